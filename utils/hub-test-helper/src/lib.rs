//! 主机端测试辅助：记录所有操作的 GPIO 控制器与 Kernel 实现

use std::{
    collections::BTreeMap,
    sync::Arc,
    time::{Duration, Instant},
};

use spin::Mutex;
use usb4604_if::{
    err::GpioError,
    gpio::{GpioController, GpioFlags, Level, OutputPin, PinId},
    osal::Kernel,
};

pub fn init_log() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpioEvent {
    Request { pin: PinId, flags: GpioFlags },
    Set { pin: PinId, level: Level },
    Free { pin: PinId },
}

#[derive(Debug, Clone)]
struct Line {
    level: Level,
    label: &'static str,
}

#[derive(Default)]
struct State {
    lines: BTreeMap<PinId, Line>,
    events: Vec<GpioEvent>,
    request_errors: BTreeMap<PinId, GpioError>,
    fail_writes: bool,
}

/// GPIO 控制器模拟，克隆共享同一份状态
#[derive(Clone, Default)]
pub struct MockGpio {
    state: Arc<Mutex<State>>,
}

impl MockGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next requests of `pin` fail with `err`.
    pub fn fail_request(&self, pin: PinId, err: GpioError) {
        self.state.lock().request_errors.insert(pin, err);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    pub fn is_requested(&self, pin: PinId) -> bool {
        self.state.lock().lines.contains_key(&pin)
    }

    pub fn level(&self, pin: PinId) -> Option<Level> {
        self.state.lock().lines.get(&pin).map(|l| l.level)
    }

    pub fn label(&self, pin: PinId) -> Option<&'static str> {
        self.state.lock().lines.get(&pin).map(|l| l.label)
    }

    pub fn events(&self) -> Vec<GpioEvent> {
        self.state.lock().events.clone()
    }
}

impl GpioController for MockGpio {
    fn request_one(
        &self,
        pin: PinId,
        flags: GpioFlags,
        label: &'static str,
    ) -> Result<Box<dyn OutputPin>, GpioError> {
        let mut state = self.state.lock();
        if let Some(err) = state.request_errors.get(&pin) {
            return Err(err.clone());
        }
        if state.lines.contains_key(&pin) {
            return Err(GpioError::Busy);
        }
        let level = flags.initial_level().ok_or(GpioError::NotOutput)?;
        state.lines.insert(pin, Line { level, label });
        state.events.push(GpioEvent::Request { pin, flags });
        Ok(Box::new(MockPin {
            pin,
            state: self.state.clone(),
        }))
    }
}

struct MockPin {
    pin: PinId,
    state: Arc<Mutex<State>>,
}

impl OutputPin for MockPin {
    fn id(&self) -> PinId {
        self.pin
    }

    fn set_level(&mut self, level: Level) -> Result<(), GpioError> {
        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(GpioError::Io(format!("write to GPIO {} failed", self.pin)));
        }
        let line = state.lines.get_mut(&self.pin).ok_or(GpioError::InvalidPin)?;
        line.level = level;
        state.events.push(GpioEvent::Set {
            pin: self.pin,
            level,
        });
        Ok(())
    }
}

impl Drop for MockPin {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.lines.remove(&self.pin);
        state.events.push(GpioEvent::Free { pin: self.pin });
    }
}

/// 只记录等待请求，不真正睡眠
#[derive(Default)]
pub struct RecordingKernel {
    sleeps: Mutex<Vec<(Duration, Duration)>>,
}

impl RecordingKernel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<(Duration, Duration)> {
        self.sleeps.lock().clone()
    }
}

impl Kernel for RecordingKernel {
    fn delay(&self, duration: Duration) {
        self.sleeps.lock().push((duration, duration));
    }

    fn sleep_range(&self, min: Duration, max: Duration) {
        self.sleeps.lock().push((min, max));
    }
}

/// 使用 `std::thread::sleep` 的真实等待
#[derive(Default)]
pub struct StdKernel {
    slept: Mutex<Duration>,
}

impl StdKernel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total time actually spent sleeping.
    pub fn slept(&self) -> Duration {
        *self.slept.lock()
    }
}

impl Kernel for StdKernel {
    fn delay(&self, duration: Duration) {
        let start = Instant::now();
        std::thread::sleep(duration);
        *self.slept.lock() += start.elapsed();
    }
}
