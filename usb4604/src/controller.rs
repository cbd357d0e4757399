//! USB4604 模式状态机
//!
//! ```text
//!            switch_mode(Hub)             switch_mode(Standby)
//! Unknown ───────────────────► Hub ◄────────────────────────► Standby
//!    │                                                          ▲
//!    └──────────────────────────────────────────────────────────┘
//!                        switch_mode(Standby)
//! ```
//!
//! 进入 HUB：复位线拉高，然后等待 4~10ms 让芯片完成上电。
//! 进入 STANDBY：复位线拉低，无需等待。

use alloc::{boxed::Box, sync::Arc};
use core::{fmt::Debug, time::Duration};

use usb4604_if::{
    Mode,
    gpio::{GpioController, GpioFlags, Level, OutputPin, PinId},
    osal::Kernel,
};

use crate::{
    config::ControllerConfig,
    err::{Error, Result},
};

/// 释放复位后芯片就绪所需的最短时间
pub const SETTLE_MIN: Duration = Duration::from_millis(4);
pub const SETTLE_MAX: Duration = Duration::from_millis(10);

pub const RESET_LABEL: &str = "usb4604 reset";

/// 已申请的复位线，独占对应引脚
pub struct ResetLine {
    pin: Box<dyn OutputPin>,
}

impl ResetLine {
    /// Requests `pin` as an output driven low.
    pub fn claim(gpio: &dyn GpioController, pin: PinId) -> Result<Self> {
        let handle = gpio
            .request_one(pin, GpioFlags::OUT_INIT_LOW, RESET_LABEL)
            .map_err(|source| {
                log::error!("unable to request GPIO {pin} as connect pin ({source})");
                Error::ResourceClaimFailed { pin, source }
            })?;
        Ok(Self { pin: handle })
    }

    pub fn id(&self) -> PinId {
        self.pin.id()
    }

    fn drive(&mut self, level: Level) -> Result {
        self.pin.set_level(level)?;
        Ok(())
    }
}

impl Debug for ResetLine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ResetLine").field("pin", &self.id()).finish()
    }
}

pub struct ModeController {
    mode: Mode,
    reset: Option<ResetLine>,
    kernel: Arc<dyn Kernel>,
}

impl ModeController {
    /// Claims the configured reset line. The controller starts in
    /// [`Mode::Unknown`]; see [`ModeController::init`].
    pub fn new(
        config: &ControllerConfig,
        gpio: &dyn GpioController,
        kernel: Arc<dyn Kernel>,
    ) -> Result<Self> {
        let reset = match config.reset_line() {
            Some(pin) => Some(ResetLine::claim(gpio, pin)?),
            None => None,
        };
        Ok(Self {
            mode: Mode::Unknown,
            reset,
            kernel,
        })
    }

    /// Constructs the controller and drives it to the configured initial mode.
    pub fn init(
        config: &ControllerConfig,
        gpio: &dyn GpioController,
        kernel: Arc<dyn Kernel>,
    ) -> Result<Self> {
        let mut ctrl = Self::new(config, gpio, kernel)?;
        ctrl.switch_mode(config.initial_mode())?;
        Ok(ctrl)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn reset_pin(&self) -> Option<PinId> {
        self.reset.as_ref().map(|r| r.id())
    }

    pub fn has_reset_line(&self) -> bool {
        self.reset.is_some()
    }

    /// Runs the transition sequence for `mode`, even if already in it.
    ///
    /// Entering [`Mode::Hub`] blocks for the settle interval.
    pub fn switch_mode(&mut self, mode: Mode) -> Result {
        match mode {
            Mode::Hub => self.connect(),
            Mode::Standby => {
                self.reset(Level::Low)?;
                self.mode = Mode::Standby;
                log::debug!("switched to STANDBY mode");
                Ok(())
            }
            Mode::Unknown => {
                log::error!("unknown mode is requested");
                Err(Error::InvalidMode(mode))
            }
        }
    }

    fn connect(&mut self) -> Result {
        self.reset(Level::High)?;
        // 释放复位后芯片需要时间上电，没有复位线时同样等待
        self.kernel.sleep_range(SETTLE_MIN, SETTLE_MAX);
        self.mode = Mode::Hub;
        log::debug!("switched to HUB mode");
        Ok(())
    }

    fn reset(&mut self, level: Level) -> Result {
        // 没有复位线时芯片默认已上电
        if let Some(line) = self.reset.as_mut() {
            line.drive(level)?;
        }
        Ok(())
    }

    /// Gives up the reset line, returning the pin it was bound to.
    pub fn release(mut self) -> Option<PinId> {
        self.reset.take().map(|line| line.id())
    }
}

impl Debug for ModeController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModeController")
            .field("mode", &self.mode)
            .field("reset", &self.reset)
            .finish()
    }
}
