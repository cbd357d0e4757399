//! 驱动入口
//!
//! 框架在匹配到设备后调用一次 [`Usb4604Driver::attach`]；返回
//! [`crate::Error::Deferred`] 时由框架负责稍后重试，驱动内部不做重试。

use alloc::sync::Arc;

use spin::Mutex;
use usb4604_if::{Mode, gpio::GpioController, osal::Kernel};

use crate::{
    config::{ConfigSource, ControllerConfig, PlatformData},
    controller::ModeController,
    err::Result,
    of::OfNode,
};

pub const DRIVER_NAME: &str = "usb4604";
pub const OF_COMPATIBLE: &str = "smsc,usb4604";
pub const OF_MATCH_TABLE: &[&str] = &[OF_COMPATIBLE];

/// Everything the framework hands over for one device instance.
pub struct AttachContext<'a> {
    pub platform_data: Option<PlatformData>,
    pub of_node: Option<&'a dyn OfNode>,
    pub gpio: &'a dyn GpioController,
    pub kernel: Arc<dyn Kernel>,
}

impl<'a> AttachContext<'a> {
    pub fn new(gpio: &'a dyn GpioController, kernel: Arc<dyn Kernel>) -> Self {
        Self {
            platform_data: None,
            of_node: None,
            gpio,
            kernel,
        }
    }

    pub fn with_platform_data(mut self, pdata: PlatformData) -> Self {
        self.platform_data = Some(pdata);
        self
    }

    pub fn with_of_node(mut self, node: &'a dyn OfNode) -> Self {
        self.of_node = Some(node);
        self
    }

    fn source(&self) -> ConfigSource<'a> {
        ConfigSource::select(self.platform_data, self.of_node)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Usb4604Driver;

impl Usb4604Driver {
    pub fn name(&self) -> &'static str {
        DRIVER_NAME
    }

    pub fn compatible(&self) -> &'static [&'static str] {
        OF_MATCH_TABLE
    }

    pub fn matches(&self, node: &dyn OfNode) -> bool {
        OF_MATCH_TABLE.iter().any(|c| node.is_compatible(c))
    }

    /// Resolves configuration, claims the reset line and switches to the
    /// initial mode. Any failure leaves nothing claimed.
    pub fn attach(&self, ctx: &AttachContext<'_>) -> Result<Usb4604> {
        let config = ctx.source().resolve()?;
        log::debug!(
            "{DRIVER_NAME}: initial mode {}, reset gpio {:?}",
            config.initial_mode(),
            config.reset_line()
        );

        let ctrl = ModeController::init(&config, ctx.gpio, ctx.kernel.clone())
            .inspect_err(|e| log::error!("{DRIVER_NAME}: attach failed: {e}"))?;

        log::info!("{DRIVER_NAME}: attached in {} mode", ctrl.mode());
        Ok(Usb4604 {
            config,
            ctrl: Mutex::new(ctrl),
        })
    }
}

/// 已 attach 的设备实例
#[derive(Debug)]
pub struct Usb4604 {
    config: ControllerConfig,
    ctrl: Mutex<ModeController>,
}

impl Usb4604 {
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.ctrl.lock().mode()
    }

    /// Serialized with other callers; blocks for the settle interval when
    /// entering [`Mode::Hub`].
    pub fn switch_mode(&self, mode: Mode) -> Result {
        self.ctrl.lock().switch_mode(mode)
    }

    /// Releases the reset line. The line keeps its last level.
    pub fn detach(self) {
        let ctrl = self.ctrl.into_inner();
        let mode = ctrl.mode();
        match ctrl.release() {
            Some(pin) => log::info!("{DRIVER_NAME}: detached in {mode} mode, released GPIO {pin}"),
            None => log::info!("{DRIVER_NAME}: detached in {mode} mode"),
        }
    }
}
