//! 初始配置解析
//!
//! 平台描述符与设备树节点互斥，描述符优先。两者都没有时默认 HUB 模式、无复位线。

use usb4604_if::{Mode, gpio::PinId};

use crate::{
    err::{Error, Result},
    of::{GpioLookup, OfNode},
};

pub const PROP_RESET_GPIOS: &str = "reset-gpios";
pub const PROP_INITIAL_MODE: &str = "initial-mode";

/// 平台描述符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformData {
    pub init_mode: Mode,
    pub reset_gpio: Option<PinId>,
}

impl PlatformData {
    pub fn new(init_mode: Mode, reset_gpio: Option<PinId>) -> Self {
        Self {
            init_mode,
            reset_gpio,
        }
    }

    /// Builds a descriptor from its integer encoding. A negative `reset_gpio`
    /// means the board has no reset line.
    pub fn from_raw(init_mode: u32, reset_gpio: i32) -> Self {
        Self {
            init_mode: Mode::from_raw(init_mode),
            reset_gpio: PinId::from_raw(reset_gpio),
        }
    }
}

/// Resolved attach-time configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    initial_mode: Mode,
    reset_line: Option<PinId>,
}

impl ControllerConfig {
    pub const fn new(initial_mode: Mode, reset_line: Option<PinId>) -> Self {
        Self {
            initial_mode,
            reset_line,
        }
    }

    pub fn initial_mode(&self) -> Mode {
        self.initial_mode
    }

    pub fn reset_line(&self) -> Option<PinId> {
        self.reset_line
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::new(Mode::Hub, None)
    }
}

impl From<PlatformData> for ControllerConfig {
    fn from(value: PlatformData) -> Self {
        Self::new(value.init_mode, value.reset_gpio)
    }
}

pub enum ConfigSource<'a> {
    Platform(PlatformData),
    Node(&'a dyn OfNode),
    Empty,
}

impl<'a> ConfigSource<'a> {
    /// Picks exactly one source; platform data shadows the node.
    pub fn select(pdata: Option<PlatformData>, node: Option<&'a dyn OfNode>) -> Self {
        match (pdata, node) {
            (Some(pdata), _) => ConfigSource::Platform(pdata),
            (None, Some(node)) => ConfigSource::Node(node),
            (None, None) => ConfigSource::Empty,
        }
    }

    pub fn resolve(&self) -> Result<ControllerConfig> {
        match self {
            ConfigSource::Platform(pdata) => Ok((*pdata).into()),
            ConfigSource::Node(node) => resolve_node(*node),
            ConfigSource::Empty => Ok(ControllerConfig::default()),
        }
    }
}

fn resolve_node(node: &dyn OfNode) -> Result<ControllerConfig> {
    let reset_line = match node.named_gpio(PROP_RESET_GPIOS, 0) {
        GpioLookup::Found(pin) => Some(pin),
        GpioLookup::Deferred => {
            log::debug!("{}: {PROP_RESET_GPIOS} provider not ready", node.name());
            return Err(Error::Deferred);
        }
        GpioLookup::NotFound => None,
    };

    let initial_mode = node
        .read_u32(PROP_INITIAL_MODE)
        .map(Mode::from_raw)
        .unwrap_or(Mode::Hub);

    Ok(ControllerConfig::new(initial_mode, reset_line))
}
