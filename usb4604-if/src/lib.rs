#![no_std]

extern crate alloc;

pub mod err;
pub mod gpio;
pub mod osal;

use core::fmt::Display;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// USB4604 工作模式
///
/// 数值与平台描述符及设备树 `initial-mode` 属性中的编码一致。
///
/// 变体上不加 `#[default]`，否则 num_enum 的 `TryFromPrimitive` 会把越界值映射到它。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum Mode {
    /// 初始化前的占位状态，不能作为切换目标
    Unknown = 0,
    /// 复位释放，芯片作为 Hub 工作
    Hub = 1,
    /// 复位保持，芯片处于低功耗状态
    Standby = 2,
}

#[allow(clippy::derivable_impls)]
impl Default for Mode {
    fn default() -> Self {
        Mode::Unknown
    }
}

impl Mode {
    /// Decodes a raw mode value, keeping out-of-range values as [`Mode::Unknown`].
    pub fn from_raw(raw: u32) -> Self {
        match Mode::try_from(raw) {
            Ok(mode) => mode,
            Err(_) => {
                log::warn!("USB4604: mode value {raw} out of range");
                Mode::Unknown
            }
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Mode::Unknown => "UNKNOWN",
            Mode::Hub => "HUB",
            Mode::Standby => "STANDBY",
        };
        write!(f, "{name}")
    }
}
