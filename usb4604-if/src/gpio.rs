//! GPIO 抽象
//!
//! 驱动只需要两件事：向 GPIO 控制器申请一根输出线，以及设置它的电平。
//! 引脚复用、中断等细节由平台实现负责。

use alloc::boxed::Box;
use core::fmt::Display;

use bitflags::bitflags;

use crate::err::GpioError;

/// 全局 GPIO 编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PinId(u32);

impl PinId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Integer descriptors encode "no GPIO" as a negative number.
    pub fn from_raw(raw: i32) -> Option<Self> {
        u32::try_from(raw).ok().map(Self)
    }

    pub const fn raw(&self) -> u32 {
        self.0
    }
}

impl Display for PinId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Low,
    High,
}

bitflags! {
    /// 申请 GPIO 时的配置
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GpioFlags: u32 {
        const OUTPUT = 1 << 0;
        const INIT_LOW = 1 << 1;
        const INIT_HIGH = 1 << 2;

        const OUT_INIT_LOW = Self::OUTPUT.bits() | Self::INIT_LOW.bits();
        const OUT_INIT_HIGH = Self::OUTPUT.bits() | Self::INIT_HIGH.bits();
    }
}

impl GpioFlags {
    pub fn is_output(&self) -> bool {
        self.contains(GpioFlags::OUTPUT)
    }

    /// Level an output line is driven to as soon as it is requested.
    pub fn initial_level(&self) -> Option<Level> {
        if !self.is_output() {
            return None;
        }
        if self.contains(GpioFlags::INIT_HIGH) {
            Some(Level::High)
        } else {
            Some(Level::Low)
        }
    }
}

/// 已申请的输出线
///
/// 句柄独占引脚，drop 时归还给控制器。
pub trait OutputPin: Send {
    fn id(&self) -> PinId;

    /// May sleep; never call from interrupt context.
    fn set_level(&mut self, level: Level) -> Result<(), GpioError>;

    fn set_high(&mut self) -> Result<(), GpioError> {
        self.set_level(Level::High)
    }

    fn set_low(&mut self) -> Result<(), GpioError> {
        self.set_level(Level::Low)
    }
}

pub trait GpioController: Send + Sync {
    /// Requests `pin` with `flags`, applying the initial level before returning.
    fn request_one(
        &self,
        pin: PinId,
        flags: GpioFlags,
        label: &'static str,
    ) -> Result<Box<dyn OutputPin>, GpioError>;
}
