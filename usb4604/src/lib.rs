//! SMSC USB4604 HSIC USB 2.0 hub 模式控制驱动
//!
//! 芯片只通过一根复位线控制：释放复位进入 HUB 模式，保持复位进入 STANDBY 模式。
//! 驱动在 attach 时解析平台描述符或设备树节点，申请复位线并切换到初始模式。

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod controller;
pub mod driver;
pub mod err;
pub mod of;

pub use usb4604_if::Mode;
pub use usb4604_if::gpio::*;
pub use usb4604_if::osal::Kernel;

pub use config::{ConfigSource, ControllerConfig, PlatformData};
pub use controller::{ModeController, ResetLine};
pub use driver::{AttachContext, Usb4604, Usb4604Driver};
pub use err::{Error, GpioError, Result};
pub use of::{GpioChipRegistry, GpioLookup, GpioSpec, OfNode, PropertyNode};
