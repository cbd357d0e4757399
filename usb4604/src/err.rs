pub use usb4604_if::err::{Error, GpioError};

pub type Result<T = ()> = core::result::Result<T, Error>;
