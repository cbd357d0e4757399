use alloc::string::String;

use crate::{Mode, gpio::PinId};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// GPIO 提供者尚未注册，调用方需要稍后重新探测
    #[error("reset GPIO provider not ready, probe deferred")]
    Deferred,
    #[error("unable to request GPIO {pin} as connect pin: {source}")]
    ResourceClaimFailed {
        pin: PinId,
        #[source]
        source: GpioError,
    },
    #[error("unknown mode {0} is requested")]
    InvalidMode(Mode),
    #[error("GPIO error: {0}")]
    Gpio(#[from] GpioError),
}

impl Error {
    /// Only [`Error::Deferred`] may succeed when attach is run again later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Deferred)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GpioError {
    #[error("GPIO is busy")]
    Busy,
    #[error("invalid GPIO")]
    InvalidPin,
    #[error("GPIO is not an output")]
    NotOutput,
    #[error("I/O error: {0}")]
    Io(String),
}
