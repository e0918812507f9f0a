use crate::{config::ConfigError, shutdown::ShutdownSignalError};

/// Errors that stop a control loop.
///
/// Reader read failures never show up here; they are absorbed per cycle.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("spi error: {0}")]
    Spi(String),
    #[error(transparent)]
    Signal(#[from] ShutdownSignalError),
}

impl Error {
    pub(crate) fn gpio(err: impl core::fmt::Debug) -> Self {
        Error::Gpio(format!("{err:?}"))
    }
}
