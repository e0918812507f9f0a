//! Interrupt handling for the puzzle binaries.
//!
//! [`Shutdown::install`] registers the SIGINT and SIGTERM listeners on the
//! spot. A signal that arrives before anyone awaits [`Shutdown::wait`] is
//! buffered by tokio, so an interrupt during startup still reaches cleanup
//! instead of killing the process.

use std::io;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

#[derive(Debug, thiserror::Error)]
pub enum ShutdownSignalError {
    #[error("failed to listen for interrupt: {0}")]
    Interrupt(io::Error),
    #[error("failed to listen for terminate: {0}")]
    Terminate(io::Error),
}

/// Registered interrupt listeners. Create one before acquiring any hardware.
pub struct Shutdown {
    #[cfg(unix)]
    interrupt: Signal,
    #[cfg(unix)]
    terminate: Signal,
    #[cfg(windows)]
    ctrl_c: tokio::signal::windows::CtrlC,
    #[cfg(windows)]
    ctrl_close: tokio::signal::windows::CtrlClose,
}

impl Shutdown {
    /// Must be called inside a tokio runtime with the signal driver enabled.
    #[cfg(unix)]
    pub fn install() -> Result<Self, ShutdownSignalError> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt()).map_err(ShutdownSignalError::Interrupt)?,
            terminate: signal(SignalKind::terminate()).map_err(ShutdownSignalError::Terminate)?,
        })
    }

    #[cfg(windows)]
    pub fn install() -> Result<Self, ShutdownSignalError> {
        use tokio::signal::windows;
        Ok(Self {
            ctrl_c: windows::ctrl_c().map_err(ShutdownSignalError::Interrupt)?,
            ctrl_close: windows::ctrl_close().map_err(ShutdownSignalError::Terminate)?,
        })
    }

    /// Resolves on the next interrupt or terminate request, including one
    /// that arrived since [`Shutdown::install`].
    #[cfg(unix)]
    pub async fn wait(&mut self) -> Result<(), ShutdownSignalError> {
        tokio::select! {
            _ = self.interrupt.recv() => tracing::info!("SIGINT received"),
            _ = self.terminate.recv() => tracing::info!("SIGTERM received"),
        }
        Ok(())
    }

    #[cfg(windows)]
    pub async fn wait(&mut self) -> Result<(), ShutdownSignalError> {
        tokio::select! {
            _ = self.ctrl_c.recv() => tracing::info!("Ctrl+C received"),
            _ = self.ctrl_close.recv() => tracing::info!("close requested"),
        }
        Ok(())
    }
}
