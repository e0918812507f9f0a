use std::{fmt, time::Duration};

use tracing::{debug, error, info};

/// What a PN532 reports for `GetFirmwareVersion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion {
    pub ic: u8,
    pub version: u8,
    pub revision: u8,
    pub support: u8,
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PN5{:02x} v{}.{}", self.ic, self.version, self.revision)
    }
}

/// An NFC reader as the tag lock sees it.
pub trait TagReader {
    type Error: fmt::Debug;

    /// Checks the reader answers with firmware and prepares it for reads.
    fn probe(&mut self) -> Result<FirmwareVersion, Self::Error>;

    /// Waits up to `timeout` for one tag. `Ok(None)` when nothing is in range.
    fn read_tag(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, Self::Error>;
}

/// A reader slot. Offline readers stay offline for the life of the process.
pub enum Reader<R> {
    Online(R),
    Offline,
}

impl<R> Reader<R> {
    pub fn is_online(&self) -> bool {
        matches!(self, Reader::Online(_))
    }

    pub fn online_mut(&mut self) -> Option<&mut R> {
        match self {
            Reader::Online(reader) => Some(reader),
            Reader::Offline => None,
        }
    }
}

impl<R> fmt::Debug for Reader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reader::Online(_) => f.write_str("Online"),
            Reader::Offline => f.write_str("Offline"),
        }
    }
}

/// Probes `reader` up to `attempts` times, `delay` apart.
///
/// `number` is the 1-based label used in logs.
pub async fn bring_online<R: TagReader>(
    number: usize,
    mut reader: R,
    attempts: u32,
    delay: Duration,
) -> Reader<R> {
    for attempt in 1..=attempts {
        match reader.probe() {
            Ok(firmware) => {
                info!("Reader {number} online ({firmware})");
                return Reader::Online(reader);
            }
            Err(e) => {
                debug!("Reader {number} attempt {attempt}/{attempts} failed: {e:?}");
                if attempt < attempts {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
    error!("Reader {number} FAILED after {attempts} attempts, leaving it offline");
    Reader::Offline
}
