//! Control loops for the escape-room puzzles running on the Raspberry Pi.
//!
//! - [`beam`]: laser-trip detector that sounds a buzzer while any beam is broken.
//! - [`tag_lock`]: four-reader NFC "organ" puzzle that opens a relay lock when
//!   every reader holds its correct tag.
//!
//! The loops only see `embedded-hal` traits; the Pi backend lives in
//! `hardware` behind the `rpi` feature.

pub mod beam;
pub mod config;
pub mod error;
#[cfg(feature = "rpi")]
pub mod hardware;
pub mod logging;
pub mod nfc;
pub mod output;
pub mod reader;
pub mod schedule;
pub mod shutdown;
pub mod tag;
pub mod tag_lock;
#[cfg(test)]
mod test_utils;

pub use config::{BeamConfig, Config, TagLockConfig};
pub use error::Error;
pub use tag::TagId;
