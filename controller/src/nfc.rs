//! PN532 readers on top of the `pn532` crate.
//!
//! The crate owns framing, ACKs and ready polling. This module only picks the
//! requests the tag lock needs and turns their responses into a
//! [`FirmwareVersion`] or a UID.

use std::{fmt, time::Duration};

use pn532::{requests::SAMMode, serialport::SysTimer, Interface, Pn532, Request};

use crate::reader::{FirmwareVersion, TagReader};

/// Driver buffer; an InListPassiveTarget answer for one ISO-A target fits easily.
pub const BUF_LEN: usize = 64;

/// Longest InListPassiveTarget answer expected for one 7-byte-UID tag with ATS.
const INLIST_RESPONSE_LEN: usize = 17;
const FIRMWARE_TIMEOUT: Duration = Duration::from_millis(200);
const SAM_TIMEOUT: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("{0} targets in range")]
    MultipleTargets(u8),
    #[error("bad uid length {0}")]
    UidLength(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum NfcError<E: fmt::Debug> {
    #[error("pn532: {0:?}")]
    Driver(pn532::Error<E>),
    #[error("no firmware version in response")]
    NoFirmware,
    #[error(transparent)]
    Target(#[from] TargetError),
}

impl<E: fmt::Debug> From<pn532::Error<E>> for NfcError<E> {
    fn from(err: pn532::Error<E>) -> Self {
        NfcError::Driver(err)
    }
}

/// `GetFirmwareVersion` answer: `[IC, Ver, Rev, Support]`.
pub fn parse_firmware(response: &[u8]) -> Option<FirmwareVersion> {
    match response {
        [ic, version, revision, support, ..] => Some(FirmwareVersion {
            ic: *ic,
            version: *version,
            revision: *revision,
            support: *support,
        }),
        _ => None,
    }
}

/// `InListPassiveTarget` answer: `[NbTg, Tg, SENS_RES(2), SEL_RES, NFCIDLength, NFCID..]`.
///
/// `Ok(None)` when no target was listed.
pub fn parse_target(response: &[u8]) -> Result<Option<Vec<u8>>, TargetError> {
    match response.first() {
        None | Some(0) => return Ok(None),
        Some(1) => {}
        Some(n) => return Err(TargetError::MultipleTargets(*n)),
    }
    let uid_len = response.get(5).map(|l| usize::from(*l)).unwrap_or(0);
    if uid_len == 0 || response.len() < 6 + uid_len {
        return Err(TargetError::UidLength(uid_len));
    }
    Ok(Some(response[6..6 + uid_len].to_vec()))
}

pub struct Pn532Reader<I: Interface> {
    driver: Pn532<I, SysTimer, BUF_LEN>,
}

impl<I: Interface> Pn532Reader<I> {
    pub fn new(interface: I) -> Self {
        Self {
            driver: Pn532::new(interface, SysTimer::new()),
        }
    }
}

impl<I> TagReader for Pn532Reader<I>
where
    I: Interface,
    I::Error: fmt::Debug,
{
    type Error = NfcError<I::Error>;

    /// Firmware check, then SAM configuration in normal mode without IRQ.
    /// The first command on the bus also wakes the chip.
    fn probe(&mut self) -> Result<FirmwareVersion, Self::Error> {
        let response = self
            .driver
            .process(&Request::GET_FIRMWARE_VERSION, 4, FIRMWARE_TIMEOUT)?;
        let firmware = parse_firmware(response).ok_or(NfcError::NoFirmware)?;
        self.driver.process(
            &Request::sam_configuration(SAMMode::Normal, false),
            0,
            SAM_TIMEOUT,
        )?;
        Ok(firmware)
    }

    fn read_tag(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, Self::Error> {
        match self
            .driver
            .process(&Request::INLIST_ONE_ISO_A_TARGET, INLIST_RESPONSE_LEN, timeout)
        {
            Ok(response) => Ok(parse_target(response)?),
            // nothing came into the field
            Err(pn532::Error::TimeoutResponse) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
