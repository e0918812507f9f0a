//! Four-reader "organ matching" lock.
//!
//! Each reader remembers the last tag it saw and when. A tag that has not been
//! re-read within the expiry window counts as removed. The relay opens while
//! every reader holds its correct tag and closes as soon as one does not.

use std::{fmt, future::Future, time::Duration};

use embedded_hal::digital::{OutputPin, PinState};
use tokio::time::Instant;
use tracing::{info, trace};

use crate::{
    error::Error,
    output::GuardedOutput,
    reader::{Reader, TagReader},
    schedule::poll_until,
    shutdown::ShutdownSignalError,
    tag::TagId,
};

/// Relay level that keeps the lock shut. The opposite level opens it.
pub const LOCKED_LEVEL: PinState = PinState::High;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Locked,
    Unlocked,
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockState::Locked => f.write_str("locked"),
            LockState::Unlocked => f.write_str("unlocked"),
        }
    }
}

/// Last tag seen on one reader. `last_seen` survives clearing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderState {
    pub last_tag: Option<TagId>,
    pub last_seen: Option<Instant>,
}

/// Per-reader state plus the fixed table of correct tags.
#[derive(Debug, Clone)]
pub struct TagBoard {
    slots: Vec<ReaderState>,
    correct: Vec<TagId>,
    expiry: Duration,
}

impl TagBoard {
    pub fn new(correct: Vec<TagId>, expiry: Duration) -> Self {
        Self {
            slots: vec![ReaderState::default(); correct.len()],
            correct,
            expiry,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn state(&self, index: usize) -> Option<&ReaderState> {
        self.slots.get(index)
    }

    /// Records `tag` on reader `index`. Returns true when the tag id changed.
    pub fn observe(&mut self, index: usize, tag: TagId, now: Instant) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        let changed = slot.last_tag != Some(tag);
        slot.last_tag = Some(tag);
        slot.last_seen = Some(now);
        changed
    }

    /// Clears every tag unseen for the expiry window. Returns the cleared indices.
    pub fn expire(&mut self, now: Instant) -> Vec<usize> {
        let expiry = self.expiry;
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| {
                let seen = slot.last_seen?;
                if slot.last_tag.is_some() && now.saturating_duration_since(seen) >= expiry {
                    slot.last_tag = None;
                    Some(i)
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn correct_count(&self) -> usize {
        self.slots
            .iter()
            .zip(&self.correct)
            .filter(|(slot, expected)| slot.last_tag == Some(**expected))
            .count()
    }

    pub fn is_solved(&self) -> bool {
        !self.is_empty() && self.correct_count() == self.len()
    }
}

/// Outcome of one controller cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub correct: usize,
    pub lock: LockState,
    /// Set when this cycle moved the lock.
    pub transitioned: bool,
}

pub struct TagLockController<R, O: OutputPin> {
    readers: Vec<Reader<R>>,
    board: TagBoard,
    lock: GuardedOutput<O>,
    read_timeout: Duration,
}

impl<R, O> TagLockController<R, O>
where
    R: TagReader,
    O: OutputPin,
{
    /// `readers[i]` is expected to hold `board`'s correct tag `i`. The lock
    /// pin is driven to [`LOCKED_LEVEL`] straight away.
    pub fn new(
        readers: Vec<Reader<R>>,
        board: TagBoard,
        lock: O,
        read_timeout: Duration,
    ) -> Result<Self, Error> {
        if readers.len() != board.len() {
            return Err(Error::Config(crate::config::ConfigError::Validation(format!(
                "{} readers for {} correct tags",
                readers.len(),
                board.len()
            ))));
        }
        let lock = GuardedOutput::new("lock", lock, LOCKED_LEVEL).map_err(Error::gpio)?;
        Ok(Self {
            readers,
            board,
            lock,
            read_timeout,
        })
    }

    pub fn lock_state(&self) -> LockState {
        if self.lock.is_active() {
            LockState::Unlocked
        } else {
            LockState::Locked
        }
    }

    pub fn board(&self) -> &TagBoard {
        &self.board
    }

    pub fn online_readers(&self) -> usize {
        self.readers.iter().filter(|r| r.is_online()).count()
    }

    /// One cycle: scan, expire, compare, drive the lock on change.
    pub fn cycle(&mut self) -> Result<CycleReport, Error> {
        self.scan();

        for index in self.board.expire(Instant::now()) {
            info!("Reader {}: cleared", index + 1);
        }

        let correct = self.board.correct_count();
        let solved = self.board.is_solved();
        let transitioned = self.lock.set_active(solved).map_err(Error::gpio)?;
        if transitioned {
            if solved {
                info!("all organs in place, UNLOCKING");
            } else {
                info!(correct, "organ removed, LOCKING");
            }
        }
        Ok(CycleReport {
            correct,
            lock: self.lock_state(),
            transitioned,
        })
    }

    fn scan(&mut self) {
        for (index, reader) in self.readers.iter_mut().enumerate() {
            let Some(reader) = reader.online_mut() else {
                continue;
            };
            let uid = match reader.read_tag(self.read_timeout) {
                Ok(Some(uid)) => uid,
                Ok(None) => continue,
                Err(e) => {
                    // no tag this cycle
                    trace!("Reader {}: read failed: {:?}", index + 1, e);
                    continue;
                }
            };
            let Some(tag) = TagId::from_uid(&uid) else {
                trace!("Reader {}: ignoring uid {:02x?}", index + 1, uid);
                continue;
            };
            if self.board.observe(index, tag, Instant::now()) {
                info!("Reader {}: detected {}", index + 1, tag);
            }
        }
    }

    /// Cycles every `period` until `shutdown` resolves, then closes the lock
    /// and releases the readers. Cleanup also runs when a cycle fails.
    pub async fn run<S>(mut self, period: Duration, shutdown: S) -> Result<(), Error>
    where
        S: Future<Output = Result<(), ShutdownSignalError>>,
    {
        let outcome = poll_until(period, shutdown, || self.cycle().map(|_| ())).await;
        let released = self.release();
        outcome?;
        released
    }

    /// Returns the relay to the locked level and drops the readers.
    pub fn release(&mut self) -> Result<(), Error> {
        info!("cleaning up tag lock GPIO");
        self.readers.clear();
        self.lock.release().map_err(Error::gpio)
    }
}
