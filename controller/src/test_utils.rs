use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    convert::Infallible,
    io,
    rc::Rc,
    sync::{Arc, Mutex},
    time::Duration,
};

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, PinState};

use crate::reader::{FirmwareVersion, TagReader};

// ─── Pins ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Recording {
    writes: RefCell<Vec<PinState>>,
    drops: Cell<usize>,
}

/// Output pin that records every level written. Clones share the record.
#[derive(Clone, Default)]
pub struct RecordingPin(Rc<Recording>, bool);

impl RecordingPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<PinState> {
        self.0.writes.borrow().clone()
    }

    /// Drops of the handle given to the code under test.
    pub fn drops(&self) -> usize {
        self.0.drops.get()
    }

    /// Handle that counts its own drop, for handing to the code under test.
    pub fn owned(&self) -> Self {
        Self(self.0.clone(), true)
    }
}

impl Drop for RecordingPin {
    fn drop(&mut self) {
        if self.1 {
            self.0.drops.set(self.0.drops.get() + 1);
        }
    }
}

impl ErrorType for RecordingPin {
    type Error = Infallible;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.writes.borrow_mut().push(PinState::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.writes.borrow_mut().push(PinState::High);
        Ok(())
    }
}

/// Input pin whose level the test sets through a shared cell.
#[derive(Clone, Default)]
pub struct LevelPin(Rc<Cell<bool>>);

impl LevelPin {
    pub fn set(&self, high: bool) {
        self.0.set(high);
    }
}

impl ErrorType for LevelPin {
    type Error = Infallible;
}

impl InputPin for LevelPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.get())
    }
}

// ─── Logs ───────────────────────────────────────────────────────────────────

/// fmt-layer writer that keeps everything written, for asserting on log lines.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ─── Readers ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeReadError;

#[derive(Default)]
struct Script {
    probe_failures: Cell<u32>,
    probes: Cell<u32>,
    reads: RefCell<VecDeque<Result<Option<Vec<u8>>, FakeReadError>>>,
    resting: RefCell<Option<Vec<u8>>>,
}

/// Reader whose answers the test scripts. Queued reads are served first, then
/// the resting tag (the tag lying on the reader) on every read.
#[derive(Clone, Default)]
pub struct ScriptedReader(Rc<Script>);

impl ScriptedReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_probes(self, count: u32) -> Self {
        self.0.probe_failures.set(count);
        self
    }

    pub fn probes(&self) -> u32 {
        self.0.probes.get()
    }

    pub fn place(&self, uid: &[u8]) {
        *self.0.resting.borrow_mut() = Some(uid.to_vec());
    }

    pub fn lift(&self) {
        *self.0.resting.borrow_mut() = None;
    }

    pub fn queue(&self, read: Result<Option<Vec<u8>>, FakeReadError>) {
        self.0.reads.borrow_mut().push_back(read);
    }
}

impl TagReader for ScriptedReader {
    type Error = FakeReadError;

    fn probe(&mut self) -> Result<FirmwareVersion, Self::Error> {
        self.0.probes.set(self.0.probes.get() + 1);
        let remaining = self.0.probe_failures.get();
        if remaining > 0 {
            self.0.probe_failures.set(remaining - 1);
            return Err(FakeReadError);
        }
        Ok(FirmwareVersion {
            ic: 0x32,
            version: 1,
            revision: 6,
            support: 7,
        })
    }

    fn read_tag(&mut self, _timeout: Duration) -> Result<Option<Vec<u8>>, Self::Error> {
        if let Some(read) = self.0.reads.borrow_mut().pop_front() {
            return read;
        }
        Ok(self.0.resting.borrow().clone())
    }
}
