#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    rc::Rc,
    time::Duration,
};

use embedded_hal::digital::{self, ErrorKind, ErrorType, InputPin, OutputPin, PinState};
use escape_puzzles::reader::{FirmwareVersion, TagReader};

// ─── Pins ───────────────────────────────────────────────────────────────────

/// A pin that stopped answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinFault;

impl digital::Error for PinFault {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Default)]
struct PinLog {
    writes: RefCell<Vec<PinState>>,
    drops: Cell<usize>,
    fail_next: Cell<bool>,
}

/// Output pin recording each write. `handle()` goes to the code under test
/// and counts its own drop; the test keeps the original to inspect.
#[derive(Default)]
pub struct FakeOutput {
    log: Rc<PinLog>,
    counts_drop: bool,
}

impl FakeOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> Self {
        Self {
            log: self.log.clone(),
            counts_drop: true,
        }
    }

    pub fn writes(&self) -> Vec<PinState> {
        self.log.writes.borrow().clone()
    }

    pub fn last(&self) -> Option<PinState> {
        self.log.writes.borrow().last().copied()
    }

    pub fn drops(&self) -> usize {
        self.log.drops.get()
    }

    /// The next write fails and changes nothing.
    pub fn fail_next_write(&self) {
        self.log.fail_next.set(true);
    }

    fn write(&self, level: PinState) -> Result<(), PinFault> {
        if self.log.fail_next.replace(false) {
            return Err(PinFault);
        }
        self.log.writes.borrow_mut().push(level);
        Ok(())
    }
}

impl Drop for FakeOutput {
    fn drop(&mut self) {
        if self.counts_drop {
            self.log.drops.set(self.log.drops.get() + 1);
        }
    }
}

impl ErrorType for FakeOutput {
    type Error = PinFault;
}

impl OutputPin for FakeOutput {
    fn set_low(&mut self) -> Result<(), PinFault> {
        self.write(PinState::Low)
    }

    fn set_high(&mut self) -> Result<(), PinFault> {
        self.write(PinState::High)
    }
}

/// Input pin driven by the test.
#[derive(Clone, Default)]
pub struct FakeInput {
    level: Rc<Cell<bool>>,
    broken: Rc<Cell<bool>>,
    drops: Rc<Cell<usize>>,
}

impl FakeInput {
    pub fn set_high(&self, high: bool) {
        self.level.set(high);
    }

    /// Every read from now on fails.
    pub fn disconnect(&self) {
        self.broken.set(true);
    }

    pub fn drops(&self) -> usize {
        self.drops.get()
    }
}

/// Handle given to the code under test; counts its drop.
pub struct OwnedInput(FakeInput);

impl From<&FakeInput> for OwnedInput {
    fn from(pin: &FakeInput) -> Self {
        OwnedInput(pin.clone())
    }
}

impl Drop for OwnedInput {
    fn drop(&mut self) {
        self.0.drops.set(self.0.drops.get() + 1);
    }
}

impl OwnedInput {
    fn level(&self) -> Result<bool, PinFault> {
        if self.0.broken.get() {
            return Err(PinFault);
        }
        Ok(self.0.level.get())
    }
}

impl ErrorType for OwnedInput {
    type Error = PinFault;
}

impl InputPin for OwnedInput {
    fn is_high(&mut self) -> Result<bool, PinFault> {
        self.level()
    }

    fn is_low(&mut self) -> Result<bool, PinFault> {
        self.level().map(|high| !high)
    }
}

// ─── Readers ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct BusError;

#[derive(Default)]
struct ReaderScript {
    on_reader: RefCell<Option<Vec<u8>>>,
    glitches: RefCell<VecDeque<()>>,
    reads: Cell<usize>,
    dead: Cell<bool>,
    probes: Cell<u32>,
}

/// NFC reader with a tag that the test places and lifts.
#[derive(Clone, Default)]
pub struct FakeReader(Rc<ReaderScript>);

impl FakeReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// A reader that never answers the firmware check.
    pub fn dead() -> Self {
        let reader = Self::default();
        reader.0.dead.set(true);
        reader
    }

    pub fn probes(&self) -> u32 {
        self.0.probes.get()
    }

    pub fn place(&self, tag: u32) {
        *self.0.on_reader.borrow_mut() = Some(tag.to_be_bytes().to_vec());
    }

    pub fn lift(&self) {
        *self.0.on_reader.borrow_mut() = None;
    }

    /// The next read fails with a bus error.
    pub fn glitch(&self) {
        self.0.glitches.borrow_mut().push_back(());
    }

    pub fn reads(&self) -> usize {
        self.0.reads.get()
    }
}

impl TagReader for FakeReader {
    type Error = BusError;

    fn probe(&mut self) -> Result<FirmwareVersion, BusError> {
        self.0.probes.set(self.0.probes.get() + 1);
        if self.0.dead.get() {
            return Err(BusError);
        }
        Ok(FirmwareVersion {
            ic: 0x32,
            version: 1,
            revision: 6,
            support: 7,
        })
    }

    fn read_tag(&mut self, _timeout: Duration) -> Result<Option<Vec<u8>>, BusError> {
        self.0.reads.set(self.0.reads.get() + 1);
        if self.0.glitches.borrow_mut().pop_front().is_some() {
            return Err(BusError);
        }
        Ok(self.0.on_reader.borrow().clone())
    }
}
