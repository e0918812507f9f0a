use embedded_hal::digital::{OutputPin, PinState};
use tracing::{debug, warn};

/// A digital output that only writes on logical change and returns to its
/// idle level exactly once when released.
///
/// If the owner goes away without calling [`GuardedOutput::release`] (error
/// path, panic), `Drop` releases it.
pub struct GuardedOutput<O: OutputPin> {
    name: &'static str,
    pin: O,
    idle: PinState,
    active: bool,
    released: bool,
}

impl<O: OutputPin> GuardedOutput<O> {
    /// Takes ownership of `pin` and drives it to `idle`.
    pub fn new(name: &'static str, mut pin: O, idle: PinState) -> Result<Self, O::Error> {
        pin.set_state(idle)?;
        Ok(Self {
            name,
            pin,
            idle,
            active: false,
            released: false,
        })
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Drives the active or idle level. Returns whether a hardware write was issued.
    pub fn set_active(&mut self, active: bool) -> Result<bool, O::Error> {
        if self.released || self.active == active {
            return Ok(false);
        }
        let level = if active { opposite(self.idle) } else { self.idle };
        self.pin.set_state(level)?;
        self.active = active;
        Ok(true)
    }

    /// Writes the idle level. Later calls do nothing.
    pub fn release(&mut self) -> Result<(), O::Error> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.active = false;
        debug!(output = self.name, "returning output to idle");
        self.pin.set_state(self.idle)
    }
}

impl<O: OutputPin> Drop for GuardedOutput<O> {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.release() {
                warn!(output = self.name, "failed to idle output on drop: {:?}", e);
            }
        }
    }
}

fn opposite(state: PinState) -> PinState {
    match state {
        PinState::Low => PinState::High,
        PinState::High => PinState::Low,
    }
}
