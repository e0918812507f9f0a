//! Laser-trip detector.
//!
//! Each cycle reads every beam sensor; a HIGH sensor means the light path is
//! interrupted. The buzzer sounds while at least one beam is broken.

use std::{fmt, future::Future, time::Duration};

use embedded_hal::digital::{InputPin, OutputPin, PinState};
use tracing::{info, warn};

use crate::{
    error::Error, output::GuardedOutput, schedule::poll_until, shutdown::ShutdownSignalError,
};

/// Broken beams seen in one cycle, as 1-based beam numbers in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BeamReport {
    broken: Vec<usize>,
}

impl BeamReport {
    pub fn from_levels<I>(levels: I) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        let broken = levels
            .into_iter()
            .enumerate()
            .filter_map(|(i, high)| high.then_some(i + 1))
            .collect();
        Self { broken }
    }

    pub fn broken(&self) -> &[usize] {
        &self.broken
    }

    pub fn is_clear(&self) -> bool {
        self.broken.is_empty()
    }
}

impl fmt::Display for BeamReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clear() {
            f.write_str("all OK")
        } else {
            write!(f, "broken: {:?}", self.broken)
        }
    }
}

pub struct BeamMonitor<I, O: OutputPin> {
    sensors: Vec<I>,
    buzzer: GuardedOutput<O>,
    last: Option<BeamReport>,
}

impl<I, O> BeamMonitor<I, O>
where
    I: InputPin,
    O: OutputPin,
{
    /// Sensors are given in beam order. The buzzer starts silent.
    pub fn new(sensors: Vec<I>, buzzer: O) -> Result<Self, Error> {
        let buzzer = GuardedOutput::new("buzzer", buzzer, PinState::Low).map_err(Error::gpio)?;
        Ok(Self {
            sensors,
            buzzer,
            last: None,
        })
    }

    pub fn beam_count(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_buzzing(&self) -> bool {
        self.buzzer.is_active()
    }

    /// One cycle: read all beams, drive the buzzer, report.
    pub fn scan(&mut self) -> Result<BeamReport, Error> {
        let levels = self
            .sensors
            .iter_mut()
            .map(|sensor| sensor.is_high())
            .collect::<Result<Vec<_>, _>>()
            .map_err(Error::gpio)?;
        let report = BeamReport::from_levels(levels);

        self.buzzer
            .set_active(!report.is_clear())
            .map_err(Error::gpio)?;

        info!("beams: {}", report);
        if self.last.as_ref() != Some(&report) {
            if report.is_clear() {
                info!("buzzer off");
            } else {
                warn!(broken = ?report.broken(), "beam broken, buzzer on");
            }
            self.last = Some(report.clone());
        }
        Ok(report)
    }

    /// Scans every `period` until `shutdown` resolves, then silences the
    /// buzzer and releases all pins. Cleanup also runs when a scan fails.
    pub async fn run<S>(mut self, period: Duration, shutdown: S) -> Result<(), Error>
    where
        S: Future<Output = Result<(), ShutdownSignalError>>,
    {
        let outcome = poll_until(period, shutdown, || self.scan().map(|_| ())).await;
        let released = self.release();
        outcome?;
        released
    }

    /// Silences the buzzer and drops the sensor pins.
    pub fn release(&mut self) -> Result<(), Error> {
        info!("cleaning up beam monitor GPIO");
        self.sensors.clear();
        self.buzzer.release().map_err(Error::gpio)
    }
}
