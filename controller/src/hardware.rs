//! Raspberry Pi backend: GPIO lines and the shared SPI bus.
//!
//! Pins handed out here are owned by the loops. rppal puts every pin back in
//! its original mode when it is dropped, so dropping a loop (and then the
//! context) releases all lines on every exit path.

use std::{cell::RefCell, rc::Rc};

use embedded_hal::digital::PinState;
use embedded_hal_bus::spi::RcDevice;
use pn532::spi::SPIInterface;
use rppal::{
    gpio::{Gpio, InputPin, OutputPin},
    hal::Delay,
    spi::{Bus, Mode, SlaveSelect, Spi},
};
use tracing::{debug, info};

use crate::{error::Error, nfc::Pn532Reader};

/// One PN532 on the shared bus, selected by its own GPIO.
pub type ReaderDevice = RcDevice<Spi, OutputPin, Delay>;
pub type PiReader = Pn532Reader<SPIInterface<ReaderDevice>>;

pub struct HardwareContext {
    gpio: Gpio,
    spi: Option<Rc<RefCell<Spi>>>,
}

impl HardwareContext {
    pub fn open() -> Result<Self, Error> {
        let gpio = Gpio::new().map_err(Error::gpio)?;
        info!("GPIO opened");
        Ok(Self { gpio, spi: None })
    }

    /// Pulled up, so a beam sensor that stops conducting reads HIGH.
    pub fn input_pullup(&self, bcm: u8) -> Result<InputPin, Error> {
        debug!(bcm, "acquiring input");
        Ok(self.gpio.get(bcm).map_err(Error::gpio)?.into_input_pullup())
    }

    /// The pin comes up already at `initial`, so relays never glitch.
    pub fn output(&self, bcm: u8, initial: PinState) -> Result<OutputPin, Error> {
        debug!(bcm, ?initial, "acquiring output");
        let pin = self.gpio.get(bcm).map_err(Error::gpio)?;
        Ok(match initial {
            PinState::High => pin.into_output_high(),
            PinState::Low => pin.into_output_low(),
        })
    }

    /// Opens SPI0 in mode 0. Chip select is done in software per reader.
    pub fn open_spi(&mut self, clock_hz: u32) -> Result<(), Error> {
        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, clock_hz, Mode::Mode0)
            .map_err(|e| Error::Spi(e.to_string()))?;
        info!(clock_hz, "SPI bus opened");
        self.spi = Some(Rc::new(RefCell::new(spi)));
        Ok(())
    }

    /// A PN532 on the bus behind chip-select pin `cs_bcm`.
    pub fn reader(&self, cs_bcm: u8) -> Result<PiReader, Error> {
        let bus = self
            .spi
            .clone()
            .ok_or_else(|| Error::Spi("SPI bus not opened".into()))?;
        let cs = self.output(cs_bcm, PinState::High)?;
        let device = RcDevice::new(bus, cs, Delay::new()).map_err(Error::gpio)?;
        Ok(Pn532Reader::new(SPIInterface { spi: device }))
    }
}

impl Drop for HardwareContext {
    fn drop(&mut self) {
        info!("hardware context released");
    }
}
