//! Laser-trip detector: buzzer on while any beam is broken.

use anyhow::Context;
use embedded_hal::digital::PinState;
use escape_puzzles::{
    beam::BeamMonitor, hardware::HardwareContext, logging, shutdown::Shutdown, Config,
};
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    logging::init("beam_monitor");

    let config = Config::load().context("loading configuration")?;
    let beam = &config.beam;
    let mut shutdown = Shutdown::install().context("installing signal handlers")?;

    let hardware = HardwareContext::open().context("opening GPIO")?;
    let sensors = beam
        .sensor_pins
        .iter()
        .map(|&bcm| hardware.input_pullup(bcm))
        .collect::<Result<Vec<_>, _>>()
        .context("acquiring beam sensor pins")?;
    let buzzer = hardware
        .output(beam.buzzer_pin, PinState::Low)
        .context("acquiring buzzer pin")?;

    let monitor = BeamMonitor::new(sensors, buzzer)?;
    info!(
        "--- LASER GRID --- {} beams armed, press Ctrl+C to exit safely",
        monitor.beam_count()
    );

    monitor.run(beam.poll_period(), shutdown.wait()).await?;

    drop(hardware);
    info!("system halted safely");
    Ok(())
}
