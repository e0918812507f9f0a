//! Organ puzzle: four NFC readers, one relay lock.

use anyhow::Context;
use escape_puzzles::{
    hardware::HardwareContext,
    logging,
    reader::{bring_online, Reader},
    schedule::unless_shutdown,
    shutdown::Shutdown,
    tag_lock::{TagBoard, TagLockController, LOCKED_LEVEL},
    Config,
};
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    logging::init("tag_lock");

    let config = Config::load().context("loading configuration")?;
    let lock_config = &config.tag_lock;
    let mut shutdown = Shutdown::install().context("installing signal handlers")?;

    info!("--- ORGAN PUZZLE --- press Ctrl+C to exit safely");

    let mut hardware = HardwareContext::open().context("opening GPIO")?;
    // Start locked before anything else can go wrong.
    let lock = hardware
        .output(lock_config.lock_pin, LOCKED_LEVEL)
        .context("acquiring lock relay pin")?;
    hardware
        .open_spi(lock_config.spi_hz)
        .context("opening SPI bus")?;

    let bring_up = async {
        let mut readers = Vec::with_capacity(lock_config.reader_cs_pins.len());
        for (i, &cs) in lock_config.reader_cs_pins.iter().enumerate() {
            let reader = match hardware.reader(cs) {
                Ok(device) => {
                    bring_online(
                        i + 1,
                        device,
                        lock_config.connect_attempts,
                        lock_config.connect_delay(),
                    )
                    .await
                }
                Err(e) => {
                    error!("Reader {}: chip select {} unavailable: {}", i + 1, cs, e);
                    Reader::Offline
                }
            };
            readers.push(reader);
        }
        readers
    };
    let Some(readers) = unless_shutdown(shutdown.wait(), bring_up).await? else {
        // the relay never left the locked level
        drop(lock);
        drop(hardware);
        info!("system halted safely");
        return Ok(());
    };

    let board = TagBoard::new(lock_config.correct_tags.clone(), lock_config.tag_expiry());
    let controller = TagLockController::new(readers, board, lock, lock_config.read_timeout())?;
    let online = controller.online_readers();
    if online < lock_config.reader_cs_pins.len() {
        error!(
            "only {online}/{} readers online, the lock cannot open",
            lock_config.reader_cs_pins.len()
        );
    }
    info!(lock = %controller.lock_state(), "waiting for organs...");

    controller.run(lock_config.poll_period(), shutdown.wait()).await?;

    drop(hardware);
    info!("system halted safely");
    Ok(())
}
