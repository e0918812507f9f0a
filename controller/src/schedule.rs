use std::{future::Future, time::Duration};

use tokio::time::{self, MissedTickBehavior};
use tracing::info;

use crate::{error::Error, shutdown::ShutdownSignalError};

/// Runs `cycle` once per `period` until `shutdown` resolves or a cycle fails.
///
/// The first cycle runs immediately. A pending shutdown wins over a due tick,
/// so an interrupt is handled at most one cycle late.
pub async fn poll_until<S, F>(period: Duration, shutdown: S, mut cycle: F) -> Result<(), Error>
where
    S: Future<Output = Result<(), ShutdownSignalError>>,
    F: FnMut() -> Result<(), Error>,
{
    tokio::pin!(shutdown);
    let mut ticker = time::interval(period.max(Duration::from_millis(1)));
    // A slow cycle pushes the schedule back instead of bursting to catch up.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            signal = &mut shutdown => {
                signal?;
                info!("interrupt received, stopping");
                return Ok(());
            }
            _ = ticker.tick() => cycle()?,
        }
    }
}

/// Runs startup `work` unless `shutdown` resolves first. `Ok(None)` means the
/// interrupt won and `work` was dropped at its current await point.
pub async fn unless_shutdown<S, W>(shutdown: S, work: W) -> Result<Option<W::Output>, Error>
where
    S: Future<Output = Result<(), ShutdownSignalError>>,
    W: Future,
{
    tokio::select! {
        biased;
        signal = shutdown => {
            signal?;
            info!("interrupt received during startup");
            Ok(None)
        }
        output = work => Ok(Some(output)),
    }
}
