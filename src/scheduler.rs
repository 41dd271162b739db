//! Autonomous refresh scheduling.
//!
//! One refresh immediately at startup, then one per period. Ticks only
//! enqueue a command; failures happen (and are absorbed) inside the
//! engine, so the timer itself can never be stopped by a bad tick.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

use crate::engine::FrameCommand;

pub fn spawn(tx: mpsc::Sender<FrameCommand>, period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            // The first tick completes immediately.
            ticker.tick().await;
            debug!("Scheduled refresh tick");
            if tx.send(FrameCommand::Refresh).await.is_err() {
                warn!("Engine gone, stopping scheduler");
                break;
            }
        }
    })
}
