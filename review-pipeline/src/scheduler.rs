//! Poll-loop front end.
//!
//! Cycles run strictly one at a time; a tick that would overlap a cycle
//! still in progress is skipped rather than queued.

use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info};

use crate::pipeline::{self, ReviewContext};

/// Runs the poll loop forever: one immediate cycle, then one per interval.
pub async fn run(ctx: &ReviewContext, interval_seconds: u64) {
    info!("scheduler started ({interval_seconds}s interval)");

    let mut ticker = time::interval(Duration::from_secs(interval_seconds.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        // first tick completes immediately
        ticker.tick().await;
        if let Err(e) = pipeline::process_merge_requests(ctx).await {
            error!("review cycle failed: {e}");
        }
    }
}
