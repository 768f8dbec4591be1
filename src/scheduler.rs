//! Periodic execution: run immediately, then again at a fixed interval
//! until cancelled. A failed run logs and waits for the next tick instead
//! of killing the schedule.

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::models::MonitoredUrl;
use crate::pipeline::Pipeline;
use crate::utils::error::Result;

pub async fn run_periodic(
    pipeline: &mut Pipeline,
    urls: &[MonitoredUrl],
    interval: Duration,
    cancel: &CancellationToken,
) -> Result<()> {
    info!(?interval, "periodic monitoring started");

    loop {
        match pipeline.run(urls, cancel).await {
            Ok(outcome) => {
                if let Err(e) = pipeline.send_summary(&outcome.summary).await {
                    warn!(error = %e, "failed to send run digest");
                }
            }
            Err(e) => error!(error = %e, "scheduled run failed"),
        }

        if cancel.is_cancelled() {
            info!("periodic monitoring stopped");
            return Ok(());
        }

        info!(?interval, "waiting for next scheduled run");
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("periodic monitoring stopped");
                return Ok(());
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
