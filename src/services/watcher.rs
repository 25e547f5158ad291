//! Polls a submitted job until it reaches a terminal phase.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::job::{JobHandle, Phase};
use crate::error::Result;
use crate::infrastructure::cluster::JobApi;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    Succeeded,
    Failed,
    Cancelled,
}

#[derive(Clone)]
pub struct LifecycleWatcher {
    api: Arc<dyn JobApi>,
    interval: Duration,
}

impl LifecycleWatcher {
    pub fn new(api: Arc<dyn JobApi>) -> Self {
        Self::with_interval(api, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_interval(api: Arc<dyn JobApi>, interval: Duration) -> Self {
        Self { api, interval }
    }

    /// Poll once per interval until the job terminates or `cancel` fires.
    ///
    /// Fetch errors are returned immediately; they are not retried.
    pub async fn wait(
        &self,
        handle: &JobHandle,
        cancel: CancellationToken,
    ) -> Result<WatchOutcome> {
        debug!(job = %handle, interval = ?self.interval, "Waiting for job completion");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(job = %handle, "Stopped waiting for job: cancelled");
                    return Ok(WatchOutcome::Cancelled);
                }
                _ = tokio::time::sleep(self.interval) => {
                    let phase = self.api.phase(handle).await?;
                    debug!(job = %handle, phase = ?phase, "Polled job");

                    match phase {
                        Phase::Pending | Phase::Running => {}
                        Phase::Unknown => {
                            warn!(job = %handle, "Job is in an unknown state");
                        }
                        Phase::Failed => {
                            warn!(job = %handle, "Job failed");
                            return Ok(WatchOutcome::Failed);
                        }
                        Phase::Succeeded => {
                            info!(job = %handle, "Job succeeded");
                            return Ok(WatchOutcome::Succeeded);
                        }
                    }
                }
            }
        }
    }
}
