//! Runs one invocation on the cluster from submission through cleanup.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::TranscoderConfig;
use crate::domain::invocation::Invocation;
use crate::domain::job::{JobHandle, JobOutcome};
use crate::error::{AppError, Result};
use crate::infrastructure::cluster::JobApi;
use crate::services::diagnostics::FailureDiagnostics;
use crate::services::job_builder::JobSpecBuilder;
use crate::services::rewriter::InvocationRewriter;
use crate::services::submitter::JobSubmitter;
use crate::services::watcher::{LifecycleWatcher, WatchOutcome};

pub struct Orchestrator<'a> {
    config: &'a TranscoderConfig,
    rewriter: InvocationRewriter,
    submitter: JobSubmitter,
    watcher: LifecycleWatcher,
    diagnostics: FailureDiagnostics,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a TranscoderConfig, api: Arc<dyn JobApi>) -> Self {
        Self {
            config,
            rewriter: InvocationRewriter::new(config.internal_address.clone()),
            submitter: JobSubmitter::new(api.clone()),
            watcher: LifecycleWatcher::new(api.clone()),
            diagnostics: FailureDiagnostics::new(api),
        }
    }

    /// Rewrite, build, submit and wait for the job, then delete it.
    ///
    /// Once a job has been created it is deleted exactly once, whatever
    /// happened while waiting. If both the wait and the delete fail, the
    /// delete error is the one returned.
    pub async fn run(
        &self,
        invocation: Invocation,
        shutdown: CancellationToken,
    ) -> Result<JobOutcome> {
        let invocation = self.rewriter.rewrite(invocation)?;
        let spec = JobSpecBuilder::new(self.config).build(&invocation)?;
        let handle = self.submitter.submit(&spec).await?;

        let outcome = match self.wait(&handle, &shutdown).await {
            Ok(WatchOutcome::Succeeded) => Ok(JobOutcome::Succeeded),
            Ok(WatchOutcome::Failed) => self
                .diagnostics
                .collect(&handle)
                .await
                .map(|logs| JobOutcome::Failed { logs }),
            Ok(WatchOutcome::Cancelled) => Ok(JobOutcome::Cancelled),
            Err(e) => Err(e),
        };

        match (outcome, self.submitter.cleanup(&handle).await) {
            (outcome, Ok(())) => outcome,
            (
                Ok(JobOutcome::Failed { logs }),
                Err(AppError::CleanupFailed { name, reason, .. }),
            ) => Err(AppError::CleanupFailed {
                name,
                reason,
                job_logs: Some(logs),
            }),
            (Ok(_), Err(cleanup_err)) => Err(cleanup_err),
            (Err(err), Err(cleanup_err)) => {
                error!(
                    job = %handle,
                    error = %err,
                    "Job ended with an error before cleanup failed"
                );
                Err(cleanup_err)
            }
        }
    }

    /// Race the watcher task against the stop signal.
    async fn wait(
        &self,
        handle: &JobHandle,
        shutdown: &CancellationToken,
    ) -> Result<WatchOutcome> {
        let cancel = shutdown.child_token();
        let watcher = self.watcher.clone();
        let task_handle = handle.clone();
        let task_cancel = cancel.clone();
        let mut task = tokio::spawn(async move { watcher.wait(&task_handle, task_cancel).await });

        let waited = tokio::select! {
            joined = &mut task => match joined {
                Ok(result) => result,
                Err(e) => Err(AppError::PollFailed(format!(
                    "watcher task ended abnormally: {}",
                    e
                ))),
            },
            _ = shutdown.cancelled() => {
                info!(job = %handle, "Exit requested");
                Ok(WatchOutcome::Cancelled)
            }
        };

        cancel.cancel();
        task.abort();
        waited
    }
}
