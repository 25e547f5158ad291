use std::sync::Arc;
use tracing::{error, info};

use crate::domain::job::{JobHandle, JobSpec};
use crate::error::Result;
use crate::infrastructure::cluster::JobApi;

/// Creates jobs and removes them again.
pub struct JobSubmitter {
    api: Arc<dyn JobApi>,
}

impl JobSubmitter {
    pub fn new(api: Arc<dyn JobApi>) -> Self {
        Self { api }
    }

    /// Submit the spec. A rejected submission is not retried.
    pub async fn submit(&self, spec: &JobSpec) -> Result<JobHandle> {
        let handle = self.api.create(spec).await?;
        info!(job = %handle, "Started job");
        Ok(handle)
    }

    /// Delete the job. Called exactly once per handle; a failure is returned
    /// as-is so an orphaned pod is never hidden.
    pub async fn cleanup(&self, handle: &JobHandle) -> Result<()> {
        info!(job = %handle, "Cleaning up job");
        self.api.delete(handle).await.inspect_err(|e| {
            error!(job = %handle, error = %e, "Job may still be running on the cluster");
        })
    }
}
