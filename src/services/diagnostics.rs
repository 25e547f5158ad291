use std::sync::Arc;
use tracing::info;

use crate::domain::job::JobHandle;
use crate::error::Result;
use crate::infrastructure::cluster::JobApi;

/// Collects the captured output of a failed job.
pub struct FailureDiagnostics {
    api: Arc<dyn JobApi>,
}

impl FailureDiagnostics {
    pub fn new(api: Arc<dyn JobApi>) -> Self {
        Self { api }
    }

    /// Fetch the full log stream. Errors are not swallowed.
    pub async fn collect(&self, handle: &JobHandle) -> Result<String> {
        let logs = self.api.logs(handle).await?;
        info!(job = %handle, bytes = logs.len(), "Collected job logs");
        Ok(logs)
    }
}
