//! In-memory [`JobApi`] used by the service tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;

use crate::domain::job::{JobHandle, JobSpec, Phase};
use crate::error::{AppError, Result};
use crate::infrastructure::cluster::JobApi;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub create: usize,
    pub phase: usize,
    pub logs: usize,
    pub delete: usize,
}

/// Scripted fake: phases are served in order and the job reports `Running`
/// once the script runs out.
pub struct FakeJobApi {
    phases: Mutex<VecDeque<Result<Phase>>>,
    calls: Mutex<CallCounts>,
    pub submitted: Mutex<Vec<JobSpec>>,
    pub logs: String,
    pub fail_create: bool,
    pub fail_logs: bool,
    pub fail_delete: bool,
}

impl FakeJobApi {
    pub fn with_phases(phases: Vec<Result<Phase>>) -> Self {
        Self {
            phases: Mutex::new(phases.into()),
            calls: Mutex::new(CallCounts::default()),
            submitted: Mutex::new(Vec::new()),
            logs: String::new(),
            fail_create: false,
            fail_logs: false,
            fail_delete: false,
        }
    }

    pub async fn calls(&self) -> CallCounts {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl JobApi for FakeJobApi {
    async fn create(&self, spec: &JobSpec) -> Result<JobHandle> {
        self.calls.lock().await.create += 1;
        if self.fail_create {
            return Err(AppError::SubmissionFailed("pods is forbidden".to_string()));
        }
        self.submitted.lock().await.push(spec.clone());
        Ok(JobHandle {
            name: format!("{}abcde", spec.generate_name),
            namespace: spec.namespace.clone(),
        })
    }

    async fn phase(&self, _handle: &JobHandle) -> Result<Phase> {
        self.calls.lock().await.phase += 1;
        self.phases
            .lock()
            .await
            .pop_front()
            .unwrap_or(Ok(Phase::Running))
    }

    async fn logs(&self, handle: &JobHandle) -> Result<String> {
        self.calls.lock().await.logs += 1;
        if self.fail_logs {
            return Err(AppError::LogFetchFailed(format!("{}: stream reset", handle)));
        }
        Ok(self.logs.clone())
    }

    async fn delete(&self, handle: &JobHandle) -> Result<()> {
        self.calls.lock().await.delete += 1;
        if self.fail_delete {
            return Err(AppError::CleanupFailed {
                name: handle.to_string(),
                reason: "etcdserver: request timed out".to_string(),
                job_logs: None,
            });
        }
        Ok(())
    }
}
