//! Cluster access for transcode jobs.
//!
//! Every cluster call the orchestrator makes goes through [`JobApi`], so the
//! lifecycle logic can run against an in-memory fake in tests.

use async_trait::async_trait;
use futures::AsyncReadExt;
use k8s_openapi::api::core::v1::Pod;
use kube::{
    api::{DeleteParams, LogParams, PostParams},
    Api, Client,
};
use tracing::{debug, info};

use crate::domain::job::{JobHandle, JobSpec, Phase};
use crate::error::{AppError, Result};
use crate::services::job_builder::CONTAINER_NAME;

#[async_trait]
pub trait JobApi: Send + Sync {
    /// Create the job and return the name the cluster assigned to it.
    async fn create(&self, spec: &JobSpec) -> Result<JobHandle>;

    /// Fetch the current phase of the job.
    async fn phase(&self, handle: &JobHandle) -> Result<Phase>;

    /// Read the job's complete output stream.
    async fn logs(&self, handle: &JobHandle) -> Result<String>;

    /// Delete the job.
    async fn delete(&self, handle: &JobHandle) -> Result<()>;
}

/// Pod-backed [`JobApi`] scoped to a single namespace.
pub struct KubeJobApi {
    pods_api: Api<Pod>,
    namespace: String,
}

impl KubeJobApi {
    /// Connect using the ambient cluster credentials (in-cluster service
    /// account, or kubeconfig when run outside a cluster).
    pub async fn connect(namespace: &str) -> Result<Self> {
        let client = Client::try_default().await.map_err(|e| {
            AppError::KubernetesClientError(format!("Failed to create Kubernetes client: {}", e))
        })?;
        Ok(Self::new(client, namespace))
    }

    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            pods_api: Api::namespaced(client, namespace),
            namespace: namespace.to_string(),
        }
    }
}

#[async_trait]
impl JobApi for KubeJobApi {
    async fn create(&self, spec: &JobSpec) -> Result<JobHandle> {
        let pod = spec.to_pod();
        debug!(pod = %serde_json::to_string(&pod)?, "Submitting pod");

        let created = self
            .pods_api
            .create(&PostParams::default(), &pod)
            .await
            .map_err(|e| AppError::SubmissionFailed(e.to_string()))?;

        let name = created.metadata.name.ok_or_else(|| {
            AppError::SubmissionFailed("cluster returned a pod without a name".to_string())
        })?;
        let namespace = created
            .metadata
            .namespace
            .unwrap_or_else(|| self.namespace.clone());

        info!(pod = %name, namespace = %namespace, "Created pod");
        Ok(JobHandle { name, namespace })
    }

    async fn phase(&self, handle: &JobHandle) -> Result<Phase> {
        let pod = self
            .pods_api
            .get(&handle.name)
            .await
            .map_err(|e| AppError::PollFailed(format!("failed to get pod {}: {}", handle, e)))?;

        let phase = pod.status.as_ref().and_then(|s| s.phase.as_deref());
        Ok(Phase::from_pod_phase(phase))
    }

    async fn logs(&self, handle: &JobHandle) -> Result<String> {
        let params = LogParams {
            container: Some(CONTAINER_NAME.to_string()),
            ..Default::default()
        };

        let stream = self
            .pods_api
            .log_stream(&handle.name, &params)
            .await
            .map_err(|e| AppError::LogFetchFailed(format!("{}: {}", handle, e)))?;
        let mut stream = Box::pin(stream);

        let mut buf = Vec::new();
        stream
            .read_to_end(&mut buf)
            .await
            .map_err(|e| AppError::LogFetchFailed(format!("reading logs of {}: {}", handle, e)))?;

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    async fn delete(&self, handle: &JobHandle) -> Result<()> {
        self.pods_api
            .delete(&handle.name, &DeleteParams::default())
            .await
            .map_err(|e| AppError::CleanupFailed {
                name: handle.to_string(),
                reason: e.to_string(),
                job_logs: None,
            })?;
        Ok(())
    }
}
