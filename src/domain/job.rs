//! Remote job description, identity and lifecycle state.

use std::fmt;

/// Declarative description of the transcode pod.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    pub generate_name: String,
    pub namespace: String,
    pub image: String,
    pub command: Vec<String>,
    pub working_dir: String,
    pub env: Vec<EnvPair>,
    pub run_as_user: i64,
    pub run_as_group: i64,
    pub limit_cpu: String,
    pub node_arch: String,
    pub volumes: JobVolumes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvPair {
    pub name: String,
    pub value: String,
}

/// Names of the externally provisioned persistent volume claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobVolumes {
    pub data_claim: String,
    pub config_claim: String,
    pub transcode_claim: String,
}

/// Identity of a submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle {
    pub name: String,
    pub namespace: String,
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Lifecycle phase of the remote job as reported by the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Running,
    Unknown,
    Failed,
    Succeeded,
}

impl Phase {
    /// Map a pod status phase. A pod with no status yet has not been
    /// scheduled; anything unrecognized is reported as unknown.
    pub fn from_pod_phase(phase: Option<&str>) -> Self {
        match phase {
            None | Some("") | Some("Pending") => Phase::Pending,
            Some("Running") => Phase::Running,
            Some("Succeeded") => Phase::Succeeded,
            Some("Failed") => Phase::Failed,
            Some(_) => Phase::Unknown,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Failed | Phase::Succeeded)
    }
}

/// Final result of one orchestrated invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed { logs: String },
    Cancelled,
}
