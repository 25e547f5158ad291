#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Contract violation: {0}")]
    ContractViolation(String),

    #[error("Kubernetes client error: {0}")]
    KubernetesClientError(String),

    #[error("Failed to submit job: {0}")]
    SubmissionFailed(String),

    #[error("Error waiting for job to complete: {0}")]
    PollFailed(String),

    #[error("Error getting job logs: {0}")]
    LogFetchFailed(String),

    /// `job_logs` carries the diagnostics of a failed job whose pod could
    /// not be deleted afterwards.
    #[error("Error cleaning up job {name}: {reason}{}", logs_suffix(.job_logs))]
    CleanupFailed {
        name: String,
        reason: String,
        job_logs: Option<String>,
    },

    #[error("Signal handler error: {0}")]
    SignalError(String),
}

fn logs_suffix(job_logs: &Option<String>) -> String {
    job_logs
        .as_ref()
        .map(|logs| format!("\njob failed, pod logs:\n{}", logs))
        .unwrap_or_default()
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::ConfigError(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::ContractViolation(format!("JSON error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
