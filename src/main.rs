use anyhow::Context;
use dotenv::dotenv;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info};

use elastic_transcoder::config::{LogFormat, TranscoderConfig};
use elastic_transcoder::core::{logging, shutdown};
use elastic_transcoder::domain::{Invocation, JobOutcome, ProcessSnapshot};
use elastic_transcoder::infrastructure::KubeJobApi;
use elastic_transcoder::services::Orchestrator;

#[tokio::main]
async fn main() -> ExitCode {
    // Taken before .env is loaded so only the caller's environment is relayed.
    let snapshot = ProcessSnapshot::take();
    dotenv().ok();

    // Nothing to log through if the subscriber itself cannot be installed.
    if let Err(e) = logging::init_structured_logging(LogFormat::from_env()) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    let config = match TranscoderConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&config, snapshot).await {
        Ok(JobOutcome::Succeeded) => ExitCode::SUCCESS,
        Ok(JobOutcome::Cancelled) => {
            info!("Job cancelled and cleaned up");
            ExitCode::SUCCESS
        }
        Ok(JobOutcome::Failed { logs }) => {
            error!("Job failed, pod logs:\n{}", logs);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &TranscoderConfig, snapshot: ProcessSnapshot) -> anyhow::Result<JobOutcome> {
    let invocation =
        Invocation::capture(config.identity, snapshot).context("Error getting working directory")?;

    info!(
        namespace = %config.namespace,
        image = %config.image,
        limit_cpu = %config.limit_cpu,
        "Relaying transcode to cluster"
    );
    debug!(config = %serde_json::to_string(config)?, "Loaded configuration");

    let api = KubeJobApi::connect(&config.namespace)
        .await
        .context("Error building Kubernetes client")?;
    let stop = shutdown::install_shutdown_handler()?;

    let outcome = Orchestrator::new(config, Arc::new(api))
        .run(invocation, stop)
        .await?;
    Ok(outcome)
}
