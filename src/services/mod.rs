//! Remote job lifecycle: rewrite, build, submit, watch, diagnose, clean up.

pub mod diagnostics;
pub mod job_builder;
pub mod orchestrator;
pub mod rewriter;
pub mod submitter;
pub mod watcher;

#[cfg(test)]
pub(crate) mod test_support;

pub use diagnostics::FailureDiagnostics;
pub use job_builder::JobSpecBuilder;
pub use orchestrator::Orchestrator;
pub use rewriter::{InvocationRewriter, RewriteRule};
pub use submitter::JobSubmitter;
pub use watcher::{LifecycleWatcher, WatchOutcome};
