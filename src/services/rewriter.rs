//! Rewrites the local invocation so it works from inside the cluster.

use tracing::debug;

use crate::domain::invocation::Invocation;
use crate::error::{AppError, Result};

/// Authority the media server hands its local transcoder for callbacks.
pub const LOOPBACK_AUTHORITY: &str = "http://127.0.0.1:32400";

/// Verbosity forced onto the remote transcoder so failed jobs leave
/// useful logs behind.
pub const DEBUG_LOG_LEVEL: &str = "debug";

/// Transformation applied to the value following a recognized flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteRule {
    /// Point a loopback callback URL at the server's internal address.
    CallbackUrl,
    /// Force the most verbose log level.
    Verbosity,
}

impl RewriteRule {
    pub fn for_flag(flag: &str) -> Option<Self> {
        match flag {
            "-progressurl" | "-manifest_name" | "-segment_list" => Some(RewriteRule::CallbackUrl),
            "-loglevel" | "-loglevel_plex" => Some(RewriteRule::Verbosity),
            _ => None,
        }
    }

    fn apply(&self, value: &str, internal_address: &str) -> String {
        match self {
            RewriteRule::CallbackUrl => value.replacen(LOOPBACK_AUTHORITY, internal_address, 1),
            RewriteRule::Verbosity => DEBUG_LOG_LEVEL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InvocationRewriter {
    internal_address: String,
}

impl InvocationRewriter {
    pub fn new(internal_address: impl Into<String>) -> Self {
        Self {
            internal_address: internal_address.into(),
        }
    }

    pub fn rewrite(&self, mut invocation: Invocation) -> Result<Invocation> {
        self.rewrite_env(&mut invocation.env);
        self.rewrite_args(&mut invocation.args)?;
        Ok(invocation)
    }

    /// The remote transcoder needs the environment exactly as the media
    /// server set it up.
    pub fn rewrite_env(&self, _env: &mut [String]) {}

    /// Single left-to-right pass substituting values in place. The vector
    /// length never changes.
    pub fn rewrite_args(&self, args: &mut [String]) -> Result<()> {
        for i in 0..args.len() {
            let Some(rule) = RewriteRule::for_flag(&args[i]) else {
                continue;
            };
            if i + 1 >= args.len() {
                return Err(AppError::ContractViolation(format!(
                    "flag {} is the last argument and has no value to rewrite",
                    args[i]
                )));
            }

            let rewritten = rule.apply(&args[i + 1], &self.internal_address);
            debug!(flag = %args[i], from = %args[i + 1], to = %rewritten, "Rewrote argument");
            args[i + 1] = rewritten;
        }
        Ok(())
    }
}
