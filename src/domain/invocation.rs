//! The captured local execution context relayed to the remote job.

use crate::config::RunAsIdentity;
use crate::error::Result;

/// Immutable snapshot of how this process was invoked.
///
/// `env` holds raw `KEY=VALUE` entries in process order. Duplicates are
/// kept as-is; nothing here decides which one wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub cwd: String,
    pub uid: i64,
    pub gid: i64,
    pub env: Vec<String>,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(cwd: String, identity: RunAsIdentity, env: Vec<String>, args: Vec<String>) -> Self {
        Self {
            cwd,
            uid: identity.uid,
            gid: identity.gid,
            env,
            args,
        }
    }

    /// Capture the working directory and pair it with a previously taken
    /// environment/argument snapshot.
    pub fn capture(identity: RunAsIdentity, snapshot: ProcessSnapshot) -> Result<Self> {
        let cwd = std::env::current_dir()?.to_string_lossy().into_owned();
        Ok(Self::new(cwd, identity, snapshot.env, snapshot.args))
    }
}

/// Environment and argv of the current process, taken before anything
/// (such as `.env` loading) can modify the environment.
#[derive(Debug, Clone, Default)]
pub struct ProcessSnapshot {
    pub env: Vec<String>,
    pub args: Vec<String>,
}

impl ProcessSnapshot {
    pub fn take() -> Self {
        let env = std::env::vars_os()
            .map(|(k, v)| format!("{}={}", k.to_string_lossy(), v.to_string_lossy()))
            .collect();
        let args = std::env::args_os()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        Self { env, args }
    }
}
