//! elastic-transcoder - run a transcode command as an ephemeral Kubernetes pod
//!
//! Installed in place of the media server's transcoder binary. Each
//! invocation is relayed to a freshly created pod that shares the server's
//! volumes, is watched until it finishes, and is always deleted afterwards.

pub mod config;
pub mod core;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod services;

pub use error::{AppError, Result};
