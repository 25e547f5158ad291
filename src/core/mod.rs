//! Process-level plumbing: logging and signal handling.

pub mod logging;
pub mod shutdown;
