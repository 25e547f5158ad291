pub mod invocation;
pub mod job;

pub use invocation::{Invocation, ProcessSnapshot};
pub use job::{EnvPair, JobHandle, JobOutcome, JobSpec, JobVolumes, Phase};
