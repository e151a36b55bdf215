//! Job orchestration: lifecycle records, the worker queue, and source pacing

pub mod orchestrator;
pub mod queue;
pub mod rate_limit;

pub use orchestrator::{Orchestrator, OrchestratorSettings};
pub use queue::{JobQueue, JobRequest};
pub use rate_limit::SourceRateLimiter;
