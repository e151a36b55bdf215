use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kinds of ETL work the orchestrator knows how to run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    FilmFetch,
    PlaceFetch,
    Correlation,
    Enrichment,
    Cleanup,
    Report,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::FilmFetch => "film_fetch",
            JobType::PlaceFetch => "place_fetch",
            JobType::Correlation => "correlation",
            JobType::Enrichment => "enrichment",
            JobType::Cleanup => "cleanup",
            JobType::Report => "report",
        }
    }
}

impl Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Job lifecycle states; transitions only move forward
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bound on per-record error strings kept in a job document
const MAX_RECORDED_ERRORS: usize = 20;

/// Counters and messages summarizing one job run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JobResults {
    /// Records the upstream returned, including ones later skipped
    pub total_fetched: usize,
    /// Records successfully persisted
    pub processed: usize,
    /// Skipped or failed records
    pub error_count: usize,
    pub message: String,
    /// Sample of per-record errors; counting continues past the cap
    #[serde(default)]
    pub errors: Vec<String>,
}

impl JobResults {
    pub fn with_message(message: impl Into<String>) -> Self {
        JobResults {
            message: message.into(),
            ..Default::default()
        }
    }

    /// Counts an error; keeps at most the first few strings so job
    /// documents stay bounded
    pub fn record_error(&mut self, error: impl Into<String>) {
        self.error_count += 1;
        if self.errors.len() < MAX_RECORDED_ERRORS {
            self.errors.push(error.into());
        }
    }

    /// Counts records an adapter skipped, with one summary line
    pub fn note_skipped(&mut self, count: usize, stage: &str) {
        if count == 0 {
            return;
        }
        self.error_count += count;
        if self.errors.len() < MAX_RECORDED_ERRORS {
            self.errors.push(format!("{} records skipped during {}", count, stage));
        }
    }

    /// Folds another batch outcome into this one
    pub fn absorb(&mut self, other: JobResults) {
        self.total_fetched += other.total_fetched;
        self.processed += other.processed;
        self.error_count += other.error_count;
        for error in other.errors {
            if self.errors.len() < MAX_RECORDED_ERRORS {
                self.errors.push(error);
            }
        }
    }
}

/// One traceable unit of ETL work
///
/// Created at dispatch, mutated only by the orchestrator, aged out by the
/// cleanup job. `source_job_id` links a job to the one that spawned it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EtlJob {
    pub job_id: String,
    pub job_type: JobType,
    pub status: JobStatus,
    pub parameters: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_job_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<JobResults>,
}

impl EtlJob {
    /// Creates a queued job record
    pub fn new(
        job_type: JobType,
        parameters: serde_json::Value,
        source_job_id: Option<String>,
    ) -> Self {
        EtlJob {
            job_id: Uuid::new_v4().to_string(),
            job_type,
            status: JobStatus::Queued,
            parameters,
            source_job_id,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            results: None,
        }
    }

    /// Moves a queued job to running; returns false for any other state
    pub fn mark_running(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != JobStatus::Queued {
            return false;
        }
        self.status = JobStatus::Running;
        self.started_at = Some(now);
        true
    }

    /// Finalizes a running job; returns false if the job is already
    /// terminal (finalizing twice is a no-op, not an error)
    pub fn finalize(&mut self, status: JobStatus, results: JobResults, now: DateTime<Utc>) -> bool {
        if self.status.is_terminal() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        self.completed_at = Some(now);
        self.results = Some(results);
        true
    }

    /// Upsert key in the jobs collection
    pub fn key(&self) -> String {
        self.job_id.clone()
    }
}
