//! ETL engine correlating trending films with real-world places.
//!
//! The crate pulls trending films from a movie catalog and notable places
//! from a geocoding service, scores how well each film's genres fit each
//! place, and persists correlations, location success statistics, and
//! daily reports as JSON documents. All work runs as tracked ETL jobs
//! with a forward-only lifecycle.

pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod models;
pub mod services;

pub use error::{EtlError, EtlResult};
pub use jobs::{JobQueue, JobRequest, Orchestrator, OrchestratorSettings};
