use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::error::{EtlError, EtlResult};
use crate::jobs::orchestrator::Orchestrator;
use crate::models::JobType;

/// A job waiting to be dispatched by a queue worker
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub job_type: JobType,
    pub parameters: Value,
    pub source_job_id: Option<String>,
}

impl JobRequest {
    pub fn new(job_type: JobType, parameters: Value) -> Self {
        JobRequest {
            job_type,
            parameters,
            source_job_id: None,
        }
    }

    /// A request that records which job triggered it
    pub fn chained(job_type: JobType, parameters: Value, source_job_id: String) -> Self {
        JobRequest {
            job_type,
            parameters,
            source_job_id: Some(source_job_id),
        }
    }
}

/// In-process worker pool feeding jobs to the orchestrator
///
/// Workers share one receiver, so each request runs exactly once no matter
/// how many workers are started. Dropping the sender on shutdown lets the
/// workers drain the backlog before they stop.
pub struct JobQueue {
    submit_tx: mpsc::UnboundedSender<JobRequest>,
    workers: Vec<JoinHandle<()>>,
}

impl JobQueue {
    pub fn start(orchestrator: Arc<Orchestrator>, worker_count: usize) -> Self {
        let (submit_tx, submit_rx) = mpsc::unbounded_channel();
        let submit_rx = Arc::new(Mutex::new(submit_rx));

        let workers = (0..worker_count.max(1))
            .map(|worker| {
                let orchestrator = Arc::clone(&orchestrator);
                let submit_rx = Arc::clone(&submit_rx);
                tokio::spawn(worker_loop(worker, orchestrator, submit_rx))
            })
            .collect();

        JobQueue { submit_tx, workers }
    }

    /// Enqueues a request without waiting for it to run
    pub fn submit(&self, request: JobRequest) -> EtlResult<()> {
        tracing::debug!(job_type = %request.job_type, "Job submitted");
        self.submit_tx
            .send(request)
            .map_err(|_| EtlError::Internal("job queue is stopped".to_string()))
    }

    /// Stops accepting work, drains the backlog, and waits for the workers
    pub async fn shutdown(self) {
        drop(self.submit_tx);
        for worker in self.workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "Queue worker panicked");
            }
        }
        tracing::info!("Job queue stopped");
    }
}

async fn worker_loop(
    worker: usize,
    orchestrator: Arc<Orchestrator>,
    submit_rx: Arc<Mutex<mpsc::UnboundedReceiver<JobRequest>>>,
) {
    loop {
        // Hold the lock only for the receive so other workers keep pulling
        // while this one dispatches.
        let request = {
            let mut rx = submit_rx.lock().await;
            rx.recv().await
        };
        let Some(request) = request else {
            break;
        };

        match orchestrator
            .dispatch(request.job_type, request.parameters, request.source_job_id)
            .await
        {
            Ok(job_id) => tracing::debug!(worker, job_id = %job_id, "Queued job finished"),
            Err(e) => tracing::error!(worker, error = %e, "Queued job could not be recorded"),
        }
    }
    tracing::debug!(worker, "Queue worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{collections, MemoryStore, Store};
    use crate::jobs::orchestrator::OrchestratorSettings;
    use crate::models::{City, Film, Place};
    use crate::services::sources::{FetchBatch, FilmSource, PlaceSource};
    use async_trait::async_trait;
    use serde_json::json;

    struct EmptyFilmSource;

    #[async_trait]
    impl FilmSource for EmptyFilmSource {
        async fn fetch_trending(
            &self,
            _time_window: &str,
            _limit: usize,
        ) -> EtlResult<FetchBatch<Film>> {
            Ok(FetchBatch::default())
        }

        async fn fetch_details(&self, _film_id: i64) -> EtlResult<Film> {
            Err(EtlError::upstream("no films".to_string(), false))
        }

        fn name(&self) -> &'static str {
            "empty-films"
        }
    }

    struct EmptyPlaceSource;

    #[async_trait]
    impl PlaceSource for EmptyPlaceSource {
        async fn list_major_cities(
            &self,
            _country_code: &str,
            _limit: usize,
        ) -> EtlResult<Vec<City>> {
            Ok(vec![])
        }

        async fn search_places(
            &self,
            _city: &City,
            _categories: &[String],
            _radius_m: u32,
            _limit: usize,
        ) -> EtlResult<FetchBatch<Place>> {
            Ok(FetchBatch::default())
        }

        fn name(&self) -> &'static str {
            "empty-places"
        }
    }

    fn create_test_orchestrator(store: Arc<MemoryStore>) -> Arc<Orchestrator> {
        Arc::new(Orchestrator::new(
            store,
            Arc::new(EmptyFilmSource),
            Arc::new(EmptyPlaceSource),
            None,
            OrchestratorSettings {
                fetch_min_interval: std::time::Duration::ZERO,
                ..OrchestratorSettings::default()
            },
        ))
    }

    #[tokio::test]
    async fn test_queue_drains_backlog_before_stopping() {
        let store = Arc::new(MemoryStore::new());
        let queue = JobQueue::start(create_test_orchestrator(store.clone()), 2);

        for _ in 0..3 {
            queue
                .submit(JobRequest::new(JobType::Cleanup, json!({})))
                .unwrap();
        }
        queue.shutdown().await;

        assert_eq!(store.count(collections::JOBS).await.unwrap(), 3);
        assert_eq!(
            store
                .count_where(collections::JOBS, "status", "completed")
                .await
                .unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn test_chained_request_records_source_job() {
        let store = Arc::new(MemoryStore::new());
        let queue = JobQueue::start(create_test_orchestrator(store.clone()), 1);

        queue
            .submit(JobRequest::chained(
                JobType::Cleanup,
                json!({}),
                "root-job".to_string(),
            ))
            .unwrap();
        queue.shutdown().await;

        let documents = store.find(collections::JOBS, None).await.unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0]["source_job_id"], "root-job");
    }

    #[tokio::test]
    async fn test_worker_count_has_a_floor_of_one() {
        let store = Arc::new(MemoryStore::new());
        let queue = JobQueue::start(create_test_orchestrator(store.clone()), 0);
        assert_eq!(queue.workers.len(), 1);

        queue
            .submit(JobRequest::new(JobType::Cleanup, json!({})))
            .unwrap();
        queue.shutdown().await;
        assert_eq!(store.count(collections::JOBS).await.unwrap(), 1);
    }
}
