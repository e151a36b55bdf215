use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use cinemap::config::Config;
use cinemap::db::{create_pool, create_redis_client, Cache, PgStore, Store};
use cinemap::jobs::{JobQueue, JobRequest, Orchestrator, OrchestratorSettings};
use cinemap::models::JobType;
use cinemap::services::{GeoapifyClient, TmdbClient};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cinemap=info")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(workers = config.worker_count, "Cinemap ETL worker starting");

    let pool = create_pool(&config.database_url).await?;
    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
    store.ensure_schema().await?;

    let redis_client = create_redis_client(&config.redis_url)?;
    let (cache, cache_writer) = Cache::new(redis_client);

    let film_source = TmdbClient::new(config.tmdb_api_key.clone(), config.tmdb_api_url.clone())?;
    let place_source =
        GeoapifyClient::new(config.geoapify_api_key.clone(), config.geoapify_api_url.clone())?;

    let orchestrator = Arc::new(Orchestrator::new(
        store,
        Arc::new(film_source),
        Arc::new(place_source),
        Some(cache),
        OrchestratorSettings::from(&config),
    ));
    let queue = JobQueue::start(Arc::clone(&orchestrator), config.worker_count);

    run_cycle(&orchestrator, &queue).await;

    if config.pipeline_interval_secs > 0 {
        let mut interval =
            tokio::time::interval(Duration::from_secs(config.pipeline_interval_secs));
        // The first tick fires immediately and that run already happened.
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => run_cycle(&orchestrator, &queue).await,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                    break;
                }
            }
        }
    }

    queue.shutdown().await;
    cache_writer.shutdown().await;
    tracing::info!("Cinemap ETL worker stopped");
    Ok(())
}

/// One scheduled cycle: the fetch-correlate-report chain inline, then
/// maintenance jobs handed to the queue workers.
async fn run_cycle(orchestrator: &Orchestrator, queue: &JobQueue) {
    if let Err(e) = orchestrator.run_daily_pipeline().await {
        tracing::error!(error = %e, "Pipeline run failed");
    }

    for job_type in [JobType::Enrichment, JobType::Cleanup] {
        let request = JobRequest::new(job_type, serde_json::json!({}));
        if let Err(e) = queue.submit(request) {
            tracing::error!(error = %e, job_type = %job_type, "Maintenance job submit failed");
        }
    }
}
