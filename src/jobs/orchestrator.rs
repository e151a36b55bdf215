use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::cached;
use crate::config::Config;
use crate::db::redis::cache::{Cache, CacheKey};
use crate::db::{collections, Store};
use crate::error::{EtlError, EtlResult};
use crate::jobs::rate_limit::SourceRateLimiter;
use crate::models::{
    City, Correlation, DailyReport, EtlJob, Film, JobResults, JobStatus, JobType,
    LocationPreferences, LocationSuccessStats, Place, ProductionLocation, Recommendation,
    SuccessReport,
};
use crate::services::sources::{
    FilmSource, PlaceSource, DEFAULT_PLACE_CATEGORIES, DEFAULT_SEARCH_RADIUS_M,
};
use crate::services::{AggregationEngine, CorrelationEngine};

const DEFAULT_TIME_WINDOW: &str = "day";
const DEFAULT_FILM_LIMIT: usize = 30;
const DEFAULT_CITY_LIMIT: usize = 5;
const DEFAULT_PLACES_PER_CITY: usize = 5;
const DEFAULT_ENRICHMENT_LIMIT: usize = 100;
const ENRICHMENT_COUNTRY_LIMIT: usize = 3;
const ENRICHMENT_CITIES_PER_COUNTRY: usize = 10;
const ENRICHMENT_CONFIDENCE: f64 = 0.7;

/// The film limit the daily pipeline requests, wider than the job default
const PIPELINE_FILM_LIMIT: usize = 50;

/// Source stamp for documents produced by the engines rather than fetched
const CORRELATION_SOURCE: &str = "correlation_engine";
const AGGREGATION_SOURCE: &str = "aggregation_engine";

/// Production country names the enrichment job can resolve to ISO codes
static COUNTRY_CODES: &[(&str, &str)] = &[
    ("United States", "US"),
    ("United States of America", "US"),
    ("United Kingdom", "GB"),
    ("France", "FR"),
    ("Germany", "DE"),
    ("Italy", "IT"),
    ("Spain", "ES"),
    ("Canada", "CA"),
    ("Australia", "AU"),
];

/// Cities substituted when listing a country's cities fails terminally
static FALLBACK_CITIES: &[(&str, &[(&str, f64, f64, i64)])] = &[
    (
        "US",
        &[
            ("New York", 40.7128, -74.0060, 8_336_817),
            ("Los Angeles", 34.0522, -118.2437, 3_979_576),
            ("Chicago", 41.8781, -87.6298, 2_693_976),
            ("Houston", 29.7604, -95.3698, 2_320_268),
            ("Phoenix", 33.4484, -112.0740, 1_680_992),
        ],
    ),
    (
        "GB",
        &[
            ("London", 51.5074, -0.1278, 8_982_000),
            ("Manchester", 53.4808, -2.2426, 547_627),
            ("Birmingham", 52.4862, -1.8904, 1_141_816),
            ("Liverpool", 53.4084, -2.9916, 498_042),
            ("Glasgow", 55.8642, -4.2518, 633_120),
        ],
    ),
    (
        "FR",
        &[
            ("Paris", 48.8566, 2.3522, 2_161_000),
            ("Marseille", 43.2965, 5.3698, 861_635),
            ("Lyon", 45.7640, 4.8357, 513_275),
            ("Toulouse", 43.6047, 1.4442, 479_553),
            ("Nice", 43.7102, 7.2620, 340_017),
        ],
    ),
    (
        "DE",
        &[
            ("Berlin", 52.5200, 13.4050, 3_644_826),
            ("Hamburg", 53.5511, 9.9937, 1_841_179),
            ("Munich", 48.1351, 11.5820, 1_471_508),
            ("Cologne", 50.9375, 6.9603, 1_085_664),
            ("Frankfurt", 50.1109, 8.6821, 753_056),
        ],
    ),
    (
        "IT",
        &[
            ("Rome", 41.9028, 12.4964, 2_872_800),
            ("Milan", 45.4642, 9.1900, 1_396_059),
            ("Naples", 40.8518, 14.2681, 959_470),
            ("Turin", 45.0703, 7.6869, 870_952),
            ("Palermo", 38.1157, 13.3615, 663_401),
        ],
    ),
];

/// Tunables the orchestrator needs from configuration
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub fetch_min_interval: Duration,
    pub retry_max_attempts: u32,
    pub retry_delay: Duration,
    pub job_ttl_days: i64,
    pub report_cache_ttl_secs: u64,
    pub fetch_countries: Vec<String>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        OrchestratorSettings {
            fetch_min_interval: Duration::from_secs(1),
            retry_max_attempts: 3,
            retry_delay: Duration::from_secs(120),
            job_ttl_days: 7,
            report_cache_ttl_secs: 1800,
            fetch_countries: ["US", "GB", "FR", "DE", "IT", "ES", "CA", "AU"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

impl From<&Config> for OrchestratorSettings {
    fn from(config: &Config) -> Self {
        OrchestratorSettings {
            fetch_min_interval: Duration::from_secs(config.fetch_min_interval_secs),
            retry_max_attempts: config.retry_max_attempts,
            retry_delay: Duration::from_secs(config.retry_delay_secs),
            job_ttl_days: config.job_ttl_days,
            report_cache_ttl_secs: config.report_cache_ttl_secs,
            fetch_countries: config.fetch_countries.clone(),
        }
    }
}

/// Owns the ETL job lifecycle
///
/// Every unit of work runs under a job record that moves
/// `queued -> running -> completed | failed` and never backwards. The
/// orchestrator wraps adapter calls with rate limiting and retry, writes
/// batches idempotently, and guarantees a terminal job record after every
/// dispatch as long as the store accepts the initial write.
pub struct Orchestrator {
    store: Arc<dyn Store>,
    film_source: Arc<dyn FilmSource>,
    place_source: Arc<dyn PlaceSource>,
    correlation_engine: CorrelationEngine,
    aggregation_engine: AggregationEngine,
    film_limiter: SourceRateLimiter,
    place_limiter: SourceRateLimiter,
    cache: Option<Cache>,
    retry_max_attempts: u32,
    retry_delay: Duration,
    job_ttl_days: i64,
    report_cache_ttl_secs: u64,
    fetch_countries: Vec<String>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn Store>,
        film_source: Arc<dyn FilmSource>,
        place_source: Arc<dyn PlaceSource>,
        cache: Option<Cache>,
        settings: OrchestratorSettings,
    ) -> Self {
        Orchestrator {
            store,
            film_source,
            place_source,
            correlation_engine: CorrelationEngine::new(),
            aggregation_engine: AggregationEngine::new(),
            film_limiter: SourceRateLimiter::new(settings.fetch_min_interval),
            place_limiter: SourceRateLimiter::new(settings.fetch_min_interval),
            cache,
            retry_max_attempts: settings.retry_max_attempts,
            retry_delay: settings.retry_delay,
            job_ttl_days: settings.job_ttl_days,
            report_cache_ttl_secs: settings.report_cache_ttl_secs,
            fetch_countries: settings.fetch_countries,
        }
    }

    /// Runs one job end to end and returns its id
    ///
    /// The outcome lives in the job document, not the return value; an
    /// `Err` here means the job record itself could not be written.
    pub async fn dispatch(
        &self,
        job_type: JobType,
        parameters: Value,
        source_job_id: Option<String>,
    ) -> EtlResult<String> {
        let mut job = EtlJob::new(job_type, parameters, source_job_id);
        self.store
            .upsert(collections::JOBS, &job.key(), serde_json::to_value(&job)?)
            .await?;
        tracing::info!(job_id = %job.job_id, job_type = %job.job_type, "Job queued");

        job.mark_running(Utc::now());
        self.store
            .upsert(collections::JOBS, &job.key(), serde_json::to_value(&job)?)
            .await?;

        let mut results = JobResults::default();
        let status = match self.execute(&job, &mut results).await {
            Ok(()) => JobStatus::Completed,
            Err(e) => {
                tracing::error!(job_id = %job.job_id, job_type = %job.job_type, error = %e, "Job failed");
                results.record_error(e.to_string());
                results.message = format!("Job failed: {}", e);
                JobStatus::Failed
            }
        };
        self.finish_job(&mut job, status, results).await?;

        Ok(job.job_id)
    }

    async fn execute(&self, job: &EtlJob, results: &mut JobResults) -> EtlResult<()> {
        match job.job_type {
            JobType::FilmFetch => self.handle_film_fetch(job, results).await,
            JobType::PlaceFetch => self.handle_place_fetch(job, results).await,
            JobType::Correlation => self.handle_correlation(job, results).await,
            JobType::Enrichment => self.handle_enrichment(job, results).await,
            JobType::Cleanup => self.handle_cleanup(job, results).await,
            JobType::Report => self.handle_report(job, results).await,
        }
    }

    /// Finalizes the job record; repeating a terminal finalize is a no-op
    async fn finish_job(
        &self,
        job: &mut EtlJob,
        status: JobStatus,
        results: JobResults,
    ) -> EtlResult<()> {
        if !job.finalize(status, results, Utc::now()) {
            tracing::warn!(job_id = %job.job_id, "Job already terminal, finalize skipped");
            return Ok(());
        }

        self.store
            .upsert(collections::JOBS, &job.key(), serde_json::to_value(&*job)?)
            .await?;

        if let Some(results) = &job.results {
            tracing::info!(
                job_id = %job.job_id,
                job_type = %job.job_type,
                status = %job.status,
                processed = results.processed,
                error_count = results.error_count,
                "Job finished"
            );
        }
        Ok(())
    }

    /// Rate-limited adapter call with a bounded retry loop
    ///
    /// A 429's requested delay overrides the configured one. Non-retryable
    /// errors and an exhausted budget surface to the caller.
    async fn run_fetch<T, F, Fut>(
        &self,
        limiter: &SourceRateLimiter,
        source: &str,
        operation: F,
    ) -> EtlResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = EtlResult<T>>,
    {
        let mut attempt: u32 = 1;
        loop {
            limiter.acquire().await;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.retry_max_attempts => {
                    let delay = e.retry_after().unwrap_or(self.retry_delay);
                    tracing::warn!(
                        source,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retryable upstream error, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Upserts records in input order, stamped with provenance
    ///
    /// `created_at` is preserved from an existing document so re-running a
    /// fetch advances only `updated_at`. A record that will not serialize
    /// is counted and skipped; a store error aborts the batch.
    async fn persist_batch<T: Serialize>(
        &self,
        collection: &str,
        records: &[T],
        key_fn: impl Fn(&T) -> String,
        job: &EtlJob,
        source: &str,
        results: &mut JobResults,
    ) -> EtlResult<()> {
        for record in records {
            let key = key_fn(record);
            match self.stamped_document(collection, &key, record, job, source).await {
                Ok(document) => {
                    self.store.upsert(collection, &key, document).await?;
                    results.processed += 1;
                }
                Err(EtlError::InvalidRecord(reason)) => {
                    tracing::warn!(collection, key = %key, reason = %reason, "Skipping unserializable record");
                    results.record_error(format!("{} {}: {}", collection, key, reason));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn stamped_document<T: Serialize>(
        &self,
        collection: &str,
        key: &str,
        record: &T,
        job: &EtlJob,
        source: &str,
    ) -> EtlResult<Value> {
        let mut document = serde_json::to_value(record)?;
        let now = Utc::now();
        let created_at = match self.store.get(collection, key).await? {
            Some(existing) => existing.get("created_at").cloned().unwrap_or_else(|| json!(now)),
            None => json!(now),
        };

        let Value::Object(map) = &mut document else {
            return Err(EtlError::InvalidRecord(format!(
                "{} record must serialize to an object",
                collection
            )));
        };
        map.insert("job_id".to_string(), json!(job.job_id));
        map.insert("source".to_string(), json!(source));
        map.insert("created_at".to_string(), created_at);
        map.insert("updated_at".to_string(), json!(now));

        Ok(document)
    }

    /// Reads a whole collection back into typed records
    ///
    /// Documents that no longer deserialize are counted as errors and
    /// skipped rather than failing the job.
    async fn load_collection<T: DeserializeOwned>(
        &self,
        collection: &str,
        results: &mut JobResults,
    ) -> EtlResult<Vec<T>> {
        let documents = self.store.find(collection, None).await?;
        let mut records = Vec::with_capacity(documents.len());
        for document in documents {
            match serde_json::from_value::<T>(document) {
                Ok(record) => records.push(record),
                Err(e) => {
                    results.record_error(format!("stored {} document unreadable: {}", collection, e))
                }
            }
        }
        Ok(records)
    }

    // ------------------------------------------------------------------
    // Job handlers
    // ------------------------------------------------------------------

    async fn handle_film_fetch(&self, job: &EtlJob, results: &mut JobResults) -> EtlResult<()> {
        let time_window = string_param(&job.parameters, "time_window")
            .unwrap_or_else(|| DEFAULT_TIME_WINDOW.to_string());
        let limit = usize_param(&job.parameters, "limit").unwrap_or(DEFAULT_FILM_LIMIT);

        let batch = self
            .run_fetch(&self.film_limiter, self.film_source.name(), || {
                self.film_source.fetch_trending(&time_window, limit)
            })
            .await?;

        results.total_fetched = batch.records.len() + batch.skipped;
        results.note_skipped(batch.skipped, "film normalization");

        self.persist_batch(
            collections::FILMS,
            &batch.records,
            Film::key,
            job,
            self.film_source.name(),
            results,
        )
        .await?;

        results.message = format!("Fetched {} trending films ({})", results.processed, time_window);
        Ok(())
    }

    async fn handle_place_fetch(&self, job: &EtlJob, results: &mut JobResults) -> EtlResult<()> {
        let country_code = string_param(&job.parameters, "country_code").ok_or_else(|| {
            EtlError::InvalidInput("place_fetch requires a country_code parameter".to_string())
        })?;
        let city_limit = usize_param(&job.parameters, "city_limit").unwrap_or(DEFAULT_CITY_LIMIT);
        let per_city_limit =
            usize_param(&job.parameters, "per_city_limit").unwrap_or(DEFAULT_PLACES_PER_CITY);
        let categories = list_param(&job.parameters, "categories").unwrap_or_else(|| {
            DEFAULT_PLACE_CATEGORIES.iter().map(|c| c.to_string()).collect()
        });

        let source = self.place_source.name();

        // The fallback list only stands in when the upstream listing has
        // failed past the retry budget; adapters never fall back themselves.
        let (cities, fell_back) = match self
            .run_fetch(&self.place_limiter, source, || {
                self.place_source.list_major_cities(&country_code, city_limit)
            })
            .await
        {
            Ok(cities) => (cities, false),
            Err(e) => {
                tracing::warn!(country_code = %country_code, error = %e, "City listing failed, substituting fallback list");
                results.record_error(format!("City listing failed, fallback used: {}", e));
                (fallback_cities(&country_code), true)
            }
        };

        results.total_fetched += cities.len();
        self.persist_batch(collections::CITIES, &cities, City::key, job, source, results)
            .await?;

        for city in &cities {
            match self
                .run_fetch(&self.place_limiter, source, || {
                    self.place_source.search_places(
                        city,
                        &categories,
                        DEFAULT_SEARCH_RADIUS_M,
                        per_city_limit,
                    )
                })
                .await
            {
                Ok(batch) => {
                    results.total_fetched += batch.records.len() + batch.skipped;
                    results.note_skipped(batch.skipped, "place normalization");
                    self.persist_batch(
                        collections::PLACES,
                        &batch.records,
                        Place::key,
                        job,
                        source,
                        results,
                    )
                    .await?;
                }
                Err(e) => {
                    results.record_error(format!("Place search failed for {}: {}", city.name, e));
                }
            }
        }

        let note = if fell_back { " (fallback city list)" } else { "" };
        results.message = format!(
            "Fetched places for {} cities in {}{}",
            cities.len(),
            country_code,
            note
        );
        Ok(())
    }

    async fn handle_correlation(&self, job: &EtlJob, results: &mut JobResults) -> EtlResult<()> {
        let films: Vec<Film> = self.load_collection(collections::FILMS, results).await?;
        let places: Vec<Place> = self.load_collection(collections::PLACES, results).await?;

        let correlations = self.correlation_engine.correlate(&films, &places);

        self.persist_batch(
            collections::CORRELATIONS,
            &correlations,
            Correlation::key,
            job,
            CORRELATION_SOURCE,
            results,
        )
        .await?;

        results.message = format!(
            "Correlated {} films against {} places into {} records",
            films.len(),
            places.len(),
            correlations.len()
        );
        Ok(())
    }

    async fn handle_enrichment(&self, job: &EtlJob, results: &mut JobResults) -> EtlResult<()> {
        let limit = usize_param(&job.parameters, "limit").unwrap_or(DEFAULT_ENRICHMENT_LIMIT);

        let films: Vec<Film> = self.load_collection(collections::FILMS, results).await?;
        let candidates: Vec<Film> = films
            .into_iter()
            .filter(|f| f.possible_locations.is_none())
            .take(limit)
            .collect();
        results.total_fetched = candidates.len();

        let source = self.place_source.name();
        for mut film in candidates {
            let mut locations = Vec::new();
            for country in film.production_countries.iter().take(ENRICHMENT_COUNTRY_LIMIT) {
                let Some(code) = country_code_for(country) else {
                    continue;
                };
                match self
                    .run_fetch(&self.place_limiter, source, || {
                        self.place_source
                            .list_major_cities(code, ENRICHMENT_CITIES_PER_COUNTRY)
                    })
                    .await
                {
                    Ok(cities) => {
                        for city in cities {
                            locations.push(ProductionLocation {
                                city_name: city.name,
                                country: country.clone(),
                                latitude: city.latitude,
                                longitude: city.longitude,
                                confidence: ENRICHMENT_CONFIDENCE,
                                reason: "Common film production location".to_string(),
                            });
                        }
                    }
                    Err(e) => {
                        results.record_error(format!("City lookup failed for {}: {}", country, e));
                    }
                }
            }

            // Films that gained nothing stay unenriched and are picked up
            // again on the next run.
            if locations.is_empty() {
                continue;
            }
            film.possible_locations = Some(locations);
            self.persist_batch(
                collections::FILMS,
                std::slice::from_ref(&film),
                Film::key,
                job,
                self.film_source.name(),
                results,
            )
            .await?;
        }

        results.message = format!("Enriched {} films with production locations", results.processed);
        Ok(())
    }

    async fn handle_cleanup(&self, _job: &EtlJob, results: &mut JobResults) -> EtlResult<()> {
        let cutoff = Utc::now() - chrono::Duration::days(self.job_ttl_days);
        let deleted = self
            .store
            .delete_older_than(collections::JOBS, cutoff)
            .await?;

        results.processed = deleted as usize;
        results.message = format!(
            "Removed {} job records older than {} days",
            deleted, self.job_ttl_days
        );
        Ok(())
    }

    async fn handle_report(&self, job: &EtlJob, results: &mut JobResults) -> EtlResult<()> {
        let films: Vec<Film> = self.load_collection(collections::FILMS, results).await?;
        let correlations: Vec<Correlation> =
            self.load_collection(collections::CORRELATIONS, results).await?;

        let report = self.success_report(&films, &correlations).await?;

        self.persist_batch(
            collections::LOCATION_STATS,
            &report.locations,
            LocationSuccessStats::key,
            job,
            AGGREGATION_SOURCE,
            results,
        )
        .await?;

        let daily = DailyReport {
            date: Utc::now().format("%Y-%m-%d").to_string(),
            films: self.store.count(collections::FILMS).await?,
            places: self.store.count(collections::PLACES).await?,
            correlations: self.store.count(collections::CORRELATIONS).await?,
            jobs_completed: self
                .store
                .count_where(collections::JOBS, "status", "completed")
                .await?,
            jobs_failed: self
                .store
                .count_where(collections::JOBS, "status", "failed")
                .await?,
            total_locations_analyzed: report.total_locations_analyzed,
            most_popular_location: report.most_popular_location.clone(),
            highest_rated_location: report.highest_rated_location.clone(),
        };
        self.persist_batch(
            collections::REPORTS,
            std::slice::from_ref(&daily),
            DailyReport::key,
            job,
            AGGREGATION_SOURCE,
            results,
        )
        .await?;

        results.message = format!(
            "Analyzed {} locations across {} correlations",
            report.total_locations_analyzed,
            correlations.len()
        );
        Ok(())
    }

    /// Success analysis with a cache-aside read of the last computed report
    async fn success_report(
        &self,
        films: &[Film],
        correlations: &[Correlation],
    ) -> EtlResult<SuccessReport> {
        match &self.cache {
            Some(cache) => {
                cached!(cache, CacheKey::SuccessReport, self.report_cache_ttl_secs, async {
                    Ok::<_, EtlError>(self.aggregation_engine.success_by_location(films, correlations))
                })
            }
            None => Ok(self.aggregation_engine.success_by_location(films, correlations)),
        }
    }

    /// Ranks stored places against caller preferences
    ///
    /// Usage errors are rejected before the store is touched and no job
    /// record is created.
    pub async fn recommend_locations(
        &self,
        preferences: &LocationPreferences,
    ) -> EtlResult<Vec<Recommendation>> {
        preferences.validate()?;

        let documents = self.store.find(collections::PLACES, None).await?;
        let mut places = Vec::with_capacity(documents.len());
        for document in documents {
            match serde_json::from_value::<Place>(document) {
                Ok(place) => places.push(place),
                Err(e) => tracing::debug!(error = %e, "Skipping unreadable place document"),
            }
        }

        self.aggregation_engine.recommend(preferences, &places)
    }

    /// Dispatches the full fetch-correlate-report chain sequentially
    ///
    /// Follow-up jobs carry the film fetch's id as `source_job_id` so the
    /// whole run can be traced from any of its job records.
    pub async fn run_daily_pipeline(&self) -> EtlResult<Vec<String>> {
        tracing::info!("Starting daily ETL pipeline");

        let root_id = self
            .dispatch(
                JobType::FilmFetch,
                json!({"time_window": DEFAULT_TIME_WINDOW, "limit": PIPELINE_FILM_LIMIT}),
                None,
            )
            .await?;

        let mut job_ids = vec![root_id.clone()];
        let countries = self.fetch_countries.clone();
        for country in countries {
            let job_id = self
                .dispatch(
                    JobType::PlaceFetch,
                    json!({"country_code": country}),
                    Some(root_id.clone()),
                )
                .await?;
            job_ids.push(job_id);
        }

        let correlation_id = self
            .dispatch(JobType::Correlation, json!({}), Some(root_id.clone()))
            .await?;
        job_ids.push(correlation_id);

        let report_id = self
            .dispatch(JobType::Report, json!({}), Some(root_id.clone()))
            .await?;
        job_ids.push(report_id);

        tracing::info!(jobs = job_ids.len(), "Daily ETL pipeline finished");
        Ok(job_ids)
    }
}

fn string_param(parameters: &Value, key: &str) -> Option<String> {
    parameters.get(key).and_then(Value::as_str).map(str::to_string)
}

fn usize_param(parameters: &Value, key: &str) -> Option<usize> {
    parameters.get(key).and_then(Value::as_u64).map(|v| v as usize)
}

fn list_param(parameters: &Value, key: &str) -> Option<Vec<String>> {
    parameters.get(key).and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    })
}

/// ISO code for a production country name, if known
fn country_code_for(country_name: &str) -> Option<&'static str> {
    COUNTRY_CODES
        .iter()
        .copied()
        .find(|(name, _)| country_name.eq_ignore_ascii_case(name))
        .map(|(_, code)| code)
}

/// Built-in city list for a country, empty when the country is unknown
fn fallback_cities(country_code: &str) -> Vec<City> {
    FALLBACK_CITIES
        .iter()
        .copied()
        .find(|(code, _)| country_code.eq_ignore_ascii_case(code))
        .map(|(code, cities)| {
            cities
                .iter()
                .copied()
                .map(|(name, latitude, longitude, population)| City {
                    name: name.to_string(),
                    country_code: code.to_string(),
                    latitude,
                    longitude,
                    population,
                })
                .collect()
        })
        .unwrap_or_default()
}
