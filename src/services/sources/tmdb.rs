use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::error::EtlResult;
use crate::models::{Film, TmdbMovie, TmdbMovieDetails};
use crate::services::sources::{check_response, FetchBatch, FilmSource};

const SOURCE_NAME: &str = "tmdb";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// TMDB film catalog client
///
/// Wraps the v3 REST API: the trending feed plus the per-movie details
/// endpoint that carries genres and production countries.
pub struct TmdbClient {
    http_client: reqwest::Client,
    api_key: String,
    api_url: String,
}

impl TmdbClient {
    pub fn new(api_key: String, api_url: String) -> EtlResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(TmdbClient {
            http_client,
            api_key,
            api_url,
        })
    }

    async fn get_json(&self, path: &str) -> EtlResult<Value> {
        let url = format!("{}{}", self.api_url, path);
        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str()), ("language", "en-US")])
            .send()
            .await?;

        check_response(SOURCE_NAME, response).await
    }

    async fn movie_details(&self, film_id: i64) -> EtlResult<Value> {
        self.get_json(&format!("/movie/{}", film_id)).await
    }
}

/// Pulls the entries out of a trending envelope, dropping anything that
/// does not parse as a movie
fn parse_trending_entries(envelope: &Value) -> (Vec<TmdbMovie>, usize) {
    let mut movies = Vec::new();
    let mut skipped = 0;

    let results = envelope
        .get("results")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    for entry in results {
        match serde_json::from_value::<TmdbMovie>(entry) {
            Ok(movie) => movies.push(movie),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unparseable trending entry");
                skipped += 1;
            }
        }
    }

    (movies, skipped)
}

#[async_trait]
impl FilmSource for TmdbClient {
    async fn fetch_trending(&self, time_window: &str, limit: usize) -> EtlResult<FetchBatch<Film>> {
        let envelope = self
            .get_json(&format!("/trending/movie/{}", time_window))
            .await?;

        let (movies, mut skipped) = parse_trending_entries(&envelope);
        let fetched_at = Utc::now();
        let mut records = Vec::new();

        for movie in movies.into_iter().take(limit) {
            let Some(film_id) = movie.id else {
                skipped += 1;
                continue;
            };

            // Rate limits and server faults abort the batch so the
            // orchestrator can back off; a single bad record does not.
            let details = match self.movie_details(film_id).await {
                Ok(body) => match serde_json::from_value::<TmdbMovieDetails>(body) {
                    Ok(details) => Some(details),
                    Err(e) => {
                        tracing::warn!(film_id, error = %e, "Skipping film with unparseable details");
                        skipped += 1;
                        continue;
                    }
                },
                Err(e) if e.is_retryable() => return Err(e),
                Err(e) => {
                    tracing::warn!(film_id, error = %e, "Skipping film whose details fetch failed");
                    skipped += 1;
                    continue;
                }
            };

            match Film::from_wire(movie, details, fetched_at) {
                Ok(film) => records.push(film),
                Err(e) => {
                    tracing::warn!(film_id, error = %e, "Skipping invalid film record");
                    skipped += 1;
                }
            }
        }

        tracing::info!(
            fetched = records.len(),
            skipped,
            time_window,
            "Fetched trending films from TMDB"
        );

        Ok(FetchBatch { records, skipped })
    }

    async fn fetch_details(&self, film_id: i64) -> EtlResult<Film> {
        let body = self.movie_details(film_id).await?;

        // The details payload carries both the base movie fields and the
        // enrichment fields, so it parses into both views.
        let movie: TmdbMovie = serde_json::from_value(body.clone())?;
        let details: TmdbMovieDetails = serde_json::from_value(body)?;

        Film::from_wire(movie, Some(details), Utc::now())
    }

    fn name(&self) -> &'static str {
        SOURCE_NAME
    }
}

impl std::fmt::Debug for TmdbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TmdbClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}
