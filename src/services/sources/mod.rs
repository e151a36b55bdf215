use std::time::Duration;

use async_trait::async_trait;

use crate::error::{EtlError, EtlResult};
use crate::models::{City, Film, Place};

pub mod geoapify;
pub mod tmdb;

pub use geoapify::GeoapifyClient;
pub use tmdb::TmdbClient;

/// Categories searched when a place-fetch job does not name its own
pub const DEFAULT_PLACE_CATEGORIES: &[&str] = &[
    "entertainment",
    "tourism",
    "catering",
    "commercial",
    "building.historic",
];

/// Default radius around a city center for place search, in meters
pub const DEFAULT_SEARCH_RADIUS_M: u32 = 5000;

/// A normalized batch plus the number of malformed records skipped
///
/// Adapters never fail a whole batch over one bad record; they drop it,
/// count it, and let the orchestrator account for it in the job results.
#[derive(Debug, Clone)]
pub struct FetchBatch<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

impl<T> Default for FetchBatch<T> {
    fn default() -> Self {
        FetchBatch {
            records: Vec::new(),
            skipped: 0,
        }
    }
}

/// Film catalog adapter seam
///
/// Implementations normalize provider records into canonical films and
/// classify transport failures; they carry no retry loops of their own —
/// the orchestrator owns retry policy.
#[async_trait]
pub trait FilmSource: Send + Sync {
    /// Fetches the trending feed, enriched with per-film details
    async fn fetch_trending(&self, time_window: &str, limit: usize) -> EtlResult<FetchBatch<Film>>;

    /// Fetches one film by catalog id
    async fn fetch_details(&self, film_id: i64) -> EtlResult<Film>;

    /// Source name for logging and document stamping
    fn name(&self) -> &'static str;
}

/// Places adapter seam
#[async_trait]
pub trait PlaceSource: Send + Sync {
    /// Lists the major cities of a country, largest first where the
    /// provider supports it
    async fn list_major_cities(&self, country_code: &str, limit: usize) -> EtlResult<Vec<City>>;

    /// Searches points of interest around a city center
    async fn search_places(
        &self,
        city: &City,
        categories: &[String],
        radius_m: u32,
        limit: usize,
    ) -> EtlResult<FetchBatch<Place>>;

    /// Source name for logging and document stamping
    fn name(&self) -> &'static str;
}

/// Maps a non-success HTTP status to the upstream error taxonomy
///
/// 429 is retryable and carries the server's requested delay; 5xx is
/// retryable; any other 4xx is not worth repeating.
pub(crate) fn upstream_error_for_status(
    source: &str,
    status: reqwest::StatusCode,
    retry_after: Option<Duration>,
    body: String,
) -> EtlError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return EtlError::rate_limited(format!("{} rate limited (429)", source), retry_after);
    }
    EtlError::Upstream {
        message: format!("{} returned status {}: {}", source, status, body),
        retryable: status.is_server_error(),
        retry_after: None,
    }
}

/// Resolves a response into its body text, converting non-success
/// statuses into classified upstream errors
pub(crate) async fn check_response(
    source: &str,
    response: reqwest::Response,
) -> EtlResult<serde_json::Value> {
    let status = response.status();
    if !status.is_success() {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response.text().await.unwrap_or_default();
        return Err(upstream_error_for_status(source, status, retry_after, body));
    }

    // An envelope that fails to parse will not improve on retry
    response.json().await.map_err(|e| EtlError::Upstream {
        message: format!("{} returned an unparseable response: {}", source, e),
        retryable: false,
        retry_after: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_429_is_retryable_with_delay() {
        let err = upstream_error_for_status(
            "tmdb",
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            Some(Duration::from_secs(7)),
            String::new(),
        );
        assert!(err.is_retryable());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
    }

    #[test]
    fn test_5xx_is_retryable_without_delay() {
        let err = upstream_error_for_status(
            "geoapify",
            reqwest::StatusCode::SERVICE_UNAVAILABLE,
            None,
            "upstream down".to_string(),
        );
        assert!(err.is_retryable());
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn test_other_4xx_is_not_retryable() {
        for status in [
            reqwest::StatusCode::BAD_REQUEST,
            reqwest::StatusCode::UNAUTHORIZED,
            reqwest::StatusCode::NOT_FOUND,
        ] {
            let err = upstream_error_for_status("tmdb", status, None, String::new());
            assert!(!err.is_retryable(), "{} must not be retryable", status);
        }
    }

    #[test]
    fn test_error_message_names_the_source() {
        let err = upstream_error_for_status(
            "geoapify",
            reqwest::StatusCode::FORBIDDEN,
            None,
            "invalid key".to_string(),
        );
        let message = err.to_string();
        assert!(message.contains("geoapify"));
        assert!(message.contains("403"));
    }
}
