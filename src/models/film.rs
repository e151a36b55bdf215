use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EtlError, EtlResult};

/// Canonical film record
///
/// Owned by the film source adapter; mutated only by upsert during fetch,
/// never deleted. `genres` keeps the catalog's order because correlation
/// reads the first two.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Film {
    pub film_id: i64,
    pub title: String,
    pub genres: Vec<String>,
    pub popularity: f64,
    pub vote_average: f64,
    pub vote_count: i64,
    /// Production country display names, e.g. "United States"
    pub production_countries: Vec<String>,
    pub fetched_at: DateTime<Utc>,
    /// Candidate filming locations attached by the enrichment job
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub possible_locations: Option<Vec<ProductionLocation>>,
}

/// One candidate filming location derived from a production country
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductionLocation {
    pub city_name: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub confidence: f64,
    pub reason: String,
}

impl Film {
    /// Builds a canonical film from a trending feed entry, merged with the
    /// per-movie details response when available
    ///
    /// Fails with `InvalidRecord` on entries missing an id or title; the
    /// caller skips and counts those without failing the batch.
    pub fn from_wire(
        movie: TmdbMovie,
        details: Option<TmdbMovieDetails>,
        fetched_at: DateTime<Utc>,
    ) -> EtlResult<Self> {
        let film_id = movie
            .id
            .filter(|id| *id > 0)
            .ok_or_else(|| EtlError::InvalidRecord("film entry missing id".to_string()))?;
        let title = movie
            .title
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| EtlError::InvalidRecord(format!("film {} missing title", film_id)))?;

        let details = details.unwrap_or_default();

        Ok(Film {
            film_id,
            title,
            genres: details.genres.into_iter().map(|g| g.name).collect(),
            popularity: movie.popularity.or(details.popularity).unwrap_or(0.0),
            vote_average: movie.vote_average.or(details.vote_average).unwrap_or(0.0),
            vote_count: movie.vote_count.or(details.vote_count).unwrap_or(0),
            production_countries: details
                .production_countries
                .into_iter()
                .map(|c| c.name)
                .collect(),
            fetched_at,
            possible_locations: None,
        })
    }

    /// Upsert key in the films collection
    pub fn key(&self) -> String {
        self.film_id.to_string()
    }
}

// ============================================================================
// Movie catalog API wire types
// ============================================================================

/// Trending feed entry; every field optional so one malformed entry cannot
/// poison the surrounding batch
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovie {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<i64>,
}

/// Per-movie details response; carries the fields the trending feed omits
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbMovieDetails {
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub production_countries: Vec<TmdbCountry>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbGenre {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbCountry {
    pub name: String,
}
