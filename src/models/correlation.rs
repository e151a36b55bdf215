use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EtlError, EtlResult};

/// Ranked association between one film and its best-matching places
///
/// Superseded on re-run for the same film, never appended. Films with no
/// eligible place produce no record at all.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Correlation {
    pub film_id: i64,
    pub film_title: String,
    /// Lower-cased at correlation time
    pub film_genres: Vec<String>,
    /// Descending by score, capped at 3
    pub suggested_locations: Vec<SuggestedLocation>,
    /// Places that cleared the score threshold, before the cap
    pub total_matches: usize,
    /// Mean score of the kept locations
    pub average_match_score: f64,
    pub created_at: DateTime<Utc>,
}

impl Correlation {
    /// Upsert key in the correlations collection
    pub fn key(&self) -> String {
        self.film_id.to_string()
    }
}

/// One suggested place inside a correlation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuggestedLocation {
    pub place_id: String,
    pub place_name: String,
    pub place_city: String,
    pub primary_category: String,
    pub match_score: f64,
    pub reason: String,
}

/// Per-location aggregate over all current correlations
///
/// Fully recomputed each aggregation pass rather than incrementally
/// mutated, so a stale document can never drift from the correlations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationSuccessStats {
    pub place_id: String,
    pub place_name: String,
    pub city: String,
    pub total_films: usize,
    pub average_rating: f64,
    pub average_popularity: f64,
    pub genres: BTreeSet<String>,
    pub films: Vec<FilmContribution>,
}

impl LocationSuccessStats {
    /// Upsert key in the location stats collection
    pub fn key(&self) -> String {
        self.place_id.clone()
    }
}

/// One film's contribution to a location's statistics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilmContribution {
    pub film_id: i64,
    pub title: String,
    pub rating: f64,
    pub popularity: f64,
    pub match_score: f64,
}

/// Output of the success-by-location analysis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuccessReport {
    pub total_locations_analyzed: usize,
    /// Place id with the most films; ties keep first-seen order
    pub most_popular_location: Option<String>,
    /// Place id with the highest average rating; ties keep first-seen order
    pub highest_rated_location: Option<String>,
    pub locations: Vec<LocationSuccessStats>,
    pub generated_at: DateTime<Utc>,
}

/// Daily operational snapshot persisted by the report job
///
/// Collection counts and job tallies at generation time plus the headline
/// numbers of the success analysis. One document per UTC date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyReport {
    /// UTC date in `YYYY-MM-DD` form; also the upsert key
    pub date: String,
    pub films: u64,
    pub places: u64,
    pub correlations: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub total_locations_analyzed: usize,
    pub most_popular_location: Option<String>,
    pub highest_rated_location: Option<String>,
}

impl DailyReport {
    /// Upsert key in the reports collection
    pub fn key(&self) -> String {
        self.date.clone()
    }
}

/// Caller preferences for recommendation ranking
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationPreferences {
    #[serde(default)]
    pub preferred_genres: Vec<String>,
    #[serde(default)]
    pub preferred_categories: Vec<String>,
}

impl LocationPreferences {
    /// Rejects empty preference sets before any I/O happens
    pub fn validate(&self) -> EtlResult<()> {
        if self.preferred_genres.is_empty() && self.preferred_categories.is_empty() {
            return Err(EtlError::InvalidInput(
                "at least one preferred genre or category is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// One recommended place for a preference set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub place_id: String,
    pub place_name: String,
    pub city: String,
    pub primary_category: String,
    pub relevance_score: f64,
    pub reasons: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferences_require_some_input() {
        let empty = LocationPreferences::default();
        assert!(matches!(
            empty.validate(),
            Err(EtlError::InvalidInput(_))
        ));

        let genres_only = LocationPreferences {
            preferred_genres: vec!["action".to_string()],
            preferred_categories: vec![],
        };
        assert!(genres_only.validate().is_ok());

        let categories_only = LocationPreferences {
            preferred_genres: vec![],
            preferred_categories: vec!["museum".to_string()],
        };
        assert!(categories_only.validate().is_ok());
    }

    #[test]
    fn test_correlation_key_is_film_id() {
        let correlation = Correlation {
            film_id: 27205,
            film_title: "Inception".to_string(),
            film_genres: vec!["action".to_string()],
            suggested_locations: vec![],
            total_matches: 0,
            average_match_score: 0.0,
            created_at: Utc::now(),
        };
        assert_eq!(correlation.key(), "27205");
    }

    #[test]
    fn test_stats_genres_deduplicate() {
        let mut genres = BTreeSet::new();
        genres.insert("action".to_string());
        genres.insert("action".to_string());
        genres.insert("drama".to_string());

        let stats = LocationSuccessStats {
            place_id: "p1".to_string(),
            place_name: "Somewhere".to_string(),
            city: "London".to_string(),
            total_films: 2,
            average_rating: 7.5,
            average_popularity: 50.0,
            genres,
            films: vec![],
        };
        assert_eq!(stats.genres.len(), 2);

        let doc = serde_json::to_value(&stats).unwrap();
        let listed = doc["genres"].as_array().unwrap();
        assert_eq!(listed.len(), 2);
    }
}
