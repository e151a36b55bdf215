use std::collections::{BTreeSet, HashMap};

use chrono::Utc;

use crate::error::EtlResult;
use crate::models::{
    Correlation, Film, FilmContribution, LocationPreferences, LocationSuccessStats, Place,
    Recommendation, SuccessReport,
};
use crate::services::correlation::{categories_for_genre, DEFAULT_GENRE_CATEGORIES};

/// Added per preferred genre whose categories match the primary category
const GENRE_PREFERENCE_WEIGHT: f64 = 0.4;
/// Added per preferred category found anywhere in the place's categories
const CATEGORY_PREFERENCE_WEIGHT: f64 = 0.3;
/// Added when the place sits close to its city center
const PROXIMITY_BONUS: f64 = 0.1;
const CENTRAL_DISTANCE_M: f64 = 2000.0;
/// Recommendations scoring at or below this are dropped
const MIN_RELEVANCE_SCORE: f64 = 0.2;
const MAX_RECOMMENDATIONS: usize = 10;

/// Pure statistics over films and their correlations
///
/// Like the correlation engine this holds no state and performs no I/O;
/// callers hand it full in-memory batches.
#[derive(Debug, Default, Clone)]
pub struct AggregationEngine;

impl AggregationEngine {
    pub fn new() -> Self {
        AggregationEngine
    }

    /// Folds correlations into per-location success statistics
    ///
    /// Correlations referencing a film that is not in the batch are
    /// skipped. Winner picks resolve ties toward the location seen first.
    pub fn success_by_location(
        &self,
        films: &[Film],
        correlations: &[Correlation],
    ) -> SuccessReport {
        let films_by_id: HashMap<i64, &Film> = films.iter().map(|f| (f.film_id, f)).collect();

        let mut order: Vec<String> = Vec::new();
        let mut stats_by_place: HashMap<String, LocationSuccessStats> = HashMap::new();

        for correlation in correlations {
            let Some(film) = films_by_id.get(&correlation.film_id) else {
                continue;
            };

            for suggestion in &correlation.suggested_locations {
                let stats = stats_by_place
                    .entry(suggestion.place_id.clone())
                    .or_insert_with(|| {
                        order.push(suggestion.place_id.clone());
                        LocationSuccessStats {
                            place_id: suggestion.place_id.clone(),
                            place_name: suggestion.place_name.clone(),
                            city: suggestion.place_city.clone(),
                            total_films: 0,
                            average_rating: 0.0,
                            average_popularity: 0.0,
                            genres: BTreeSet::new(),
                            films: Vec::new(),
                        }
                    });

                stats.films.push(FilmContribution {
                    film_id: film.film_id,
                    title: film.title.clone(),
                    rating: film.vote_average,
                    popularity: film.popularity,
                    match_score: suggestion.match_score,
                });
                for genre in &film.genres {
                    stats.genres.insert(genre.clone());
                }
            }
        }

        let mut locations: Vec<LocationSuccessStats> = order
            .into_iter()
            .filter_map(|place_id| stats_by_place.remove(&place_id))
            .collect();

        for stats in &mut locations {
            stats.total_films = stats.films.len();
            if !stats.films.is_empty() {
                let count = stats.films.len() as f64;
                stats.average_rating = stats.films.iter().map(|f| f.rating).sum::<f64>() / count;
                stats.average_popularity =
                    stats.films.iter().map(|f| f.popularity).sum::<f64>() / count;
            }
        }

        // Winners are picked over first-seen order, before the
        // presentation sort below reshuffles it.
        let most_popular_location = best_by(&locations, |s| s.total_films as f64);
        let highest_rated_location = best_by(&locations, |s| s.average_rating);

        locations.sort_by(|a, b| b.total_films.cmp(&a.total_films));

        SuccessReport {
            total_locations_analyzed: locations.len(),
            most_popular_location,
            highest_rated_location,
            locations,
            generated_at: Utc::now(),
        }
    }

    /// Ranks places against caller preferences
    ///
    /// An empty preference set is a usage error and is rejected before
    /// any scoring happens.
    pub fn recommend(
        &self,
        preferences: &LocationPreferences,
        places: &[Place],
    ) -> EtlResult<Vec<Recommendation>> {
        preferences.validate()?;

        let mut recommendations = Vec::new();
        for place in places {
            let mut score = 0.0;

            let mut genre_hits = 0usize;
            for genre in &preferences.preferred_genres {
                let categories = categories_for_genre(genre).unwrap_or(DEFAULT_GENRE_CATEGORIES);
                if categories
                    .iter()
                    .any(|&c| place.primary_category.contains(c))
                {
                    score += GENRE_PREFERENCE_WEIGHT;
                    genre_hits += 1;
                }
            }

            let mut category_hits = 0usize;
            for preferred in &preferences.preferred_categories {
                if place.categories.iter().any(|c| c.contains(preferred.as_str())) {
                    score += CATEGORY_PREFERENCE_WEIGHT;
                    category_hits += 1;
                }
            }

            let central = place.distance_from_city_center_m < CENTRAL_DISTANCE_M;
            if central {
                score += PROXIMITY_BONUS;
            }

            if score > MIN_RELEVANCE_SCORE {
                let mut reasons = Vec::new();
                if genre_hits > 0 {
                    reasons.push(format!("Matches {} preferred genres", genre_hits));
                }
                if category_hits > 0 {
                    reasons.push(format!("Matches {} preferred categories", category_hits));
                }
                if central {
                    reasons.push("Close to the city center".to_string());
                }

                recommendations.push(Recommendation {
                    place_id: place.place_id.clone(),
                    place_name: place.name.clone(),
                    city: place.city.clone(),
                    primary_category: place.primary_category.clone(),
                    relevance_score: score,
                    reasons,
                });
            }
        }

        recommendations.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        recommendations.truncate(MAX_RECOMMENDATIONS);

        Ok(recommendations)
    }
}

/// First location with the strictly greatest key, in input order
fn best_by<F>(locations: &[LocationSuccessStats], key: F) -> Option<String>
where
    F: Fn(&LocationSuccessStats) -> f64,
{
    let mut best: Option<(&LocationSuccessStats, f64)> = None;
    for stats in locations {
        let value = key(stats);
        match &best {
            Some((_, best_value)) if value <= *best_value => {}
            _ => best = Some((stats, value)),
        }
    }
    best.map(|(stats, _)| stats.place_id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;
    use crate::models::SuggestedLocation;
    use chrono::Utc;

    fn create_test_film(film_id: i64, genres: &[&str], rating: f64, popularity: f64) -> Film {
        Film {
            film_id,
            title: format!("Film {}", film_id),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            popularity,
            vote_average: rating,
            vote_count: 1000,
            production_countries: vec![],
            fetched_at: Utc::now(),
            possible_locations: None,
        }
    }

    fn create_test_correlation(film_id: i64, place_ids: &[&str]) -> Correlation {
        Correlation {
            film_id,
            film_title: format!("Film {}", film_id),
            film_genres: vec![],
            suggested_locations: place_ids
                .iter()
                .map(|place_id| SuggestedLocation {
                    place_id: place_id.to_string(),
                    place_name: format!("Place {}", place_id),
                    place_city: "London".to_string(),
                    primary_category: "tourism.sights".to_string(),
                    match_score: 0.5,
                    reason: "Matches drama genre".to_string(),
                })
                .collect(),
            total_matches: place_ids.len(),
            average_match_score: 0.5,
            created_at: Utc::now(),
        }
    }

    fn create_test_place(place_id: &str, primary: &str, categories: &[&str], distance: f64) -> Place {
        Place {
            place_id: place_id.to_string(),
            name: format!("Place {}", place_id),
            city: "London".to_string(),
            country_code: "GB".to_string(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            primary_category: primary.to_string(),
            latitude: 51.5,
            longitude: -0.12,
            distance_from_city_center_m: distance,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_two_films_sharing_a_place_fold_together() {
        let engine = AggregationEngine::new();
        let films = [
            create_test_film(1, &["Action"], 8.0, 100.0),
            create_test_film(2, &["Drama"], 6.0, 50.0),
        ];
        let correlations = [
            create_test_correlation(1, &["p1"]),
            create_test_correlation(2, &["p1"]),
        ];

        let report = engine.success_by_location(&films, &correlations);
        assert_eq!(report.total_locations_analyzed, 1);
        assert_eq!(report.most_popular_location.as_deref(), Some("p1"));
        assert_eq!(report.highest_rated_location.as_deref(), Some("p1"));

        let stats = &report.locations[0];
        assert_eq!(stats.total_films, 2);
        assert!((stats.average_rating - 7.0).abs() < 1e-9);
        assert!((stats.average_popularity - 75.0).abs() < 1e-9);
        assert_eq!(stats.genres.len(), 2);
        assert!(stats.genres.contains("Action"));
        assert_eq!(stats.films.len(), 2);
    }

    #[test]
    fn test_popularity_tie_resolves_to_first_seen() {
        let engine = AggregationEngine::new();
        let films = [
            create_test_film(1, &["Action"], 6.0, 10.0),
            create_test_film(2, &["Drama"], 9.0, 10.0),
        ];
        let correlations = [
            create_test_correlation(1, &["p1"]),
            create_test_correlation(2, &["p2"]),
        ];

        let report = engine.success_by_location(&films, &correlations);
        // Both places carry one film; the rating winner is unambiguous.
        assert_eq!(report.most_popular_location.as_deref(), Some("p1"));
        assert_eq!(report.highest_rated_location.as_deref(), Some("p2"));
    }

    #[test]
    fn test_report_orders_locations_by_film_count() {
        let engine = AggregationEngine::new();
        let films = [
            create_test_film(1, &["Action"], 7.0, 10.0),
            create_test_film(2, &["Drama"], 7.0, 10.0),
        ];
        let correlations = [
            create_test_correlation(1, &["p1", "p2"]),
            create_test_correlation(2, &["p2"]),
        ];

        let report = engine.success_by_location(&films, &correlations);
        assert_eq!(report.total_locations_analyzed, 2);
        assert_eq!(report.locations[0].place_id, "p2");
        assert_eq!(report.locations[0].total_films, 2);
        assert_eq!(report.locations[1].total_films, 1);
    }

    #[test]
    fn test_correlation_without_film_is_skipped() {
        let engine = AggregationEngine::new();
        let films = [create_test_film(1, &["Action"], 7.0, 10.0)];
        let correlations = [create_test_correlation(999, &["p1"])];

        let report = engine.success_by_location(&films, &correlations);
        assert_eq!(report.total_locations_analyzed, 0);
        assert!(report.locations.is_empty());
        assert!(report.most_popular_location.is_none());
        assert!(report.highest_rated_location.is_none());
    }

    #[test]
    fn test_empty_inputs_yield_empty_report() {
        let engine = AggregationEngine::new();
        let report = engine.success_by_location(&[], &[]);
        assert_eq!(report.total_locations_analyzed, 0);
        assert!(report.most_popular_location.is_none());
    }

    #[test]
    fn test_recommend_rejects_empty_preferences() {
        let engine = AggregationEngine::new();
        let result = engine.recommend(&LocationPreferences::default(), &[]);
        assert!(matches!(result, Err(EtlError::InvalidInput(_))));
    }

    #[test]
    fn test_recommend_weights_accumulate() {
        let engine = AggregationEngine::new();
        let preferences = LocationPreferences {
            preferred_genres: vec!["action".to_string()],
            preferred_categories: vec!["museum".to_string()],
        };
        let places = [create_test_place(
            "p1",
            "entertainment.cinema",
            &["tourism.museum"],
            500.0,
        )];

        let recommendations = engine.recommend(&preferences, &places).unwrap();
        assert_eq!(recommendations.len(), 1);
        assert!((recommendations[0].relevance_score - 0.8).abs() < 1e-9);
        assert_eq!(recommendations[0].reasons.len(), 3);
    }

    #[test]
    fn test_recommend_drops_low_scores() {
        let engine = AggregationEngine::new();
        let preferences = LocationPreferences {
            preferred_genres: vec![],
            preferred_categories: vec!["museum".to_string()],
        };
        let places = [
            // Proximity alone cannot clear the threshold
            create_test_place("near-miss", "catering.cafe", &["catering.cafe"], 100.0),
            create_test_place("kept", "tourism.museum", &["tourism.museum"], 9000.0),
        ];

        let recommendations = engine.recommend(&preferences, &places).unwrap();
        assert_eq!(recommendations.len(), 1);
        assert_eq!(recommendations[0].place_id, "kept");
        assert_eq!(
            recommendations[0].reasons,
            vec!["Matches 1 preferred categories".to_string()]
        );
    }

    #[test]
    fn test_recommend_caps_at_ten_sorted_descending() {
        let engine = AggregationEngine::new();
        let preferences = LocationPreferences {
            preferred_genres: vec![],
            preferred_categories: vec!["tourism".to_string()],
        };

        let places: Vec<Place> = (0..12)
            .map(|i| {
                // Even-numbered places sit close to the center and rank higher
                let distance = if i % 2 == 0 { 300.0 } else { 8000.0 };
                create_test_place(&format!("p{}", i), "tourism.sights", &["tourism.sights"], distance)
            })
            .collect();

        let recommendations = engine.recommend(&preferences, &places).unwrap();
        assert_eq!(recommendations.len(), 10);
        assert!(recommendations
            .windows(2)
            .all(|w| w[0].relevance_score >= w[1].relevance_score));
        assert!(recommendations
            .iter()
            .all(|r| r.relevance_score > MIN_RELEVANCE_SCORE));
        assert!((recommendations[0].relevance_score - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_unmapped_preferred_genre_uses_default_categories() {
        let engine = AggregationEngine::new();
        let preferences = LocationPreferences {
            preferred_genres: vec!["western".to_string()],
            preferred_categories: vec![],
        };
        let places = [create_test_place("p1", "tourism.sights", &[], 5000.0)];

        let recommendations = engine.recommend(&preferences, &places).unwrap();
        assert_eq!(recommendations.len(), 1);
        assert!((recommendations[0].relevance_score - 0.4).abs() < 1e-9);
        assert_eq!(
            recommendations[0].reasons,
            vec!["Matches 1 preferred genres".to_string()]
        );
    }
}
