use chrono::{DateTime, Utc};

use crate::models::{Correlation, Film, Place, SuggestedLocation};

/// Added for every mapped genre category found in the place's categories
const GENRE_HIT_SCORE: f64 = 0.3;
/// Keyword bonuses, independent of genre
const CINEMA_BONUS: f64 = 0.3;
const MUSEUM_BONUS: f64 = 0.2;
const HISTORIC_BONUS: f64 = 0.2;
/// Places scoring at or below this never become suggestions
const MIN_MATCH_SCORE: f64 = 0.3;
/// Suggestions kept per film after ranking
const MAX_SUGGESTED_LOCATIONS: usize = 3;
/// Genres considered when deciding which places are worth scoring
const MAX_PRIMARY_GENRES: usize = 2;

/// Category prefixes characteristic of each genre
static GENRE_CATEGORY_MAP: &[(&str, &[&str])] = &[
    ("action", &["entertainment.cinema", "commercial", "building"]),
    ("comedy", &["entertainment", "catering", "tourism"]),
    ("drama", &["building.historic", "tourism.museum", "tourism.sights"]),
    ("horror", &["building.abandoned", "tourism.sights", "natural"]),
    ("romance", &["tourism.sights.viewpoint", "catering.cafe", "tourism"]),
    ("thriller", &["commercial", "building", "tourism.sights"]),
    ("science fiction", &["building", "tourism.museum", "entertainment"]),
    ("adventure", &["natural", "tourism", "tourism.sights"]),
    ("fantasy", &["tourism.sights.castle", "building.historic", "natural"]),
];

/// Fallback for genres with no entry in the map
pub(crate) const DEFAULT_GENRE_CATEGORIES: &[&str] = &["entertainment", "tourism", "catering"];

/// Looks up the category prefixes mapped to a genre, case-insensitively
pub(crate) fn categories_for_genre(genre: &str) -> Option<&'static [&'static str]> {
    GENRE_CATEGORY_MAP
        .iter()
        .copied()
        .find(|(name, _)| genre.eq_ignore_ascii_case(name))
        .map(|(_, categories)| categories)
}

/// Pure film-to-place matcher
///
/// Scores every place against every film and keeps the best few per
/// film. Holds no state and performs no I/O.
#[derive(Debug, Default, Clone)]
pub struct CorrelationEngine;

impl CorrelationEngine {
    pub fn new() -> Self {
        CorrelationEngine
    }

    /// Produces at most one correlation per film
    ///
    /// A film whose best match does not clear the score threshold yields
    /// no record rather than an empty one.
    pub fn correlate(&self, films: &[Film], places: &[Place]) -> Vec<Correlation> {
        let created_at = Utc::now();
        films
            .iter()
            .filter_map(|film| correlate_film(film, places, created_at))
            .collect()
    }
}

fn correlate_film(
    film: &Film,
    places: &[Place],
    created_at: DateTime<Utc>,
) -> Option<Correlation> {
    let genres: Vec<String> = film.genres.iter().map(|g| g.to_lowercase()).collect();
    let relevant = relevant_categories(&genres);

    let mut matched = Vec::new();
    for place in places {
        if !relevant
            .iter()
            .any(|category| place.primary_category.contains(category))
        {
            continue;
        }

        let score = match_score(&genres, place);
        if score > MIN_MATCH_SCORE {
            matched.push(SuggestedLocation {
                place_id: place.place_id.clone(),
                place_name: place.name.clone(),
                place_city: place.city.clone(),
                primary_category: place.primary_category.clone(),
                match_score: score,
                reason: format!(
                    "Matches {} genre",
                    genres.first().map(String::as_str).unwrap_or("general")
                ),
            });
        }
    }

    if matched.is_empty() {
        return None;
    }

    let total_matches = matched.len();
    // Stable sort keeps input order between equal scores
    matched.sort_by(|a, b| {
        b.match_score
            .partial_cmp(&a.match_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matched.truncate(MAX_SUGGESTED_LOCATIONS);

    let average_match_score =
        matched.iter().map(|s| s.match_score).sum::<f64>() / matched.len() as f64;

    Some(Correlation {
        film_id: film.film_id,
        film_title: film.title.clone(),
        film_genres: genres,
        suggested_locations: matched,
        total_matches,
        average_match_score,
        created_at,
    })
}

/// Category prefixes worth examining for a film, from its leading genres
fn relevant_categories(genres_lower: &[String]) -> Vec<&'static str> {
    let mut relevant = Vec::new();
    for genre in genres_lower.iter().take(MAX_PRIMARY_GENRES) {
        if let Some(categories) = categories_for_genre(genre) {
            relevant.extend_from_slice(categories);
        }
    }
    if relevant.is_empty() {
        relevant.extend_from_slice(DEFAULT_GENRE_CATEGORIES);
    }
    relevant
}

/// Scores one film against one place, clamped to [0, 1]
fn match_score(genres_lower: &[String], place: &Place) -> f64 {
    let mut score = 0.0;

    for genre in genres_lower {
        let Some(categories) = categories_for_genre(genre) else {
            continue;
        };
        for &category in categories {
            if category_present(place, category) {
                score += GENRE_HIT_SCORE;
            }
        }
    }

    for (keyword, bonus) in [
        ("cinema", CINEMA_BONUS),
        ("museum", MUSEUM_BONUS),
        ("historic", HISTORIC_BONUS),
    ] {
        if category_present(place, keyword) {
            score += bonus;
        }
    }

    score.clamp(0.0, 1.0)
}

fn category_present(place: &Place, needle: &str) -> bool {
    place.primary_category.contains(needle)
        || place.categories.iter().any(|c| c.contains(needle))
}
