use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EtlError, EtlResult};

/// Fetch seed for place search; persisted for traceability
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct City {
    pub name: String,
    pub country_code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub population: i64,
}

impl City {
    /// Builds a city from a geocoding feature
    ///
    /// The geocoder occasionally returns features without coordinates;
    /// those cannot seed a radius search and are skipped.
    pub fn from_feature(props: GeoProperties, country_code: &str) -> EtlResult<Self> {
        let name = props
            .city
            .filter(|n| !n.trim().is_empty())
            .or_else(|| props.name.filter(|n| !n.trim().is_empty()))
            .ok_or_else(|| EtlError::InvalidRecord("city feature missing name".to_string()))?;
        let (latitude, longitude) = match (props.lat, props.lon) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => {
                return Err(EtlError::InvalidRecord(format!(
                    "city {} missing coordinates",
                    name
                )))
            }
        };

        Ok(City {
            name,
            country_code: props
                .country_code
                .unwrap_or_else(|| country_code.to_string())
                .to_uppercase(),
            latitude,
            longitude,
            population: props.population.unwrap_or(0),
        })
    }

    /// Upsert key in the cities collection
    pub fn key(&self) -> String {
        format!("{}:{}", self.country_code, self.name.to_lowercase())
    }
}

/// Canonical point-of-interest record
///
/// `categories` is the provider's hierarchical list (e.g.
/// "tourism.sights.museum"); `primary_category` is its first entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Place {
    pub place_id: String,
    pub name: String,
    pub city: String,
    pub country_code: String,
    pub categories: Vec<String>,
    pub primary_category: String,
    pub latitude: f64,
    pub longitude: f64,
    pub distance_from_city_center_m: f64,
    pub fetched_at: DateTime<Utc>,
}

impl Place {
    /// Builds a canonical place from a places feature, anchored to the city
    /// whose search produced it
    pub fn from_feature(props: GeoProperties, city: &City, fetched_at: DateTime<Utc>) -> EtlResult<Self> {
        let place_id = props
            .place_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| EtlError::InvalidRecord("place feature missing place_id".to_string()))?;

        let primary_category = props.categories.first().cloned().unwrap_or_default();

        Ok(Place {
            place_id,
            name: props.name.unwrap_or_else(|| "Unnamed".to_string()),
            city: props.city.unwrap_or_else(|| city.name.clone()),
            country_code: props
                .country_code
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| city.country_code.clone()),
            categories: props.categories,
            primary_category,
            latitude: props.lat.unwrap_or(city.latitude),
            longitude: props.lon.unwrap_or(city.longitude),
            distance_from_city_center_m: props.distance.unwrap_or(0.0),
            fetched_at,
        })
    }

    /// Upsert key in the places collection
    pub fn key(&self) -> String {
        self.place_id.clone()
    }
}

// ============================================================================
// Places API wire types (GeoJSON-shaped)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct GeoFeature {
    #[serde(default)]
    pub properties: GeoProperties,
}

/// Feature properties; the places API inlines coordinates here, so the
/// geometry member is ignored
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoProperties {
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub population: Option<i64>,
}
