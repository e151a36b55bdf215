use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::error::EtlResult;
use crate::models::{City, GeoFeature, Place};
use crate::services::sources::{check_response, FetchBatch, PlaceSource};

const SOURCE_NAME: &str = "geoapify";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Geoapify places client
///
/// Uses the geocoding API to resolve a country's major cities and the
/// places API for a category-filtered search around each city center.
pub struct GeoapifyClient {
    http_client: reqwest::Client,
    api_key: String,
    api_url: String,
}

impl GeoapifyClient {
    pub fn new(api_key: String, api_url: String) -> EtlResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(GeoapifyClient {
            http_client,
            api_key,
            api_url,
        })
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> EtlResult<Value> {
        let url = format!("{}{}", self.api_url, path);
        let response = self
            .http_client
            .get(&url)
            .query(query)
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await?;

        check_response(SOURCE_NAME, response).await
    }
}

/// Pulls the features out of a geocoding envelope and normalizes them
/// into cities, dropping anything without a name or coordinates
fn parse_city_features(envelope: &Value, country_code: &str) -> Vec<City> {
    let features = envelope
        .get("features")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut cities = Vec::new();
    for feature in features {
        let parsed = serde_json::from_value::<GeoFeature>(feature)
            .map_err(|e| e.into())
            .and_then(|f| City::from_feature(f.properties, country_code));
        match parsed {
            Ok(city) => cities.push(city),
            Err(e) => tracing::debug!(error = %e, "Dropping unusable city feature"),
        }
    }

    cities
}

/// Normalizes a places envelope against its anchor city
fn parse_place_features(envelope: &Value, city: &City) -> FetchBatch<Place> {
    let features = envelope
        .get("features")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let fetched_at = Utc::now();
    let mut batch = FetchBatch::default();
    for feature in features {
        let parsed = serde_json::from_value::<GeoFeature>(feature)
            .map_err(|e| e.into())
            .and_then(|f| Place::from_feature(f.properties, city, fetched_at));
        match parsed {
            Ok(place) => batch.records.push(place),
            Err(e) => {
                tracing::warn!(city = %city.name, error = %e, "Skipping invalid place record");
                batch.skipped += 1;
            }
        }
    }

    batch
}

#[async_trait]
impl PlaceSource for GeoapifyClient {
    async fn list_major_cities(&self, country_code: &str, limit: usize) -> EtlResult<Vec<City>> {
        let envelope = self
            .get_json(
                "/v1/geocode/search",
                &[
                    ("text", country_code.to_string()),
                    ("type", "city".to_string()),
                    ("filter", format!("countrycode:{}", country_code.to_lowercase())),
                    ("limit", limit.to_string()),
                    ("format", "geojson".to_string()),
                ],
            )
            .await?;

        let cities = parse_city_features(&envelope, country_code);
        tracing::info!(country_code, found = cities.len(), "Listed major cities");

        Ok(cities)
    }

    async fn search_places(
        &self,
        city: &City,
        categories: &[String],
        radius_m: u32,
        limit: usize,
    ) -> EtlResult<FetchBatch<Place>> {
        let envelope = self
            .get_json(
                "/v2/places",
                &[
                    ("categories", categories.join(",")),
                    (
                        "filter",
                        format!("circle:{},{},{}", city.longitude, city.latitude, radius_m),
                    ),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        let batch = parse_place_features(&envelope, city);
        tracing::info!(
            city = %city.name,
            found = batch.records.len(),
            skipped = batch.skipped,
            "Searched places around city center"
        );

        Ok(batch)
    }

    fn name(&self) -> &'static str {
        SOURCE_NAME
    }
}

impl std::fmt::Debug for GeoapifyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoapifyClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}
