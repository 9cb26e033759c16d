//! Place Search Proxy
//!
//! Location search backed by the Google Places API. The Places API (New)
//! text search is tried first; the legacy Text Search API is the fallback.
//! Failures of either are logged, never surfaced: the caller gets an empty
//! result set with `apiUsed: "none"`.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::config::PlacesConfig;

/// Fields requested from the Places API (New)
const FIELD_MASK: &str =
    "places.displayName,places.formattedAddress,places.location,places.types,places.primaryType";

/// Place types the legacy search is restricted to
const LEGACY_FOOD_TYPES: &str =
    "restaurant|cafe|bakery|supermarket|grocery_or_supermarket|meal_takeaway|food";

/// Search request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaceSearchRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl PlaceSearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Default::default()
        }
    }

    pub fn near(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// Both coordinates, or nothing
    fn location(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

/// A matched place
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceResult {
    pub name: String,
    /// Formatted address
    pub display: String,
    pub lat: f64,
    pub lon: f64,
    pub types: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

/// Which upstream produced the results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiUsed {
    New,
    Legacy,
    None,
}

/// Search response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceSearchResponse {
    pub results: Vec<PlaceResult>,
    pub api_used: ApiUsed,
}

/// Google Places client
pub struct PlacesClient {
    client: Client,
    config: PlacesConfig,
}

impl PlacesClient {
    pub fn new(config: PlacesConfig) -> Result<Self, PlacesError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &PlacesConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        self.api_key().is_some()
    }

    fn api_key(&self) -> Option<&str> {
        self.config.api_key.as_deref().filter(|k| !k.is_empty())
    }

    /// Search for places matching `request.query`
    ///
    /// Only a missing key or an empty query is an error; upstream failures
    /// degrade to an empty `ApiUsed::None` response. The first upstream that
    /// returns any places answers, even if none of them have coordinates.
    pub async fn search(&self, request: &PlaceSearchRequest) -> Result<PlaceSearchResponse, PlacesError> {
        let api_key = self.api_key().ok_or(PlacesError::MissingApiKey)?;

        let query = request.query.as_deref().map(str::trim).unwrap_or_default();
        if query.is_empty() {
            return Err(PlacesError::EmptyQuery);
        }

        let location = request.location();
        tracing::info!(query = %query, location = ?location, "Searching for places");

        match self.search_new(api_key, query, location).await {
            Ok(Some(results)) => {
                tracing::info!(count = results.len(), "Places API (New) found places");
                return Ok(PlaceSearchResponse {
                    results,
                    api_used: ApiUsed::New,
                });
            }
            Ok(None) => tracing::info!("Places API (New) returned no results, trying legacy API"),
            Err(e) => tracing::warn!(error = %e, "Places API (New) failed, trying legacy API"),
        }

        match self.search_legacy(api_key, query, location).await {
            Ok(Some(results)) => {
                tracing::info!(count = results.len(), "Legacy Places API found places");
                return Ok(PlaceSearchResponse {
                    results,
                    api_used: ApiUsed::Legacy,
                });
            }
            Ok(None) => tracing::info!("Legacy Places API returned no results"),
            Err(e) => tracing::error!(error = %e, "Legacy Places API failed"),
        }

        Ok(PlaceSearchResponse {
            results: Vec::new(),
            api_used: ApiUsed::None,
        })
    }

    async fn search_new(
        &self,
        api_key: &str,
        query: &str,
        location: Option<(f64, f64)>,
    ) -> Result<Option<Vec<PlaceResult>>, PlacesError> {
        let url = format!(
            "{}/v1/places:searchText",
            self.config.new_api_base.trim_end_matches('/')
        );

        let mut body = json!({
            "textQuery": query,
            "maxResultCount": self.config.max_results,
        });
        if let Some((latitude, longitude)) = location {
            body["locationBias"] = json!({
                "circle": {
                    "center": { "latitude": latitude, "longitude": longitude },
                    "radius": self.config.radius_meters,
                }
            });
        }
        tracing::debug!(body = %body, "Places API (New) request");

        let response = self
            .client
            .post(&url)
            .header("X-Goog-Api-Key", api_key)
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(status = %status, "Places API (New) response");
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PlacesError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let data: NewSearchResponse = response.json().await?;
        if data.places.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            data.places
                .into_iter()
                .filter_map(NewPlace::into_result)
                .collect(),
        ))
    }

    async fn search_legacy(
        &self,
        api_key: &str,
        query: &str,
        location: Option<(f64, f64)>,
    ) -> Result<Option<Vec<PlaceResult>>, PlacesError> {
        let mut url = format!(
            "{}/maps/api/place/textsearch/json?query={}&type={}&key={}",
            self.config.legacy_api_base.trim_end_matches('/'),
            urlencoding::encode(query),
            urlencoding::encode(LEGACY_FOOD_TYPES),
            urlencoding::encode(api_key),
        );
        if let Some((latitude, longitude)) = location {
            url.push_str(&format!(
                "&location={},{}&radius={}",
                latitude, longitude, self.config.radius_meters
            ));
        }
        tracing::debug!(
            url = %redact(&url, &urlencoding::encode(api_key)),
            "Legacy Places API request"
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        tracing::debug!(status = %status, "Legacy Places API response");

        let data: LegacySearchResponse = response.json().await?;
        if data.status != "OK" {
            tracing::debug!(status = %data.status, "Legacy Places API status not OK");
            return Ok(None);
        }
        if data.results.is_empty() {
            return Ok(None);
        }

        Ok(Some(
            data.results
                .into_iter()
                .take(self.config.max_results)
                .filter_map(LegacyPlace::into_result)
                .collect(),
        ))
    }
}

fn redact(url: &str, secret: &str) -> String {
    if secret.is_empty() {
        url.to_string()
    } else {
        url.replace(secret, "[API_KEY]")
    }
}

// ============================================
// Upstream DTOs
// ============================================

#[derive(Debug, Deserialize)]
struct NewSearchResponse {
    #[serde(default)]
    places: Vec<NewPlace>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewPlace {
    display_name: Option<LocalizedText>,
    formatted_address: Option<String>,
    location: Option<LatLng>,
    #[serde(default)]
    types: Vec<String>,
    primary_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LocalizedText {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl NewPlace {
    /// Places without coordinates are dropped
    fn into_result(self) -> Option<PlaceResult> {
        let location = self.location?;
        let (lat, lon) = non_zero(location.latitude?, location.longitude?)?;

        Some(PlaceResult {
            name: self
                .display_name
                .and_then(|d| d.text)
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Unknown Place".to_string()),
            display: self
                .formatted_address
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| "Address not available".to_string()),
            lat,
            lon,
            types: self.types,
            primary_type: self.primary_type,
            rating: None,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LegacySearchResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    results: Vec<LegacyPlace>,
}

#[derive(Debug, Deserialize)]
struct LegacyPlace {
    #[serde(default)]
    name: String,
    #[serde(default)]
    formatted_address: String,
    geometry: Option<LegacyGeometry>,
    #[serde(default)]
    types: Vec<String>,
    rating: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct LegacyGeometry {
    location: Option<LegacyLatLng>,
}

#[derive(Debug, Deserialize)]
struct LegacyLatLng {
    lat: Option<f64>,
    lng: Option<f64>,
}

impl LegacyPlace {
    fn into_result(self) -> Option<PlaceResult> {
        let location = self.geometry?.location?;
        let (lat, lon) = non_zero(location.lat?, location.lng?)?;

        Some(PlaceResult {
            name: self.name,
            display: self.formatted_address,
            lat,
            lon,
            types: self.types,
            primary_type: None,
            rating: self.rating,
        })
    }
}

/// Zero coordinates are treated as missing
fn non_zero(lat: f64, lon: f64) -> Option<(f64, f64)> {
    (lat != 0.0 && lon != 0.0).then_some((lat, lon))
}

// ============================================
// Errors
// ============================================

/// Errors from the place search proxy
#[derive(Error, Debug)]
pub enum PlacesError {
    #[error("Google Places API key not configured")]
    MissingApiKey,

    #[error("Missing or empty search query")]
    EmptyQuery,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Query,
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::Value;
    use std::collections::HashMap;

    async fn spawn_mock(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client_for(base: &str) -> PlacesClient {
        PlacesClient::new(PlacesConfig {
            api_key: Some("secret-key".to_string()),
            new_api_base: base.to_string(),
            legacy_api_base: base.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    fn new_api_route(response: Value) -> Router {
        Router::new().route(
            "/v1/places:searchText",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let response = response.clone();
                async move {
                    assert_eq!(headers["x-goog-api-key"], "secret-key");
                    assert_eq!(body["maxResultCount"], 6);
                    Json(response)
                }
            }),
        )
    }

    fn legacy_route(router: Router, response: Value) -> Router {
        router.route(
            "/maps/api/place/textsearch/json",
            get(move |Query(q): Query<HashMap<String, String>>| {
                let response = response.clone();
                async move {
                    assert_eq!(q["key"], "secret-key");
                    assert!(q["type"].contains("restaurant"));
                    Json(response)
                }
            }),
        )
    }

    #[tokio::test]
    async fn test_missing_key() {
        let client = PlacesClient::new(PlacesConfig::default()).unwrap();
        let err = client.search(&PlaceSearchRequest::new("pizza")).await.unwrap_err();
        assert!(matches!(err, PlacesError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_empty_query() {
        let client = client_for("http://127.0.0.1:1");
        let err = client.search(&PlaceSearchRequest::new("   ")).await.unwrap_err();
        assert!(matches!(err, PlacesError::EmptyQuery));

        let err = client.search(&PlaceSearchRequest::default()).await.unwrap_err();
        assert!(matches!(err, PlacesError::EmptyQuery));
    }

    #[tokio::test]
    async fn test_new_api_results_mapped() {
        let router = new_api_route(json!({
            "places": [
                {
                    "displayName": {"text": "Joe's Pizza"},
                    "formattedAddress": "7 Carmine St, New York",
                    "location": {"latitude": 40.73, "longitude": -74.0},
                    "types": ["restaurant"],
                    "primaryType": "pizza_restaurant"
                },
                {
                    "location": {"latitude": 40.7, "longitude": -73.9}
                },
                {
                    "displayName": {"text": "Nowhere"}
                }
            ]
        }));
        let client = client_for(&spawn_mock(router).await);

        let response = client
            .search(&PlaceSearchRequest::new("pizza").near(40.7, -74.0))
            .await
            .unwrap();

        assert_eq!(response.api_used, ApiUsed::New);
        assert_eq!(response.results.len(), 2);
        assert_eq!(response.results[0].name, "Joe's Pizza");
        assert_eq!(response.results[0].primary_type.as_deref(), Some("pizza_restaurant"));
        assert_eq!(response.results[1].name, "Unknown Place");
        assert_eq!(response.results[1].display, "Address not available");
    }

    #[tokio::test]
    async fn test_location_bias_sent_only_with_both_coordinates() {
        let router = Router::new().route(
            "/v1/places:searchText",
            post(|Json(body): Json<Value>| async move {
                let biased = body.get("locationBias").is_some();
                if biased {
                    assert_eq!(body["locationBias"]["circle"]["radius"], 50_000);
                }
                let name = if biased { "biased" } else { "unbiased" };
                Json(json!({
                    "places": [{
                        "displayName": {"text": name},
                        "location": {"latitude": 1.0, "longitude": 2.0}
                    }]
                }))
            }),
        );
        let client = client_for(&spawn_mock(router).await);

        let half = PlaceSearchRequest {
            query: Some("cafe".to_string()),
            latitude: Some(10.0),
            longitude: None,
        };
        let response = client.search(&half).await.unwrap();
        assert_eq!(response.results[0].name, "unbiased");

        let full = PlaceSearchRequest::new("cafe").near(10.0, 20.0);
        let response = client.search(&full).await.unwrap();
        assert_eq!(response.results[0].name, "biased");
    }

    #[tokio::test]
    async fn test_falls_back_to_legacy() {
        let router = Router::new().route(
            "/v1/places:searchText",
            post(|| async { (StatusCode::FORBIDDEN, "API not enabled") }),
        );
        let router = legacy_route(
            router,
            json!({
                "status": "OK",
                "results": [{
                    "name": "Corner Bakery",
                    "formatted_address": "1 Main St",
                    "geometry": {"location": {"lat": 51.5, "lng": -0.12}},
                    "types": ["bakery"],
                    "rating": 4.5
                }]
            }),
        );
        let client = client_for(&spawn_mock(router).await);

        let response = client.search(&PlaceSearchRequest::new("bread")).await.unwrap();
        assert_eq!(response.api_used, ApiUsed::Legacy);
        assert_eq!(response.results[0].name, "Corner Bakery");
        assert_eq!(response.results[0].rating, Some(4.5));
    }

    #[tokio::test]
    async fn test_legacy_truncated_to_max_results() {
        let places: Vec<Value> = (0..10)
            .map(|i| {
                json!({
                    "name": format!("Place {}", i),
                    "formatted_address": "Somewhere",
                    "geometry": {"location": {"lat": 1.0 + i as f64, "lng": 2.0}}
                })
            })
            .collect();
        let router = legacy_route(
            new_api_route(json!({"places": []})),
            json!({"status": "OK", "results": places}),
        );
        let client = client_for(&spawn_mock(router).await);

        let response = client.search(&PlaceSearchRequest::new("food")).await.unwrap();
        assert_eq!(response.api_used, ApiUsed::Legacy);
        assert_eq!(response.results.len(), 6);
    }

    #[tokio::test]
    async fn test_both_empty_returns_none() {
        let router = legacy_route(
            new_api_route(json!({})),
            json!({"status": "ZERO_RESULTS", "results": []}),
        );
        let client = client_for(&spawn_mock(router).await);

        let response = client.search(&PlaceSearchRequest::new("xyz")).await.unwrap();
        assert_eq!(response.api_used, ApiUsed::None);
        assert!(response.results.is_empty());
    }

    #[tokio::test]
    async fn test_places_without_coordinates_stop_fallback() {
        let router = legacy_route(
            new_api_route(json!({"places": [{"displayName": {"text": "Nowhere"}}]})),
            json!({
                "status": "OK",
                "results": [{
                    "name": "Corner Bakery",
                    "geometry": {"location": {"lat": 51.5, "lng": -0.12}}
                }]
            }),
        );
        let client = client_for(&spawn_mock(router).await);

        let response = client.search(&PlaceSearchRequest::new("bread")).await.unwrap();
        assert_eq!(response.api_used, ApiUsed::New);
        assert!(response.results.is_empty());
    }

    #[tokio::test]
    async fn test_legacy_without_coordinates_still_legacy() {
        let router = legacy_route(
            new_api_route(json!({"places": []})),
            json!({"status": "OK", "results": [{"name": "Nowhere"}]}),
        );
        let client = client_for(&spawn_mock(router).await);

        let response = client.search(&PlaceSearchRequest::new("bread")).await.unwrap();
        assert_eq!(response.api_used, ApiUsed::Legacy);
        assert!(response.results.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_upstream_returns_none() {
        let client = client_for("http://127.0.0.1:1");
        let response = client.search(&PlaceSearchRequest::new("xyz")).await.unwrap();
        assert_eq!(response.api_used, ApiUsed::None);
    }

    #[test]
    fn test_response_serialization() {
        let response = PlaceSearchResponse {
            results: vec![PlaceResult {
                name: "A".to_string(),
                display: "B".to_string(),
                lat: 1.0,
                lon: 2.0,
                types: vec![],
                primary_type: None,
                rating: None,
            }],
            api_used: ApiUsed::Legacy,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["apiUsed"], "legacy");
        assert!(json["results"][0].get("primaryType").is_none());
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact("a?key=abc&x=1", "abc"), "a?key=[API_KEY]&x=1");
    }
}
