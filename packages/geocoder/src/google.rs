//! Google Geocoding client behind a key-injecting proxy.
//!
//! The proxy forwards `GET /api/geocode?address=...` to Google and returns
//! the Geocoding API JSON unmodified, so no API key ever reaches this
//! process. Set `GEOCODE_PROXY_URL` to point at a proxy other than the one
//! in the service TOML.
//!
//! See <https://developers.google.com/maps/documentation/geocoding/requests-geocoding>

use async_trait::async_trait;
use coord_map_geocoder_models::{AddressDetails, Coordinate, GeocodeMatch};

use crate::{GeocodeError, GeocodeProvider};

/// Environment variable overriding the proxy base URL.
pub const PROXY_URL_ENV: &str = "GEOCODE_PROXY_URL";

/// Google Geocoding through a pass-through proxy.
#[derive(Debug, Clone)]
pub struct GoogleProxyProvider {
    client: reqwest::Client,
    name: String,
    base_url: String,
    concurrent_requests: usize,
}

impl GoogleProxyProvider {
    /// Creates a client for the proxy at `base_url`, unless
    /// `GEOCODE_PROXY_URL` is set and non-empty.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        name: impl Into<String>,
        base_url: &str,
        concurrent_requests: usize,
    ) -> Self {
        let base_url = std::env::var(PROXY_URL_ENV)
            .ok()
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| base_url.to_string());

        Self {
            client,
            name: name.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            concurrent_requests: concurrent_requests.max(1),
        }
    }
}

#[async_trait]
impl GeocodeProvider for GoogleProxyProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_in_flight(&self) -> usize {
        self.concurrent_requests
    }

    async fn query(&self, text: &str) -> Result<Vec<GeocodeMatch>, GeocodeError> {
        let url = format!("{}/api/geocode", self.base_url);

        log::debug!("{}: searching {text:?}", self.name);

        let resp = self
            .client
            .get(&url)
            .query(&[("address", text)])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }
        if !resp.status().is_success() {
            return Err(GeocodeError::Status {
                provider: self.name.clone(),
                status: resp.status().as_u16(),
            });
        }

        let body: serde_json::Value = resp.json().await?;
        parse_google(&body, &self.name)
    }
}

/// Parses a Geocoding API response body.
fn parse_google(body: &serde_json::Value, provider: &str) -> Result<Vec<GeocodeMatch>, GeocodeError> {
    match body["status"].as_str() {
        Some("OK") => {}
        Some("ZERO_RESULTS") => return Ok(Vec::new()),
        Some("OVER_QUERY_LIMIT") => return Err(GeocodeError::RateLimited),
        status => {
            return Err(GeocodeError::Parse {
                message: format!(
                    "Google status {}: {}",
                    status.unwrap_or("missing"),
                    body["error_message"].as_str().unwrap_or("no error message")
                ),
            });
        }
    }

    let Some(results) = body["results"].as_array() else {
        return Ok(Vec::new());
    };

    results.iter().map(|r| parse_result(r, provider)).collect()
}

fn parse_result(result: &serde_json::Value, provider: &str) -> Result<GeocodeMatch, GeocodeError> {
    let location = &result["geometry"]["location"];
    let (Some(lat), Some(lng)) = (location["lat"].as_f64(), location["lng"].as_f64()) else {
        return Err(GeocodeError::Parse {
            message: "Missing geometry.location in Google result".to_string(),
        });
    };

    let has_type = |t: &str| {
        result["types"]
            .as_array()
            .is_some_and(|types| types.iter().any(|v| v.as_str() == Some(t)))
    };
    let raw_class = if has_type("street_address") || has_type("premise") || has_type("subpremise") {
        "building"
    } else if has_type("route") {
        "highway"
    } else {
        "place"
    };

    let location_type = result["geometry"]["location_type"].as_str();
    let importance = match location_type {
        Some("ROOFTOP") => Some(1.0),
        Some("RANGE_INTERPOLATED") => Some(0.8),
        Some("GEOMETRIC_CENTER") => Some(0.6),
        Some("APPROXIMATE") => Some(0.4),
        _ => None,
    };

    let details = parse_components(&result["address_components"]);

    Ok(GeocodeMatch {
        coordinate: Coordinate::new(lng, lat),
        display_address: result["formatted_address"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        provider_name: provider.to_string(),
        raw_class: Some(raw_class.to_string()),
        raw_type: location_type.map(String::from),
        has_house_number: Some(details.house_number.is_some()),
        importance,
        details,
    })
}

fn parse_components(components: &serde_json::Value) -> AddressDetails {
    let mut details = AddressDetails::default();
    let Some(components) = components.as_array() else {
        return details;
    };

    let find = |wanted: &str| {
        components.iter().find_map(|c| {
            let matches = c["types"]
                .as_array()
                .is_some_and(|types| types.iter().any(|t| t.as_str() == Some(wanted)));
            if matches {
                c["long_name"].as_str().map(String::from)
            } else {
                None
            }
        })
    };

    details.house_number = find("street_number");
    details.road = find("route");
    details.neighbourhood = find("neighborhood");
    details.city_district = find("administrative_area_level_2").or_else(|| find("sublocality_level_1"));
    details.city = find("locality").or_else(|| find("administrative_area_level_1"));
    details
}
