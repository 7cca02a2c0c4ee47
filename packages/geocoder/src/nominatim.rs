//! Nominatim / OpenStreetMap geocoder client.
//!
//! The public instance allows **1 request per second**; the service TOML
//! sets `rate_limit_ms` accordingly and the resolver honours it through
//! [`GeocodeProvider::min_delay_ms`].
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/> and
//! <https://nominatim.org/release-docs/develop/api/Reverse/>.

use async_trait::async_trait;
use coord_map_geocoder_models::{AddressDetails, Coordinate, GeocodeMatch};

use crate::service_registry::NominatimConfig;
use crate::{GeocodeError, GeocodeProvider};

/// Nominatim search and reverse client.
#[derive(Debug, Clone)]
pub struct NominatimProvider {
    client: reqwest::Client,
    name: String,
    base_url: String,
    reverse_url: String,
    country_codes: String,
    accept_language: String,
    limit: usize,
    rate_limit_ms: u64,
    concurrent_requests: usize,
}

impl NominatimProvider {
    /// Creates a client from a service configuration.
    ///
    /// The `User-Agent` required by the usage policy is taken from
    /// `client`.
    #[must_use]
    pub fn new(client: reqwest::Client, name: impl Into<String>, config: &NominatimConfig) -> Self {
        Self {
            client,
            name: name.into(),
            base_url: config.base_url.clone(),
            reverse_url: config.reverse_url.clone(),
            country_codes: config.country_codes.clone(),
            accept_language: config.accept_language.clone(),
            limit: config.limit.max(1),
            rate_limit_ms: config.rate_limit_ms,
            concurrent_requests: config.concurrent_requests.max(1),
        }
    }

    /// Looks up a display name for a position.
    ///
    /// Returns `None` when Nominatim has nothing at that position.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the HTTP request or response parsing fails.
    pub async fn reverse(&self, lat: f64, lng: f64) -> Result<Option<String>, GeocodeError> {
        let lat = lat.to_string();
        let lon = lng.to_string();

        let resp = self
            .client
            .get(&self.reverse_url)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("format", "jsonv2"),
                ("accept-language", self.accept_language.as_str()),
            ])
            .send()
            .await?;

        self.check_status(&resp)?;

        let body: serde_json::Value = resp.json().await?;
        Ok(parse_reverse(&body))
    }

    fn check_status(&self, resp: &reqwest::Response) -> Result<(), GeocodeError> {
        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }
        if !resp.status().is_success() {
            return Err(GeocodeError::Status {
                provider: self.name.clone(),
                status: resp.status().as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl GeocodeProvider for NominatimProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_in_flight(&self) -> usize {
        self.concurrent_requests
    }

    fn min_delay_ms(&self) -> u64 {
        self.rate_limit_ms
    }

    async fn query(&self, text: &str) -> Result<Vec<GeocodeMatch>, GeocodeError> {
        let limit = self.limit.to_string();
        let mut params = vec![
            ("q", text),
            ("format", "jsonv2"),
            ("addressdetails", "1"),
            ("limit", limit.as_str()),
            ("accept-language", self.accept_language.as_str()),
        ];
        if !self.country_codes.is_empty() {
            params.push(("countrycodes", self.country_codes.as_str()));
        }

        log::debug!("{}: searching {text:?}", self.name);

        let resp = self.client.get(&self.base_url).query(&params).send().await?;
        self.check_status(&resp)?;

        let body: serde_json::Value = resp.json().await?;
        parse_search(&body, &self.name)
    }
}

/// Parses a `jsonv2` search response.
fn parse_search(body: &serde_json::Value, provider: &str) -> Result<Vec<GeocodeMatch>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    results.iter().map(|r| parse_place(r, provider)).collect()
}

fn parse_place(place: &serde_json::Value, provider: &str) -> Result<GeocodeMatch, GeocodeError> {
    let lat = coordinate_field(place, "lat")?;
    let lon = coordinate_field(place, "lon")?;

    let text = |key: &str| place[key].as_str().map(String::from);
    let address = &place["address"];
    let first_of = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| address[*k].as_str())
            .map(String::from)
    };

    let details = AddressDetails {
        house_number: first_of(&["house_number"]),
        road: first_of(&["road"]),
        neighbourhood: first_of(&["neighbourhood", "suburb", "quarter"]),
        city_district: first_of(&["city_district", "district"]),
        city: first_of(&["city", "town", "county"]),
    };

    Ok(GeocodeMatch {
        coordinate: Coordinate::new(lon, lat),
        display_address: text("display_name").unwrap_or_default(),
        provider_name: provider.to_string(),
        // jsonv2 calls it `category`; the older formats call it `class`.
        raw_class: text("category").or_else(|| text("class")),
        raw_type: text("type"),
        has_house_number: Some(details.house_number.is_some()),
        importance: place["importance"].as_f64(),
        details,
    })
}

fn coordinate_field(place: &serde_json::Value, key: &str) -> Result<f64, GeocodeError> {
    place[key]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .or_else(|| place[key].as_f64())
        .ok_or_else(|| GeocodeError::Parse {
            message: format!("Missing {key} in Nominatim response"),
        })
}

/// Parses a reverse response: `display_name`, falling back to `name`.
fn parse_reverse(body: &serde_json::Value) -> Option<String> {
    if body.get("error").is_some() {
        return None;
    }
    body["display_name"]
        .as_str()
        .or_else(|| body["name"].as_str())
        .filter(|s| !s.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use coord_map_geocoder_models::Precision;

    use super::*;

    #[test]
    fn parses_nominatim_result() {
        let body = serde_json::json!([{
            "lat": "24.9683",
            "lon": "121.5412",
            "category": "building",
            "type": "house",
            "importance": 0.31,
            "display_name": "100, 北宜路二段, 新店區, 新北市, 231, 臺灣",
            "address": {
                "house_number": "100",
                "road": "北宜路二段",
                "suburb": "新店區",
                "city": "新北市",
                "country": "臺灣"
            }
        }]);
        let results = parse_search(&body, "nominatim").unwrap();
        assert_eq!(results.len(), 1);

        let m = &results[0];
        assert!((m.coordinate.latitude - 24.9683).abs() < 1e-6);
        assert!((m.coordinate.longitude - 121.5412).abs() < 1e-6);
        assert_eq!(m.raw_class.as_deref(), Some("building"));
        assert_eq!(m.raw_type.as_deref(), Some("house"));
        assert_eq!(m.has_house_number, Some(true));
        assert_eq!(m.details.road.as_deref(), Some("北宜路二段"));
        assert_eq!(m.details.neighbourhood.as_deref(), Some("新店區"));
        assert_eq!(m.provider_name, "nominatim");
        assert_eq!(m.precision(), Precision::HouseNumber);
    }

    #[test]
    fn accepts_legacy_class_field() {
        let body = serde_json::json!([{
            "lat": "25.0",
            "lon": "121.5",
            "class": "highway",
            "type": "secondary",
            "display_name": "北宜路二段"
        }]);
        let results = parse_search(&body, "nominatim").unwrap();
        assert_eq!(results[0].raw_class.as_deref(), Some("highway"));
        assert_eq!(results[0].has_house_number, Some(false));
        assert_eq!(results[0].importance, None);
    }

    #[test]
    fn parses_nominatim_empty() {
        let body = serde_json::json!([]);
        assert!(parse_search(&body, "nominatim").unwrap().is_empty());
    }

    #[test]
    fn rejects_non_array() {
        let body = serde_json::json!({"error": "bad request"});
        assert!(matches!(
            parse_search(&body, "nominatim"),
            Err(GeocodeError::Parse { .. })
        ));
    }

    #[test]
    fn rejects_missing_coordinates() {
        let body = serde_json::json!([{ "display_name": "nowhere" }]);
        assert!(parse_search(&body, "nominatim").is_err());
    }

    #[test]
    fn reverse_prefers_display_name() {
        let body = serde_json::json!({
            "display_name": "台北101, 信義路五段, 信義區, 臺北市, 臺灣",
            "name": "台北101"
        });
        assert_eq!(
            parse_reverse(&body).as_deref(),
            Some("台北101, 信義路五段, 信義區, 臺北市, 臺灣")
        );

        let body = serde_json::json!({ "name": "台北101" });
        assert_eq!(parse_reverse(&body).as_deref(), Some("台北101"));

        let body = serde_json::json!({ "error": "Unable to geocode" });
        assert_eq!(parse_reverse(&body), None);
    }
}
