use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;

use crate::model::Coordinates;

use super::{ProviderError, execute_json_request};

const SEARCH_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";

#[derive(Debug, Serialize)]
struct SearchQuery<'a> {
    q: &'a str,
    format: &'a str,
    limit: u8,
}

pub fn fetch_search(client: &Client, destination: &str) -> Result<Value, ProviderError> {
    let query = SearchQuery {
        q: destination,
        format: "json",
        limit: 1,
    };

    execute_json_request(client.get(SEARCH_ENDPOINT).query(&query))
}

/// First search hit. Nominatim sends `lat`/`lon` as strings; numbers are
/// accepted too so cached `{lat, lon}` records go through the same path.
pub fn parse_search_response(payload: &Value, destination: &str) -> Result<Coordinates, ProviderError> {
    let first = match payload {
        Value::Array(results) => results.first(),
        Value::Object(_) => Some(payload),
        _ => None,
    }
    .ok_or_else(|| ProviderError::NotFound(format!("no results for destination '{destination}'")))?;

    let lat = coordinate_field(first, "lat")?;
    let lon = coordinate_field(first, "lon")?;
    Ok(Coordinates::new(lat, lon))
}

fn coordinate_field(item: &Value, key: &str) -> Result<f64, ProviderError> {
    let value = match item.get(key) {
        Some(Value::String(raw)) => raw.trim().parse::<f64>().ok(),
        Some(Value::Number(number)) => number.as_f64(),
        _ => None,
    };
    value
        .filter(|value| value.is_finite())
        .ok_or_else(|| ProviderError::InvalidResponse(format!("geocode payload: missing {key}")))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn nominatim_parses_string_coordinates_of_first_hit() {
        let payload = json!([
            {"place_id": 1, "lat": "41.3828939", "lon": "2.1774322", "display_name": "Barcelona"},
            {"place_id": 2, "lat": "10.0", "lon": "10.0"}
        ]);

        let coords = parse_search_response(&payload, "Barcelona").expect("coords");
        assert_eq!(coords, Coordinates::new(41.3828939, 2.1774322));
    }

    #[test]
    fn nominatim_accepts_cached_numeric_record() {
        let coords = parse_search_response(&json!({"lat": 52.52, "lon": 13.405}), "Berlin")
            .expect("coords");
        assert_eq!(coords, Coordinates::new(52.52, 13.405));
    }

    #[test]
    fn nominatim_empty_result_is_not_found() {
        let error = parse_search_response(&json!([]), "Atlantis").expect_err("must fail");
        assert!(matches!(error, ProviderError::NotFound(message) if message.contains("Atlantis")));
    }

    #[test]
    fn nominatim_rejects_hit_without_coordinates() {
        let error = parse_search_response(&json!([{"lat": "x"}]), "Nowhere").expect_err("must fail");
        assert_eq!(
            error,
            ProviderError::InvalidResponse("geocode payload: missing lat".to_string())
        );
    }
}
