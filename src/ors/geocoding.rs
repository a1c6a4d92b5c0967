#![forbid(unsafe_code)]

use log::{debug, error};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::ors::transport::HTTP_BAD_GATEWAY;
use crate::ors::OrsGateway;
use crate::utils::errors::PlannerError;

// ***************************************************************************
//                                Constants
// ***************************************************************************
pub const MAX_GEOCODE_RESULTS : usize = 5;
pub const MIN_QUERY_CHARS : usize = 2;
const SEARCH_PATH : &str = "/geocode/search";

// ***************************************************************************
//                          Provider Response Shape
// ***************************************************************************
// Every level is optional so that one odd feature cannot fail the whole
// response; unusable features are filtered out below.
#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Default, Deserialize)]
struct Feature {
    #[serde(default)]
    geometry: Option<Geometry>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct Geometry {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    coordinates: Vec<Value>,
}

// ---------------------------------------------------------------------------
// GeocodeMatch:
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeMatch {
    pub label: String,
    pub lat: f64,
    pub lon: f64,
}

// ***************************************************************************
//                            Geocoding Gateway
// ***************************************************************************
impl OrsGateway {
    // ---------------------------------------------------------------------------
    // geocode:
    // ---------------------------------------------------------------------------
    /** Resolve free text into at most five labelled points, in provider order. */
    pub async fn geocode(&self, text: &str) -> Result<Vec<GeocodeMatch>, PlannerError> {
        if text.chars().count() < MIN_QUERY_CHARS {
            return Err(PlannerError::validation("q", "q must be at least 2 characters long"));
        }

        let query = vec![("text", text.to_string()), ("size", MAX_GEOCODE_RESULTS.to_string())];
        let reply = self.transport.get(SEARCH_PATH, query, self.geocode_timeout).await?;

        if !reply.is_success() {
            let msg = format!("Geocode error: {}", reply.body);
            error!("{}", msg);
            return Err(PlannerError::upstream(reply.status, msg));
        }

        let response: SearchResponse = serde_json::from_str(&reply.body).map_err(|e| {
            let msg = format!("Geocode error: unparseable response: {}", e);
            error!("{}", msg);
            PlannerError::upstream(HTTP_BAD_GATEWAY, msg)
        })?;

        let total = response.features.len();
        let matches: Vec<GeocodeMatch> = response.features
            .into_iter()
            .filter_map(to_match)
            .take(MAX_GEOCODE_RESULTS)
            .collect();
        debug!("Geocode '{}' kept {} of {} features.", text, matches.len(), total);
        Ok(matches)
    }
}

// ---------------------------------------------------------------------------
// to_match:
// ---------------------------------------------------------------------------
/** Convert one provider feature, or None if it is not a labelled point.
 * Provider coordinates are (lon, lat).
 */
fn to_match(feature: Feature) -> Option<GeocodeMatch> {
    let geometry = feature.geometry?;
    if geometry.kind != "Point" {
        return None;
    }
    let lon = geometry.coordinates.first()?.as_f64()?;
    let lat = geometry.coordinates.get(1)?.as_f64()?;

    let properties = feature.properties?;
    let label = ["label", "name"]
        .iter()
        .filter_map(|k| properties.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())?;

    Some(GeocodeMatch {label: label.to_string(), lat, lon})
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use serde_json::json;

    use crate::ors::transport::test_support::StubTransport;

    fn point(lon: f64, lat: f64, properties: Value) -> Value {
        json!({
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [lon, lat]},
            "properties": properties
        })
    }

    fn collection(features: Vec<Value>) -> Value {
        json!({"type": "FeatureCollection", "features": features})
    }

    async fn geocode_with(stub: &Arc<StubTransport>, text: &str) -> Result<Vec<GeocodeMatch>, PlannerError> {
        OrsGateway::new(stub.clone()).geocode(text).await
    }

    #[tokio::test]
    async fn point_axes_are_swapped() {
        let body = collection(vec![point(37.6173, 55.7558, json!({"label": "Moscow, Russia"}))]);
        let stub = Arc::new(StubTransport::replying(200, body));
        let matches = geocode_with(&stub, "Moscow").await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].label, "Moscow, Russia");
        assert!((matches[0].lat - 55.7558).abs() < 1e-9);
        assert!((matches[0].lon - 37.6173).abs() < 1e-9);
    }

    #[tokio::test]
    async fn request_carries_text_and_size() {
        let stub = Arc::new(StubTransport::replying(200, collection(vec![])));
        geocode_with(&stub, "Eiffel").await.unwrap();

        let calls = stub.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, "GET");
        assert_eq!(calls[0].path, "/geocode/search");
        assert_eq!(calls[0].query, vec![("text", "Eiffel".to_string()), ("size", "5".to_string())]);
        assert_eq!(calls[0].timeout, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn unusable_features_are_skipped() {
        let body = collection(vec![
            json!({"geometry": {"type": "Polygon", "coordinates": [[[0.0, 0.0]]]}, "properties": {"label": "Area"}}),
            point(1.0, 2.0, json!({})),
            point(3.0, 4.0, json!({"name": "Named Only"})),
            json!({"properties": {"label": "No geometry"}}),
            point(5.0, 6.0, json!({"label": "", "name": "Fallback"})),
            json!({"geometry": {"type": "Point", "coordinates": [7.0]}, "properties": {"label": "Short"}}),
            point(8.0, 9.0, json!({"label": "Kept"})),
        ]);
        let stub = Arc::new(StubTransport::replying(200, body));
        let matches = geocode_with(&stub, "somewhere").await.unwrap();
        let labels: Vec<&str> = matches.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, ["Named Only", "Fallback", "Kept"]);
        assert_eq!(matches[0], GeocodeMatch {label: "Named Only".to_string(), lat: 4.0, lon: 3.0});
    }

    #[tokio::test]
    async fn results_are_capped_in_order() {
        let features = (0..8)
            .map(|i| point(i as f64, i as f64, json!({"label": format!("Place {}", i)})))
            .collect();
        let stub = Arc::new(StubTransport::replying(200, collection(features)));
        let matches = geocode_with(&stub, "place").await.unwrap();
        let labels: Vec<&str> = matches.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, ["Place 0", "Place 1", "Place 2", "Place 3", "Place 4"]);
    }

    #[tokio::test]
    async fn missing_features_is_empty() {
        let stub = Arc::new(StubTransport::replying(200, json!({"type": "FeatureCollection"})));
        assert!(geocode_with(&stub, "nowhere").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_status_propagates() {
        let stub = Arc::new(StubTransport::replying_raw(429, "Rate limit exceeded"));
        let err = geocode_with(&stub, "Paris").await.unwrap_err();
        assert_eq!(err, PlannerError::upstream(429, "Geocode error: Rate limit exceeded".to_string()));
    }

    #[tokio::test]
    async fn unparseable_success_is_bad_gateway() {
        let stub = Arc::new(StubTransport::replying_raw(200, "not json"));
        let err = geocode_with(&stub, "Paris").await.unwrap_err();
        assert!(matches!(err, PlannerError::Upstream { status: 502, .. }));
    }

    #[tokio::test]
    async fn short_query_never_reaches_provider() {
        let stub = Arc::new(StubTransport::replying(200, collection(vec![])));
        for q in ["", "a", "é"] {
            let err = geocode_with(&stub, q).await.unwrap_err();
            assert!(matches!(err, PlannerError::Validation { ref field, .. } if field == "q"));
        }
        assert!(geocode_with(&stub, "éa").await.is_ok());
        assert_eq!(stub.calls().len(), 1);
    }
}
