#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use log::{debug, error, info};
use serde_json::{json, Value};

use crate::ors::transport::HTTP_BAD_GATEWAY;
use crate::ors::OrsGateway;
use crate::utils::errors::PlannerError;

// ***************************************************************************
//                                Constants
// ***************************************************************************
/// Snap radius in meters sent for each route endpoint.
const SEARCH_RADIUS_M : u32 = 50;
const ROUTE_PREFERENCE : &str = "recommended";
const COORD_FORMAT_MSG : &str = "Invalid coordinate format, expected 'lat,lon'.";

// ---------------------------------------------------------------------------
// TravelProfile:
// ---------------------------------------------------------------------------
/// Travel modes understood by the provider's directions service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TravelProfile {
    DrivingCar,
    DrivingHgv,
    CyclingRegular,
    CyclingRoad,
    CyclingMountain,
    CyclingElectric,
    #[default]
    FootWalking,
    FootHiking,
    Wheelchair,
}

impl TravelProfile {
    /// Name of the profile in provider URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelProfile::DrivingCar => "driving-car",
            TravelProfile::DrivingHgv => "driving-hgv",
            TravelProfile::CyclingRegular => "cycling-regular",
            TravelProfile::CyclingRoad => "cycling-road",
            TravelProfile::CyclingMountain => "cycling-mountain",
            TravelProfile::CyclingElectric => "cycling-electric",
            TravelProfile::FootWalking => "foot-walking",
            TravelProfile::FootHiking => "foot-hiking",
            TravelProfile::Wheelchair => "wheelchair",
        }
    }
}

impl fmt::Display for TravelProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TravelProfile {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let profile = match s.trim().to_lowercase().as_str() {
            "driving-car" | "driving" => TravelProfile::DrivingCar,
            "driving-hgv" => TravelProfile::DrivingHgv,
            "cycling-regular" | "cycling" => TravelProfile::CyclingRegular,
            "cycling-road" => TravelProfile::CyclingRoad,
            "cycling-mountain" => TravelProfile::CyclingMountain,
            "cycling-electric" => TravelProfile::CyclingElectric,
            "foot-walking" | "walking" => TravelProfile::FootWalking,
            "foot-hiking" | "hiking" => TravelProfile::FootHiking,
            "wheelchair" => TravelProfile::Wheelchair,
            _ => return Err(PlannerError::InvalidInput(format!("Unknown travel profile '{}'.", s))),
        };
        Ok(profile)
    }
}

// ---------------------------------------------------------------------------
// LatLon:
// ---------------------------------------------------------------------------
/// A coordinate in this service's (lat, lon) order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl FromStr for LatLon {
    type Err = PlannerError;

    /// Parse "lat,lon".  Exactly two finite numbers are required.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').collect();
        let [lat, lon] = parts.as_slice() else {
            return Err(PlannerError::InvalidInput(COORD_FORMAT_MSG.to_string()));
        };
        let parse = |p: &str| -> Result<f64, PlannerError> {
            match p.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(v),
                _ => Err(PlannerError::InvalidInput(COORD_FORMAT_MSG.to_string())),
            }
        };
        Ok(LatLon {lat: parse(*lat)?, lon: parse(*lon)?})
    }
}

// ---------------------------------------------------------------------------
// RouteResult:
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResult {
    /// The provider's GeoJSON response, untouched.
    pub geojson: Value,
    pub distance_km: f64,
    pub duration_min: i64,
    pub profile: TravelProfile,
}

// ***************************************************************************
//                             Routing Gateway
// ***************************************************************************
impl OrsGateway {
    // ---------------------------------------------------------------------------
    // route:
    // ---------------------------------------------------------------------------
    /** Compute a route between two "lat,lon" strings.  Input is fully parsed
     * before the provider is contacted.
     */
    pub async fn route(&self, from_coord: &str, to_coord: &str, profile: &str)
        -> Result<RouteResult, PlannerError>
    {
        let from: LatLon = from_coord.parse()?;
        let to: LatLon = to_coord.parse()?;
        let profile: TravelProfile = profile.parse()?;

        let path = format!("/v2/directions/{}/geojson", profile);
        debug!("Routing {:?} -> {:?} by {}", from, to, profile);
        let reply = self.transport
            .post_json(&path, directions_body(from, to), self.route_timeout)
            .await?;

        if !reply.is_success() {
            let msg = format!("Directions error: {}", reply.body);
            error!("{}", msg);
            return Err(PlannerError::upstream(reply.status, msg));
        }

        let geojson: Value = serde_json::from_str(&reply.body).map_err(|e| {
            let msg = format!("Directions error: unparseable response: {}", e);
            error!("{}", msg);
            PlannerError::upstream(HTTP_BAD_GATEWAY, msg)
        })?;

        let result = summarize(geojson, profile)?;
        info!("Route {} found: {} km, {} min.", profile, result.distance_km, result.duration_min);
        Ok(result)
    }
}

// ***************************************************************************
//                          Private Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// directions_body:
// ---------------------------------------------------------------------------
/** Build the provider request.  The provider wants (lon, lat) pairs. */
fn directions_body(from: LatLon, to: LatLon) -> Value {
    json!({
        "coordinates": [[from.lon, from.lat], [to.lon, to.lat]],
        "instructions": false,
        "elevation": false,
        "radiuses": [SEARCH_RADIUS_M, SEARCH_RADIUS_M],
        "preference": ROUTE_PREFERENCE,
    })
}

// ---------------------------------------------------------------------------
// summarize:
// ---------------------------------------------------------------------------
/** Pull the first feature's summary out of the GeoJSON.  Missing distance or
 * duration values count as zero.
 */
fn summarize(geojson: Value, profile: TravelProfile) -> Result<RouteResult, PlannerError> {
    let first = match geojson.get("features").and_then(Value::as_array).and_then(|f| f.first()) {
        Some(f) => f,
        None => {
            error!("Directions error: empty router response");
            return Err(PlannerError::upstream(HTTP_BAD_GATEWAY, "Empty router response.".to_string()));
        }
    };

    let Some(properties) = first.get("properties").filter(|p| p.is_object()) else {
        error!("Directions error: route feature has no properties");
        return Err(PlannerError::upstream(HTTP_BAD_GATEWAY,
                   "Directions error: route feature has no properties.".to_string()));
    };
    let summary = properties.get("summary");
    let distance_m = summary.and_then(|s| s.get("distance")).and_then(Value::as_f64).unwrap_or(0.0);
    let duration_s = summary.and_then(|s| s.get("duration")).and_then(Value::as_f64).unwrap_or(0.0);

    Ok(RouteResult {
        distance_km: round_km(distance_m),
        duration_min: round_minutes(duration_s),
        geojson,
        profile,
    })
}

/// Meters to kilometers, rounded to three decimals on the binary value of
/// the quotient.  Formatting expands the float exactly, so a distance such as
/// 2.5 m (0.0025000000000000000520 km) goes up and 5.5 m goes down.
fn round_km(distance_m: f64) -> f64 {
    let km = distance_m / 1000.0;
    format!("{:.3}", km).parse::<f64>().unwrap_or(km)
}

/// Seconds to whole minutes, ties to even.
fn round_minutes(duration_s: f64) -> i64 {
    (duration_s / 60.0).round_ties_even() as i64
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::ors::transport::test_support::StubTransport;

    fn route_response(distance: f64, duration: f64) -> Value {
        json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": {"type": "LineString", "coordinates": [[2.2945, 48.8584], [2.3376, 48.8606]]},
                "properties": {"summary": {"distance": distance, "duration": duration}}
            }]
        })
    }

    fn gateway(stub: &Arc<StubTransport>) -> OrsGateway {
        OrsGateway::new(stub.clone())
    }

    #[test]
    fn coordinates_parse() {
        assert_eq!("48.8584,2.2945".parse::<LatLon>().unwrap(), LatLon {lat: 48.8584, lon: 2.2945});
        assert_eq!(" -33.9 , 151.2 ".parse::<LatLon>().unwrap(), LatLon {lat: -33.9, lon: 151.2});
        for bad in ["invalid", "48.8584", "1,2,3", "a,b", "", "48.8,", "nan,1", "inf,2"] {
            assert!(matches!(bad.parse::<LatLon>(), Err(PlannerError::InvalidInput(_))), "accepted {bad:?}");
        }
    }

    #[test]
    fn profiles_parse() {
        assert_eq!(TravelProfile::default(), TravelProfile::FootWalking);
        assert_eq!("foot-walking".parse::<TravelProfile>().unwrap(), TravelProfile::FootWalking);
        assert_eq!("walking".parse::<TravelProfile>().unwrap(), TravelProfile::FootWalking);
        assert_eq!("driving".parse::<TravelProfile>().unwrap(), TravelProfile::DrivingCar);
        assert_eq!("Cycling-Road".parse::<TravelProfile>().unwrap(), TravelProfile::CyclingRoad);
        assert_eq!(TravelProfile::CyclingElectric.to_string(), "cycling-electric");
        assert!(matches!("teleport".parse::<TravelProfile>(), Err(PlannerError::InvalidInput(_))));
    }

    #[test]
    fn rounding() {
        assert_eq!(round_km(3500.0), 3.5);
        assert_eq!(round_km(1234.5678), 1.235);
        assert_eq!(round_km(0.0), 0.0);
        assert_eq!(round_km(0.5), 0.001);
        assert_eq!(round_km(2.5), 0.003);
        assert_eq!(round_km(5.5), 0.005);
        assert_eq!(round_km(12345.5), 12.345);
        assert_eq!(round_minutes(2700.0), 45);
        assert_eq!(round_minutes(89.0), 1);
        assert_eq!(round_minutes(90.0), 2);
        assert_eq!(round_minutes(150.0), 2);
        assert_eq!(round_minutes(29.0), 0);
    }

    #[tokio::test]
    async fn route_summary_is_flattened() {
        let stub = Arc::new(StubTransport::replying(200, route_response(3500.0, 2700.0)));
        let r = gateway(&stub).route("48.8584,2.2945", "48.8606,2.3376", "foot-walking").await.unwrap();
        assert_eq!(r.distance_km, 3.5);
        assert_eq!(r.duration_min, 45);
        assert_eq!(r.profile, TravelProfile::FootWalking);
        assert_eq!(r.geojson["type"], "FeatureCollection");
        assert_eq!(r.geojson["features"][0]["properties"]["summary"]["distance"], 3500.0);
    }

    #[tokio::test]
    async fn request_uses_provider_shape() {
        let stub = Arc::new(StubTransport::replying(200, route_response(1.0, 1.0)));
        gateway(&stub).route("48.8584,2.2945", "48.8606,2.3376", "driving-car").await.unwrap();

        let calls = stub.calls();
        assert_eq!(calls.len(), 1);
        let call = &calls[0];
        assert_eq!(call.method, "POST");
        assert_eq!(call.path, "/v2/directions/driving-car/geojson");
        assert_eq!(call.timeout, Duration::from_secs(15));
        assert_eq!(call.body.as_ref().unwrap(), &json!({
            "coordinates": [[2.2945, 48.8584], [2.3376, 48.8606]],
            "instructions": false,
            "elevation": false,
            "radiuses": [50, 50],
            "preference": "recommended",
        }));
    }

    #[tokio::test]
    async fn malformed_input_never_reaches_provider() {
        let stub = Arc::new(StubTransport::replying(200, route_response(1.0, 1.0)));
        let gw = gateway(&stub);

        let err = gw.route("invalid", "48.8606,2.3376", "foot-walking").await.unwrap_err();
        assert!(matches!(err, PlannerError::InvalidInput(_)));
        let err = gw.route("48.8584,2.2945", "invalid", "foot-walking").await.unwrap_err();
        assert!(matches!(err, PlannerError::InvalidInput(_)));
        let err = gw.route("48.8584,2.2945", "48.8606,2.3376", "rocket").await.unwrap_err();
        assert!(matches!(err, PlannerError::InvalidInput(_)));

        assert!(stub.calls().is_empty());
    }

    #[tokio::test]
    async fn provider_status_propagates() {
        let stub = Arc::new(StubTransport::replying_raw(403, "Access to this API has been disallowed"));
        let err = gateway(&stub).route("1,1", "2,2", "foot-walking").await.unwrap_err();
        assert_eq!(err, PlannerError::upstream(403,
                   "Directions error: Access to this API has been disallowed".to_string()));
    }

    #[tokio::test]
    async fn empty_features_is_bad_gateway() {
        let stub = Arc::new(StubTransport::replying(200, json!({"type": "FeatureCollection", "features": []})));
        let err = gateway(&stub).route("1,1", "2,2", "foot-walking").await.unwrap_err();
        assert!(matches!(err, PlannerError::Upstream { status: 502, .. }));
    }

    #[tokio::test]
    async fn unparseable_success_is_bad_gateway() {
        let stub = Arc::new(StubTransport::replying_raw(200, "<html>oops</html>"));
        let err = gateway(&stub).route("1,1", "2,2", "foot-walking").await.unwrap_err();
        assert!(matches!(err, PlannerError::Upstream { status: 502, .. }));
    }

    #[tokio::test]
    async fn missing_summary_counts_as_zero() {
        let body = json!({"features": [{"properties": {}}]});
        let stub = Arc::new(StubTransport::replying(200, body));
        let r = gateway(&stub).route("1,1", "2,2", "walking").await.unwrap();
        assert_eq!(r.distance_km, 0.0);
        assert_eq!(r.duration_min, 0);
    }

    #[tokio::test]
    async fn transport_timeout_propagates() {
        let stub = Arc::new(StubTransport::failing(PlannerError::upstream(504, "timed out".to_string())));
        let err = gateway(&stub).route("1,1", "2,2", "foot-walking").await.unwrap_err();
        assert!(matches!(err, PlannerError::Upstream { status: 504, .. }));
    }
}
