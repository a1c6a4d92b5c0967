#![forbid(unsafe_code)]

use std::sync::Arc;

use poem::http::StatusCode;
use poem::Request;
use poem_openapi::{ OpenApi, payload::Json, param::Query, Object, ApiResponse };
use log::error;

use crate::ors::geocoding::GeocodeMatch;
use crate::ors::OrsGateway;
use crate::utils::errors::{HttpResult, PlannerError};
use crate::utils::planner_utils::{self, RequestDebug};

// ***************************************************************************
//                          Request/Response Definiions
// ***************************************************************************
pub struct GeocodeApi {
    gateway: Arc<OrsGateway>,
}

impl GeocodeApi {
    pub fn new(gateway: Arc<OrsGateway>) -> Self {
        Self {gateway}
    }
}

struct ReqGeocode
{
    q: String,
}

#[derive(Object, Debug)]
pub struct RespGeocode
{
    results: Vec<GeocodeElement>,
}

#[derive(Object, Debug)]
pub struct GeocodeElement
{
    label: String,
    lat: f64,
    lon: f64,
}

impl From<GeocodeMatch> for GeocodeElement {
    fn from(m: GeocodeMatch) -> Self {
        Self {label: m.label, lat: m.lat, lon: m.lon}
    }
}

// Implement the debug record trait for logging.
impl RequestDebug for ReqGeocode {
    fn get_request_info(&self) -> String {
        let mut s = String::with_capacity(255);
        s.push_str("  Request query:");
        s.push_str("\n    q: ");
        s.push_str(&self.q);
        s
    }
}

// ------------------- HTTP Status Codes -------------------
#[derive(Debug, ApiResponse)]
#[oai(bad_request_handler = "bad_request_handler")]
enum PlannerResponse {
    #[oai(status = 200)]
    Http200(Json<RespGeocode>),
    #[oai(status = 422)]
    Http422(Json<HttpResult>),
    /// Provider failures are reported with the provider's status code.
    Upstream(StatusCode, Json<HttpResult>),
}

fn make_http_200(resp: RespGeocode) -> PlannerResponse {
    PlannerResponse::Http200(Json(resp))
}
fn make_http_422(msg: String, field: String) -> PlannerResponse {
    PlannerResponse::Http422(Json(HttpResult::with_field(422.to_string(), msg, field)))
}
fn make_http_upstream(status: u16, msg: String) -> PlannerResponse {
    let code = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    PlannerResponse::Upstream(code, Json(HttpResult::new(code.as_u16().to_string(), msg)))
}

// A missing q parameter is treated like a too-short one.
fn bad_request_handler(err: poem::Error) -> PlannerResponse {
    let msg = "ERROR: ".to_owned() + err.to_string().as_str();
    error!("{}", msg);
    make_http_422(msg, "q".to_string())
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
#[OpenApi]
impl GeocodeApi {
    /// Look up free text with the provider and return at most five matches.
    #[oai(path = "/geocode", method = "get")]
    async fn geocode_api(&self, http_req: &Request, q: Query<String>) -> PlannerResponse {
        // Package the request parameters.
        let req = ReqGeocode {q: q.0};

        // Conditional logging depending on log level.
        planner_utils::debug_request(http_req, &req);

        // -------------------- Process Request ----------------------
        match self.gateway.geocode(&req.q).await {
            Ok(matches) => {
                let results = matches.into_iter().map(GeocodeElement::from).collect();
                make_http_200(RespGeocode {results})
            }
            Err(e) => {
                let msg = "ERROR: ".to_owned() + e.to_string().as_str();
                error!("{}", msg);
                match e {
                    PlannerError::Validation { field, .. } => make_http_422(msg, field),
                    PlannerError::Upstream { status, .. } => make_http_upstream(status, msg),
                    _ => make_http_upstream(StatusCode::INTERNAL_SERVER_ERROR.as_u16(), msg),
                }
            }
        }
    }
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    use crate::ors::transport::test_support::StubTransport;
    use crate::v1::planner::test_support::{empty_stub, test_client};

    #[tokio::test]
    async fn geocode_results_are_flattened() {
        let provider = json!({"features": [
            {"geometry": {"type": "Point", "coordinates": [37.6173, 55.7558]},
             "properties": {"label": "Moscow, Russia"}}
        ]});
        let stub = Arc::new(StubTransport::replying(200, provider));
        let (_dir, _store, cli) = test_client(stub.clone());

        let resp = cli.get("/geocode").query("q", &"Moscow").send().await;
        resp.assert_status_is_ok();
        let body: Value = resp.0.into_body().into_json().await.unwrap();
        let first = &body["results"][0];
        assert_eq!(first["label"], "Moscow, Russia");
        assert!((first["lat"].as_f64().unwrap() - 55.7558).abs() < 1e-9);
        assert!((first["lon"].as_f64().unwrap() - 37.6173).abs() < 1e-9);
        assert_eq!(stub.calls()[0].query[0], ("text", "Moscow".to_string()));
    }

    #[tokio::test]
    async fn short_or_missing_query_is_422() {
        let stub = empty_stub();
        let (_dir, _store, cli) = test_client(stub.clone());

        cli.get("/geocode").query("q", &"M").send().await.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        cli.get("/geocode").send().await.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert!(stub.calls().is_empty());
    }

    #[tokio::test]
    async fn provider_status_is_passed_through() {
        let stub = Arc::new(StubTransport::replying_raw(403, "Forbidden"));
        let (_dir, _store, cli) = test_client(stub);

        let resp = cli.get("/geocode").query("q", &"Paris").send().await;
        resp.assert_status(StatusCode::FORBIDDEN);
        let body: Value = resp.0.into_body().into_json().await.unwrap();
        assert_eq!(body["result_code"], "403");
        assert!(body["result_msg"].as_str().unwrap().contains("Geocode error: Forbidden"));
    }
}
