#![forbid(unsafe_code)]

use std::sync::Arc;

use poem::http::StatusCode;
use poem::Request;
use poem_openapi::{ OpenApi, payload::Json, param::Query, Object, ApiResponse };
use log::error;

use crate::ors::routing::{RouteResult, TravelProfile};
use crate::ors::OrsGateway;
use crate::utils::errors::{HttpResult, PlannerError};
use crate::utils::planner_utils::{self, RequestDebug};

// ***************************************************************************
//                          Request/Response Definiions
// ***************************************************************************
pub struct RouteApi {
    gateway: Arc<OrsGateway>,
}

impl RouteApi {
    pub fn new(gateway: Arc<OrsGateway>) -> Self {
        Self {gateway}
    }
}

struct ReqRoute
{
    from_coord: String,
    to_coord: String,
    profile: String,
}

#[derive(Object, Debug)]
pub struct RespRoute
{
    /// The provider's GeoJSON feature collection, unchanged.
    geojson: serde_json::Value,
    distance_km: f64,
    duration_min: i64,
    /// Canonical provider profile name.  Aliases are reported in their
    /// canonical form, so `walking` comes back as `foot-walking`.
    profile: String,
}

impl From<RouteResult> for RespRoute {
    fn from(r: RouteResult) -> Self {
        Self {
            geojson: r.geojson,
            distance_km: r.distance_km,
            duration_min: r.duration_min,
            profile: r.profile.to_string(),
        }
    }
}

// Implement the debug record trait for logging.
impl RequestDebug for ReqRoute {
    fn get_request_info(&self) -> String {
        let mut s = String::with_capacity(255);
        s.push_str("  Request query:");
        s.push_str("\n    from_coord: ");
        s.push_str(&self.from_coord);
        s.push_str("\n    to_coord: ");
        s.push_str(&self.to_coord);
        s.push_str("\n    profile: ");
        s.push_str(&self.profile);
        s
    }
}

// ------------------- HTTP Status Codes -------------------
#[derive(Debug, ApiResponse)]
enum PlannerResponse {
    #[oai(status = 200)]
    Http200(Json<RespRoute>),
    #[oai(status = 400)]
    Http400(Json<HttpResult>),
    /// Provider failures are reported with the provider's status code.
    Upstream(StatusCode, Json<HttpResult>),
}

fn make_http_200(resp: RespRoute) -> PlannerResponse {
    PlannerResponse::Http200(Json(resp))
}
fn make_http_400(msg: String) -> PlannerResponse {
    PlannerResponse::Http400(Json(HttpResult::new(400.to_string(), msg)))
}
fn make_http_upstream(status: u16, msg: String) -> PlannerResponse {
    let code = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    PlannerResponse::Upstream(code, Json(HttpResult::new(code.as_u16().to_string(), msg)))
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
#[OpenApi]
impl RouteApi {
    /// Route between two "lat,lon" points with the given travel profile
    /// (default foot-walking).
    #[oai(path = "/route", method = "get")]
    async fn route_api(&self, http_req: &Request,
                       from_coord: Query<String>,
                       to_coord: Query<String>,
                       profile: Query<Option<String>>,
                      ) -> PlannerResponse {
        // Package the request parameters.
        let req = ReqRoute {
            from_coord: from_coord.0,
            to_coord: to_coord.0,
            profile: profile.0.unwrap_or_else(|| TravelProfile::default().to_string()),
        };

        // Conditional logging depending on log level.
        planner_utils::debug_request(http_req, &req);

        // -------------------- Process Request ----------------------
        match self.gateway.route(&req.from_coord, &req.to_coord, &req.profile).await {
            Ok(r) => make_http_200(RespRoute::from(r)),
            Err(e) => {
                let msg = "ERROR: ".to_owned() + e.to_string().as_str();
                error!("{}", msg);
                match e {
                    PlannerError::InvalidInput(_) => make_http_400(msg),
                    PlannerError::Upstream { status, .. } => make_http_upstream(status, msg),
                    _ => make_http_upstream(StatusCode::INTERNAL_SERVER_ERROR.as_u16(), msg),
                }
            }
        }
    }
}
