#![forbid(unsafe_code)]

use std::sync::Arc;

use poem::Request;
use poem_openapi::{ OpenApi, payload::Json, Object, ApiResponse };
use log::{error, info};

use crate::pois::store::PoiStore;
use crate::pois::validator::validate_poi;
use crate::pois::PoiInput;
use crate::utils::errors::{HttpResult, PlannerError};
use crate::utils::planner_utils::{self, RequestDebug};
use crate::v1::planner::PoiRecord;

// ***************************************************************************
//                          Request/Response Definiions
// ***************************************************************************
pub struct CreatePoiApi {
    store: Arc<PoiStore>,
}

impl CreatePoiApi {
    pub fn new(store: Arc<PoiStore>) -> Self {
        Self {store}
    }
}

#[derive(Object)]
struct ReqCreatePoi
{
    name: String,
    lat: f64,
    lon: f64,
    tags: Option<Vec<String>>,
}

// Implement the debug record trait for logging.
impl RequestDebug for ReqCreatePoi {
    fn get_request_info(&self) -> String {
        let mut s = String::with_capacity(255);
        s.push_str("  Request body:");
        s.push_str("\n    name: ");
        s.push_str(&self.name);
        s.push_str("\n    lat: ");
        s.push_str(&self.lat.to_string());
        s.push_str("\n    lon: ");
        s.push_str(&self.lon.to_string());
        s.push_str("\n    tags: ");
        s.push_str(&format!("{:?}", self.tags));
        s
    }
}

// ------------------- HTTP Status Codes -------------------
#[derive(Debug, ApiResponse)]
#[oai(bad_request_handler = "bad_request_handler")]
enum PlannerResponse {
    #[oai(status = 201)]
    Http201(Json<PoiRecord>),
    #[oai(status = 409)]
    Http409(Json<HttpResult>),
    #[oai(status = 422)]
    Http422(Json<HttpResult>),
    #[oai(status = 500)]
    Http500(Json<HttpResult>),
}

fn make_http_201(resp: PoiRecord) -> PlannerResponse {
    PlannerResponse::Http201(Json(resp))
}
fn make_http_409(msg: String) -> PlannerResponse {
    PlannerResponse::Http409(Json(HttpResult::new(409.to_string(), msg)))
}
fn make_http_422(msg: String, field: Option<String>) -> PlannerResponse {
    match field {
        Some(f) => PlannerResponse::Http422(Json(HttpResult::with_field(422.to_string(), msg, f))),
        None => PlannerResponse::Http422(Json(HttpResult::new(422.to_string(), msg))),
    }
}
fn make_http_500(msg: String) -> PlannerResponse {
    PlannerResponse::Http500(Json(HttpResult::new(500.to_string(), msg)))
}

// A body that does not parse, or lacks a required field, is an invalid
// field value like any other.
fn bad_request_handler(err: poem::Error) -> PlannerResponse {
    let msg = "ERROR: ".to_owned() + err.to_string().as_str();
    error!("{}", msg);
    make_http_422(msg, None)
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
#[OpenApi]
impl CreatePoiApi {
    /// Create a point of interest.  Names must be unique ignoring case and
    /// surrounding whitespace.
    #[oai(path = "/pois", method = "post")]
    async fn create_poi_api(&self, http_req: &Request, req: Json<ReqCreatePoi>) -> PlannerResponse {
        // -------------------- Process Request ----------------------
        match process(http_req, &self.store, req.0).await {
            Ok(r) => r,
            Err(e) => {
                let msg = "ERROR: ".to_owned() + e.to_string().as_str();
                error!("{}", msg);
                match e {
                    PlannerError::Validation { field, .. } => make_http_422(msg, Some(field)),
                    PlannerError::DuplicateName(_) => make_http_409(msg),
                    _ => make_http_500(msg),
                }
            }
        }
    }
}

// ***************************************************************************
//                          Private Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// process:
// ---------------------------------------------------------------------------
async fn process(http_req: &Request, store: &Arc<PoiStore>, req: ReqCreatePoi) -> Result<PlannerResponse, PlannerError> {
    // Conditional logging depending on log level.
    planner_utils::debug_request(http_req, &req);

    // Validate before the store is consulted.
    let candidate = validate_poi(PoiInput {name: req.name, lat: req.lat, lon: req.lon, tags: req.tags})?;
    let poi = store.blocking(move |s| s.create(candidate)).await?;
    info!("New POI '{}' ({}) at {},{}.", poi.name, poi.id, poi.lat, poi.lon);

    Ok(make_http_201(PoiRecord::from(poi)))
}
