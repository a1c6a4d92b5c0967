#![forbid(unsafe_code)]

use std::sync::Arc;

use poem::Request;
use poem_openapi::{ OpenApi, payload::Json, param::Path, ApiResponse };
use log::{error, info};

use crate::pois::store::PoiStore;
use crate::utils::errors::{HttpResult, PlannerError};
use crate::utils::planner_utils::{self, RequestDebug};

// ***************************************************************************
//                          Request/Response Definiions
// ***************************************************************************
pub struct DeletePoiApi {
    store: Arc<PoiStore>,
}

impl DeletePoiApi {
    pub fn new(store: Arc<PoiStore>) -> Self {
        Self {store}
    }
}

struct ReqDeletePoi
{
    id: String,
}

// Implement the debug record trait for logging.
impl RequestDebug for ReqDeletePoi {
    fn get_request_info(&self) -> String {
        let mut s = String::with_capacity(255);
        s.push_str("  Request path:");
        s.push_str("\n    id: ");
        s.push_str(&self.id);
        s
    }
}

// ------------------- HTTP Status Codes -------------------
#[derive(Debug, ApiResponse)]
enum PlannerResponse {
    #[oai(status = 204)]
    Http204,
    #[oai(status = 404)]
    Http404(Json<HttpResult>),
    #[oai(status = 500)]
    Http500(Json<HttpResult>),
}

fn make_http_404(msg: String) -> PlannerResponse {
    PlannerResponse::Http404(Json(HttpResult::new(404.to_string(), msg)))
}
fn make_http_500(msg: String) -> PlannerResponse {
    PlannerResponse::Http500(Json(HttpResult::new(500.to_string(), msg)))
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
#[OpenApi]
impl DeletePoiApi {
    /// Delete the point of interest with the given id.
    #[oai(path = "/pois/:id", method = "delete")]
    async fn delete_poi_api(&self, http_req: &Request, id: Path<String>) -> PlannerResponse {
        // Package the request parameters.
        let req = ReqDeletePoi {id: id.0};

        // -------------------- Process Request ----------------------
        match process(http_req, &self.store, &req).await {
            Ok(r) => r,
            Err(e) => {
                let msg = "ERROR: ".to_owned() + e.to_string().as_str();
                error!("{}", msg);
                match e {
                    PlannerError::NotFound(_) => make_http_404(msg),
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
async fn process(http_req: &Request, store: &Arc<PoiStore>, req: &ReqDeletePoi) -> Result<PlannerResponse, PlannerError> {
    // Conditional logging depending on log level.
    planner_utils::debug_request(http_req, req);

    let id = req.id.clone();
    store.blocking(move |s| s.delete(&id)).await?;
    info!("POI {} deleted.", req.id);
    Ok(PlannerResponse::Http204)
}
