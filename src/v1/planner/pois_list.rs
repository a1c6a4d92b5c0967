#![forbid(unsafe_code)]

use std::sync::Arc;

use poem::Request;
use poem_openapi::{ OpenApi, payload::Json, ApiResponse };
use log::error;

use crate::pois::store::PoiStore;
use crate::utils::errors::{HttpResult, PlannerError};
use crate::utils::planner_utils::{self, RequestDebug};
use crate::v1::planner::PoiRecord;

// ***************************************************************************
//                          Request/Response Definiions
// ***************************************************************************
pub struct ListPoisApi {
    store: Arc<PoiStore>,
}

impl ListPoisApi {
    pub fn new(store: Arc<PoiStore>) -> Self {
        Self {store}
    }
}

struct ReqListPois;

// Implement the debug record trait for logging.
impl RequestDebug for ReqListPois {
    fn get_request_info(&self) -> String {
        "  No request body".to_string()
    }
}

// ------------------- HTTP Status Codes -------------------
#[derive(Debug, ApiResponse)]
enum PlannerResponse {
    #[oai(status = 200)]
    Http200(Json<Vec<PoiRecord>>),
    #[oai(status = 500)]
    Http500(Json<HttpResult>),
}

fn make_http_200(resp: Vec<PoiRecord>) -> PlannerResponse {
    PlannerResponse::Http200(Json(resp))
}
fn make_http_500(msg: String) -> PlannerResponse {
    PlannerResponse::Http500(Json(HttpResult::new(500.to_string(), msg)))
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
#[OpenApi]
impl ListPoisApi {
    /// List every stored point of interest in file order.
    #[oai(path = "/pois", method = "get")]
    async fn list_pois_api(&self, http_req: &Request) -> PlannerResponse {
        // -------------------- Process Request ----------------------
        match process(http_req, &self.store).await {
            Ok(r) => r,
            Err(e) => {
                let msg = "ERROR: ".to_owned() + e.to_string().as_str();
                error!("{}", msg);
                make_http_500(msg)
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
async fn process(http_req: &Request, store: &Arc<PoiStore>) -> Result<PlannerResponse, PlannerError> {
    // Conditional logging depending on log level.
    planner_utils::debug_request(http_req, &ReqListPois);

    let pois = store.blocking(|s| s.list()).await?;
    Ok(make_http_200(pois.into_iter().map(PoiRecord::from).collect()))
}
