#![forbid(unsafe_code)]

use poem_openapi::{ OpenApi, payload::Json, Object };

// From cargo.toml.
const PLANNER_VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

// ***************************************************************************
//                          Request/Response Definiions
// ***************************************************************************
pub struct VersionApi;

#[derive(Object)]
struct RespVersion
{
    result_code: String,
    result_msg: String,
    version: String,
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
#[OpenApi]
impl VersionApi {
    #[oai(path = "/version", method = "get")]
    async fn get_version(&self) -> Json<RespVersion> {
        Json(RespVersion::new("0", "success", PLANNER_VERSION.unwrap_or("unknown")))
    }
}

// ***************************************************************************
//                          Request/Response Methods
// ***************************************************************************
impl RespVersion {
    fn new(result_code: &str, result_msg: &str, version: &str) -> Self {
        Self {result_code: result_code.to_string(),
              result_msg: result_msg.to_string(),
              version: version.to_string(),
        }
    }
}
