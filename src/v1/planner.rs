#![forbid(unsafe_code)]

use std::path::Path;
use std::sync::Arc;

use log::info;
use poem::endpoint::{StaticFileEndpoint, StaticFilesEndpoint};
use poem::Route;
use poem_openapi::{Object, OpenApiService};

use crate::ors::OrsGateway;
use crate::pois::store::PoiStore;
use crate::pois::PointOfInterest;

pub mod geocode;
pub mod pois_create;
pub mod pois_delete;
pub mod pois_list;
pub mod route;
pub mod version;

use geocode::GeocodeApi;
use pois_create::CreatePoiApi;
use pois_delete::DeletePoiApi;
use pois_list::ListPoisApi;
use route::RouteApi;
use version::VersionApi;

// ***************************************************************************
//                              Shared Objects
// ***************************************************************************
/// A stored POI as returned to callers.
#[derive(Object, Debug)]
pub struct PoiRecord
{
    id: String,
    name: String,
    lat: f64,
    lon: f64,
    tags: Vec<String>,
}

impl From<PointOfInterest> for PoiRecord {
    fn from(poi: PointOfInterest) -> Self {
        Self {id: poi.id, name: poi.name, lat: poi.lat, lon: poi.lon, tags: poi.tags}
    }
}

// ***************************************************************************
//                              Service Assembly
// ***************************************************************************
pub type PlannerEndpoints = (ListPoisApi, CreatePoiApi, DeletePoiApi, GeocodeApi, RouteApi, VersionApi);

// ---------------------------------------------------------------------------
// api_service:
// ---------------------------------------------------------------------------
/** Bundle every endpoint into one OpenAPI service.  All endpoints share the
 * same store and gateway.
 */
pub fn api_service(store: Arc<PoiStore>, gateway: Arc<OrsGateway>, title: &str, server_url: &str)
    -> OpenApiService<PlannerEndpoints, ()>
{
    let endpoints = (
        ListPoisApi::new(store.clone()),
        CreatePoiApi::new(store.clone()),
        DeletePoiApi::new(store),
        GeocodeApi::new(gateway.clone()),
        RouteApi::new(gateway),
        VersionApi,
    );
    OpenApiService::new(endpoints, title, env!("CARGO_PKG_VERSION")).server(server_url.to_string())
}

// ---------------------------------------------------------------------------
// build_routes:
// ---------------------------------------------------------------------------
/** Mount the API at the root next to its Swagger UI and generated documents.
 * With a frontend directory, `/` answers with its index.html and the rest of
 * its files are served under `/static`.
 */
pub fn build_routes(api_service: OpenApiService<PlannerEndpoints, ()>, frontend_dir: Option<&str>) -> Route {
    // Allow the generated openapi specs to be retrieved from the server.
    let spec = api_service.spec_endpoint();
    let spec_yaml = api_service.spec_endpoint_yaml();
    let ui = api_service.swagger_ui();

    let app = Route::new()
        .nest("/", api_service)
        .nest("/docs", ui)
        .at("/spec", spec)
        .at("/spec_yaml", spec_yaml);

    match frontend_dir {
        Some(dir) => {
            info!("Serving frontend from {}.", dir);
            app.at("/", StaticFileEndpoint::new(Path::new(dir).join("index.html")))
               .nest("/static", StaticFilesEndpoint::new(dir).index_file("index.html"))
        }
        None => app,
    }
}

// ***************************************************************************
//                              Test Support
// ***************************************************************************
#[cfg(test)]
pub mod test_support {
    use super::*;
    use poem::test::TestClient;
    use tempfile::TempDir;

    use crate::ors::transport::test_support::StubTransport;

    /// A test client over the full API, backed by a temporary POI file and a
    /// stub provider.  Keep the TempDir alive for the duration of the test.
    pub fn test_client(stub: Arc<StubTransport>) -> (TempDir, Arc<PoiStore>, TestClient<Route>) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(PoiStore::new(dir.path().join("pois.json")));
        let gateway = Arc::new(OrsGateway::new(stub));
        let service = api_service(store.clone(), gateway, "Travel Planner", "http://localhost:8000");
        (dir, store, TestClient::new(build_routes(service, None)))
    }

    pub fn empty_stub() -> Arc<StubTransport> {
        Arc::new(StubTransport::replying(200, serde_json::json!({"features": []})))
    }
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use poem::http::StatusCode;
    use poem::test::TestClient;
    use tempfile::TempDir;

    use crate::v1::planner::test_support::{empty_stub, test_client};

    fn frontend_client() -> (TempDir, TestClient<Route>) {
        let dir = TempDir::new().unwrap();
        let site = dir.path().join("frontend");
        fs::create_dir(&site).unwrap();
        fs::write(site.join("index.html"), "<h1>Travel Planner</h1>").unwrap();
        fs::write(site.join("app.js"), "console.log('planner');").unwrap();

        let store = Arc::new(PoiStore::new(dir.path().join("pois.json")));
        let gateway = Arc::new(OrsGateway::new(empty_stub()));
        let service = api_service(store, gateway, "Travel Planner", "http://localhost:8000");
        let app = build_routes(service, site.to_str());
        (dir, TestClient::new(app))
    }

    #[tokio::test]
    async fn root_serves_frontend_index() {
        let (_dir, cli) = frontend_client();
        let resp = cli.get("/").send().await;
        resp.assert_status_is_ok();
        resp.assert_text("<h1>Travel Planner</h1>").await;

        let resp = cli.get("/static/app.js").send().await;
        resp.assert_status_is_ok();
        resp.assert_text("console.log('planner');").await;
    }

    #[tokio::test]
    async fn api_and_docs_sit_beside_the_frontend() {
        let (_dir, cli) = frontend_client();
        cli.get("/pois").send().await.assert_status_is_ok();
        cli.get("/version").send().await.assert_status_is_ok();
        cli.get("/spec").send().await.assert_status_is_ok();
    }

    #[tokio::test]
    async fn root_is_not_found_without_frontend() {
        let (_dir, _store, cli) = test_client(empty_stub());
        cli.get("/").send().await.assert_status(StatusCode::NOT_FOUND);
        cli.get("/spec_yaml").send().await.assert_status_is_ok();
    }
}
