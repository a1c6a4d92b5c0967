#![forbid(unsafe_code)]

use std::fs;
use std::sync::Arc;

use anyhow::Result;
use log::info;
use poem::listener::{Listener, RustlsCertificate, RustlsConfig, TcpListener};
use poem::middleware::Cors;
use poem::EndpointExt;

// Planner Utilities
use crate::ors::transport::HttpTransport;
use crate::ors::OrsGateway;
use crate::pois::store::PoiStore;
use crate::utils::config::{init_log, init_planner_dirs, init_runtime_context, RuntimeCtx, PLANNER_ARGS};
use crate::utils::errors::Errors;
use crate::utils::planner_utils::get_absolute_path;
use crate::v1::planner::{api_service, build_routes};

// Modules
mod ors;
mod pois;
mod utils;
mod v1;

// ***************************************************************************
//                                Constants
// ***************************************************************************
const SERVER_NAME : &str = "TravelPlanner"; // for poem logging

// ---------------------------------------------------------------------------
// main:
// ---------------------------------------------------------------------------
#[tokio::main]
async fn main() -> Result<()> {
    // --------------- Initialize Planner -------------
    // Announce ourselves.
    println!("Starting travel_planner!");

    // Create or check the data directories.
    let dirs = init_planner_dirs()?;
    if PLANNER_ARGS.create_dirs_only {
        println!("Data directories ready under {}.", dirs.root_dir);
        return Ok(());
    }

    // Initialize the server.
    let ctx = planner_init(dirs)?;
    let config = &ctx.parms.config;

    // --------------- Main Loop Set Up ---------------
    // Assign base URL.
    let server_url = format!("{}:{}", config.http_addr, config.http_port);

    // Wire the store and the provider gateway into the endpoints.
    let store = Arc::new(PoiStore::new(&ctx.pois_file));
    info!("POI file: {}", store.path().display());
    let transport = Arc::new(HttpTransport::new(ctx.ors_api_key.clone(), &config.ors_base_url));
    let gateway = Arc::new(OrsGateway::new(transport)
        .with_timeouts(config.geocode_timeout(), config.route_timeout()));
    let api_service = api_service(store, gateway, &config.title, &server_url);

    // Create the routes, with the browser frontend when one is configured.
    let frontend_dir = config.frontend_dir.as_deref().map(get_absolute_path);
    let app = build_routes(api_service, frontend_dir.as_deref())
        .with(Cors::new().allow_credentials(true));

    // ------------------ Main Loop -------------------
    let addr = format!("{}{}", "0.0.0.0:", config.http_port);
    let listener = if config.tls {
        TcpListener::bind(addr).rustls(
            RustlsConfig::new().fallback(
                RustlsCertificate::new()
                    .key(fs::read(ctx.dirs.key_file())?)
                    .cert(fs::read(ctx.dirs.cert_file())?),
            ),
        ).boxed()
    } else {
        TcpListener::bind(addr).boxed()
    };
    info!("Listening at {}.", server_url);

    poem::Server::new(listener)
        .name(SERVER_NAME)
        .run(app)
        .await?;
    Ok(())
}

// ***************************************************************************
//                             Private Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// planner_init:
// ---------------------------------------------------------------------------
/** Initialize logging and read the runtime context.  A missing provider
 * credential or an unreadable configuration stops the server here.
 */
fn planner_init(dirs: utils::config::PlannerDirs) -> Result<RuntimeCtx> {
    // Configure our log.
    init_log(&dirs)?;

    // Read input parameters and the provider credential.
    let ctx = match init_runtime_context(dirs) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{}", e);
            return Err(e);
        }
    };
    info!("{}", Errors::InputParms(format!("{:#?}", ctx)));
    if !ctx.parms.config_file.is_empty() {
        info!("Configuration read from {}.", ctx.parms.config_file);
    }

    // Log build info.
    print_version_info();
    Ok(ctx)
}

// ---------------------------------------------------------------------------
// print_version_info:
// ---------------------------------------------------------------------------
fn print_version_info() {
    info!("\n*** Running travel_planner={}, RUSTC_PKG={}",
          option_env!("CARGO_PKG_VERSION").unwrap_or("unknown"),
          env!("CARGO_PKG_NAME"));
}
