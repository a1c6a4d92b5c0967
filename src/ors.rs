// This file contains the openrouteservice gateways.  Everything under this
// module speaks the provider's (lon, lat) order; everything outside it uses
// (lat, lon).
#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

pub mod geocoding;
pub mod routing;
pub mod transport;

use transport::ProviderTransport;

// ***************************************************************************
//                                Constants
// ***************************************************************************
pub const DEFAULT_ORS_BASE_URL : &str = "https://api.openrouteservice.org";
pub const DEFAULT_GEOCODE_TIMEOUT_SECS : u64 = 10;
pub const DEFAULT_ROUTE_TIMEOUT_SECS : u64 = 15;

// ---------------------------------------------------------------------------
// OrsGateway:
// ---------------------------------------------------------------------------
/// Entry point for geocoding and routing.  The operations themselves live in
/// the geocoding and routing modules.
#[derive(Clone)]
pub struct OrsGateway {
    transport: Arc<dyn ProviderTransport>,
    geocode_timeout: Duration,
    route_timeout: Duration,
}

impl OrsGateway {
    pub fn new(transport: Arc<dyn ProviderTransport>) -> Self {
        Self {
            transport,
            geocode_timeout: Duration::from_secs(DEFAULT_GEOCODE_TIMEOUT_SECS),
            route_timeout: Duration::from_secs(DEFAULT_ROUTE_TIMEOUT_SECS),
        }
    }

    pub fn with_timeouts(mut self, geocode_timeout: Duration, route_timeout: Duration) -> Self {
        self.geocode_timeout = geocode_timeout;
        self.route_timeout = route_timeout;
        self
    }
}
