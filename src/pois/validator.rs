#![forbid(unsafe_code)]

use crate::pois::{PoiCandidate, PoiInput};
use crate::utils::errors::PlannerError;

// ***************************************************************************
//                                Constants
// ***************************************************************************
const MIN_LAT: f64 = -90.0;
const MAX_LAT: f64 = 90.0;
const MIN_LON: f64 = -180.0;
const MAX_LON: f64 = 180.0;

// ---------------------------------------------------------------------------
// validate_poi:
// ---------------------------------------------------------------------------
/** Check the raw POI fields and produce a candidate the store can accept.
 * The name is trimmed before the emptiness check, the coordinate ranges are
 * inclusive and NaN fails both range checks.  Absent tags become an empty
 * list.
 */
pub fn validate_poi(input: PoiInput) -> Result<PoiCandidate, PlannerError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(PlannerError::validation("name", "name must not be empty"));
    }

    if !(MIN_LAT..=MAX_LAT).contains(&input.lat) {
        return Err(PlannerError::validation("lat", "lat must be between -90 and 90"));
    }

    if !(MIN_LON..=MAX_LON).contains(&input.lon) {
        return Err(PlannerError::validation("lon", "lon must be between -180 and 180"));
    }

    Ok(PoiCandidate {
        name: name.to_string(),
        lat: input.lat,
        lon: input.lon,
        tags: input.tags.unwrap_or_default(),
    })
}
