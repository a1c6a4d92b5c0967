// This file contains the point of interest types shared by the store,
// the validator and the POI endpoints.
#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

pub mod store;
pub mod validator;

// ---------------------------------------------------------------------------
// PointOfInterest:
// ---------------------------------------------------------------------------
/// A named location as persisted in the POI file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

// ---------------------------------------------------------------------------
// PoiInput:
// ---------------------------------------------------------------------------
/// Raw, unvalidated POI fields as received from a caller.
#[derive(Debug, Clone)]
pub struct PoiInput {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub tags: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// PoiCandidate:
// ---------------------------------------------------------------------------
/// POI fields that passed validation but have no identity yet.  Only the
/// validator constructs these.
#[derive(Debug, Clone, PartialEq)]
pub struct PoiCandidate {
    name: String,
    lat: f64,
    lon: f64,
    tags: Vec<String>,
}

impl PoiCandidate {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

/// Key used for name uniqueness: surrounding whitespace removed, case folded.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}
