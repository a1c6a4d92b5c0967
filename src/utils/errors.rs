#![forbid(unsafe_code)]

use poem_openapi::Object;
use thiserror::Error;

/// Errors enumerates the startup and runtime errors of the server itself.
#[derive(Error, Debug)]
pub enum Errors {
    /// Input parameter logging.
    #[error("travel_planner input parameters:\n{}", .0)]
    InputParms(String),

    /// Inaccessible logger configuration file.
    #[error("Unable to access the Log4rs configuration file: {}", .0)]
    Log4rsInitialization(String),

    #[error("Reading application configuration file: {}", .0)]
    ReadingConfigFile(String),

    #[error("Unable to parse TOML file: {}", .0)]
    TOMLParseError(String),

    #[error("Data directory error: {}", .0)]
    DataDirectory(String),

    #[error("Required environment variable {} is not set", .0)]
    MissingCredential(String),
}

/// PlannerError enumerates the failures that POI and provider operations
/// report back to the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlannerError {
    /// A field of an incoming POI or query failed validation.
    #[error("{message}")]
    Validation { field: String, message: String },

    /// A POI with the same trimmed, case-folded name already exists.
    #[error("POI with name '{0}' already exists")]
    DuplicateName(String),

    /// No POI carries the requested id.
    #[error("POI {0} not found")]
    NotFound(String),

    /// Malformed route input such as an unparseable coordinate string.
    #[error("{0}")]
    InvalidInput(String),

    /// The provider failed, timed out or returned something unusable.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// The POI file could not be read, parsed or written.
    #[error("POI storage error on {path}: {message}")]
    Storage { path: String, message: String },
}

impl PlannerError {
    pub fn validation(field: &str, message: &str) -> Self {
        PlannerError::Validation { field: field.to_string(), message: message.to_string() }
    }

    pub fn upstream(status: u16, message: String) -> Self {
        PlannerError::Upstream { status, message }
    }
}

// ***************************************************************************
//                             HTTP Error Body
// ***************************************************************************
/// Body returned with every non-success HTTP response.
#[derive(Object, Debug)]
pub struct HttpResult {
    pub result_code: String,
    pub result_msg: String,
    #[oai(skip_serializing_if_is_none)]
    pub field: Option<String>,
}

impl HttpResult {
    pub fn new(result_code: String, result_msg: String) -> Self {
        Self {result_code, result_msg, field: None}
    }

    pub fn with_field(result_code: String, result_msg: String, field: String) -> Self {
        Self {result_code, result_msg, field: Some(field)}
    }
}
