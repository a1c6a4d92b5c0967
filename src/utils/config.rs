#![forbid(unsafe_code)]

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use fs_mistrust::Mistrust;
use lazy_static::lazy_static;
use log::{error, info, LevelFilter};
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config as LogConfig, Root};
use log4rs::encode::pattern::PatternEncoder;
use serde::Deserialize;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::Duration;
use std::{env, fs};

// Planner Utilities
use crate::ors::{DEFAULT_GEOCODE_TIMEOUT_SECS, DEFAULT_ORS_BASE_URL, DEFAULT_ROUTE_TIMEOUT_SECS};
use crate::utils::errors::Errors;
use crate::utils::planner_utils::get_absolute_path;

// ***************************************************************************
//                                Constants
// ***************************************************************************
// Directory and file locations. Unless otherwise noted, all files and directories
// are relative to the root directory.
const ENV_PLANNER_ROOT_DIR : &str = "PLANNER_ROOT_DIR";
const DEFAULT_ROOT_DIR     : &str = "~/.travel_planner";
const CONFIG_DIR           : &str = "/config";
const LOGS_DIR             : &str = "/logs";
const DATA_DIR             : &str = "/data";
const CERTS_DIR            : &str = "/certs";
const LOG4RS_CONFIG_FILE   : &str = "/log4rs.yml";  // relative to config dir
const PLANNER_CONFIG_FILE  : &str = "/planner.toml"; // relative to config dir
const POIS_FILE            : &str = "/pois.json";   // relative to data dir
const CERT_FILE            : &str = "/cert.pem";    // relative to certs dir
const KEY_FILE             : &str = "/key.pem";     // relative to certs dir

// The provider credential.
pub const ENV_ORS_API_KEY  : &str = "ORS_API_KEY";

// Networking.
const DEFAULT_HTTP_ADDR    : &str = "http://localhost";
const DEFAULT_HTTP_PORT    : u16  = 8000;

// ***************************************************************************
//                             Static Variables
// ***************************************************************************
// Assign the command line arguments before the runtime context is built in main.
lazy_static! {
    pub static ref PLANNER_ARGS: PlannerArgs = PlannerArgs::parse();
}

// ***************************************************************************
//                             Directory Structs
// ***************************************************************************
// ---------------------------------------------------------------------------
// PlannerDirs:
// ---------------------------------------------------------------------------
#[derive(Debug, Clone)]
pub struct PlannerDirs {
    pub root_dir: String,
    pub config_dir: String,
    pub logs_dir: String,
    pub data_dir: String,
    pub certs_dir: String,
}

impl PlannerDirs {
    /// Lay out the data directories under the root without touching the disk.
    pub fn new(root_dir: &str) -> Self {
        let root_dir = get_absolute_path(root_dir);
        Self {
            config_dir: root_dir.clone() + CONFIG_DIR,
            logs_dir: root_dir.clone() + LOGS_DIR,
            data_dir: root_dir.clone() + DATA_DIR,
            certs_dir: root_dir.clone() + CERTS_DIR,
            root_dir,
        }
    }

    pub fn config_file(&self) -> String {
        self.config_dir.clone() + PLANNER_CONFIG_FILE
    }

    pub fn log_config_file(&self) -> String {
        self.config_dir.clone() + LOG4RS_CONFIG_FILE
    }

    pub fn default_pois_file(&self) -> String {
        self.data_dir.clone() + POIS_FILE
    }

    pub fn cert_file(&self) -> String {
        self.certs_dir.clone() + CERT_FILE
    }

    pub fn key_file(&self) -> String {
        self.certs_dir.clone() + KEY_FILE
    }

    fn all(&self) -> [(&str, &str); 5] {
        [(self.root_dir.as_str(), "root directory"),
         (self.config_dir.as_str(), "config directory"),
         (self.logs_dir.as_str(), "logs directory"),
         (self.data_dir.as_str(), "data directory"),
         (self.certs_dir.as_str(), "certs directory")]
    }
}

// ***************************************************************************
//                               Config Structs
// ***************************************************************************
// ---------------------------------------------------------------------------
// PlannerArgs:
// ---------------------------------------------------------------------------
#[derive(Debug, Parser)]
#[command(name = "travel_planner", version, about = "Points of interest and route planning server.")]
pub struct PlannerArgs {
    /// Specify the server's root data directory.
    ///
    /// This directory contains the configuration, log, certificate and POI
    /// data directories.
    #[arg(short, long)]
    pub root_dir: Option<String>,

    /// Create the data directories and then exit.
    ///
    /// The data directories will be rooted at a root directory calculated
    /// using the following priority order:
    ///
    ///   1. If set, the value of the PLANNER_ROOT_DIR environment,
    ///
    ///   2. Otherwise, if set, the value of the --root-dir command line argument,
    ///
    ///   3. Otherwise, ~/.travel_planner
    ///
    #[arg(short, long)]
    pub create_dirs_only: bool,
}

// ---------------------------------------------------------------------------
// Parms:
// ---------------------------------------------------------------------------
#[derive(Debug)]
pub struct Parms {
    pub config_file: String,
    pub config: Config,
}

// ---------------------------------------------------------------------------
// RuntimeCtx:
// ---------------------------------------------------------------------------
pub struct RuntimeCtx {
    pub parms: Parms,
    pub dirs: PlannerDirs,
    pub pois_file: String,
    pub ors_api_key: String,
}

// The credential must never reach the log.
impl std::fmt::Debug for RuntimeCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeCtx")
            .field("parms", &self.parms)
            .field("dirs", &self.dirs)
            .field("pois_file", &self.pois_file)
            .field("ors_api_key", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Config:
// ---------------------------------------------------------------------------
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub title: String,
    pub http_addr: String,
    pub http_port: u16,
    pub pois_file: Option<String>,
    pub frontend_dir: Option<String>,
    pub ors_base_url: String,
    pub geocode_timeout_secs: u64,
    pub route_timeout_secs: u64,
    pub tls: bool,
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }

    pub fn geocode_timeout(&self) -> Duration {
        Duration::from_secs(self.geocode_timeout_secs)
    }

    pub fn route_timeout(&self) -> Duration {
        Duration::from_secs(self.route_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "Travel Planner".to_string(),
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            pois_file: None,
            frontend_dir: None,
            ors_base_url: DEFAULT_ORS_BASE_URL.to_string(),
            geocode_timeout_secs: DEFAULT_GEOCODE_TIMEOUT_SECS,
            route_timeout_secs: DEFAULT_ROUTE_TIMEOUT_SECS,
            tls: false,
        }
    }
}

// ***************************************************************************
//                            Directory Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_planner_dirs:
// ---------------------------------------------------------------------------
/** Calculate the external data directories and make sure each one exists
 * with owner-only permissions.
 */
pub fn init_planner_dirs() -> Result<PlannerDirs> {
    let dirs = PlannerDirs::new(&get_root_dir());
    let mistrust = get_mistrust()?;
    for (dir, msgname) in dirs.all() {
        check_planner_dir(dir, msgname, &mistrust)?;
    }
    Ok(dirs)
}

// ---------------------------------------------------------------------------
// check_planner_dir:
// ---------------------------------------------------------------------------
/** Check that the path is absolute and, if it exists, that is has the proper
 * permissions assigned.  If it doesn't exist, create it.  The mistrust package
 * creates directories with 0o700 permissions.
 */
fn check_planner_dir(dir: &str, msgname: &str, mistrust: &Mistrust) -> Result<()> {
    let path = Path::new(dir);
    if !path.is_absolute() {
        return Err(Errors::DataDirectory(format!("the {} path must be absolute: {}", msgname, dir)).into());
    }
    if path.exists() {
        if !path.is_dir() {
            return Err(Errors::DataDirectory(format!("the {} path must be a directory: {}", msgname, dir)).into());
        }

        // Make sure the directory has rwx for owner only.
        let perm = path.metadata()
            .with_context(|| format!("Unable to read metadata for {}: {}", msgname, dir))?
            .permissions()
            .mode();
        if perm & 0o777 != 0o700 {
            return Err(Errors::DataDirectory(
                format!("the {} path must have 0o700 permissions: {}", msgname, dir)).into());
        }
    } else {
        mistrust.make_directory(path)
            .map_err(|e| Errors::DataDirectory(format!("make directory error for {}: {}", dir, e)))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// get_mistrust:
// ---------------------------------------------------------------------------
/** Configure a new mistrust object for initial directory processing. */
fn get_mistrust() -> Result<Mistrust> {
    Mistrust::builder()
        .ignore_prefix(get_absolute_path("~"))
        .trust_group(0)
        .build()
        .map_err(|e| anyhow!(Errors::DataDirectory(format!("mistrust configuration error: {}", e))))
}

// ---------------------------------------------------------------------------
// get_root_dir:
// ---------------------------------------------------------------------------
fn get_root_dir() -> String {
    // Order of precedence:
    //  1. Environment variable
    //  2. Command line --root-dir argument
    //  3. Default location
    //
    let root_dir = env::var(ENV_PLANNER_ROOT_DIR).unwrap_or_else(
        |_| {
            match PLANNER_ARGS.root_dir.clone() {
                Some(r) => r,
                None => DEFAULT_ROOT_DIR.to_string(),
            }
        });

    // Canonicalize the path.
    get_absolute_path(&root_dir)
}

// ***************************************************************************
//                               Log Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_log:
// ---------------------------------------------------------------------------
/** Initialize log4rs from the config directory's log4rs.yml, or with a plain
 * console logger at info level when that file does not exist.
 */
pub fn init_log(dirs: &PlannerDirs) -> Result<()> {
    let logconfig = dirs.log_config_file();
    if Path::new(&logconfig).exists() {
        log4rs::init_file(&logconfig, Default::default())
            .map_err(|e| anyhow!("{}: {}", Errors::Log4rsInitialization(logconfig.clone()), e))?;
        info!("Log4rs initialized using: {}", logconfig);
    } else {
        let stdout = ConsoleAppender::builder()
            .encoder(Box::new(PatternEncoder::new("{d(%Y-%m-%d %H:%M:%S)} {h({l})} {M} - {m}{n}")))
            .build();
        let config = LogConfig::builder()
            .appender(Appender::builder().build("stdout", Box::new(stdout)))
            .build(Root::builder().appender("stdout").build(LevelFilter::Info))
            .map_err(|e| anyhow!("{}: {}", Errors::Log4rsInitialization(logconfig.clone()), e))?;
        log4rs::init_config(config)
            .map_err(|e| anyhow!("{}: {}", Errors::Log4rsInitialization(logconfig.clone()), e))?;
        info!("No log configuration at {}, logging to the console.", logconfig);
    }
    Ok(())
}

/// ***************************************************************************
//                             Parms Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// get_parms:
// ---------------------------------------------------------------------------
/** Retrieve the application parameters from the configuration file in the
 * config directory.  A missing file means default values; a file that does
 * not parse is an error.
 */
fn get_parms(dirs: &PlannerDirs) -> Result<Parms> {
    let config_file = dirs.config_file();
    info!("{}", Errors::ReadingConfigFile(config_file.clone()));
    let contents = match fs::read_to_string(&config_file) {
        Ok(c) => c,
        Err(_) => {
            info!("Unable to read configuration at {}. Using default values.", config_file);
            return Ok(Parms { config_file: Default::default(), config: Config::new() });
        }
    };

    let config = parse_config(&contents).map_err(|e| {
        let msg = format!("{}\n   {}", Errors::TOMLParseError(config_file.clone()), e);
        error!("{}", msg);
        anyhow!(msg)
    })?;

    Ok(Parms { config_file, config })
}

// ---------------------------------------------------------------------------
// parse_config:
// ---------------------------------------------------------------------------
fn parse_config(contents: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(contents)
}

// ---------------------------------------------------------------------------
// get_api_key:
// ---------------------------------------------------------------------------
/** The provider credential is required; the server cannot do anything
 * useful without it.
 */
fn get_api_key(value: Option<String>) -> Result<String> {
    match value {
        Some(k) if !k.trim().is_empty() => Ok(k),
        _ => Err(Errors::MissingCredential(ENV_ORS_API_KEY.to_string()).into()),
    }
}

// ***************************************************************************
//                             Config Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_runtime_context:
// ---------------------------------------------------------------------------
pub fn init_runtime_context(dirs: PlannerDirs) -> Result<RuntimeCtx> {
    // If any of these fail the application aborts.
    let ors_api_key = get_api_key(env::var(ENV_ORS_API_KEY).ok())?;
    let parms = get_parms(&dirs)?;
    let pois_file = match &parms.config.pois_file {
        Some(f) => get_absolute_path(f),
        None => dirs.default_pois_file(),
    };
    Ok(RuntimeCtx {parms, dirs, pois_file, ors_api_key})
}
