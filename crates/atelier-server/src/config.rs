//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Admissions desk settings.
    #[serde(default)]
    pub admissions: AdmissionsConfig,

    /// Upload handling settings.
    #[serde(default)]
    pub uploads: UploadsConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,

    /// How long a request waits for a session before failing with 503.
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "atelier_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// A single entry in the student directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StudentRecord {
    pub id: i64,
    pub name: String,
}

/// Admissions desk configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AdmissionsConfig {
    /// Seed for the decision RNG. Unset means seeded from OS entropy.
    #[serde(default)]
    pub decision_seed: Option<u64>,

    /// Students known to the lookup endpoint.
    #[serde(default = "default_students")]
    pub students: Vec<StudentRecord>,
}

/// Upload handling configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadsConfig {
    /// Parts larger than this are rolled over from memory to a temp file.
    #[serde(default = "default_spool_threshold_bytes")]
    pub spool_threshold_bytes: usize,

    /// Maximum accepted request body for the form routes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    8000
}

fn default_db_path() -> String {
    "atelier.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    atelier_db::DbRuntimeSettings::default().busy_timeout_ms
}

fn default_pool_max_size() -> u32 {
    atelier_db::DbRuntimeSettings::default().pool_max_size
}

fn default_acquire_timeout_ms() -> u64 {
    atelier_db::DbRuntimeSettings::default().acquire_timeout_ms
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_students() -> Vec<StudentRecord> {
    vec![
        StudentRecord {
            id: 1235,
            name: "Bobby Fischer".to_string(),
        },
        StudentRecord {
            id: 252,
            name: "Alice Mcqueen".to_string(),
        },
    ]
}

fn default_spool_threshold_bytes() -> usize {
    1024 * 1024
}

fn default_max_body_bytes() -> usize {
    50 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
        }
    }
}

impl DatabaseConfig {
    /// The pool tunables carried by this section.
    pub fn runtime_settings(&self) -> atelier_db::DbRuntimeSettings {
        atelier_db::DbRuntimeSettings {
            busy_timeout_ms: self.busy_timeout_ms,
            pool_max_size: self.pool_max_size,
            acquire_timeout_ms: self.acquire_timeout_ms,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for AdmissionsConfig {
    fn default() -> Self {
        Self {
            decision_seed: None,
            students: default_students(),
        }
    }
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            spool_threshold_bytes: default_spool_threshold_bytes(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `ATELIER_HOST` overrides `server.host`
/// - `ATELIER_PORT` overrides `server.port`
/// - `ATELIER_DB_PATH` overrides `database.path`
/// - `ATELIER_LOG_LEVEL` overrides `logging.level`
/// - `ATELIER_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `ATELIER_DECISION_SEED` overrides `admissions.decision_seed`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => parse_config(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    if let Ok(host) = std::env::var("ATELIER_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("ATELIER_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(db_path) = std::env::var("ATELIER_DB_PATH") {
        config.database.path = db_path;
    }
    if let Ok(level) = std::env::var("ATELIER_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("ATELIER_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Ok(seed) = std::env::var("ATELIER_DECISION_SEED") {
        if let Ok(parsed) = seed.parse() {
            config.admissions.decision_seed = Some(parsed);
        }
    }

    Ok(config)
}

/// Parses configuration from TOML text. Missing sections and keys take
/// their defaults.
pub fn parse_config(contents: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(contents)?)
}
