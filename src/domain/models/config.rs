//! Application configuration model.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for pagecap
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Capability cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Discovery pipeline configuration
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// Persistent cache time-to-live in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// In-memory scan cache time-to-live in seconds
    #[serde(default = "default_scan_cache_ttl_secs")]
    pub scan_cache_ttl_secs: u64,

    /// Maximum number of in-memory scan cache entries
    #[serde(default = "default_scan_cache_capacity")]
    pub scan_cache_capacity: u64,
}

const fn default_ttl_secs() -> u64 {
    24 * 60 * 60
}

const fn default_scan_cache_ttl_secs() -> u64 {
    5
}

const fn default_scan_cache_capacity() -> u64 {
    256
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            scan_cache_ttl_secs: default_scan_cache_ttl_secs(),
            scan_cache_capacity: default_scan_cache_capacity(),
        }
    }
}

/// Discovery pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DiscoveryConfig {
    /// How many levels of embedded subtrees to descend into
    #[serde(default = "default_max_embed_depth")]
    pub max_embed_depth: usize,

    /// Capabilities below this confidence are dropped after merge
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Quiet window before a burst of mutations triggers one rescan
    #[serde(default = "default_mutation_debounce_ms")]
    pub mutation_debounce_ms: u64,
}

const fn default_max_embed_depth() -> usize {
    3
}

const fn default_min_confidence() -> f64 {
    0.3
}

const fn default_mutation_debounce_ms() -> u64 {
    300
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_embed_depth: default_max_embed_depth(),
            min_confidence: default_min_confidence(),
            mutation_debounce_ms: default_mutation_debounce_ms(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".pagecap/pagecap.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Rotation for file output: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
