// src/config.rs
//! Immutable service configuration.
//!
//! Values come from the process environment, optionally layered over a flat
//! TOML file whose keys are the same variable names:
//! 1) $SYNC_CONFIG_PATH
//! 2) config/sync.toml
//!
//! Environment variables always win over the file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::RetryPolicy;

pub const ENV_CONFIG_PATH: &str = "SYNC_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/sync.toml";
pub const DEFAULT_RAINDROP_API_BASE: &str = "https://api.raindrop.io/rest/v1";

const REQUIRED: [(&str, &str); 6] = [
    ("RAINDROP_TOKEN", "Raindrop API token"),
    ("WP_USERNAME", "WordPress username"),
    ("WP_APP_PASSWORD", "WordPress application password"),
    ("WP_ENDPOINT", "WordPress REST API endpoint"),
    ("TRIGGER_TOKEN", "API trigger token"),
    ("RAINDROP_TAG", "Raindrop tag to sync"),
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {names}. Please set the following environment variables: {}", .keys.join(", "))]
    Missing { names: String, keys: Vec<String> },
    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("reading config file {path}: {reason}")]
    File { path: PathBuf, reason: String },
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub raindrop_token: String,
    pub raindrop_tag: String,
    pub raindrop_api_base: String,
    pub wp_username: String,
    pub wp_app_password: String,
    pub wp_endpoint: String,
    pub trigger_token: String,
    pub max_retries: u32,
    pub request_timeout: Duration,
    pub max_items_per_sync: u32,
    pub error_retention_days: u32,
    pub dry_run: bool,
    pub sync_interval: Duration,
    pub state_file: PathBuf,
}

impl SyncConfig {
    /// Build from any key lookup (env, file, test map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let missing: Vec<(&str, &str)> = REQUIRED
            .iter()
            .copied()
            .filter(|(key, _)| get(*key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing {
                names: missing.iter().map(|(_, n)| *n).collect::<Vec<_>>().join(", "),
                keys: missing.iter().map(|(k, _)| k.to_string()).collect(),
            });
        }

        let required = |key: &str| get(key).map(|v| v.trim().to_string()).unwrap_or_default();
        let wp_endpoint = required("WP_ENDPOINT");
        validate_wp_endpoint(&wp_endpoint)?;

        Ok(Self {
            raindrop_token: required("RAINDROP_TOKEN"),
            raindrop_tag: required("RAINDROP_TAG"),
            raindrop_api_base: get("RAINDROP_API_BASE")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_RAINDROP_API_BASE.to_string()),
            wp_username: required("WP_USERNAME"),
            wp_app_password: required("WP_APP_PASSWORD"),
            wp_endpoint,
            trigger_token: required("TRIGGER_TOKEN"),
            max_retries: parse_number(get("MAX_RETRIES"), 3) as u32,
            request_timeout: Duration::from_millis(parse_number(get("REQUEST_TIMEOUT"), 30_000)),
            max_items_per_sync: parse_number(get("MAX_ITEMS_PER_SYNC"), 50) as u32,
            error_retention_days: parse_number(get("ERROR_RETENTION_DAYS"), 30) as u32,
            dry_run: parse_bool(get("DRY_RUN"), false),
            sync_interval: Duration::from_secs(parse_number(get("SYNC_INTERVAL_SECS"), 900).max(1)),
            state_file: get("STATE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/state.json")),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Environment layered over an explicit TOML file.
    pub fn from_env_and_file(path: &Path) -> Result<Self, ConfigError> {
        let file = load_file_values(path)?;
        Self::from_lookup(|k| std::env::var(k).ok().or_else(|| file.get(k).cloned()))
    }

    /// $SYNC_CONFIG_PATH, then `config/sync.toml`, then environment only.
    pub fn load_default() -> Result<Self, ConfigError> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(ConfigError::File {
                    path: pb,
                    reason: format!("{ENV_CONFIG_PATH} points to non-existent path"),
                });
            }
            return Self::from_env_and_file(&pb);
        }
        let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            return Self::from_env_and_file(&default_path);
        }
        Self::from_env()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default().with_max_retries(self.max_retries)
    }

    pub fn error_retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.error_retention_days))
    }
}

fn load_file_values(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let file_err = |reason: String| ConfigError::File {
        path: path.to_path_buf(),
        reason,
    };
    let content = fs::read_to_string(path).map_err(|e| file_err(e.to_string()))?;
    let table: toml::Table = toml::from_str(&content).map_err(|e| file_err(e.to_string()))?;

    let mut out = HashMap::with_capacity(table.len());
    for (key, value) in table {
        let text = match value {
            toml::Value::String(s) => s,
            toml::Value::Integer(i) => i.to_string(),
            toml::Value::Float(f) => f.to_string(),
            toml::Value::Boolean(b) => b.to_string(),
            other => return Err(file_err(format!("{key}: unsupported value {other}"))),
        };
        out.insert(key.to_ascii_uppercase(), text);
    }
    Ok(out)
}

fn validate_wp_endpoint(endpoint: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        field: "WP_ENDPOINT",
        reason: reason.to_string(),
    };
    let rest = endpoint
        .strip_prefix("https://")
        .or_else(|| endpoint.strip_prefix("http://"))
        .ok_or_else(|| invalid("WordPress endpoint must be a valid HTTP/HTTPS URL"))?;

    let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(invalid("WordPress endpoint must be a valid URL"));
    }
    if !format!("/{path}").contains("/wp-json/") {
        return Err(invalid(
            "WordPress endpoint must include '/wp-json/' path (e.g., https://example.com/wp-json/wp/v2/posts)",
        ));
    }
    Ok(())
}

/// Blank, non-numeric or negative values fall back to the default.
fn parse_number(value: Option<String>, default: u64) -> u64 {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|n| *n >= 0)
        .map(|n| n as u64)
        .unwrap_or(default)
}

fn parse_bool(value: Option<String>, default: bool) -> bool {
    match value {
        None => default,
        Some(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
    }
}
