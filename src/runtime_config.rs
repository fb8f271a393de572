//! # Runtime Configuration Module
//!
//! Application options, loaded from environment variables or a YAML file.
//!
//! ## Environment Variables
//!
//! | Variable               | Field          | Default    |
//! |------------------------|----------------|------------|
//! | `CHAINR_SERVER_NAME`   | `server_name`  | empty      |
//! | `CHAINR_DEBUG`         | `debug`        | `false`    |
//! | `CHAINR_ETAG`          | `etag`         | `false`    |
//! | `CHAINR_HEALTH_CHECK`  | `health_check` | `true`     |
//! | `CHAINR_VIEWS_DIR`     | `views_dir`    | unset      |
//! | `CHAINR_VIEWS_EXT`     | `views_ext`    | `.html`    |
//! | `CHAINR_VIEWS_LAYOUT`  | `views_layout` | unset      |
//! | `CHAINR_STACK_SIZE`    | `stack_size`   | `0x10000`  |
//!
//! `CHAINR_STACK_SIZE` accepts decimal (`65536`) or hexadecimal (`0x10000`).
//! Booleans accept `1`, `true`, `yes` and `on` (case-insensitive).
//!
//! ## YAML
//!
//! ```yaml
//! server_name: chainrouter
//! etag: true
//! views_dir: ./views
//! views_layout: layout
//! ```
//!
//! Missing keys take their defaults. A configuration file replaces the
//! environment entirely; it is not merged with it.

use anyhow::Context as _;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// Default coroutine stack size (64 KB)
pub const DEFAULT_STACK_SIZE: usize = 0x10000;

/// Application-wide options
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Value for the `Server` response header; empty disables the header
    pub server_name: String,
    /// Log one line per request and print the route table at startup
    pub debug: bool,
    /// Compute an ETag after every handler and answer conditional GETs with 304
    pub etag: bool,
    /// Register `GET /check` answering `ok`
    pub health_check: bool,
    /// Directory for the built-in template engine
    pub views_dir: Option<PathBuf>,
    /// Template file extension
    pub views_ext: String,
    /// Default layout template
    pub views_layout: Option<String>,
    /// Coroutine stack size in bytes
    pub stack_size: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            server_name: String::new(),
            debug: false,
            etag: false,
            health_check: true,
            views_dir: None,
            views_ext: ".html".to_string(),
            views_layout: None,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl Options {
    /// Load options from `CHAINR_*` environment variables
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_name: env::var("CHAINR_SERVER_NAME").unwrap_or(defaults.server_name),
            debug: env_flag("CHAINR_DEBUG").unwrap_or(defaults.debug),
            etag: env_flag("CHAINR_ETAG").unwrap_or(defaults.etag),
            health_check: env_flag("CHAINR_HEALTH_CHECK").unwrap_or(defaults.health_check),
            views_dir: env::var("CHAINR_VIEWS_DIR").ok().map(PathBuf::from),
            views_ext: env::var("CHAINR_VIEWS_EXT").unwrap_or(defaults.views_ext),
            views_layout: env::var("CHAINR_VIEWS_LAYOUT").ok(),
            stack_size: env::var("CHAINR_STACK_SIZE")
                .ok()
                .and_then(|v| parse_size(&v))
                .unwrap_or(defaults.stack_size),
        }
    }

    /// Load options from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid YAML.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_yaml_str(&raw).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Parse options from a YAML document
    ///
    /// # Errors
    ///
    /// Returns the YAML error.
    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }
}

/// Parse a byte size in decimal or `0x` hexadecimal
#[must_use]
pub fn parse_size(value: &str) -> Option<usize> {
    let value = value.trim();
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name).ok().map(|v| {
        matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}
