//! Configuration for the processing client
//!
//! Loaded from `client.toml`; every field has a built-in default so an
//! absent file or a partial file both work.
//!
//! # Settings Sources Priority (binary)
//!
//! 1. Command-line arguments (--api-url, --token, --config)
//! 2. Environment variables (VIDSHIELD_API_URL, VIDSHIELD_TOKEN, VIDSHIELD_CONFIG)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use vidshield_common::config::{load_toml_config, LoggingConfig};
use vidshield_common::Result;

/// Default config file name searched in the config directories
pub const CONFIG_FILE_NAME: &str = "client.toml";

/// Top-level client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Processing API root, e.g. `https://vidshield.example.com`
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default)]
    pub reconnect: ReconnectConfig,

    #[serde(default)]
    pub redirect: RedirectConfig,

    #[serde(default)]
    pub prefetch: PrefetchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Reconnection backoff settings
///
/// Delay before retry `n` (0-based) is `min(base_delay + n * step, max_delay)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_step_ms")]
    pub step_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Failures beyond this count are fatal
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

/// Completion and error redirect settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedirectConfig {
    /// Delay between `complete` and the redirect to the review route
    #[serde(default = "default_completion_delay_ms")]
    pub completion_delay_ms: u64,

    /// Countdown length (seconds) after a server-reported error
    #[serde(default = "default_error_countdown_seconds")]
    pub error_countdown_seconds: u32,

    /// Route opened when the error countdown reaches zero
    #[serde(default = "default_error_fallback_route")]
    pub error_fallback_route: String,

    /// Review route prefix used when `complete` carries no redirect_url
    #[serde(default = "default_review_route_prefix")]
    pub review_route_prefix: String,
}

/// Violations prefetch paging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefetchConfig {
    #[serde(default = "default_page")]
    pub page: u32,

    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_api_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_step_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_max_attempts() -> u32 {
    10
}

fn default_completion_delay_ms() -> u64 {
    2000
}

fn default_error_countdown_seconds() -> u32 {
    5
}

fn default_error_fallback_route() -> String {
    "/upload".to_string()
}

fn default_review_route_prefix() -> String {
    "/review".to_string()
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    100
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            reconnect: ReconnectConfig::default(),
            redirect: RedirectConfig::default(),
            prefetch: PrefetchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            step_ms: default_step_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            completion_delay_ms: default_completion_delay_ms(),
            error_countdown_seconds: default_error_countdown_seconds(),
            error_fallback_route: default_error_fallback_route(),
            review_route_prefix: default_review_route_prefix(),
        }
    }
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl RedirectConfig {
    pub fn completion_delay(&self) -> Duration {
        Duration::from_millis(self.completion_delay_ms)
    }

    /// Review route for a video when the server sent none
    pub fn review_route(&self, video_id: &str) -> String {
        format!("{}/{}", self.review_route_prefix.trim_end_matches('/'), video_id)
    }
}

impl ClientConfig {
    /// Load configuration from an explicit file or the default locations
    ///
    /// Missing file → defaults (with a warning). Unparsable file → `Error::Config`.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        load_toml_config(explicit, CONFIG_FILE_NAME)
    }
}
