// src/config.rs
// Environment-based configuration - single source of truth for all env vars

use crate::error::{KitError, Result};
use std::path::PathBuf;
use tracing::debug;

pub const DEFAULT_DRAFTS_DIR: &str = "./drafts";
pub const DEFAULT_APPROVAL_MAX_AGE_SECS: u64 = 3600;

/// Startup configuration, loaded once and immutable afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    /// Kit API key (KIT_API_KEY, required)
    pub api_key: String,
    /// Kit API base URL (KIT_API_URL)
    pub api_url: String,
    /// Directory holding local draft files (KIT_DRAFTS_DIR)
    pub drafts_dir: PathBuf,
    /// Optional JSON policy table (KIT_POLICY_FILE); built-in defaults otherwise
    pub policy_file: Option<PathBuf>,
    /// Maximum age of a pending approval (KIT_APPROVAL_MAX_AGE_SECS)
    pub approval_max_age_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A missing API key is a configuration failure: the process refuses to
    /// start rather than serving tools that cannot reach the Kit API.
    pub fn from_env() -> Result<Self> {
        let api_key = read_var("KIT_API_KEY").ok_or_else(|| {
            KitError::Config("KIT_API_KEY environment variable is required".to_string())
        })?;

        let api_url =
            read_var("KIT_API_URL").unwrap_or_else(|| crate::kit::DEFAULT_API_URL.to_string());

        let drafts_dir = read_var("KIT_DRAFTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DRAFTS_DIR));

        let policy_file = read_var("KIT_POLICY_FILE").map(PathBuf::from);

        let approval_max_age_secs = match read_var("KIT_APPROVAL_MAX_AGE_SECS") {
            Some(raw) => raw.parse().map_err(|_| {
                KitError::Config(format!(
                    "KIT_APPROVAL_MAX_AGE_SECS must be a number of seconds, got '{raw}'"
                ))
            })?,
            None => DEFAULT_APPROVAL_MAX_AGE_SECS,
        };

        debug!(
            api_url = %api_url,
            drafts_dir = %drafts_dir.display(),
            approval_max_age_secs,
            "configuration loaded"
        );

        Ok(Self {
            api_key,
            api_url,
            drafts_dir,
            policy_file,
            approval_max_age_secs,
        })
    }
}

/// Read a single environment variable, filtering empty values.
fn read_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
