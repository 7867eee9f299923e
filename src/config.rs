use std::path::PathBuf;
use std::time::Duration;

use crate::keys::FileKeyStore;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 180;
const DEFAULT_WIREFRAME_TIMEOUT_SECS: u64 = 60;

/// Client settings resolved from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_base_url: String,
    /// Applies to every request except the chat stream, which has no overall limit.
    pub request_timeout: Duration,
    pub wireframe_timeout: Duration,
    pub key_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            wireframe_timeout: Duration::from_secs(DEFAULT_WIREFRAME_TIMEOUT_SECS),
            key_file: FileKeyStore::default_path().unwrap_or_else(|| PathBuf::from("api_keys.json")),
        }
    }
}

impl Settings {
    /// Reads `PRD_API_BASE_URL`, `PRD_REQUEST_TIMEOUT_SECS`,
    /// `PRD_WIREFRAME_TIMEOUT_SECS` and `PRD_KEY_FILE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let secs = |name: &str, fallback: Duration| {
            lookup(name)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(fallback)
        };

        Self {
            api_base_url: lookup("PRD_API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty())
                .unwrap_or(defaults.api_base_url),
            request_timeout: secs("PRD_REQUEST_TIMEOUT_SECS", defaults.request_timeout),
            wireframe_timeout: secs("PRD_WIREFRAME_TIMEOUT_SECS", defaults.wireframe_timeout),
            key_file: lookup("PRD_KEY_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.key_file),
        }
    }

    pub fn key_store(&self) -> FileKeyStore {
        FileKeyStore::new(self.key_file.clone())
    }
}
