//! Provider API keys chosen by the user.
//!
//! The service runs requests against the user's own AI account when the
//! request carries `X-AI-Provider` / `X-AI-API-Key`. Keys are stored as a
//! small JSON document and threaded explicitly into [`crate::api::ApiClient`].

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::errors::AppError;

pub const PROVIDER_HEADER: &str = "X-AI-Provider";
pub const API_KEY_HEADER: &str = "X-AI-API-Key";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    Gemini,
    Openai,
    Claude,
    Deepseek,
}

impl AiProvider {
    pub const ALL: [AiProvider; 4] = [
        AiProvider::Gemini,
        AiProvider::Openai,
        AiProvider::Claude,
        AiProvider::Deepseek,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AiProvider::Gemini => "gemini",
            AiProvider::Openai => "openai",
            AiProvider::Claude => "claude",
            AiProvider::Deepseek => "deepseek",
        }
    }
}

impl std::fmt::Display for AiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claude: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deepseek: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<AiProvider>,
}

impl ApiKeys {
    fn slot(&self, provider: AiProvider) -> &Option<String> {
        match provider {
            AiProvider::Gemini => &self.gemini,
            AiProvider::Openai => &self.openai,
            AiProvider::Claude => &self.claude,
            AiProvider::Deepseek => &self.deepseek,
        }
    }

    fn slot_mut(&mut self, provider: AiProvider) -> &mut Option<String> {
        match provider {
            AiProvider::Gemini => &mut self.gemini,
            AiProvider::Openai => &mut self.openai,
            AiProvider::Claude => &mut self.claude,
            AiProvider::Deepseek => &mut self.deepseek,
        }
    }

    pub fn key_for(&self, provider: AiProvider) -> Option<&str> {
        self.slot(provider).as_deref().filter(|k| !k.is_empty())
    }

    /// Stores `key`, or removes the provider's key when `key` is `None`.
    pub fn set_key(&mut self, provider: AiProvider, key: Option<String>) {
        *self.slot_mut(provider) = key.filter(|k| !k.trim().is_empty());
    }

    /// The configured default provider, Gemini when none was chosen.
    pub fn default_provider(&self) -> AiProvider {
        self.default_provider.unwrap_or(AiProvider::Gemini)
    }

    pub fn has_key(&self, provider: AiProvider) -> bool {
        self.key_for(provider).is_some()
    }

    pub fn has_any_key(&self) -> bool {
        AiProvider::ALL.iter().any(|p| self.has_key(*p))
    }

    /// Header values to attach to outgoing requests, if the default
    /// provider has a key.
    pub fn request_headers(&self) -> Option<(AiProvider, &str)> {
        let provider = self.default_provider();
        self.key_for(provider).map(|key| (provider, key))
    }
}

/// Shows the first and last four characters of a key.
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() < 8 {
        return "••••••••".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}••••{tail}")
}

/// Persistence for [`ApiKeys`].
pub trait KeyStore {
    fn load(&self) -> Result<ApiKeys, AppError>;
    fn save(&self, keys: &ApiKeys) -> Result<(), AppError>;
    fn clear(&self) -> Result<(), AppError>;
}

/// Stores keys as JSON in a single file.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/prd-studio/api_keys.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("prd-studio").join("api_keys.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> AppError {
        AppError::KeyStoreIo {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl KeyStore for FileKeyStore {
    /// Missing or unreadable content loads as an empty configuration.
    fn load(&self) -> Result<ApiKeys, AppError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ApiKeys::default()),
            Err(e) => return Err(self.io_error(e)),
        };

        match serde_json::from_str(&content) {
            Ok(keys) => Ok(keys),
            Err(e) => {
                error!("Failed to load API keys from {}: {e}", self.path.display());
                Ok(ApiKeys::default())
            }
        }
    }

    fn save(&self, keys: &ApiKeys) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let json = serde_json::to_string_pretty(keys)
            .map_err(|e| AppError::Unexpected(format!("Failed to serialize API keys: {e}")))?;
        fs::write(&self.path, json).map_err(|e| self.io_error(e))?;
        info!("Saved API keys to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), AppError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_provider_falls_back_to_gemini() {
        assert_eq!(ApiKeys::default().default_provider(), AiProvider::Gemini);
    }

    #[test]
    fn request_headers_require_a_key_for_the_default_provider() {
        let mut keys = ApiKeys::default();
        keys.set_key(AiProvider::Claude, Some("sk-claude".into()));
        assert_eq!(keys.request_headers(), None);

        keys.default_provider = Some(AiProvider::Claude);
        assert_eq!(keys.request_headers(), Some((AiProvider::Claude, "sk-claude")));
    }

    #[test]
    fn blank_keys_are_not_stored() {
        let mut keys = ApiKeys::default();
        keys.set_key(AiProvider::Openai, Some("  ".into()));
        assert!(!keys.has_any_key());
        keys.set_key(AiProvider::Openai, Some("sk-1".into()));
        assert!(keys.has_key(AiProvider::Openai));
        keys.set_key(AiProvider::Openai, None);
        assert!(!keys.has_any_key());
    }

    #[test]
    fn masks_keys() {
        assert_eq!(mask_api_key("sk-abcdefgh1234"), "sk-a••••1234");
        assert_eq!(mask_api_key("short"), "••••••••");
    }

    #[test]
    fn json_layout_uses_camel_case_default_provider() {
        let keys = ApiKeys {
            deepseek: Some("ds".into()),
            default_provider: Some(AiProvider::Deepseek),
            ..Default::default()
        };
        let json = serde_json::to_value(&keys).unwrap();
        assert_eq!(json, serde_json::json!({ "deepseek": "ds", "defaultProvider": "deepseek" }));
    }

    #[test]
    fn file_store_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path().join("nested").join("keys.json"));
        assert_eq!(store.load().unwrap(), ApiKeys::default());

        let mut keys = ApiKeys::default();
        keys.set_key(AiProvider::Gemini, Some("g-123456789".into()));
        store.save(&keys).unwrap();
        assert_eq!(store.load().unwrap(), keys);

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), ApiKeys::default());
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(FileKeyStore::new(path).load().unwrap(), ApiKeys::default());
    }
}
