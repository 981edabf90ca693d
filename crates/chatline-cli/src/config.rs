//! Configuration file support

use chatline_ai::models;
use chatline_core::DEFAULT_MAX_TOKENS;
use chatline_core::session::DEFAULT_SYSTEM_PROMPT;
use chatline_store::StoreConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for chatline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Models offered when starting a conversation
    pub models: Vec<String>,
    /// Response length cap per completion
    pub max_tokens: u32,
    /// System prompt used when the prompt screen is left empty
    pub system_prompt: String,
    /// OpenAI-compatible endpoint
    pub base_url: String,
    /// API key file, defaults to `<config dir>/key`
    pub key_file: Option<PathBuf>,
    pub store: StoreSection,
}

/// `[store]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Document root, defaults to `<data dir>/conversations`
    pub root: Option<PathBuf>,
    pub bucket: String,
    pub scope: String,
    pub collection: String,
    pub ready_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            models: models::default_models(),
            max_tokens: DEFAULT_MAX_TOKENS,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            base_url: chatline_ai::providers::openai::DEFAULT_BASE_URL.to_string(),
            key_file: None,
            store: StoreSection::default(),
        }
    }
}

impl Default for StoreSection {
    fn default() -> Self {
        let defaults = StoreConfig::default();
        Self {
            root: None,
            bucket: defaults.bucket,
            scope: defaults.scope,
            collection: defaults.collection,
            ready_timeout_secs: defaults.ready_timeout.as_secs(),
        }
    }
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chatline")
    }

    /// Directory for the log file and the default document root
    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chatline")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        // Check for CHATLINE_CONFIG_PATH env var first
        if let Ok(path) = std::env::var("CHATLINE_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from the default location
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from a file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        let config = match fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<Config>(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to parse config file");
                    return Self::default();
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read config file");
                return Self::default();
            }
        };

        for model in config.models.iter().filter(|m| !models::is_chat_model(m)) {
            tracing::warn!(model = %model, "configured model does not look like a chat model");
        }
        config
    }

    pub fn key_path(&self) -> PathBuf {
        self.key_file
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("key"))
    }

    pub fn store_root(&self) -> PathBuf {
        self.store
            .root
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("conversations"))
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            bucket: self.store.bucket.clone(),
            scope: self.store.scope.clone(),
            collection: self.store.collection.clone(),
            ready_timeout: Duration::from_secs(self.store.ready_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.max_tokens, 100);
        assert_eq!(config.system_prompt, "You are a helpful assistant");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert!(config.models.iter().any(|m| m == "gpt-3.5-turbo"));

        let store = config.store_config();
        assert_eq!(store.bucket, "conversations");
        assert_eq!(store.scope, "_default");
        assert_eq!(store.collection, "_default");
        assert_eq!(store.ready_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
models = ["gpt-4"]
max_tokens = 256
key_file = "/tmp/chatline-key"

[store]
root = "/tmp/chatline-store"
bucket = "archive"
ready_timeout_secs = 1
"#,
        )
        .unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.models, vec!["gpt-4"]);
        assert_eq!(config.max_tokens, 256);
        assert_eq!(config.system_prompt, "You are a helpful assistant");
        assert_eq!(config.key_path(), PathBuf::from("/tmp/chatline-key"));
        assert_eq!(config.store_root(), PathBuf::from("/tmp/chatline-store"));

        let store = config.store_config();
        assert_eq!(store.bucket, "archive");
        assert_eq!(store.collection, "_default");
        assert_eq!(store.ready_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "max_tokens = \"lots\"").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_serializes_back() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
