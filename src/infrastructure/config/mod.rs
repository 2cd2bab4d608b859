use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::infrastructure::security::keyring::KeyringManager;

pub const CONFIG_FILE: &str = "picklist.toml";
pub const ENV_PREFIX: &str = "PICKLIST_";
const KEYRING_SERVICE: &str = "FrcPicklist";
const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Uploaded sheets land here.
    pub data_dir: PathBuf,
    /// Parent of the `storage_<file name>` history stores.
    pub storage_root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Sessions untouched for this long are dropped.
    pub idle_ttl_secs: u64,
    pub max_sessions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub sessions: SessionConfig,
    pub llm: LLMConfig,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3001,
            },
            storage: StorageConfig {
                data_dir: PathBuf::from("data"),
                storage_root: PathBuf::from("."),
            },
            sessions: SessionConfig {
                idle_ttl_secs: 4 * 60 * 60,
                max_sessions: 64,
            },
            llm: LLMConfig::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults, then `picklist.toml`, then `PICKLIST_*` variables
    /// (`PICKLIST_LLM__MODEL=gpt-4o-mini`).
    pub fn load() -> Result<Self> {
        Self::figment(Figment::from(Serialized::defaults(AppConfig::default())))
            .extract()
            .map_err(|e| AppError::ConfigError(e.to_string()))
    }

    fn figment(base: Figment) -> Figment {
        base.merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

/// Resolves the API key an engine call should use.
pub struct ConfigService {
    keyring: KeyringManager,
}

impl ConfigService {
    pub fn new() -> Self {
        Self {
            keyring: KeyringManager::new(KEYRING_SERVICE),
        }
    }

    pub fn save_api_key(&self, provider: &str, key: &str) -> Result<()> {
        self.keyring.set_secret(provider, key)
    }

    /// Session override, then config, then `OPENAI_API_KEY`, then keyring.
    pub fn resolve_api_key(
        &self,
        config: &LLMConfig,
        session_key: Option<&str>,
    ) -> Result<Option<String>> {
        let non_blank = |key: &str| {
            let key = key.trim();
            (!key.is_empty()).then(|| key.to_string())
        };

        if let Some(key) = session_key.and_then(non_blank) {
            return Ok(Some(key));
        }
        if let Some(key) = config.api_key.as_deref().and_then(non_blank) {
            return Ok(Some(key));
        }
        if let Some(key) = std::env::var(OPENAI_KEY_ENV).ok().as_deref().and_then(non_blank) {
            return Ok(Some(key));
        }

        match self.keyring.get_secret(&provider_key(config)) {
            Ok(key) => Ok(key),
            Err(e) => {
                tracing::warn!(error = %e, "Keyring lookup failed");
                Ok(None)
            }
        }
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

fn provider_key(config: &LLMConfig) -> String {
    format!("{:?}", config.provider).to_lowercase()
}
