use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RevdictConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub swama: SwamaConfig,
    pub openai: OpenAiConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

/// Local inference server hosting the Qwen3 embedding and completion models.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SwamaConfig {
    pub enabled: bool,
    /// Base URL; `/v1/embeddings` and `/v1/chat/completions` are appended.
    pub endpoint: String,
    pub completion_model: String,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OpenAiConfig {
    pub enabled: bool,
    /// Full embeddings URL.
    pub endpoint: String,
    pub model: String,
    /// Minimum spacing between requests once the burst is spent. 0 disables throttling.
    pub rate_interval_ms: u64,
    pub burst: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_revdict_dir()
            .join("words.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for SwamaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "http://localhost:28100".into(),
            completion_model: "mlx-community/Qwen3-8B-4bit".into(),
            timeout_secs: 300,
            temperature: 0.7,
            max_tokens: 2048,
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "https://api.openai.com/v1/embeddings".into(),
            model: "text-embedding-3-large".into(),
            rate_interval_ms: 500,
            burst: 5,
            timeout_secs: 60,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

impl SwamaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl OpenAiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn rate_interval(&self) -> Duration {
        Duration::from_millis(self.rate_interval_ms)
    }
}

impl SearchConfig {
    /// Apply the default for a missing limit and clamp to `[1, max_limit]`.
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1))
    }
}

/// Returns `~/.revdict/`
pub fn default_revdict_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".revdict")
}

/// Returns the default config file path: `~/.revdict/config.toml`
pub fn default_config_path() -> PathBuf {
    default_revdict_dir().join("config.toml")
}

impl RevdictConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            RevdictConfig::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (REVDICT_DB, REVDICT_LOG_LEVEL, REVDICT_SWAMA_URL, REVDICT_PORT).
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("REVDICT_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("REVDICT_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("REVDICT_SWAMA_URL") {
            self.swama.endpoint = val;
        }
        if let Ok(val) = std::env::var("REVDICT_PORT") {
            self.server.port = val
                .parse()
                .with_context(|| format!("REVDICT_PORT is not a port number: {val}"))?;
        }
        Ok(())
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
