pub mod interactive;


pub use interactive::{run_interactive_config, show_config};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub ollama: OllamaConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the qa.db produced by the ingestion pipeline.
    /// Defaults to `<config dir>/qa.db` when unset.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OllamaConfig {
    pub host: String,
    pub port: u16,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// Which stored vector variant to index: question or answer embeddings.
    pub which_vec: VectorVariant,
    /// Raw candidate pool pulled from the index per query.
    pub top_n: usize,
    /// Number of records returned to the caller.
    pub final_k: usize,
    /// Minimum best-candidate similarity for a query to be accepted.
    pub sem_thr: f32,
    /// Persist query embeddings to the database cache.
    pub cache_queries: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VectorVariant {
    #[serde(rename = "q")]
    Question,
    #[serde(rename = "a")]
    Answer,
}

impl VectorVariant {
    /// Column of `qa_vec` that holds this variant.
    #[inline]
    pub fn column(self) -> &'static str {
        match self {
            VectorVariant::Question => "q_vec",
            VectorVariant::Answer => "a_vec",
        }
    }
}

impl FromStr for VectorVariant {
    type Err = ConfigError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "q" | "question" => Ok(VectorVariant::Question),
            "a" | "answer" => Ok(VectorVariant::Answer),
            other => Err(ConfigError::InvalidVariant(other.to_string())),
        }
    }
}

impl std::fmt::Display for VectorVariant {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            VectorVariant::Question => write!(f, "q"),
            VectorVariant::Answer => write!(f, "a"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid model name: {0:?} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid vector variant: {0:?} (expected 'q' or 'a')")]
    InvalidVariant(String),
    #[error("Invalid similarity threshold: {0} (must be between -1.0 and 1.0)")]
    InvalidThreshold(f32),
    #[error("Invalid pool sizes: top_n={top_n} final_k={final_k} (need top_n >= final_k >= 1)")]
    InvalidPoolSizes { top_n: usize, final_k: usize },
    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnvValue { var: String, value: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            ollama: OllamaConfig {
                host: "localhost".to_string(),
                port: 11434,
                model: "nomic-embed-text:latest".to_string(),
            },
            search: SearchConfig::default(),
        }
    }
}

impl Default for SearchConfig {
    #[inline]
    fn default() -> Self {
        Self {
            which_vec: VectorVariant::Question,
            top_n: 50,
            final_k: 5,
            sem_thr: 0.55,
            cache_queries: true,
        }
    }
}

impl Config {
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".faq-search"))
            .or({
                #[cfg(windows)]
                {
                    dirs::data_dir().map(|data| data.join("faq-search"))
                }
                #[cfg(not(windows))]
                {
                    None
                }
            })
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load the config file (falling back to defaults when absent), then
    /// apply environment overrides and validate.
    #[inline]
    pub fn load() -> Result<Self> {
        let config_path =
            Self::config_file_path().context("Failed to determine config file path")?;

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;

            toml::from_str(&content).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?
        } else {
            Self::default()
        };

        config
            .apply_env_overrides()
            .context("Failed to apply environment overrides")?;

        config
            .validate()
            .context("Configuration validation failed")?;

        Ok(config)
    }

    /// Environment variables recognized by the service. File settings lose
    /// to the environment so deployments can retune without editing TOML.
    #[inline]
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(model) = std::env::var("ST_MODEL_NAME")
            && !model.trim().is_empty()
        {
            self.ollama.model = model;
        }

        if let Ok(raw) = std::env::var("WHICH_VEC") {
            self.search.which_vec = raw.parse()?;
        }

        if let Ok(raw) = std::env::var("TOP_N") {
            self.search.top_n = parse_env("TOP_N", &raw)?;
        }

        if let Ok(raw) = std::env::var("FINAL_K") {
            self.search.final_k = parse_env("FINAL_K", &raw)?;
        }

        if let Ok(raw) = std::env::var("SEM_THR") {
            self.search.sem_thr = parse_env("SEM_THR", &raw)?;
        }

        if let Ok(raw) = std::env::var("CACHE_QUERY_EMB") {
            self.search.cache_queries = match raw.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::InvalidEnvValue {
                        var: "CACHE_QUERY_EMB".to_string(),
                        value: raw,
                    });
                }
            };
        }

        if let Ok(path) = std::env::var("FAQ_DB_PATH")
            && !path.trim().is_empty()
        {
            self.database.path = Some(PathBuf::from(path));
        }

        Ok(())
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = Self::config_dir().context("Failed to determine config directory")?;

        fs::create_dir_all(&config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = config_dir.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;
        self.search.validate()
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("http://{}:{}", self.ollama.host, self.ollama.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }

    /// Resolved database path: explicit setting or `<config dir>/qa.db`.
    #[inline]
    pub fn db_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.database.path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::config_dir()?.join("qa.db")),
        }
    }
}

impl OllamaConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        let url_str = format!("http://{}:{}", self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))?;

        Ok(())
    }
}

impl SearchConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.final_k == 0 || self.top_n < self.final_k {
            return Err(ConfigError::InvalidPoolSizes {
                top_n: self.top_n,
                final_k: self.final_k,
            });
        }

        if !(-1.0..=1.0).contains(&self.sem_thr) {
            return Err(ConfigError::InvalidThreshold(self.sem_thr));
        }

        Ok(())
    }
}

fn parse_env<T: FromStr>(var: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidEnvValue {
        var: var.to_string(),
        value: raw.to_string(),
    })
}

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<PathBuf, ConfigError> {
    Config::config_dir()
}
