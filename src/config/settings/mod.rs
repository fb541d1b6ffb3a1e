
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::embeddings::ollama::DEFAULT_EMBEDDING_DIMENSION;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Connection settings for the Ollama embedding server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub embedding_dimension: u32,
}

/// Settings for the OpenAI-compatible chat completion endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompletionConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            model: "all-minilm:latest".to_string(),
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1/".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 500,
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_seconds: 120,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 3 }
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
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid max tokens: {0} (must be between 1 and 16384)")]
    InvalidMaxTokens(u32),
    #[error("Invalid completion timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid API key variable: {0:?} (cannot be empty)")]
    InvalidApiKeyEnv(String),
    #[error("Invalid top_k: {0} (must be between 1 and 100)")]
    InvalidTopK(usize),
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
            ollama: OllamaConfig::default(),
            completion: CompletionConfig::default(),
            retrieval: RetrievalConfig::default(),
            base_dir: Self::default_dir().unwrap_or_else(|_| PathBuf::from(".docusense")),
        }
    }
}

impl Config {
    /// Default data directory, `~/.docusense`
    #[inline]
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".docusense"))
            .or({
                #[cfg(windows)]
                {
                    dirs::data_dir().map(|data| data.join("docusense"))
                }
                #[cfg(not(windows))]
                {
                    None
                }
            })
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;
        self.completion.validate()?;
        self.retrieval.validate()?;
        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    /// Directory holding every collection of the vector database
    #[inline]
    pub fn vector_database_path(&self) -> PathBuf {
        self.get_base_dir().join("vectors")
    }

    /// Directory holding the OCR detection and recognition models
    #[inline]
    pub fn ocr_models_path(&self) -> PathBuf {
        self.get_base_dir().join("models")
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        self.ollama.ollama_url()
    }
}

const EMBEDDING_DIMENSIONS: RangeInclusive<u32> = 64..=4096;
const MAX_TOKENS: RangeInclusive<u32> = 1..=16384;
const TIMEOUT_SECONDS: RangeInclusive<u64> = 1..=600;
const TOP_K: RangeInclusive<usize> = 1..=100;

fn check_protocol(protocol: &str) -> Result<(), ConfigError> {
    match protocol {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidProtocol(other.to_string())),
    }
}

fn check_model(model: &str) -> Result<(), ConfigError> {
    if model.trim().is_empty() {
        Err(ConfigError::InvalidModel(model.to_string()))
    } else {
        Ok(())
    }
}

fn check_range<T, E>(value: T, range: &RangeInclusive<T>, error: E) -> Result<(), ConfigError>
where
    T: PartialOrd + Copy,
    E: FnOnce(T) -> ConfigError,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(error(value))
    }
}

impl OllamaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_protocol(&self.protocol)?;
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }
        self.ollama_url()?;
        check_model(&self.model)?;
        check_range(
            self.embedding_dimension,
            &EMBEDDING_DIMENSIONS,
            ConfigError::InvalidEmbeddingDimension,
        )
    }

    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let raw = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&raw).map_err(|_| ConfigError::InvalidUrl(raw))
    }

    pub fn set_protocol(&mut self, protocol: String) -> Result<(), ConfigError> {
        check_protocol(&protocol)?;
        self.protocol = protocol;
        Ok(())
    }

    /// Rejects hosts that do not form a valid URL with the current protocol and port
    pub fn set_host(&mut self, host: String) -> Result<(), ConfigError> {
        OllamaConfig {
            host: host.clone(),
            ..self.clone()
        }
        .ollama_url()?;
        self.host = host;
        Ok(())
    }

    pub fn set_port(&mut self, port: u16) -> Result<(), ConfigError> {
        if port == 0 {
            return Err(ConfigError::InvalidPort(port));
        }
        self.port = port;
        Ok(())
    }

    pub fn set_model(&mut self, model: String) -> Result<(), ConfigError> {
        check_model(&model)?;
        self.model = model;
        Ok(())
    }

    pub fn set_embedding_dimension(&mut self, dimension: u32) -> Result<(), ConfigError> {
        check_range(
            dimension,
            &EMBEDDING_DIMENSIONS,
            ConfigError::InvalidEmbeddingDimension,
        )?;
        self.embedding_dimension = dimension;
        Ok(())
    }
}

impl CompletionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.completion_url()?;
        check_model(&self.model)?;
        check_range(self.max_tokens, &MAX_TOKENS, ConfigError::InvalidMaxTokens)?;
        check_range(
            self.timeout_seconds,
            &TIMEOUT_SECONDS,
            ConfigError::InvalidTimeout,
        )?;
        if self.api_key_env.trim().is_empty() {
            return Err(ConfigError::InvalidApiKeyEnv(self.api_key_env.clone()));
        }
        Ok(())
    }

    /// Base URL of the completion API, always ending in `/` so relative joins append
    pub fn completion_url(&self) -> Result<Url, ConfigError> {
        let trimmed = self.base_url.trim();
        let raw = if trimmed.ends_with('/') {
            trimmed.to_string()
        } else {
            format!("{}/", trimmed)
        };
        let url = Url::parse(&raw).map_err(|_| ConfigError::InvalidUrl(raw.clone()))?;
        check_protocol(url.scheme())?;
        Ok(url)
    }

    pub fn set_base_url(&mut self, base_url: String) -> Result<(), ConfigError> {
        CompletionConfig {
            base_url: base_url.clone(),
            ..self.clone()
        }
        .completion_url()?;
        self.base_url = base_url;
        Ok(())
    }

    pub fn set_model(&mut self, model: String) -> Result<(), ConfigError> {
        check_model(&model)?;
        self.model = model;
        Ok(())
    }

    pub fn set_max_tokens(&mut self, max_tokens: u32) -> Result<(), ConfigError> {
        check_range(max_tokens, &MAX_TOKENS, ConfigError::InvalidMaxTokens)?;
        self.max_tokens = max_tokens;
        Ok(())
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range(self.top_k, &TOP_K, ConfigError::InvalidTopK)
    }
}
