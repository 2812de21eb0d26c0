//! Configuration management for docqa.
//!
//! Configuration is merged from several sources, lowest precedence first:
//! - Built-in defaults
//! - A YAML file (`--config`, `DOCQA_CONFIG`, or `<data_dir>/docqa.yaml`)
//! - Environment variables
//! - Command-line flags

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// Name of the config file looked up inside the data directory.
pub const CONFIG_FILE_NAME: &str = "docqa.yaml";

/// Embedding providers this build knows how to construct.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 3] = ["ollama", "fastembed", "trigram"];

/// Generation providers this build knows how to construct.
pub const KNOWN_LLM_PROVIDERS: [&str; 1] = ["ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root directory for uploads, indices and prompt overrides
    pub data_dir: PathBuf,

    /// Config file this configuration was read from, if any
    #[serde(skip)]
    pub config_file: Option<PathBuf>,

    /// HTTP server settings
    pub server: ServerConfig,

    /// Text generation settings
    pub llm: LlmSettings,

    /// Embedding model settings
    pub embedding: EmbeddingSettings,

    /// Chunker settings
    pub chunking: ChunkingSettings,

    /// Retriever settings
    pub retrieval: RetrievalSettings,

    /// Logging settings
    pub logging: LoggingSettings,

    /// Verbose mode (enables debug logging)
    #[serde(skip)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body, in bytes
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: String,
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    /// Per-request timeout for generation calls
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub batch_size: usize,
    /// Defaults to the LLM endpoint when unset
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    /// Minimum cosine similarity for a chunk to be returned
    pub score_threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: Option<String>,
    pub format: LogFormat,
    pub color: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            config_file: None,
            server: ServerConfig::default(),
            llm: LlmSettings::default(),
            embedding: EmbeddingSettings::default(),
            chunking: ChunkingSettings::default(),
            retrieval: RetrievalSettings::default(),
            logging: LoggingSettings::default(),
            verbose: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3".to_string(),
            temperature: 0.7,
            timeout_secs: 120,
        }
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            batch_size: 32,
            endpoint: None,
            timeout_secs: 30,
        }
    }
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            chunk_overlap: 80,
        }
    }
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 20,
            score_threshold: 0.1,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: None,
            format: LogFormat::Pretty,
            color: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML file and the environment.
    ///
    /// Environment variables:
    /// - `DOCQA_DATA_DIR`: Data directory
    /// - `DOCQA_CONFIG`: Path to config file
    /// - `DOCQA_HOST`, `DOCQA_PORT`: Listen address
    /// - `DOCQA_LLM_ENDPOINT` / `OLLAMA_URL`: Ollama base URL
    /// - `DOCQA_MODEL`: Generation model
    /// - `DOCQA_EMBEDDING_PROVIDER`, `DOCQA_EMBEDDING_MODEL`: Embedder
    /// - `RUST_LOG`: Log filter
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use docqa_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Data dir: {:?}", config.data_dir);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None)
    }

    /// Load configuration, reading `config_file` instead of the default location.
    pub fn load_from(config_file: Option<&Path>) -> AppResult<Self> {
        Self::load_with(config_file, |key| std::env::var(key).ok())
    }

    fn load_with(
        config_file: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> AppResult<Self> {
        let explicit = config_file
            .map(Path::to_path_buf)
            .or_else(|| env("DOCQA_CONFIG").map(PathBuf::from));

        let data_dir = env("DOCQA_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::default().data_dir);

        let mut config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "Config file does not exist: {:?}",
                        path
                    )));
                }
                Self::from_yaml_file(&path)?
            }
            None => {
                let candidate = data_dir.join(CONFIG_FILE_NAME);
                if candidate.exists() {
                    Self::from_yaml_file(&candidate)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(env);
        Ok(config)
    }

    /// Parse a YAML config file. Missing keys keep their defaults.
    fn from_yaml_file(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let mut config: AppConfig = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        config.config_file = Some(path.to_path_buf());
        Ok(config)
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = env("DOCQA_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }

        if let Some(host) = env("DOCQA_HOST") {
            self.server.host = host;
        }

        if let Some(port) = env("DOCQA_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid DOCQA_PORT value: {}", port),
            }
        }

        if let Some(endpoint) = env("DOCQA_LLM_ENDPOINT").or_else(|| env("OLLAMA_URL")) {
            self.llm.endpoint = endpoint;
        }

        if let Some(model) = env("DOCQA_MODEL") {
            self.llm.model = model;
        }

        if let Some(provider) = env("DOCQA_EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }

        if let Some(model) = env("DOCQA_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }

        if let Some(level) = env("RUST_LOG") {
            self.logging.level = Some(level);
        }

        if env("NO_COLOR").is_some() {
            self.logging.color = false;
        }
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over the environment and the file.
    pub fn with_overrides(
        mut self,
        data_dir: Option<PathBuf>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(data_dir) = data_dir {
            self.data_dir = data_dir;
        }

        if let Some(model) = model {
            self.llm.model = model;
        }

        if let Some(log_level) = log_level {
            self.logging.level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.logging.level.is_none() {
                self.logging.level = Some("debug".to_string());
            }
        }

        if no_color {
            self.logging.color = false;
        }

        self
    }

    /// Base URL used by the Ollama embedding provider.
    pub fn embedding_endpoint(&self) -> &str {
        self.embedding
            .endpoint
            .as_deref()
            .unwrap_or(&self.llm.endpoint)
    }

    /// Listen address as `host:port`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Directory holding YAML prompt overrides.
    pub fn prompts_dir(&self) -> PathBuf {
        self.data_dir.join("prompts")
    }

    /// Ensure the data directory exists.
    pub fn ensure_data_dir(&self) -> AppResult<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir).map_err(|e| {
                AppError::Config(format!(
                    "Failed to create data directory {:?}: {}",
                    self.data_dir, e
                ))
            })?;
        }
        Ok(())
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_LLM_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown LLM provider: {}. Supported: {}",
                self.llm.provider,
                KNOWN_LLM_PROVIDERS.join(", ")
            )));
        }

        if !KNOWN_EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(AppError::Config(format!(
                "Temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be greater than zero".to_string(),
            ));
        }

        if self.embedding.batch_size == 0 {
            return Err(AppError::Config(
                "Embedding batch size must be greater than zero".to_string(),
            ));
        }

        if self.chunking.chunk_size == 0 {
            return Err(AppError::Config(
                "Chunk size must be greater than zero".to_string(),
            ));
        }

        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(AppError::Config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config("top_k must be at least 1".to_string()));
        }

        if !(-1.0..=1.0).contains(&self.retrieval.score_threshold) {
            return Err(AppError::Config(format!(
                "Score threshold must be between -1.0 and 1.0, got {}",
                self.retrieval.score_threshold
            )));
        }

        Ok(())
    }
}
