//! Configuration management for ragline.
//!
//! Configuration is merged from several sources, later ones winning:
//! - Built-in defaults
//! - Config file (`.ragline/config.yaml`, or `RAGLINE_CONFIG`)
//! - Environment variables
//! - Command-line flags (`AppConfig::with_overrides`)
//!
//! Secrets are never stored in the file itself; provider and index sections
//! name the environment variable that holds the key (`apiKeyEnv`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Providers the LLM factory knows how to build.
pub const KNOWN_PROVIDERS: [&str; 2] = ["huggingface", "ollama"];

/// Largest number of chunks a single query may ground on.
pub const MAX_TOP_K: usize = 100;

const DEFAULT_HF_KEY_ENV: &str = "HUGGINGFACE_API_KEY";
const DEFAULT_PINECONE_KEY_ENV: &str = "PINECONE_API_KEY";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .ragline/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Active LLM provider ("huggingface" or "ollama")
    pub provider: String,

    /// Generation model identifier
    pub model: String,

    /// Explicit API key for the LLM provider (RAGLINE_API_KEY)
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Emit logs as JSON
    pub log_json: bool,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,

    /// Retrieval and generation tuning
    pub rag: RagSettings,

    /// Chunker sizing
    pub chunking: ChunkingSettings,

    /// Conversation history window
    pub conversation: ConversationSettings,

    /// Embedding provider selection
    pub embedding: EmbeddingSettings,

    /// Vector index backend selection
    pub index: IndexSettings,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    HuggingFace {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
        timeout: Option<u64>,
    },
    Ollama {
        endpoint: String,
        model: String,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    /// Model named by this provider entry.
    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::HuggingFace { model, .. } | ProviderConfig::Ollama { model, .. } => {
                model
            }
        }
    }

    /// Custom endpoint, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            ProviderConfig::HuggingFace { endpoint, .. } => endpoint.as_deref(),
            ProviderConfig::Ollama { endpoint, .. } => Some(endpoint.as_str()),
        }
    }

    /// Request timeout in seconds, if configured.
    pub fn timeout(&self) -> Option<u64> {
        match self {
            ProviderConfig::HuggingFace { timeout, .. } | ProviderConfig::Ollama { timeout, .. } => {
                *timeout
            }
        }
    }
}

/// Retrieval, context assembly and source ranking parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RagSettings {
    /// Number of chunks handed to generation
    pub top_k: usize,

    /// Minimum cosine similarity for a candidate to count as relevant
    pub min_score: f32,

    /// Denylisted sources above this score are kept anyway
    pub high_confidence_score: f32,

    /// Character budget for the assembled context
    pub max_context_length: usize,

    /// Candidates with shorter indexed text are discarded
    pub min_chunk_chars: usize,

    /// Maximum snippet length in a source citation
    pub snippet_length: usize,

    /// Upper bound on a single generation call
    pub llm_timeout_secs: u64,

    /// How many history messages to feed into generation (None = all kept)
    pub history_messages: Option<usize>,

    /// URL path patterns that mark administrative / listing pages
    pub denylist: Vec<String>,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_score: 0.3,
            high_confidence_score: 0.7,
            max_context_length: 2000,
            min_chunk_chars: 20,
            snippet_length: 200,
            llm_timeout_secs: 30,
            history_messages: None,
            denylist: vec![
                "/news".to_string(),
                "/announcement".to_string(),
                "/events".to_string(),
                "/calendar".to_string(),
            ],
        }
    }
}

/// Chunker sizing, in characters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

/// Sliding window applied to every conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversationSettings {
    pub max_history_messages: usize,
    pub max_history_tokens: usize,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            max_history_messages: 10,
            max_history_tokens: 2000,
        }
    }
}

/// Embedding provider selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddingSettings {
    /// "trigram" or "ollama"
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub endpoint: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
        }
    }
}

/// Vector index backend selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexSettings {
    /// "sqlite" or "pinecone"
    pub backend: String,

    /// SQLite database file; relative paths resolve against the workspace
    pub path: Option<PathBuf>,

    /// Pinecone index host (e.g. https://my-index-abc123.svc.pinecone.io)
    pub host: Option<String>,

    pub api_key_env: String,

    pub namespace: Option<String>,

    /// Vectors per upsert request during ingestion
    pub batch_size: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            path: None,
            host: None,
            api_key_env: DEFAULT_PINECONE_KEY_ENV.to_string(),
            namespace: None,
            batch_size: 100,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    rag: Option<RagSettings>,
    chunking: Option<ChunkingSettings>,
    conversation: Option<ConversationSettings>,
    embedding: Option<EmbeddingSettings>,
    index: Option<IndexSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    format: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "huggingface".to_string(),
            model: "mistralai/Mistral-7B-Instruct-v0.2".to_string(),
            api_key: None,
            log_level: None,
            log_json: false,
            verbose: false,
            no_color: false,
            llm: None,
            rag: RagSettings::default(),
            chunking: ChunkingSettings::default(),
            conversation: ConversationSettings::default(),
            embedding: EmbeddingSettings::default(),
            index: IndexSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, the config file and defaults.
    ///
    /// Environment variables:
    /// - `RAGLINE_WORKSPACE`: Override workspace path
    /// - `RAGLINE_CONFIG`: Path to config file
    /// - `RAGLINE_PROVIDER`: LLM provider
    /// - `RAGLINE_MODEL`: Model identifier
    /// - `RAGLINE_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("RAGLINE_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("RAGLINE_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.ragline_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("RAGLINE_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("RAGLINE_MODEL") {
            config.model = model;
        }

        if let Ok(key) = std::env::var("RAGLINE_API_KEY") {
            config.api_key = Some(key);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Parse a config file and merge it into a copy of this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(&self, contents: &str) -> Result<Self, serde_yaml::Error> {
        let config_file: ConfigFile = if contents.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(contents)?
        };

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(format) = logging.format {
                result.log_json = format.eq_ignore_ascii_case("json");
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();
            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }
            result.llm = Some(llm);
        }

        if let Some(rag) = config_file.rag {
            result.rag = rag;
        }
        if let Some(chunking) = config_file.chunking {
            result.chunking = chunking;
        }
        if let Some(conversation) = config_file.conversation {
            result.conversation = conversation;
        }
        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }
        if let Some(index) = config_file.index {
            result.index = index;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        json_logs: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        if json_logs {
            self.log_json = true;
        }

        self
    }

    /// Get the path to the .ragline directory.
    pub fn ragline_dir(&self) -> PathBuf {
        self.workspace.join(".ragline")
    }

    /// Ensure the .ragline directory exists.
    pub fn ensure_ragline_dir(&self) -> AppResult<()> {
        let dir = self.ragline_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .ragline directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Location of the SQLite index file.
    pub fn index_path(&self) -> PathBuf {
        match self.index.path {
            Some(ref path) if path.is_absolute() => path.clone(),
            Some(ref path) => self.workspace.join(path),
            None => self.ragline_dir().join("index.sqlite"),
        }
    }

    /// Directory holding prompt overrides.
    pub fn prompts_dir(&self) -> PathBuf {
        self.ragline_dir().join("prompts")
    }

    /// Get a provider's configuration block, if present.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Custom endpoint configured for a provider.
    pub fn provider_endpoint(&self, provider: &str) -> Option<String> {
        self.get_provider_config(provider)
            .and_then(|p| p.endpoint())
            .map(str::to_string)
    }

    /// Request timeout for a provider, falling back to the generation timeout.
    pub fn provider_timeout_secs(&self, provider: &str) -> u64 {
        self.get_provider_config(provider)
            .and_then(|p| p.timeout())
            .unwrap_or(self.rag.llm_timeout_secs)
    }

    /// Resolve the LLM API key.
    ///
    /// `RAGLINE_API_KEY` wins, then the provider's `apiKeyEnv`; HuggingFace
    /// falls back to `HUGGINGFACE_API_KEY` when no provider block exists.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        let env_var = match self.get_provider_config(provider) {
            Some(ProviderConfig::HuggingFace { api_key_env, .. }) => Some(api_key_env.as_str()),
            Some(ProviderConfig::Ollama { .. }) => None,
            None if provider.eq_ignore_ascii_case("huggingface") => Some(DEFAULT_HF_KEY_ENV),
            None => None,
        };

        env_var
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.trim().is_empty())
    }

    /// Resolve the vector index API key (Pinecone).
    pub fn resolve_index_api_key(&self) -> Option<String> {
        std::env::var(&self.index.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    /// Validate the merged configuration.
    ///
    /// A missing LLM key is not a validation failure: the engine reports the
    /// model as unavailable at query time instead.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_PROVIDERS.contains(&self.provider.to_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if self.chunking.chunk_size == 0 {
            return Err(AppError::Config("chunkSize must be greater than zero".to_string()));
        }

        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(AppError::Config(format!(
                "chunkOverlap ({}) must be smaller than chunkSize ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }

        if self.rag.top_k == 0 || self.rag.top_k > MAX_TOP_K {
            return Err(AppError::Config(format!(
                "rag.topK must be between 1 and {}, got {}",
                MAX_TOP_K, self.rag.top_k
            )));
        }

        for (name, value) in [
            ("rag.minScore", self.rag.min_score),
            ("rag.highConfidenceScore", self.rag.high_confidence_score),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AppError::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        match self.embedding.provider.as_str() {
            "trigram" | "ollama" => {}
            other => {
                return Err(AppError::Config(format!(
                    "Unknown embedding provider: {}. Supported: trigram, ollama",
                    other
                )))
            }
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding.dimensions must be greater than zero".to_string(),
            ));
        }

        match self.index.backend.as_str() {
            "sqlite" => {}
            "pinecone" => {
                if self.index.host.is_none() {
                    return Err(AppError::Config(
                        "index.host is required for the pinecone backend".to_string(),
                    ));
                }
            }
            other => {
                return Err(AppError::Config(format!(
                    "Unknown index backend: {}. Supported: sqlite, pinecone",
                    other
                )))
            }
        }

        if self.index.batch_size == 0 {
            return Err(AppError::Config("index.batchSize must be at least 1".to_string()));
        }

        Ok(())
    }
}
