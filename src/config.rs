//! TOML configuration.
//!
//! Every section is optional and falls back to defaults, so an empty file
//! (or no file at all, see [`load_or_default`]) gives a working OpenAI
//! setup as long as `OPENAI_API_KEY` is set.
//!
//! ```toml
//! [storage]
//! base_dir = "./collections_store"
//!
//! [embedding]
//! provider = "openai"            # openai | ollama | local | disabled
//! model = "text-embedding-3-small"
//! dims = 1536
//!
//! [llm]
//! provider = "openai"            # openai | ollama | disabled
//! model = "gpt-4o-mini"
//! temperature = 0.7
//! max_tokens = 1000
//! stream = true
//!
//! [chat]
//! persona = "You are a helpful assistant for the claims department."
//! ```
//!
//! Chunk size, chunk overlap, retrieval `k` and the similarity threshold
//! are fixed by the pipeline and cannot be configured.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use docchat_core::prompt::DEFAULT_PERSONA;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding one subdirectory per collection.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
        }
    }
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("./collections_store")
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL override (OpenAI-compatible endpoint or Ollama server).
    #[serde(default)]
    pub url: Option<String>,
    /// Retries on HTTP 429/5xx. Zero surfaces the first failure as-is.
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            url: None,
            max_retries: 0,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_embedding_provider() -> String {
    "openai".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_stream")]
    pub stream: bool,
    /// Base URL override (OpenAI-compatible endpoint or Ollama server).
    #[serde(default)]
    pub url: Option<String>,
    /// Longest wait for the next piece of a streamed answer; the whole
    /// request when `stream = false`.
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            stream: default_stream(),
            url: None,
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_stream() -> bool {
    true
}
fn default_llm_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    /// First line of every prompt.
    #[serde(default = "default_persona")]
    pub persona: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            persona: default_persona(),
        }
    }
}

fn default_persona() -> String {
    DEFAULT_PERSONA.to_string()
}

/// Read and validate a configuration file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Like [`load_config`], but a missing file yields the defaults.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        let config = Config::default();
        validate(&config)?;
        Ok(config)
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.storage.base_dir.as_os_str().is_empty() {
        bail!("storage.base_dir must not be empty");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" | "local" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
            other
        ),
    }

    if config.embedding.dims == Some(0) {
        bail!("embedding.dims must be > 0");
    }

    if config.embedding.provider == "ollama" && config.embedding.model.is_none() {
        bail!("embedding.model must be specified when provider is 'ollama'");
    }

    match config.llm.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => bail!(
            "Unknown llm provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }

    if !(0.0..=2.0).contains(&config.llm.temperature) {
        bail!("llm.temperature must be in [0.0, 2.0]");
    }

    if config.llm.max_tokens == 0 {
        bail!("llm.max_tokens must be > 0");
    }

    if config.llm.model.trim().is_empty() {
        bail!("llm.model must not be empty");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(content: &str) -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("docchat.toml");
        fs::write(&path, content).unwrap();
        (tmp, path)
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let (_tmp, path) = write_config("");
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.storage.base_dir, PathBuf::from("./collections_store"));
        assert_eq!(cfg.embedding.provider, "openai");
        assert_eq!(cfg.embedding.max_retries, 0);
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
        assert!((cfg.llm.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(cfg.llm.max_tokens, 1000);
        assert!(cfg.llm.stream);
        assert_eq!(cfg.chat.persona, DEFAULT_PERSONA);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let tmp = TempDir::new().unwrap();
        let cfg = load_or_default(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.llm.provider, "openai");
    }

    #[test]
    fn test_full_file() {
        let (_tmp, path) = write_config(
            r#"
[storage]
base_dir = "/var/lib/docchat"

[embedding]
provider = "ollama"
model = "nomic-embed-text"
dims = 768
url = "http://gpu:11434"

[llm]
provider = "ollama"
model = "llama3.1"
temperature = 0.2
max_tokens = 400
stream = false

[chat]
persona = "You answer questions about HR policies."
"#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.storage.base_dir, PathBuf::from("/var/lib/docchat"));
        assert_eq!(cfg.embedding.dims, Some(768));
        assert_eq!(cfg.embedding.url.as_deref(), Some("http://gpu:11434"));
        assert_eq!(cfg.llm.max_tokens, 400);
        assert!(!cfg.llm.stream);
        assert_eq!(cfg.chat.persona, "You answer questions about HR policies.");
    }

    #[test]
    fn test_rejects_unknown_providers() {
        let (_tmp, path) = write_config("[embedding]\nprovider = \"magic\"\n");
        assert!(load_config(&path).is_err());
        let (_tmp, path) = write_config("[llm]\nprovider = \"magic\"\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_rejects_bad_llm_settings() {
        let (_tmp, path) = write_config("[llm]\ntemperature = 3.5\n");
        assert!(load_config(&path).is_err());
        let (_tmp, path) = write_config("[llm]\nmax_tokens = 0\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_ollama_embedding_requires_model() {
        let (_tmp, path) = write_config("[embedding]\nprovider = \"ollama\"\n");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("embedding.model"));
    }
}
