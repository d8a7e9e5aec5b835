use crate::errors::{ChatError, ChatResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "gemini-chat";
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const MODEL_ENV: &str = "GEMINI_MODEL";

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_STREAM_IDLE_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 512 * 1024;

/// Default system instruction. The trailing block format is what
/// `suggestions::parse_suggestions` understands.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly and helpful assistant. \
Answer the user's questions clearly and concisely, using Markdown where it helps.

At the very end of every answer, suggest exactly three short follow-up questions \
the user might ask next, in this exact format:
[SUGGESTIONS]
\"First follow-up question?\"
\"Second follow-up question?\"
\"Third follow-up question?\"
[/SUGGESTIONS]";

/// Configuration for the chat client
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    pub system_prompt: Option<String>,
    pub api_base_url: Option<String>,
    pub temperature: Option<f32>,
    pub stream_idle_timeout_secs: Option<u64>,
    pub max_response_bytes: Option<usize>,
    pub render_markdown: Option<bool>,
    pub log_level: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model_name: Some(DEFAULT_MODEL.to_string()),
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            api_base_url: Some(DEFAULT_API_BASE_URL.to_string()),
            temperature: Some(0.7),
            stream_idle_timeout_secs: Some(DEFAULT_STREAM_IDLE_TIMEOUT_SECS),
            max_response_bytes: Some(DEFAULT_MAX_RESPONSE_BYTES),
            render_markdown: Some(true),
            log_level: Some("off".to_string()),
        }
    }
}

impl GeminiConfig {
    /// Config with every field unset. Useful as an overlay for `merge`.
    pub fn empty() -> Self {
        Self {
            api_key: None,
            model_name: None,
            system_prompt: None,
            api_base_url: None,
            temperature: None,
            stream_idle_timeout_secs: None,
            max_response_bytes: None,
            render_markdown: None,
            log_level: None,
        }
    }

    /// Loads configuration from a file if it exists, otherwise returns the default config
    pub fn load_from_file(path: &Path) -> ChatResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ChatError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            ChatError::ParsingError(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(config)
    }

    /// Overlay built from `GEMINI_API_KEY` and `GEMINI_MODEL`
    pub fn from_env() -> Self {
        let mut overlay = Self::empty();
        overlay.api_key = std::env::var(API_KEY_ENV).ok();
        overlay.model_name = std::env::var(MODEL_ENV).ok();
        overlay
    }

    /// Merges this config with another config, preferring values from the other config if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            api_key: other.api_key.clone().or_else(|| self.api_key.clone()),
            model_name: other.model_name.clone().or_else(|| self.model_name.clone()),
            system_prompt: other
                .system_prompt
                .clone()
                .or_else(|| self.system_prompt.clone()),
            api_base_url: other
                .api_base_url
                .clone()
                .or_else(|| self.api_base_url.clone()),
            temperature: other.temperature.or(self.temperature),
            stream_idle_timeout_secs: other
                .stream_idle_timeout_secs
                .or(self.stream_idle_timeout_secs),
            max_response_bytes: other.max_response_bytes.or(self.max_response_bytes),
            render_markdown: other.render_markdown.or(self.render_markdown),
            log_level: other.log_level.clone().or_else(|| self.log_level.clone()),
        }
    }

    /// The credential, if present and non-blank
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn model_name(&self) -> &str {
        self.model_name.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn api_base_url(&self) -> &str {
        self.api_base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE_URL)
            .trim_end_matches('/')
    }

    /// `None` or zero disables the idle timeout
    pub fn stream_idle_timeout(&self) -> Option<Duration> {
        self.stream_idle_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// `None` or zero disables the response size cap
    pub fn max_response_bytes(&self) -> Option<usize> {
        self.max_response_bytes.filter(|bytes| *bytes > 0)
    }

    pub fn render_markdown(&self) -> bool {
        self.render_markdown.unwrap_or(true)
    }
}

/// Helper function to get default config directory
pub fn get_default_config_dir(app_name: &str) -> ChatResult<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| {
        ChatError::ConfigError("Could not determine home directory".to_string())
    })?;

    Ok(home_dir.join(".config").join(app_name))
}

/// Helper function to get default config file path
pub fn get_default_config_file(app_name: &str) -> ChatResult<PathBuf> {
    let config_dir = get_default_config_dir(app_name)?;
    Ok(config_dir.join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = GeminiConfig::load_from_file(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, GeminiConfig::default());
        assert!(config.api_key().is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "model_name = \"gemini-1.5-pro\"").unwrap();
        writeln!(file, "stream_idle_timeout_secs = 0").unwrap();

        let config = GeminiConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.model_name(), "gemini-1.5-pro");
        assert_eq!(config.stream_idle_timeout(), None);
        assert_eq!(config.system_prompt.as_deref(), Some(DEFAULT_SYSTEM_PROMPT));
        assert!(config.render_markdown());
    }

    #[test]
    fn test_invalid_file_is_a_parsing_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "model_name = [").unwrap();

        let result = GeminiConfig::load_from_file(file.path());
        assert!(matches!(result, Err(ChatError::ParsingError(_))));
    }

    #[test]
    fn test_merge_prefers_overlay() {
        let base = GeminiConfig::default();
        let mut overlay = GeminiConfig::empty();
        overlay.api_key = Some("secret".to_string());
        overlay.temperature = Some(0.1);

        let merged = base.merge(&overlay);
        assert_eq!(merged.api_key(), Some("secret"));
        assert_eq!(merged.temperature, Some(0.1));
        assert_eq!(merged.model_name(), DEFAULT_MODEL);
    }

    #[test]
    fn test_blank_api_key_counts_as_missing() {
        let mut config = GeminiConfig::default();
        config.api_key = Some("   ".to_string());
        assert!(config.api_key().is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let mut config = GeminiConfig::default();
        config.api_base_url = Some("http://localhost:9000/v1beta/".to_string());
        assert_eq!(config.api_base_url(), "http://localhost:9000/v1beta");
    }
}
