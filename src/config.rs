//! Autoscribe configuration management
//!
//! The whole configuration is one [`ScribeConfig`] value, built once at
//! startup (TOML file or defaults) and handed to each component
//! constructor. Every section falls back to its defaults when omitted.

use crate::error::{Error, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main Autoscribe configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScribeConfig {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Content directory configuration
    pub content: ContentConfig,

    /// Text generation configuration
    pub generation: GenerationConfig,

    /// Research lookup configuration
    pub research: ResearchConfig,

    /// Daily schedule configuration
    pub schedule: ScheduleConfig,

    /// Topic and style pool sources
    pub pools: PoolsConfig,

    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
}

impl ScribeConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot check on its own.
    pub fn validate(&self) -> Result<()> {
        self.schedule.time()?;
        if self.generation.min_words > self.generation.max_words {
            return Err(Error::Config(format!(
                "generation.min_words ({}) exceeds generation.max_words ({})",
                self.generation.min_words, self.generation.max_words
            )));
        }
        if self.research.max_length == 0 {
            return Err(Error::Config(
                "research.max_length must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed CORS origins (empty = any)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            cors_origins: Vec::new(),
        }
    }
}

/// Content directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Directory holding generated `.txt` artifacts
    pub dir: PathBuf,

    /// Number of artifacts previewed on the home page
    pub home_count: usize,

    /// Number of filenames returned by the listing endpoint
    pub list_count: usize,

    /// Maximum preview length in characters
    pub preview_chars: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("content"),
            home_count: 3,
            list_count: 20,
            preview_chars: 200,
        }
    }
}

/// Text generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Model identifier sent to the completion API
    pub model: String,

    /// Sampling temperature
    pub temperature: f64,

    /// Maximum output tokens
    pub max_tokens: u32,

    /// Hard request timeout in seconds
    pub timeout_secs: u64,

    /// Base URL of the chat-completions API
    pub base_url: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Lower bound of the requested word count
    pub min_words: u32,

    /// Upper bound of the requested word count
    pub max_words: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            max_tokens: 1500,
            timeout_secs: 30,
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            min_words: 500,
            max_words: 700,
        }
    }
}

impl GenerationConfig {
    /// Read the API key from the configured environment variable.
    ///
    /// A missing or blank key is a configuration error; the service
    /// refuses to start without one.
    pub fn resolve_api_key(&self) -> Result<String> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(Error::Config(format!(
                "API key missing: set ${} to the generation service key",
                self.api_key_env
            ))),
        }
    }

    /// Requested word-count range as `(min, max)`
    pub fn word_range(&self) -> (u32, u32) {
        (self.min_words, self.max_words)
    }
}

/// Research lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Encyclopedia article base URL; the topic is appended as a path segment
    pub base_url: String,

    /// User-Agent header sent with lookups
    pub user_agent: String,

    /// Accept-Language header sent with lookups
    pub accept_language: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum snippet length in characters (excluding the tag)
    pub max_length: usize,

    /// `id` attribute of the main content container
    pub container_id: String,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://en.wikipedia.org/wiki".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36"
                .to_string(),
            accept_language: "en-US,en;q=0.5".to_string(),
            timeout_secs: 15,
            max_length: 1000,
            container_id: "mw-content-text".to_string(),
        }
    }
}

/// Daily schedule configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Run the daily generation job
    pub enabled: bool,

    /// Local wall-clock time of the daily run, `HH:MM` or `HH:MM:SS`
    pub at: String,

    /// How often the background loop checks for a due job, in seconds
    pub poll_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            at: "09:00".to_string(),
            poll_interval_secs: 60,
        }
    }
}

impl ScheduleConfig {
    /// Parse `at` into a wall-clock time
    pub fn time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.at, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&self.at, "%H:%M:%S"))
            .map_err(|_| {
                Error::Config(format!(
                    "schedule.at must be HH:MM or HH:MM:SS, got '{}'",
                    self.at
                ))
            })
    }
}

/// Topic and style pool sources
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolsConfig {
    /// JSON array of custom topics
    pub topics_file: PathBuf,

    /// JSON array of custom styles
    pub styles_file: PathBuf,
}

impl Default for PoolsConfig {
    fn default() -> Self {
        Self {
            topics_file: PathBuf::from("custom_topics.json"),
            styles_file: PathBuf::from("custom_styles.json"),
        }
    }
}

/// A single fixed-window budget: at most `max` requests per `window_secs`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitRule {
    pub max: u32,
    pub window_secs: u64,
}

impl LimitRule {
    pub const fn new(max: u32, window_secs: u64) -> Self {
        Self { max, window_secs }
    }
}

impl std::fmt::Display for LimitRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unit = match self.window_secs {
            60 => "minute".to_string(),
            3600 => "hour".to_string(),
            86_400 => "day".to_string(),
            secs => format!("{} seconds", secs),
        };
        write!(f, "{} per {}", self.max, unit)
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    pub enabled: bool,

    /// Limits applied to every route except `/generate` and `/health`
    pub default_limits: Vec<LimitRule>,

    /// Limits applied to `/generate`
    pub generate_limits: Vec<LimitRule>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_limits: vec![LimitRule::new(200, 86_400), LimitRule::new(50, 3600)],
            generate_limits: vec![LimitRule::new(10, 60)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScribeConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.content.dir, PathBuf::from("content"));
        assert_eq!(config.generation.model, "gpt-3.5-turbo");
        assert_eq!(config.generation.max_tokens, 1500);
        assert_eq!(config.generation.word_range(), (500, 700));
        assert_eq!(config.research.max_length, 1000);
        assert_eq!(config.research.timeout_secs, 15);
        assert_eq!(config.schedule.at, "09:00");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ScribeConfig::from_toml(
            r#"
            [server]
            port = 8080

            [schedule]
            at = "06:30"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.schedule.poll_interval_secs, 60);
        assert_eq!(
            config.schedule.time().unwrap(),
            NaiveTime::from_hms_opt(6, 30, 0).unwrap()
        );
        assert_eq!(config.generation.temperature, 0.7);
    }

    #[test]
    fn test_invalid_schedule_time_rejected() {
        let result = ScribeConfig::from_toml("[schedule]\nat = \"9 o'clock\"\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_defaults_pass_validation() {
        assert!(ScribeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_from_file_validates() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("autoscribe.toml");
        std::fs::write(&path, "[research]\nmax_length = 0\n").unwrap();
        assert!(matches!(ScribeConfig::from_file(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_inverted_word_range_rejected() {
        let result =
            ScribeConfig::from_toml("[generation]\nmin_words = 800\nmax_words = 100\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_schedule_time_with_seconds() {
        let schedule = ScheduleConfig {
            at: "21:15:30".to_string(),
            ..Default::default()
        };
        assert_eq!(
            schedule.time().unwrap(),
            NaiveTime::from_hms_opt(21, 15, 30).unwrap()
        );
    }

    #[test]
    fn test_resolve_api_key_missing() {
        let config = GenerationConfig {
            api_key_env: "AUTOSCRIBE_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.resolve_api_key(), Err(Error::Config(_))));
    }

    #[test]
    fn test_resolve_api_key_present() {
        std::env::set_var("AUTOSCRIBE_TEST_KEY_PRESENT", "sk-test");
        let config = GenerationConfig {
            api_key_env: "AUTOSCRIBE_TEST_KEY_PRESENT".to_string(),
            ..Default::default()
        };
        assert_eq!(config.resolve_api_key().unwrap(), "sk-test");
    }

    #[test]
    fn test_limit_rule_display() {
        assert_eq!(LimitRule::new(10, 60).to_string(), "10 per minute");
        assert_eq!(LimitRule::new(50, 3600).to_string(), "50 per hour");
        assert_eq!(LimitRule::new(200, 86_400).to_string(), "200 per day");
        assert_eq!(LimitRule::new(3, 5).to_string(), "3 per 5 seconds");
    }

    #[test]
    fn test_config_toml_round_trip() {
        let config = ScribeConfig::default();
        let rendered = toml::to_string_pretty(&config).unwrap();
        let parsed = ScribeConfig::from_toml(&rendered).unwrap();
        assert_eq!(parsed.rate_limit.default_limits.len(), 2);
        assert_eq!(parsed.rate_limit.generate_limits[0], LimitRule::new(10, 60));
    }
}
