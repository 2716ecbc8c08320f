//! Layered runtime configuration.
//!
//! Resolution order, lowest to highest precedence:
//!
//! 1. Built-in defaults
//! 2. An optional YAML file
//! 3. Environment variables
//! 4. Explicit overrides (command line flags)
//!
//! ```yaml
//! # sift.yaml
//! model: llama-3.3-70b-versatile
//! request_timeout: 15s
//! max_attempts: 4
//! tolerant_evaluation: true
//! ```

use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::providers::{
    ApiCredential, CompletionConfig, CredentialSource, DEFAULT_BASE_URL, DEFAULT_MODEL,
    GROQ_API_ENV, GROQ_API_KEY_ENV,
};

const API_KEY_NAME: &str = "Groq API key";

/// Errors that can occur while loading or validating settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid duration for {field}: {value}")]
    InvalidDuration { field: &'static str, value: String },

    #[error("Invalid bind address: {0}")]
    InvalidBindAddr(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error(
        "Groq API key is missing. Provide it via the GROQ_API_KEY environment \
         variable or the --api-key command line option."
    )]
    MissingApiKey,
}

/// Resolved settings for one process.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Completion API key; required before any model call
    pub api_key: Option<ApiCredential>,

    /// Chat-completions API root
    pub base_url: String,

    pub model: String,

    pub temperature: f32,

    pub max_tokens: u32,

    /// Per-request timeout for completion, search and page fetches
    pub request_timeout: Duration,

    /// Attempt budget of the search workflow
    pub max_attempts: u32,

    /// Search hits kept per generated query
    pub search_results_per_query: usize,

    /// Character cap for each result description and content
    pub max_content_length: usize,

    /// Model calls the query generator makes before falling back
    pub query_generation_attempts: u32,

    /// Pause between query generation retries
    pub generation_retry_delay: Duration,

    /// Use the lenient evaluator prompt in interactive entry points
    pub tolerant_evaluation: bool,

    /// Debug-level logging
    pub verbose: bool,

    /// Listen address of the HTTP server
    pub bind_addr: SocketAddr,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.5,
            max_tokens: 1024,
            request_timeout: Duration::from_secs(10),
            max_attempts: 3,
            search_results_per_query: 2,
            max_content_length: 2048,
            query_generation_attempts: 3,
            generation_retry_delay: Duration::ZERO,
            tolerant_evaluation: false,
            verbose: false,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
        }
    }
}

/// Durations in YAML may be plain seconds or humantime strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum DurationValue {
    Seconds(f64),
    Text(String),
}

impl DurationValue {
    fn resolve(&self, field: &'static str) -> Result<Duration, ConfigError> {
        let parsed = match self {
            DurationValue::Seconds(secs) => seconds(*secs),
            DurationValue::Text(text) => parse_duration(text),
        };
        parsed.ok_or_else(|| ConfigError::InvalidDuration {
            field,
            value: match self {
                DurationValue::Seconds(secs) => secs.to_string(),
                DurationValue::Text(text) => text.clone(),
            },
        })
    }
}

/// Shape of the YAML configuration file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    request_timeout: Option<DurationValue>,
    max_attempts: Option<u32>,
    search_results_per_query: Option<usize>,
    max_content_length: Option<usize>,
    query_generation_attempts: Option<u32>,
    generation_retry_delay: Option<DurationValue>,
    tolerant_evaluation: Option<bool>,
    verbose: Option<bool>,
    bind_addr: Option<String>,
}

/// Explicit overrides, typically from command line flags.
#[derive(Debug, Default, Clone)]
pub struct SettingsOverrides {
    pub api_key: Option<String>,
    pub debug: Option<bool>,
    pub max_attempts: Option<u32>,
    pub search_results_per_query: Option<usize>,
    pub request_timeout: Option<Duration>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub tolerant_evaluation: Option<bool>,
    pub bind_addr: Option<SocketAddr>,
}

/// `None` for negative, non-finite or out-of-range values.
fn seconds(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok()
}

/// Parse `10`, `2.5` (seconds) or a humantime string such as `15s` or `1m 30s`.
pub fn parse_duration(text: &str) -> Option<Duration> {
    let text = text.trim();
    match text.parse::<f64>() {
        Ok(secs) => seconds(secs),
        Err(_) => humantime::parse_duration(text).ok(),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Apply `value` when `raw` parses, otherwise keep the current setting.
fn env_parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    parse: impl Fn(&str) -> Option<T>,
    target: &mut T,
) {
    let Some(raw) = lookup(key) else {
        return;
    };
    match parse(&raw) {
        Some(value) => *target = value,
        None => tracing::warn!(variable = key, value = %raw, "Ignoring unparseable environment value"),
    }
}

impl Settings {
    /// Resolve settings from defaults, an optional file and the process
    /// environment.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = Self::default();
        if let Some(path) = config_path {
            settings.apply_yaml_file(path)?;
        }
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Layer a YAML file over the current values.
    pub fn apply_yaml_file(&mut self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        self.apply_yaml(&contents)
    }

    /// Layer YAML text over the current values.
    pub fn apply_yaml(&mut self, yaml: &str) -> Result<(), ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(());
        }
        let file: SettingsFile = serde_yaml::from_str(yaml)?;

        if let Some(key) = file.api_key.filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(ApiCredential::new(key.trim(), CredentialSource::Config, API_KEY_NAME));
        }
        if let Some(v) = file.base_url {
            self.base_url = v;
        }
        if let Some(v) = file.model {
            self.model = v;
        }
        if let Some(v) = file.temperature {
            self.temperature = v;
        }
        if let Some(v) = file.max_tokens {
            self.max_tokens = v;
        }
        if let Some(v) = file.request_timeout {
            self.request_timeout = v.resolve("request_timeout")?;
        }
        if let Some(v) = file.max_attempts {
            self.max_attempts = v;
        }
        if let Some(v) = file.search_results_per_query {
            self.search_results_per_query = v;
        }
        if let Some(v) = file.max_content_length {
            self.max_content_length = v;
        }
        if let Some(v) = file.query_generation_attempts {
            self.query_generation_attempts = v;
        }
        if let Some(v) = file.generation_retry_delay {
            self.generation_retry_delay = v.resolve("generation_retry_delay")?;
        }
        if let Some(v) = file.tolerant_evaluation {
            self.tolerant_evaluation = v;
        }
        if let Some(v) = file.verbose {
            self.verbose = v;
        }
        if let Some(v) = file.bind_addr {
            self.bind_addr = v
                .parse()
                .map_err(|_| ConfigError::InvalidBindAddr(v.clone()))?;
        }
        Ok(())
    }

    /// Layer environment variables over the current values.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Ok(credential) =
            ApiCredential::from_lookup(&[GROQ_API_KEY_ENV, GROQ_API_ENV], API_KEY_NAME, &lookup)
        {
            self.api_key = Some(credential);
        }

        env_parsed(&lookup, "DEBUG_MODE", parse_bool, &mut self.verbose);
        env_parsed(&lookup, "MAX_RETRIES", |v| v.trim().parse().ok(), &mut self.max_attempts);
        env_parsed(
            &lookup,
            "SEARCH_RESULTS_PER_QUERY",
            |v| v.trim().parse().ok(),
            &mut self.search_results_per_query,
        );
        env_parsed(&lookup, "REQUEST_TIMEOUT", parse_duration, &mut self.request_timeout);
        env_parsed(
            &lookup,
            "MAX_CONTENT_LENGTH",
            |v| v.trim().parse().ok(),
            &mut self.max_content_length,
        );
        env_parsed(
            &lookup,
            "QUERY_GENERATION_ATTEMPTS",
            |v| v.trim().parse().ok(),
            &mut self.query_generation_attempts,
        );
        env_parsed(
            &lookup,
            "GROQ_MODEL",
            |v| Some(v.trim().to_string()).filter(|m| !m.is_empty()),
            &mut self.model,
        );
        env_parsed(&lookup, "GROQ_TEMPERATURE", |v| v.trim().parse().ok(), &mut self.temperature);
        env_parsed(&lookup, "GROQ_MAX_TOKENS", |v| v.trim().parse().ok(), &mut self.max_tokens);
        env_parsed(&lookup, "SIFT_BIND_ADDR", |v| v.trim().parse().ok(), &mut self.bind_addr);
    }

    /// Apply explicit overrides; `None` fields leave the setting alone.
    pub fn with_overrides(mut self, overrides: SettingsOverrides) -> Self {
        if let Some(key) = overrides.api_key.filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(ApiCredential::new(
                key.trim(),
                CredentialSource::CommandLine,
                API_KEY_NAME,
            ));
        }
        if let Some(v) = overrides.debug {
            self.verbose = v;
        }
        if let Some(v) = overrides.max_attempts {
            self.max_attempts = v;
        }
        if let Some(v) = overrides.search_results_per_query {
            self.search_results_per_query = v;
        }
        if let Some(v) = overrides.request_timeout {
            self.request_timeout = v;
        }
        if let Some(v) = overrides.model {
            self.model = v;
        }
        if let Some(v) = overrides.temperature {
            self.temperature = v;
        }
        if let Some(v) = overrides.max_tokens {
            self.max_tokens = v;
        }
        if let Some(v) = overrides.tolerant_evaluation {
            self.tolerant_evaluation = v;
        }
        if let Some(v) = overrides.bind_addr {
            self.bind_addr = v;
        }
        self
    }

    /// Reject settings the workflow cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "request_timeout must be greater than zero".to_string(),
            ));
        }
        if self.query_generation_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "query_generation_attempts must be at least 1".to_string(),
            ));
        }
        if self.max_content_length == 0 {
            return Err(ConfigError::ValidationError(
                "max_content_length must be at least 1".to_string(),
            ));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::ValidationError(
                "base_url must start with http:// or https://".to_string(),
            ));
        }
        Ok(())
    }

    /// The API key, or [`ConfigError::MissingApiKey`] with guidance.
    pub fn require_api_key(&self) -> Result<&ApiCredential, ConfigError> {
        self.api_key
            .as_ref()
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    /// Request parameters for the completion client.
    pub fn completion_config(&self) -> CompletionConfig {
        CompletionConfig {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.request_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.max_attempts, 3);
        assert_eq!(settings.search_results_per_query, 2);
        assert_eq!(settings.request_timeout, Duration::from_secs(10));
        assert_eq!(settings.max_content_length, 2048);
        assert_eq!(settings.query_generation_attempts, 3);
        assert_eq!(settings.model, "llama-3.3-70b-versatile");
        assert_eq!(settings.temperature, 0.5);
        assert_eq!(settings.max_tokens, 1024);
        assert!(!settings.tolerant_evaluation);
        assert_eq!(settings.bind_addr.to_string(), "127.0.0.1:5000");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_yaml_layer() {
        let mut settings = Settings::default();
        settings
            .apply_yaml(
                r#"
api_key: gsk-from-file
request_timeout: 15s
generation_retry_delay: 0.5
max_attempts: 5
tolerant_evaluation: true
bind_addr: "0.0.0.0:8080"
"#,
            )
            .unwrap();

        assert_eq!(settings.request_timeout, Duration::from_secs(15));
        assert_eq!(settings.generation_retry_delay, Duration::from_millis(500));
        assert_eq!(settings.max_attempts, 5);
        assert!(settings.tolerant_evaluation);
        assert_eq!(settings.bind_addr.port(), 8080);

        let key = settings.require_api_key().unwrap();
        assert_eq!(key.expose(), "gsk-from-file");
        assert_eq!(key.source(), CredentialSource::Config);
    }

    #[test]
    fn test_yaml_rejects_unknown_fields_and_bad_durations() {
        let mut settings = Settings::default();
        assert!(matches!(
            settings.apply_yaml("max_retries: 3"),
            Err(ConfigError::YamlError(_))
        ));
        assert!(matches!(
            settings.apply_yaml("request_timeout: soon"),
            Err(ConfigError::InvalidDuration { field: "request_timeout", .. })
        ));
    }

    #[test]
    fn test_env_layer_overrides_file() {
        let mut settings = Settings::default();
        settings.apply_yaml("max_attempts: 5\nmodel: from-file").unwrap();
        settings.apply_env(env(&[
            ("GROQ_API", "gsk-legacy"),
            ("MAX_RETRIES", "7"),
            ("REQUEST_TIMEOUT", "2.5"),
            ("DEBUG_MODE", "yes"),
            ("GROQ_MODEL", "from-env"),
            ("SIFT_BIND_ADDR", "127.0.0.1:9000"),
        ]));

        assert_eq!(settings.max_attempts, 7);
        assert_eq!(settings.request_timeout, Duration::from_millis(2500));
        assert!(settings.verbose);
        assert_eq!(settings.model, "from-env");
        assert_eq!(settings.bind_addr.port(), 9000);
        assert_eq!(settings.require_api_key().unwrap().expose(), "gsk-legacy");
    }

    #[test]
    fn test_unparseable_env_falls_back() {
        let mut settings = Settings::default();
        settings.apply_env(env(&[
            ("MAX_RETRIES", "many"),
            ("REQUEST_TIMEOUT", "-1"),
            ("DEBUG_MODE", "maybe"),
        ]));

        assert_eq!(settings.max_attempts, 3);
        assert_eq!(settings.request_timeout, Duration::from_secs(10));
        assert!(!settings.verbose);
    }

    #[test]
    fn test_out_of_range_timeout_env_falls_back() {
        let mut settings = Settings::default();
        settings.apply_env(env(&[("REQUEST_TIMEOUT", "1e300")]));
        assert_eq!(settings.request_timeout, Duration::from_secs(10));

        settings.apply_env(env(&[("REQUEST_TIMEOUT", "inf")]));
        assert_eq!(settings.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let mut settings = Settings::default();
        settings.apply_env(env(&[("REQUEST_TIMEOUT", "0")]));
        assert_eq!(settings.request_timeout, Duration::ZERO);
        assert!(matches!(settings.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_overrides_win() {
        let mut settings = Settings::default();
        settings.apply_env(env(&[("GROQ_API_KEY", "gsk-env"), ("MAX_RETRIES", "7")]));

        let settings = settings.with_overrides(SettingsOverrides {
            api_key: Some("gsk-flag".into()),
            max_attempts: Some(2),
            debug: Some(true),
            ..Default::default()
        });

        assert_eq!(settings.max_attempts, 2);
        assert!(settings.verbose);
        let key = settings.require_api_key().unwrap();
        assert_eq!(key.expose(), "gsk-flag");
        assert_eq!(key.source(), CredentialSource::CommandLine);
    }

    #[test]
    fn test_validate() {
        let settings = Settings {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(ConfigError::ValidationError(_))));

        let settings = Settings {
            query_generation_attempts: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = Settings {
            base_url: "api.groq.com".into(),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_missing_api_key_message() {
        let err = Settings::default().require_api_key().unwrap_err();
        assert!(err.to_string().contains("GROQ_API_KEY"));
        assert!(err.to_string().contains("--api-key"));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("10"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration("1m 30s"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("nope"), None);
        assert_eq!(parse_duration("1e300"), None);
        assert_eq!(parse_duration("-2"), None);
    }
}
