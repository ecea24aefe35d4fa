//! Multi-tier TOML configuration for Parley.
//!
//! Reads configuration from multiple sources with precedence:
//! CLI flags > env vars > config file > defaults

use parley_api::RetryConfig;
use parley_session::compact::{DEFAULT_KEEP_LAST, DEFAULT_SUMMARY_MAX_TOKENS};
use parley_session::{ModelPricing, PriceTable};
use parley_types::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The default Anthropic API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.anthropic.com";

/// The default model to use.
pub const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";

/// The default max tokens for a reply.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Turn count above which older turns are summarized.
pub const DEFAULT_COMPRESS_AT: usize = 10;

/// The default system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Answer briefly and to the point.";

/// Resolved configuration for a Parley session.
#[derive(Debug, Clone)]
pub struct ParleyConfig {
    pub api_key: String,
    pub model: String,
    pub api_base_url: String,
    pub max_tokens: u32,
    pub max_retries: u32,
    pub system_prompt: String,
    pub keep_last: usize,
    pub compress_at: usize,
    pub summary_max_tokens: u32,
    /// `None` keeps the conversation in memory only.
    pub history_file: Option<PathBuf>,
    pub pricing: PriceTable,
    pub config_dir: PathBuf,
}

/// Settings that can be read from a TOML config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub conversation: ConversationSettings,
    /// Per-model price overrides, keyed by model id.
    #[serde(default)]
    pub pricing: HashMap<String, ModelPricing>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiSettings {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub base_url: Option<String>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationSettings {
    pub system_prompt: Option<String>,
    pub keep_last: Option<usize>,
    pub compress_at: Option<usize>,
    pub summary_max_tokens: Option<u32>,
    pub history_file: Option<PathBuf>,
}

/// CLI overrides that take highest precedence.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub keep_last: Option<usize>,
    pub compress_at: Option<usize>,
    pub history_file: Option<PathBuf>,
    pub no_history: bool,
}

impl ParleyConfig {
    /// Load configuration from all sources, applying precedence rules.
    ///
    /// Precedence (highest to lowest):
    /// 1. CLI flags
    /// 2. Environment variables
    /// 3. Config file (~/.parley/config.toml)
    /// 4. Defaults
    pub fn load(overrides: CliOverrides) -> Result<Self, ConfigError> {
        let config_dir = config_dir();
        let settings = load_settings_file(&config_dir.join("config.toml"));
        Self::resolve(overrides, settings, config_dir, |key| std::env::var(key).ok())
    }

    /// Apply precedence rules to already-gathered sources.
    pub fn resolve(
        overrides: CliOverrides,
        settings: SettingsFile,
        config_dir: PathBuf,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let SettingsFile {
            api,
            conversation,
            pricing,
        } = settings;

        // Resolve API key: CLI > env > config file
        let api_key = overrides
            .api_key
            .or_else(|| env("ANTHROPIC_API_KEY"))
            .or(api.api_key)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingKey {
                key: "api_key (set ANTHROPIC_API_KEY or add to ~/.parley/config.toml)".into(),
            })?;

        let model = overrides
            .model
            .or_else(|| env("PARLEY_MODEL"))
            .or(api.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let api_base_url = env("ANTHROPIC_API_BASE_URL")
            .or(api.base_url)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let max_tokens = overrides
            .max_tokens
            .or(api.max_tokens)
            .unwrap_or(DEFAULT_MAX_TOKENS);
        let keep_last = overrides
            .keep_last
            .or(conversation.keep_last)
            .unwrap_or(DEFAULT_KEEP_LAST);
        let compress_at = overrides
            .compress_at
            .or(conversation.compress_at)
            .unwrap_or(DEFAULT_COMPRESS_AT);
        let summary_max_tokens = conversation
            .summary_max_tokens
            .unwrap_or(DEFAULT_SUMMARY_MAX_TOKENS);

        require_positive("max_tokens", max_tokens as usize)?;
        require_positive("summary_max_tokens", summary_max_tokens as usize)?;
        require_positive("keep_last", keep_last)?;
        require_positive("compress_at", compress_at)?;
        if keep_last > compress_at {
            tracing::warn!(
                "keep_last ({keep_last}) exceeds compress_at ({compress_at}); \
                 compression will never fold any turns"
            );
        }

        let history_file = if overrides.no_history {
            None
        } else {
            Some(
                overrides
                    .history_file
                    .or_else(|| env("PARLEY_HISTORY_FILE").map(PathBuf::from))
                    .or(conversation.history_file)
                    .unwrap_or_else(|| config_dir.join("history.json")),
            )
        };

        Ok(ParleyConfig {
            api_key,
            model,
            api_base_url,
            max_tokens,
            max_retries: api.max_retries.unwrap_or(RetryConfig::default().max_retries),
            system_prompt: conversation
                .system_prompt
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            keep_last,
            compress_at,
            summary_max_tokens,
            history_file,
            pricing: PriceTable::with_overrides(pricing),
            config_dir,
        })
    }

    /// Transport retry policy for the configured retry count.
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            ..RetryConfig::default()
        }
    }

    /// Pricing for the configured model.
    pub fn model_pricing(&self) -> ModelPricing {
        self.pricing.for_model(&self.model)
    }
}

fn require_positive(key: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be at least 1".into(),
        });
    }
    Ok(())
}

/// Get the Parley config directory path (~/.parley/).
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PARLEY_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".parley")
}

/// Load and parse a TOML settings file, returning defaults on any error.
pub fn load_settings_file(path: &Path) -> SettingsFile {
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("Failed to parse {}: {}", path.display(), e);
            SettingsFile::default()
        }),
        Err(_) => SettingsFile::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn with_key() -> CliOverrides {
        CliOverrides {
            api_key: Some("sk-test".into()),
            ..CliOverrides::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = ParleyConfig::resolve(
            with_key(),
            SettingsFile::default(),
            PathBuf::from("/cfg"),
            no_env,
        )
        .unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.summary_max_tokens, 300);
        assert_eq!(config.keep_last, 4);
        assert_eq!(config.compress_at, 10);
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.history_file, Some(PathBuf::from("/cfg/history.json")));
        assert_eq!(config.model_pricing(), ModelPricing::new(0.80, 4.00));
    }

    #[test]
    fn test_missing_api_key() {
        let err = ParleyConfig::resolve(
            CliOverrides::default(),
            SettingsFile::default(),
            PathBuf::from("/cfg"),
            no_env,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey { .. }));
    }

    #[test]
    fn test_env_beats_file_and_cli_beats_env() {
        let settings: SettingsFile = toml::from_str(
            r#"
[api]
api_key = "from-file"
model = "claude-opus-4-6"
"#,
        )
        .unwrap();
        let env = |key: &str| match key {
            "ANTHROPIC_API_KEY" => Some("from-env".to_string()),
            "PARLEY_MODEL" => Some("claude-sonnet-4-5".to_string()),
            _ => None,
        };

        let config = ParleyConfig::resolve(
            CliOverrides::default(),
            settings.clone(),
            PathBuf::from("/cfg"),
            env,
        )
        .unwrap();
        assert_eq!(config.api_key, "from-env");
        assert_eq!(config.model, "claude-sonnet-4-5");

        let config = ParleyConfig::resolve(
            CliOverrides {
                model: Some("claude-cli".into()),
                ..CliOverrides::default()
            },
            settings,
            PathBuf::from("/cfg"),
            env,
        )
        .unwrap();
        assert_eq!(config.model, "claude-cli");
    }

    #[test]
    fn test_conversation_settings_parse() {
        let toml_str = r#"
[api]
max_tokens = 2048
max_retries = 3

[conversation]
system_prompt = "Talk like a pirate."
keep_last = 2
compress_at = 6
summary_max_tokens = 200
history_file = "/tmp/chat.json"

[pricing."claude-custom"]
input_per_million = 1.5
output_per_million = 7.5
"#;
        let settings: SettingsFile = toml::from_str(toml_str).unwrap();
        let config = ParleyConfig::resolve(
            CliOverrides {
                model: Some("claude-custom".into()),
                ..with_key()
            },
            settings,
            PathBuf::from("/cfg"),
            no_env,
        )
        .unwrap();
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.retry_config().max_retries, 3);
        assert_eq!(config.system_prompt, "Talk like a pirate.");
        assert_eq!(config.keep_last, 2);
        assert_eq!(config.compress_at, 6);
        assert_eq!(config.summary_max_tokens, 200);
        assert_eq!(config.history_file, Some(PathBuf::from("/tmp/chat.json")));
        assert_eq!(config.model_pricing(), ModelPricing::new(1.5, 7.5));
    }

    #[test]
    fn test_no_history_disables_persistence() {
        let config = ParleyConfig::resolve(
            CliOverrides {
                no_history: true,
                history_file: Some("/tmp/ignored.json".into()),
                ..with_key()
            },
            SettingsFile::default(),
            PathBuf::from("/cfg"),
            no_env,
        )
        .unwrap();
        assert!(config.history_file.is_none());
    }

    #[test]
    fn test_zero_window_rejected() {
        let err = ParleyConfig::resolve(
            CliOverrides {
                keep_last: Some(0),
                ..with_key()
            },
            SettingsFile::default(),
            PathBuf::from("/cfg"),
            no_env,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "keep_last"));
    }

    #[test]
    fn test_unparseable_file_falls_back_to_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[api\nmodel = ").unwrap();
        let settings = load_settings_file(&path);
        assert!(settings.api.model.is_none());
        assert!(settings.pricing.is_empty());
    }
}
