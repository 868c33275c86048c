use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::executor::RetryPolicy;

/// Environment variable consulted when the config file carries no API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Top-level configuration for stock-meta-ai.
///
/// Holds the model connection, the generation settings that shape the prompt
/// and the post-processing, and the retry policy of the request executor.
///
/// # Loading
///
/// ```rust,no_run
/// use stock_meta_ai::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.gemini.api_key = "AIza...".into();
/// config.settings.keywords_count = 30;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Gemini connection settings.
    pub gemini: GeminiConfig,
    /// Generation settings (prompt targets, switches, custom prompts).
    pub settings: ControlSettings,
    /// Backoff and attempt limits for the request executor.
    pub retry: RetryConfig,
}

/// Google Gemini service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    /// API root, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-2.5-flash".to_string(),
            base_url: crate::ai::GEMINI_BASE_URL.to_string(),
        }
    }
}

/// Retry behaviour of the request executor, in config-file units.
///
/// `max_attempts: null` keeps retrying until the model answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_attempts: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            initial_delay_ms: policy.initial_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
            max_attempts: policy.max_attempts,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            max_attempts: self.max_attempts,
        }
    }
}

/// Which prompt the metadata mode uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CustomPromptSelect {
    /// The built-in stock metadata template.
    #[default]
    Default,
    /// The free text in [`ControlSettings::custom_prompt_entry`].
    SetCustom,
}

/// Toggles that shape caption-mode prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSwitches {
    /// Use [`ControlSettings::custom_prompt_entry_prompt`] instead of the template.
    pub custom_prompt: bool,
    pub silhouette: bool,
    pub white_bg: bool,
    pub transparent_bg: bool,
}

/// Toggles whose phrases are forced into metadata titles and keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AdvanceTitle {
    pub transparent_bg: bool,
    pub white_bg: bool,
    pub vector: bool,
    pub illustration: bool,
}

/// User-chosen generation constraints.
///
/// The numeric targets are embedded in the prompt as exact requirements. The
/// model is not guaranteed to honour them and they are not enforced locally,
/// with the exception of `keywords_count`, which caps the returned keywords.
///
/// # Example
///
/// ```rust
/// use stock_meta_ai::config::{AdvanceTitle, ControlSettings};
///
/// let settings = ControlSettings {
///     keywords_count: 25,
///     advance_title: AdvanceTitle { white_bg: true, ..Default::default() },
///     ..Default::default()
/// };
/// assert_eq!(settings.title_length, 80);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    pub custom_prompt_select: CustomPromptSelect,
    /// Custom instructions for metadata mode.
    pub custom_prompt_entry: String,
    /// Custom instructions for caption mode.
    pub custom_prompt_entry_prompt: String,
    pub prompt_switches: PromptSwitches,
    pub advance_title: AdvanceTitle,
    /// Target title length in characters.
    pub title_length: u32,
    /// Target description length in characters.
    pub desc_length: u32,
    /// Target keyword count; also the cap on returned keywords.
    pub keywords_count: usize,
    /// Target caption length in words.
    pub desc_words: u32,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            custom_prompt_select: CustomPromptSelect::Default,
            custom_prompt_entry: String::new(),
            custom_prompt_entry_prompt: String::new(),
            prompt_switches: PromptSwitches::default(),
            advance_title: AdvanceTitle::default(),
            title_length: 80,
            desc_length: 150,
            keywords_count: 40,
            desc_words: 40,
        }
    }
}

impl Config {
    /// Resolve the config file path: same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    ///
    /// An empty `gemini.api_key` is filled from `GEMINI_API_KEY`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let mut config: Config = if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).context("Failed to read config file")?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            Self::default()
        };

        if config.gemini.api_key.is_empty() {
            if let Ok(key) = std::env::var(API_KEY_ENV) {
                config.gemini.api_key = key;
            }
        }

        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }
}
