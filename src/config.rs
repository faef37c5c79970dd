//! Configuration for the commentary service
//!
//! Loaded in order, later sources winning:
//! 1. `.env` (via dotenvy) into the process environment
//! 2. a TOML file (`config/default.toml` unless a path is given)
//! 3. `COMMENTARY__<SECTION>__<KEY>` environment variables
//! 4. the flat variables of earlier deployments (`GROQ_API_KEY`, `MAX_RETRIES`, ...)

use crate::commentary::CommentaryStyle;
use crate::error::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Azure regions the speech service is deployed to
pub const SPEECH_REGIONS: [&str; 8] = [
    "eastus",
    "eastus2",
    "westus",
    "westus2",
    "northeurope",
    "westeurope",
    "southeastasia",
    "eastasia",
];

const MIN_API_KEY_LEN: usize = 32;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub voices: VoicesConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Sports data feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "default_stats_url")]
    pub base_url: String,

    /// Bearer token (env GAME_STATS_API_KEY)
    #[serde(default)]
    pub api_key: Option<SecretString>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_stats_url() -> String {
    "https://api.sportsdataservice.com/v1".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            base_url: default_stats_url(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl StatsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Language model configuration (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// Rephrase template commentary through the LLM
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_llm_url")]
    pub base_url: String,

    /// API key (env GROQ_API_KEY)
    #[serde(default)]
    pub api_key: Option<SecretString>,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_llm_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_llm_model() -> String {
    "mixtral-8x7b-32768".to_string()
}

fn default_max_tokens() -> u32 {
    150
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            base_url: default_llm_url(),
            api_key: None,
            model: default_llm_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Subscription key (env AZURE_SPEECH_KEY)
    #[serde(default)]
    pub subscription_key: Option<SecretString>,

    /// Service region (env AZURE_SPEECH_REGION)
    #[serde(default = "default_region")]
    pub region: String,

    /// Overrides the regional endpoint `https://{region}.tts.speech.microsoft.com`
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Directory synthesized audio is written to (env OUTPUT_DIR)
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_region() -> String {
    "eastus".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            subscription_key: None,
            region: default_region(),
            endpoint: None,
            output_dir: default_output_dir(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl SpeechConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Voice settings for one commentary style
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VoiceSettings {
    pub voice_name: String,
    pub rate: f64,
    pub pitch: f64,
}

/// Voice settings per commentary style
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VoicesConfig {
    #[serde(default = "default_excited_voice")]
    pub excited: VoiceSettings,
    #[serde(default = "default_neutral_voice")]
    pub neutral: VoiceSettings,
    #[serde(default = "default_analytical_voice")]
    pub analytical: VoiceSettings,
}

fn default_excited_voice() -> VoiceSettings {
    VoiceSettings {
        voice_name: "en-US-ChristopherNeural".to_string(),
        rate: 1.1,
        pitch: 2.0,
    }
}

fn default_neutral_voice() -> VoiceSettings {
    VoiceSettings {
        voice_name: "en-US-GuyNeural".to_string(),
        rate: 1.0,
        pitch: 0.0,
    }
}

fn default_analytical_voice() -> VoiceSettings {
    VoiceSettings {
        voice_name: "en-US-RogerNeural".to_string(),
        rate: 0.9,
        pitch: -1.0,
    }
}

impl Default for VoicesConfig {
    fn default() -> Self {
        Self {
            excited: default_excited_voice(),
            neutral: default_neutral_voice(),
            analytical: default_analytical_voice(),
        }
    }
}

impl VoicesConfig {
    pub fn for_style(&self, style: CommentaryStyle) -> &VoiceSettings {
        match style {
            CommentaryStyle::Excited => &self.excited,
            CommentaryStyle::Neutral => &self.neutral,
            CommentaryStyle::Analytical => &self.analytical,
        }
    }
}

/// Narration pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Seconds between commentary updates (env UPDATE_INTERVAL)
    #[serde(default = "default_update_interval")]
    pub update_interval_secs: u64,

    /// Maximum attempts per collaborator call (env MAX_RETRIES)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff between attempts, doubled each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Maximum commentary length in characters
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Fixed commentary style; chosen per cycle from the analysis when unset
    #[serde(default)]
    pub style: Option<CommentaryStyle>,

    /// How many recent templates are excluded from selection
    #[serde(default = "default_template_memory")]
    pub template_memory: usize,
}

fn default_update_interval() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_max_length() -> usize {
    150
}

fn default_template_memory() -> usize {
    5
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: default_update_interval(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_length: default_max_length(),
            style: None,
            template_memory: default_template_memory(),
        }
    }
}

impl PipelineConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset (env LOG_LEVEL)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,

    /// Also append log lines to this file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from file and environment, then validate it
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file loaded: {}", e);
        }

        let file = match path {
            Some(path) => ::config::File::from(path).required(true),
            None => ::config::File::with_name("config/default").required(false),
        };

        let config: Config = ::config::Config::builder()
            .add_source(file)
            .add_source(::config::Environment::with_prefix("COMMENTARY").separator("__"))
            .build()?
            .try_deserialize()?;

        let config = config.from_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply the flat environment variables of earlier deployments
    pub fn from_env(mut self) -> Self {
        if let Ok(val) = std::env::var("GROQ_API_KEY") {
            self.llm.api_key = Some(SecretString::new(val));
        }

        if let Ok(val) = std::env::var("AZURE_SPEECH_KEY") {
            self.speech.subscription_key = Some(SecretString::new(val));
        }

        if let Ok(val) = std::env::var("AZURE_SPEECH_REGION") {
            self.speech.region = val;
        }

        if let Ok(val) = std::env::var("GAME_STATS_API_KEY") {
            self.stats.api_key = Some(SecretString::new(val));
        }

        if let Ok(val) = std::env::var("LOG_LEVEL") {
            self.logging.level = val.to_lowercase();
        }

        if let Ok(val) = std::env::var("OUTPUT_DIR") {
            self.speech.output_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("UPDATE_INTERVAL") {
            if let Ok(secs) = val.parse() {
                self.pipeline.update_interval_secs = secs;
            }
        }

        if let Ok(val) = std::env::var("MAX_RETRIES") {
            if let Ok(retries) = val.parse() {
                self.pipeline.max_retries = retries;
            }
        }

        self
    }

    /// Check settings that would otherwise fail at the first cycle
    pub fn validate(&self) -> Result<()> {
        check_api_key("stats.api_key", self.stats.api_key.as_ref())?;

        if self.llm.enabled {
            check_api_key("llm.api_key", self.llm.api_key.as_ref())?;
        }

        if self.speech.enabled {
            check_api_key("speech.subscription_key", self.speech.subscription_key.as_ref())?;

            let region = self.speech.region.to_lowercase();
            if !SPEECH_REGIONS.contains(&region.as_str()) {
                return Err(Error::Configuration(format!(
                    "speech.region `{}` is not a supported region",
                    self.speech.region
                )));
            }
        }

        if self.pipeline.update_interval_secs == 0 {
            return Err(Error::Configuration(
                "pipeline.update_interval_secs must be greater than 0".into(),
            ));
        }

        if self.pipeline.max_retries == 0 {
            return Err(Error::Configuration(
                "pipeline.max_retries must be greater than 0".into(),
            ));
        }

        if self.pipeline.max_length == 0 {
            return Err(Error::Configuration(
                "pipeline.max_length must be greater than 0".into(),
            ));
        }

        if self.pipeline.template_memory == 0 {
            return Err(Error::Configuration(
                "pipeline.template_memory must be greater than 0".into(),
            ));
        }

        for style in CommentaryStyle::ALL {
            let voice = self.voices.for_style(style);
            if !(0.5..=2.0).contains(&voice.rate) {
                return Err(Error::Configuration(format!(
                    "voices.{}.rate must be within [0.5, 2.0]",
                    style
                )));
            }
            if !(-12.0..=12.0).contains(&voice.pitch) {
                return Err(Error::Configuration(format!(
                    "voices.{}.pitch must be within [-12, 12]",
                    style
                )));
            }
        }

        Ok(())
    }
}

fn check_api_key(setting: &str, key: Option<&SecretString>) -> Result<()> {
    let key = key.ok_or_else(|| Error::Configuration(format!("{} is required", setting)))?;
    let value = key.expose_secret();

    if value.trim().is_empty() {
        return Err(Error::Configuration(format!("{} is empty", setting)));
    }
    if value.len() < MIN_API_KEY_LEN {
        return Err(Error::Configuration(format!("{} has an invalid format", setting)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> Option<SecretString> {
        Some(SecretString::new("x".repeat(40)))
    }

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.stats.api_key = key();
        config.llm.api_key = key();
        config.speech.subscription_key = key();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.pipeline.update_interval_secs, 30);
        assert_eq!(config.pipeline.max_retries, 3);
        assert_eq!(config.pipeline.max_length, 150);
        assert_eq!(config.pipeline.template_memory, 5);
        assert_eq!(config.llm.model, "mixtral-8x7b-32768");
        assert_eq!(config.voices.excited.voice_name, "en-US-ChristopherNeural");
        assert!(config.pipeline.style.is_none());
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_key() {
        let mut config = valid_config();
        config.llm.api_key = Some(SecretString::new("short".into()));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("llm.api_key"));
    }

    #[test]
    fn test_disabled_collaborators_need_no_keys() {
        let mut config = valid_config();
        config.llm.enabled = false;
        config.llm.api_key = None;
        config.speech.enabled = false;
        config.speech.subscription_key = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_region() {
        let mut config = valid_config();
        config.speech.region = "WestEurope".into();
        assert!(config.validate().is_ok());

        config.speech.region = "mars-north".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_voice_bounds() {
        let mut config = valid_config();
        config.voices.neutral.rate = 2.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_secrets_are_redacted_in_debug() {
        let config = valid_config();
        let debug = format!("{:?}", config.llm);
        assert!(!debug.contains(&"x".repeat(40)));
    }

    #[test]
    fn test_parse_toml_sections() {
        let toml = r#"
            [pipeline]
            update_interval_secs = 10
            style = "analytical"

            [voices.excited]
            voice_name = "en-US-DavisNeural"
            rate = 1.3
            pitch = 3
        "#;

        let config: Config = ::config::Config::builder()
            .add_source(::config::File::from_str(toml, ::config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.pipeline.update_interval_secs, 10);
        assert_eq!(config.pipeline.max_retries, 3);
        assert_eq!(config.pipeline.style, Some(CommentaryStyle::Analytical));
        assert_eq!(config.voices.excited.voice_name, "en-US-DavisNeural");
        assert_eq!(config.voices.neutral, default_neutral_voice());
    }
}
