//! Agent configuration loading from file and environment variables.

use crate::greeting::GreetingConfig;
use herald_types::ChannelRef;
use herald_voice::{PlaybackConfig, SpeechConfig, TimingConfig};
use serde::Deserialize;
use thiserror::Error;

/// Top-level agent configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Which voice channel to live in.
    #[serde(default)]
    pub voice: VoiceTargetConfig,

    /// Ambient track and volumes.
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// Speech-synthesis endpoint and scratch directory.
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Fixed delays.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Announcement texts.
    #[serde(default)]
    pub greetings: GreetingConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The watched channel and the agent's own identity.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoiceTargetConfig {
    #[serde(default)]
    pub guild_id: u64,

    #[serde(default)]
    pub channel_id: u64,

    /// The agent's own user id; its voice updates are ignored.
    #[serde(default)]
    pub self_id: u64,
}

impl VoiceTargetConfig {
    pub fn channel(&self) -> ChannelRef {
        ChannelRef::new(self.guild_id, self.channel_id)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "herald_voice=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration parsed but cannot be used.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl Config {
    /// Checks the settings the agent cannot start without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.voice.channel_id == 0 {
            return Err(ConfigError::Invalid(
                "voice.channel_id must be set".to_string(),
            ));
        }
        self.speech
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.playback
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }
}

/// Parses configuration from a TOML string and applies no overrides.
pub fn parse_config(contents: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(contents)?)
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `HERALD_GUILD_ID` overrides `voice.guild_id`
/// - `HERALD_CHANNEL_ID` overrides `voice.channel_id`
/// - `HERALD_SPEECH_ENDPOINT` overrides `speech.endpoint`
/// - `HERALD_SCRATCH_DIR` overrides `speech.scratch_dir`
/// - `HERALD_AMBIENT_TRACK` overrides `playback.ambient_track`
/// - `HERALD_LOG_LEVEL` overrides `logging.level`
/// - `HERALD_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => parse_config(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Applies `HERALD_*` overrides read through `lookup`.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(guild) = lookup("HERALD_GUILD_ID") {
        if let Ok(parsed) = guild.parse() {
            config.voice.guild_id = parsed;
        }
    }
    if let Some(channel) = lookup("HERALD_CHANNEL_ID") {
        if let Ok(parsed) = channel.parse() {
            config.voice.channel_id = parsed;
        }
    }
    if let Some(endpoint) = lookup("HERALD_SPEECH_ENDPOINT") {
        config.speech.endpoint = endpoint;
    }
    if let Some(dir) = lookup("HERALD_SCRATCH_DIR") {
        config.speech.scratch_dir = dir.into();
    }
    if let Some(track) = lookup("HERALD_AMBIENT_TRACK") {
        config.playback.ambient_track = track.into();
    }
    if let Some(level) = lookup("HERALD_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("HERALD_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
