use crate::error::VoiceError;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Pause between the end of one ambient iteration and the next.
pub const AMBIENT_LOOP_DELAY: Duration = Duration::from_millis(500);

/// Pause after an announcement finishes before the sink is reused.
pub const ANNOUNCEMENT_SETTLE_DELAY: Duration = Duration::from_millis(1000);

/// Wait before re-joining the channel after a drop or a failed join.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Wait after startup before the ambient loop is first requested.
pub const STARTUP_AMBIENT_DELAY: Duration = Duration::from_secs(2);

/// Public speech-synthesis endpoint used when none is configured.
pub const DEFAULT_SPEECH_ENDPOINT: &str = "https://www.msii.xyz/api/yaziyi-ses-yapma";

const MAX_VOLUME: f32 = 2.0;

fn default_speech_endpoint() -> String {
    DEFAULT_SPEECH_ENDPOINT.to_string()
}

fn default_text_param() -> String {
    "text".to_string()
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("./temp")
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_extension() -> String {
    "mp3".to_string()
}

fn default_ambient_track() -> PathBuf {
    PathBuf::from("muzik.mp3")
}

fn default_ambient_volume() -> f32 {
    0.5
}

fn default_announcement_volume() -> f32 {
    1.0
}

fn default_ambient_loop_delay_ms() -> u64 {
    AMBIENT_LOOP_DELAY.as_millis() as u64
}

fn default_announcement_settle_delay_ms() -> u64 {
    ANNOUNCEMENT_SETTLE_DELAY.as_millis() as u64
}

fn default_reconnect_delay_ms() -> u64 {
    RECONNECT_DELAY.as_millis() as u64
}

fn default_startup_delay_ms() -> u64 {
    STARTUP_AMBIENT_DELAY.as_millis() as u64
}

/// Where announcement audio comes from and where it is staged.
#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    /// Base URL of the speech-synthesis endpoint.
    #[serde(default = "default_speech_endpoint")]
    pub endpoint: String,
    /// Query parameter that carries the text.
    #[serde(default = "default_text_param")]
    pub text_param: String,
    /// Directory holding in-flight announcement clips.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// File extension for scratch clips, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            endpoint: default_speech_endpoint(),
            text_param: default_text_param(),
            scratch_dir: default_scratch_dir(),
            request_timeout_secs: default_request_timeout_secs(),
            extension: default_extension(),
        }
    }
}

impl SpeechConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), VoiceError> {
        if self.endpoint.trim().is_empty() {
            return Err(VoiceError::Config(
                "speech endpoint must not be empty".to_string(),
            ));
        }
        url::Url::parse(&self.endpoint).map_err(|e| {
            VoiceError::Config(format!("speech endpoint {:?} is not a URL: {}", self.endpoint, e))
        })?;
        if self.text_param.trim().is_empty() {
            return Err(VoiceError::Config(
                "speech text_param must not be empty".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(VoiceError::Config(
                "speech request_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resources and levels for the two kinds of audio.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    /// The ambient resource, replayed forever.
    #[serde(default = "default_ambient_track")]
    pub ambient_track: PathBuf,
    #[serde(default = "default_ambient_volume")]
    pub ambient_volume: f32,
    #[serde(default = "default_announcement_volume")]
    pub announcement_volume: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            ambient_track: default_ambient_track(),
            ambient_volume: default_ambient_volume(),
            announcement_volume: default_announcement_volume(),
        }
    }
}

impl PlaybackConfig {
    pub fn validate(&self) -> Result<(), VoiceError> {
        for (name, volume) in [
            ("ambient_volume", self.ambient_volume),
            ("announcement_volume", self.announcement_volume),
        ] {
            if !(0.0..=MAX_VOLUME).contains(&volume) {
                return Err(VoiceError::Config(format!(
                    "{} must be between 0.0 and {}",
                    name, MAX_VOLUME
                )));
            }
        }
        Ok(())
    }
}

/// Fixed delays, in milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_ambient_loop_delay_ms")]
    pub ambient_loop_delay_ms: u64,
    #[serde(default = "default_announcement_settle_delay_ms")]
    pub announcement_settle_delay_ms: u64,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_startup_delay_ms")]
    pub startup_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            ambient_loop_delay_ms: default_ambient_loop_delay_ms(),
            announcement_settle_delay_ms: default_announcement_settle_delay_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            startup_delay_ms: default_startup_delay_ms(),
        }
    }
}

impl TimingConfig {
    pub fn ambient_loop_delay(&self) -> Duration {
        Duration::from_millis(self.ambient_loop_delay_ms)
    }

    pub fn announcement_settle_delay(&self) -> Duration {
        Duration::from_millis(self.announcement_settle_delay_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_named_delays() {
        let timing = TimingConfig::default();
        assert_eq!(timing.ambient_loop_delay(), AMBIENT_LOOP_DELAY);
        assert_eq!(timing.announcement_settle_delay(), ANNOUNCEMENT_SETTLE_DELAY);
        assert_eq!(timing.reconnect_delay(), RECONNECT_DELAY);
        assert_eq!(timing.startup_delay(), STARTUP_AMBIENT_DELAY);
    }

    #[test]
    fn default_speech_config_is_valid() {
        SpeechConfig::default().validate().unwrap();
        PlaybackConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_bad_endpoint() {
        let config = SpeechConfig {
            endpoint: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(VoiceError::Config(_))));

        let empty = SpeechConfig {
            endpoint: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(empty.validate(), Err(VoiceError::Config(_))));
    }

    #[test]
    fn rejects_out_of_range_volume() {
        let config = PlaybackConfig {
            ambient_volume: 3.5,
            ..Default::default()
        };
        match config.validate() {
            Err(VoiceError::Config(msg)) => assert!(msg.contains("ambient_volume"), "got: {}", msg),
            other => panic!("expected Config error, got {:?}", other),
        }
    }
}
