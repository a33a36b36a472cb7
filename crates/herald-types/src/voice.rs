//! Voice session and playback state definitions.
//!
//! These are the states observed and reported by the playback core. The
//! core owns the transitions; other crates only read them.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Connectivity of a voice session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// The join handshake is still in progress.
    #[default]
    Connecting,
    /// Audio sent to a subscribed sink reaches the channel.
    Connected,
    /// The session is gone and will be replaced by a reconnect.
    Disconnected,
}

impl ConnectionState {
    /// Returns the string label for this state.
    pub fn label(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }
}

/// What kind of audio a track carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    /// The looping background resource.
    Ambient,
    /// A synthesized speech clip, played once.
    Announcement,
}

/// Which source currently owns the audio sink.
///
/// Exactly one mode is active at any time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PlaybackMode {
    /// Nothing owns the sink, usually because there is no live session.
    #[default]
    Idle,
    /// The ambient resource is playing or about to be replayed.
    AmbientLoop,
    /// An announcement is being fetched, played or settled.
    ///
    /// `scratch_file` is `None` while the clip is still being fetched and
    /// after it has been deleted.
    Announcing {
        text: String,
        scratch_file: Option<PathBuf>,
    },
}

impl PlaybackMode {
    /// Returns the string label for this mode.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AmbientLoop => "ambient_loop",
            Self::Announcing { .. } => "announcing",
        }
    }

    pub fn is_announcing(&self) -> bool {
        matches!(self, Self::Announcing { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_state_labels() {
        assert_eq!(ConnectionState::Connecting.label(), "connecting");
        assert_eq!(ConnectionState::Connected.label(), "connected");
        assert_eq!(ConnectionState::Disconnected.label(), "disconnected");
    }

    #[test]
    fn default_mode_is_idle() {
        assert_eq!(PlaybackMode::default(), PlaybackMode::Idle);
        assert!(!PlaybackMode::default().is_announcing());
    }

    #[test]
    fn announcing_label() {
        let mode = PlaybackMode::Announcing {
            text: "hello".to_string(),
            scratch_file: None,
        };
        assert_eq!(mode.label(), "announcing");
        assert!(mode.is_announcing());
    }
}
