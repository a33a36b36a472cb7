//! The single outbound audio stream.
//!
//! An [`AudioSink`] plays one [`Track`] at a time. Every successful
//! [`AudioSink::play`] returns a [`PlaybackHandle`] that resolves exactly
//! once, when the track ends on its own or is stopped. Callers cannot tell
//! which of the two happened, only that the sink is idle again.

use crate::error::VoiceError;
use herald_types::TrackKind;
use std::path::PathBuf;
use tokio::sync::oneshot;

/// A playable resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub kind: TrackKind,
    pub path: PathBuf,
    /// Linear gain, 1.0 is unchanged.
    pub volume: f32,
}

impl Track {
    pub fn new(kind: TrackKind, path: impl Into<PathBuf>, volume: f32) -> Self {
        Self {
            kind,
            path: path.into(),
            volume,
        }
    }
}

/// Resolves once the track it was issued for is no longer playing.
#[derive(Debug)]
pub struct PlaybackHandle {
    done: oneshot::Receiver<()>,
}

impl PlaybackHandle {
    /// Waits until the sink is idle.
    pub async fn finished(self) {
        // A dropped notifier also means the track is over.
        let _ = self.done.await;
    }
}

/// The sink side of a [`PlaybackHandle`].
///
/// Consuming it with [`IdleNotifier::notify`] or dropping it both release
/// the handle, so a track can never report idle twice.
#[derive(Debug)]
pub struct IdleNotifier {
    tx: oneshot::Sender<()>,
}

impl IdleNotifier {
    pub fn notify(self) {
        let _ = self.tx.send(());
    }
}

/// Creates a connected notifier/handle pair for one playback.
pub fn playback_channel() -> (IdleNotifier, PlaybackHandle) {
    let (tx, rx) = oneshot::channel();
    (IdleNotifier { tx }, PlaybackHandle { done: rx })
}

/// Outbound audio to the shared channel.
///
/// Implementations must stop whatever is playing before starting a new
/// track. `stop` must be idempotent.
pub trait AudioSink: Send + Sync {
    fn play(&self, track: Track) -> Result<PlaybackHandle, VoiceError>;
    fn stop(&self);
}
