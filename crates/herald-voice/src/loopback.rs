//! An in-process stand-in for the chat platform.
//!
//! The loopback gateway "joins" instantly and can be told to fail joins or
//! drop the connection. The loopback sink does not decode audio; it holds
//! the track for a duration estimated from the file size, which is enough
//! to drive the playback core end to end without a platform.

use crate::error::VoiceError;
use crate::gateway::{VoiceConnection, VoiceGateway};
use crate::sink::{playback_channel, AudioSink, PlaybackHandle, Track};
use async_trait::async_trait;
use herald_types::{ChannelRef, ConnectionState};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info};

/// 128 kbit/s, the usual bitrate of synthesized MP3 speech.
const DEFAULT_BYTES_PER_SECOND: u64 = 16_000;

/// Shortest simulated playback, so empty files still yield an idle edge.
const MIN_PLAYBACK: Duration = Duration::from_millis(50);

/// A connection that lives entirely in memory.
#[derive(Debug)]
pub struct LoopbackConnection {
    channel: ChannelRef,
    state: watch::Sender<ConnectionState>,
}

impl LoopbackConnection {
    fn new(channel: ChannelRef) -> Self {
        let (state, _) = watch::channel(ConnectionState::Connected);
        Self { channel, state }
    }

    /// Simulates the platform dropping the connection.
    pub fn disconnect(&self) {
        info!(channel = %self.channel, "loopback connection dropped");
        self.state.send_replace(ConnectionState::Disconnected);
    }
}

impl VoiceConnection for LoopbackConnection {
    fn subscribe(&self, _sink: Arc<dyn AudioSink>) {
        debug!(channel = %self.channel, "sink subscribed to loopback connection");
    }

    fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }
}

/// Gateway whose joins always succeed unless told otherwise.
#[derive(Debug, Default)]
pub struct LoopbackGateway {
    latest: Mutex<Option<Arc<LoopbackConnection>>>,
    failures: AtomicU32,
    joins: AtomicUsize,
}

impl LoopbackGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` joins fail with a connection error.
    pub fn fail_next_joins(&self, count: u32) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Number of join attempts so far, failed ones included.
    pub fn join_count(&self) -> usize {
        self.joins.load(Ordering::SeqCst)
    }

    /// Drops the most recent connection. Returns `false` if there was none.
    pub fn drop_connection(&self) -> bool {
        let latest = self.latest.lock().unwrap_or_else(|e| e.into_inner()).clone();
        match latest {
            Some(connection) => {
                connection.disconnect();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl VoiceGateway for LoopbackGateway {
    async fn join(&self, channel: ChannelRef) -> Result<Arc<dyn VoiceConnection>, VoiceError> {
        self.joins.fetch_add(1, Ordering::SeqCst);

        let pending = self.failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.failures.store(pending - 1, Ordering::SeqCst);
            return Err(VoiceError::Connection {
                channel,
                reason: "loopback join refused".to_string(),
            });
        }

        let connection = Arc::new(LoopbackConnection::new(channel));
        *self.latest.lock().unwrap_or_else(|e| e.into_inner()) = Some(connection.clone());
        info!(%channel, "loopback voice channel joined");
        Ok(connection)
    }
}

/// Sink that simulates playback time instead of producing sound.
#[derive(Debug)]
pub struct LoopbackSink {
    bytes_per_second: u64,
    current: Mutex<Option<oneshot::Sender<()>>>,
}

impl Default for LoopbackSink {
    fn default() -> Self {
        Self::new(DEFAULT_BYTES_PER_SECOND)
    }
}

impl LoopbackSink {
    pub fn new(bytes_per_second: u64) -> Self {
        Self {
            bytes_per_second: bytes_per_second.max(1),
            current: Mutex::new(None),
        }
    }

    /// Estimated playing time of a file of `len` bytes.
    pub fn duration_for(&self, len: u64) -> Duration {
        Duration::from_millis(len.saturating_mul(1000) / self.bytes_per_second).max(MIN_PLAYBACK)
    }
}

impl AudioSink for LoopbackSink {
    fn play(&self, track: Track) -> Result<PlaybackHandle, VoiceError> {
        let len = std::fs::metadata(&track.path)
            .map_err(|e| VoiceError::Sink(format!("cannot open {:?}: {}", track.path, e)))?
            .len();
        let duration = self.duration_for(len);

        self.stop();
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(cancel_tx);

        info!(
            kind = ?track.kind,
            path = %track.path.display(),
            volume = track.volume,
            duration_ms = duration.as_millis() as u64,
            "loopback playing"
        );

        let (notifier, handle) = playback_channel();
        tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(duration) => {}
                _ = cancel_rx => {}
            }
            notifier.notify();
        });
        Ok(handle)
    }

    fn stop(&self) {
        if let Some(cancel) = self.current.lock().unwrap_or_else(|e| e.into_inner()).take() {
            debug!("loopback playback stopped");
            let _ = cancel.send(());
        }
    }
}
