//! The chat-platform side of a voice connection.
//!
//! The platform itself is an external collaborator; Herald only needs to
//! join one channel, learn about connection state changes, and point an
//! audio sink at the live connection.

use crate::error::VoiceError;
use crate::sink::AudioSink;
use async_trait::async_trait;
use herald_types::{ChannelRef, ConnectionState};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Joins voice channels on the chat platform.
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    async fn join(&self, channel: ChannelRef) -> Result<Arc<dyn VoiceConnection>, VoiceError>;
}

/// One joined voice connection.
pub trait VoiceConnection: Send + Sync {
    /// Routes the sink's output into this connection.
    fn subscribe(&self, sink: Arc<dyn AudioSink>);

    /// Observes connection state transitions.
    fn state(&self) -> watch::Receiver<ConnectionState>;
}

/// A live connection to the watched channel.
///
/// Sessions are never mutated. Each reconnect produces a new session with a
/// higher `generation`.
#[derive(Clone)]
pub struct VoiceSession {
    generation: u64,
    channel: ChannelRef,
    connection: Arc<dyn VoiceConnection>,
}

impl VoiceSession {
    pub fn new(generation: u64, channel: ChannelRef, connection: Arc<dyn VoiceConnection>) -> Self {
        Self {
            generation,
            channel,
            connection,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn channel(&self) -> ChannelRef {
        self.channel
    }

    pub fn state(&self) -> ConnectionState {
        *self.connection.state().borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.connection.state()
    }

    pub fn subscribe(&self, sink: Arc<dyn AudioSink>) {
        self.connection.subscribe(sink);
    }
}

impl fmt::Debug for VoiceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceSession")
            .field("generation", &self.generation)
            .field("channel", &self.channel)
            .field("state", &self.state())
            .finish()
    }
}
