//! Shared types for the Herald presence agent.
//!
//! This crate provides the plain data types used across all Herald crates:
//! the voice channel reference, connection states, playback modes, and the
//! membership events the agent reacts to.
//!
//! Nothing here performs I/O. Behaviour lives in `herald-voice` (the
//! playback core) and `herald-agent` (startup glue and event handling).

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod presence;
pub mod voice;

pub use presence::{Member, MembershipEvent};
pub use voice::{ConnectionState, PlaybackMode, TrackKind};

/// Identifies the single voice channel the agent lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelRef {
    /// Guild (server) that owns the channel.
    pub guild_id: u64,
    /// The voice channel itself.
    pub channel_id: u64,
}

impl ChannelRef {
    pub fn new(guild_id: u64, channel_id: u64) -> Self {
        Self {
            guild_id,
            channel_id,
        }
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.guild_id, self.channel_id)
    }
}
