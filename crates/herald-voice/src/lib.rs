//! Voice-session lifecycle and audio-state coordination for Herald.
//!
//! Herald sits in one voice channel, loops an ambient track, and interrupts
//! the loop to speak synthesized announcements. This crate is the part with
//! real state: it owns the single audio sink, guarantees that ambient audio
//! and announcements never overlap, serves announcements strictly in
//! arrival order, and keeps the channel joined across disconnects.
//!
//! The pieces, leaves first:
//!
//! | Module | Role |
//! |--------|------|
//! | [`normalize`] | ASCII transliteration of letters the speech endpoint cannot render |
//! | [`speech`] | HTTP speech fetcher staging clips in the scratch directory |
//! | [`scratch`] | Scratch directory, clip ownership and best-effort cleanup |
//! | [`sink`] | The outbound audio stream abstraction |
//! | [`coordinator`] | The playback state machine |
//! | [`connection`] | Join, watch, and re-join the voice channel |
//! | [`gateway`] | What the chat platform must provide |
//! | [`loopback`] | An in-process platform for local runs and tests |

pub mod config;
pub mod connection;
pub mod coordinator;
pub mod error;
pub mod gateway;
pub mod loopback;
pub mod normalize;
pub mod scratch;
pub mod sink;
pub mod speech;

pub use config::{
    PlaybackConfig, SpeechConfig, TimingConfig, AMBIENT_LOOP_DELAY, ANNOUNCEMENT_SETTLE_DELAY,
    RECONNECT_DELAY, STARTUP_AMBIENT_DELAY,
};
pub use connection::{ConnectionHandle, ConnectionManager};
pub use coordinator::{AnnouncementRequest, Coordinator, CoordinatorHandle};
pub use error::VoiceError;
pub use gateway::{VoiceConnection, VoiceGateway, VoiceSession};
pub use loopback::{LoopbackConnection, LoopbackGateway, LoopbackSink};
pub use normalize::normalize;
pub use scratch::{Janitor, ScratchDir, ScratchFile};
pub use sink::{playback_channel, AudioSink, IdleNotifier, PlaybackHandle, Track};
pub use speech::{SpeechFetcher, SpeechSource};
