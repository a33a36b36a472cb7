use herald_types::ChannelRef;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    /// The speech endpoint could not be reached or answered with a
    /// non-success status.
    #[error("speech request failed: {0}")]
    Network(String),

    /// The text was refused before any request was made.
    #[error("speech text rejected: {0}")]
    InvalidInput(String),

    #[error("failed to write scratch file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to join voice channel {channel}: {reason}")]
    Connection { channel: ChannelRef, reason: String },

    #[error("failed to remove scratch file {path:?}: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("audio sink error: {0}")]
    Sink(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl VoiceError {
    pub(crate) fn network(err: impl std::fmt::Display) -> Self {
        Self::Network(err.to_string())
    }
}
