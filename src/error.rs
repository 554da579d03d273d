//! Error types for the press review.
//!
//! Two buckets reach the outside: the page fails as a whole when the digest
//! or image collaborators are unusable, and audio failures stay local to the
//! playback controller.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Digest or image provider failed or returned malformed data
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// TTS fetch or playback setup failed
    #[error("Audio unavailable: {0}")]
    AudioUnavailable(String),

    /// TTS payload was not valid base64
    #[error("Invalid audio payload: {0}")]
    InvalidAudioPayload(#[from] base64::DecodeError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn upstream(msg: impl std::fmt::Display) -> Self {
        Error::UpstreamUnavailable(msg.to_string())
    }

    pub fn audio(msg: impl std::fmt::Display) -> Self {
        Error::AudioUnavailable(msg.to_string())
    }

    /// True for everything the playback controller recovers from locally.
    pub fn is_audio(&self) -> bool {
        matches!(
            self,
            Error::AudioUnavailable(_) | Error::InvalidAudioPayload(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
