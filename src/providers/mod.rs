//! Generative-API collaborators: digest text, caricature image, narration.
//!
//! Clients are built once at startup and handed to their consumers as trait
//! objects.

pub mod gemini;
pub mod huggingface;

use async_trait::async_trait;

use crate::error::Result;
use crate::review::StructuredReview;

pub use gemini::{GeminiClient, GeminiDigest, GeminiTts};
pub use huggingface::HuggingFaceImage;

#[async_trait]
pub trait DigestProvider: Send + Sync {
    /// Ask for the review of `date_label`. Fails with `UpstreamUnavailable`
    /// when the answer does not have the expected shape.
    async fn fetch_daily_review(&self, date_label: &str) -> Result<StructuredReview>;
}

#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Always yields a URL; failures produce a placeholder.
    async fn generate_caricature(&self, caption: &str) -> String;
}

#[async_trait]
pub trait TtsProvider: Send + Sync {
    /// Base64 s16le PCM for `text`. An empty string means no audio.
    async fn generate_audio(&self, text: &str) -> Result<String>;
}

/// Narration is not wired to a speech service: always "no audio".
#[derive(Debug, Clone, Default)]
pub struct SilentTts;

#[async_trait]
impl TtsProvider for SilentTts {
    async fn generate_audio(&self, _text: &str) -> Result<String> {
        log::warn!("Audio-Bila not configured, returning empty payload");
        Ok(String::new())
    }
}

/// Strip a ```` ```json ```` opening fence and a closing ```` ``` ```` fence
/// that models like to wrap JSON in.
pub fn strip_code_fence(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.trim_end().strip_suffix("```") {
        s = rest;
    }
    s.trim()
}
