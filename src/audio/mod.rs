//! audio - TTS payload decoding and playback
//!
//! Base64 payloads are decoded to planar float PCM, then played through a
//! per-playback output session. Uses ALSA for output when built with the
//! `alsa-output` feature, otherwise a silent real-time sink.

#[cfg(feature = "alsa-output")]
mod alsa_device;
pub mod output;
pub mod pcm;
pub mod session;

#[cfg(feature = "alsa-output")]
pub use alsa_device::AlsaBackend;
pub use output::{NullBackend, OutputBackend, OutputDevice};
pub use pcm::{PcmBuffer, bytes_to_pcm, decode_base64};
pub use session::{AudioSession, PlaybackEvent};
