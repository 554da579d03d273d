//! Base64 → raw bytes → planar float PCM.
//!
//! TTS payloads are signed 16-bit little-endian samples, interleaved across
//! channels. Samples are normalized by 32768.0 so the range is [-1.0, 1.0).

use base64::{Engine as _, engine::general_purpose};

use crate::error::Result;

/// Decoded samples, one `Vec` per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl PcmBuffer {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Frames per channel.
    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    pub fn duration_secs(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// Re-interleave frames `[start, end)` for devices that take interleaved
    /// writes.
    pub fn interleave(&self, start: usize, end: usize) -> Vec<f32> {
        let end = end.min(self.frame_count());
        let start = start.min(end);
        let mut out = Vec::with_capacity((end - start) * self.num_channels());
        for frame in start..end {
            for ch in &self.channels {
                out.push(ch[frame]);
            }
        }
        out
    }
}

/// Decode a base64 payload into raw bytes.
pub fn decode_base64(payload: &str) -> Result<Vec<u8>> {
    Ok(general_purpose::STANDARD.decode(payload.trim())?)
}

/// Interpret `bytes` as interleaved s16le and split it into channels.
///
/// The byte length is not validated: a trailing odd byte and any partial
/// frame are dropped.
///
/// # Panics
/// If `num_channels` is zero or `sample_rate` is zero.
pub fn bytes_to_pcm(bytes: &[u8], sample_rate: u32, num_channels: usize) -> PcmBuffer {
    assert!(num_channels >= 1, "num_channels must be at least 1");
    assert!(sample_rate > 0, "sample_rate must be positive");

    let total_samples = bytes.len() / 2;
    let frame_count = total_samples / num_channels;

    let mut channels = vec![Vec::with_capacity(frame_count); num_channels];
    for frame in 0..frame_count {
        for (c, channel) in channels.iter_mut().enumerate() {
            let i = (frame * num_channels + c) * 2;
            let sample = i16::from_le_bytes([bytes[i], bytes[i + 1]]);
            channel.push(sample as f32 / 32768.0);
        }
    }

    PcmBuffer {
        sample_rate,
        channels,
    }
}

/// Convert a normalized sample back to s16 for integer output devices.
pub fn to_i16(sample: f32) -> i16 {
    (sample * 32768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}
