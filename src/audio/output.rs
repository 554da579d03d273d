//! Output device abstraction used by the audio session.

use std::time::Duration;

use anyhow::Result;

/// Opens output contexts. One context is opened per playback session.
pub trait OutputBackend: Send + Sync {
    fn open(&self, sample_rate: u32, channels: usize) -> Result<Box<dyn OutputDevice>>;
}

/// An open output context.
pub trait OutputDevice: Send {
    /// Write interleaved float frames. Blocks for roughly as long as the
    /// frames take to play. Returns the number of frames consumed.
    fn write(&mut self, interleaved: &[f32]) -> Result<usize>;

    /// Drop anything queued in the device. Called on hard stop.
    fn drop_pending(&mut self) {}
}

/// Backend that produces no sound but keeps real-time pacing, so playback
/// durations and completion behave like a real device.
#[derive(Debug, Clone, Default)]
pub struct NullBackend {
    /// Speed-up factor applied to pacing. 1.0 means real time, 0.0 disables
    /// pacing.
    pub pace: f64,
}

impl NullBackend {
    pub fn realtime() -> Self {
        Self { pace: 1.0 }
    }
}

impl OutputBackend for NullBackend {
    fn open(&self, sample_rate: u32, channels: usize) -> Result<Box<dyn OutputDevice>> {
        log::info!(
            "Null output opened: rate={}, ch={} (no sound device)",
            sample_rate,
            channels
        );
        Ok(Box::new(NullDevice {
            sample_rate,
            channels: channels.max(1),
            pace: self.pace,
        }))
    }
}

struct NullDevice {
    sample_rate: u32,
    channels: usize,
    pace: f64,
}

impl OutputDevice for NullDevice {
    fn write(&mut self, interleaved: &[f32]) -> Result<usize> {
        let frames = interleaved.len() / self.channels;
        if self.pace > 0.0 && frames > 0 {
            let secs = frames as f64 / self.sample_rate as f64 * self.pace;
            std::thread::sleep(Duration::from_secs_f64(secs));
        }
        Ok(frames)
    }
}
