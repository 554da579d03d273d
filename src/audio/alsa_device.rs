//! ALSA playback backend.

use alsa::pcm::{Access, Format, HwParams, PCM};
use alsa::{Direction, ValueOr};
use anyhow::{Context, Result};

use super::output::{OutputBackend, OutputDevice};
use super::pcm::to_i16;

/// Parameters negotiated with the ALSA hardware.
#[derive(Debug, Clone)]
pub struct AlsaParams {
    /// Actual sample rate after negotiation
    pub sample_rate: u32,
    /// Actual number of channels
    pub channels: u32,
    /// Period size in frames
    pub period_size: usize,
}

/// Opens `device` for playback on every session.
#[derive(Debug, Clone)]
pub struct AlsaBackend {
    pub device: String,
    pub period_size: Option<usize>,
}

impl AlsaBackend {
    pub fn new(device: impl Into<String>, period_size: usize) -> Self {
        Self {
            device: device.into(),
            period_size: (period_size > 0).then_some(period_size),
        }
    }
}

impl OutputBackend for AlsaBackend {
    fn open(&self, sample_rate: u32, channels: usize) -> Result<Box<dyn OutputDevice>> {
        let (pcm, params) =
            open_playback(&self.device, sample_rate, channels as u32, self.period_size)?;
        if params.sample_rate != sample_rate || params.channels != channels as u32 {
            anyhow::bail!(
                "ALSA negotiated {}Hz/{}ch, payload is {}Hz/{}ch",
                params.sample_rate,
                params.channels,
                sample_rate,
                channels
            );
        }
        Ok(Box::new(AlsaDevice {
            pcm,
            channels: params.channels as usize,
            scratch: Vec::new(),
        }))
    }
}

struct AlsaDevice {
    pcm: PCM,
    channels: usize,
    scratch: Vec<i16>,
}

impl OutputDevice for AlsaDevice {
    fn write(&mut self, interleaved: &[f32]) -> Result<usize> {
        self.scratch.clear();
        self.scratch.extend(interleaved.iter().copied().map(to_i16));

        let io = self.pcm.io_i16()?;
        let total_frames = self.scratch.len() / self.channels;
        let mut frames_written = 0;
        let mut retry_count = 0u32;

        // 短写与 XRUN 恢复
        while frames_written < total_frames {
            let offset = frames_written * self.channels;
            match io.writei(&self.scratch[offset..]) {
                Ok(n) => {
                    frames_written += n;
                    retry_count = 0;
                }
                Err(e) => {
                    log::warn!("ALSA XRUN or error: {}, recovering...", e);
                    retry_count += 1;

                    self.pcm
                        .prepare()
                        .context("Failed to recover PCM playback")?;

                    if retry_count >= 3 {
                        log::error!(
                            "Max recovery retries ({}) reached. Dropping {} unwritten frames.",
                            retry_count,
                            total_frames - frames_written
                        );
                        break;
                    }
                }
            }
        }
        Ok(total_frames)
    }

    fn drop_pending(&mut self) {
        if let Err(e) = self.pcm.drop() {
            log::warn!("ALSA drop failed: {}", e);
        }
    }
}

impl Drop for AlsaDevice {
    fn drop(&mut self) {
        // Let queued frames finish on natural completion; a hard stop has
        // already called drop_pending().
        let _ = self.pcm.drain();
        log::debug!("ALSA playback device released");
    }
}

/// Open a PCM device for playback.
pub fn open_playback(
    device: &str,
    sample_rate: u32,
    channels: u32,
    period_size: Option<usize>,
) -> Result<(PCM, AlsaParams)> {
    let pcm = PCM::new(device, Direction::Playback, false)
        .with_context(|| format!("Failed to open PCM device '{}' for Playback", device))?;

    {
        let hwp = HwParams::any(&pcm).with_context(|| "Failed to initialize HwParams")?;
        hwp.set_access(Access::RWInterleaved)?;
        hwp.set_format(Format::S16LE)?;
        hwp.set_channels(channels)?;
        hwp.set_rate_near(sample_rate, ValueOr::Nearest)?;
        if let Some(ps) = period_size {
            hwp.set_period_size_near(ps as alsa::pcm::Frames, ValueOr::Nearest)?;
        }
        pcm.hw_params(&hwp)?;
    }

    let (actual_rate, actual_channels, period_size) = {
        let hwp = pcm.hw_params_current()?;
        let rate = hwp.get_rate()?;
        let ch = hwp.get_channels()?;
        let ps = hwp.get_period_size()? as usize;
        (rate, ch, ps)
    };

    let params = AlsaParams {
        sample_rate: actual_rate,
        channels: actual_channels,
        period_size,
    };

    log::info!(
        "ALSA Playback: device={}, rate={}, channels={}, period_size={}",
        device,
        actual_rate,
        actual_channels,
        period_size,
    );

    Ok((pcm, params))
}
