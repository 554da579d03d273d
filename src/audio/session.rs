//! One output context plus the set of playbacks running on it.
//!
//! Each playback runs on its own OS thread (not a tokio task) and writes the
//! buffer to the device one period at a time. A hard stop flips the handle's
//! flag; the thread exits before its next write.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc;
use uuid::Uuid;

use super::output::{OutputBackend, OutputDevice};
use super::pcm::PcmBuffer;
use crate::error::{Error, Result};

pub type HandleId = Uuid;

/// Reported by playback threads.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// The buffer played to the end without being stopped.
    Finished(HandleId),
    /// The device rejected a write; the playback is over.
    Failed(HandleId, String),
}

/// A live, cancellable playback.
pub struct PlaybackHandle {
    id: HandleId,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl PlaybackHandle {
    pub fn id(&self) -> HandleId {
        self.id
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.join();
    }

    fn join(&mut self) {
        if let Some(t) = self.thread.take() {
            if t.join().is_err() {
                log::error!("Playback thread {} panicked", self.id);
            }
        }
    }
}

type SharedDevice = Arc<Mutex<Box<dyn OutputDevice>>>;

pub struct AudioSession {
    sample_rate: u32,
    channels: usize,
    period_frames: usize,
    device: SharedDevice,
    active: HashMap<HandleId, PlaybackHandle>,
    events: mpsc::UnboundedSender<PlaybackEvent>,
}

impl AudioSession {
    /// Open a fresh output context at `sample_rate`.
    pub fn create(
        backend: &dyn OutputBackend,
        sample_rate: u32,
        channels: usize,
        period_frames: usize,
        events: mpsc::UnboundedSender<PlaybackEvent>,
    ) -> Result<Self> {
        let device = backend
            .open(sample_rate, channels)
            .map_err(|e| Error::audio(format!("cannot open output: {:#}", e)))?;

        Ok(Self {
            sample_rate,
            channels,
            period_frames: period_frames.max(1),
            device: Arc::new(Mutex::new(device)),
            active: HashMap::new(),
            events,
        })
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn is_active(&self, id: HandleId) -> bool {
        self.active.contains_key(&id)
    }

    /// Start `pcm` immediately and register it in the active set.
    pub fn play(&mut self, pcm: PcmBuffer) -> Result<HandleId> {
        if pcm.sample_rate() != self.sample_rate || pcm.num_channels() != self.channels {
            return Err(Error::audio(format!(
                "buffer is {}Hz/{}ch, session is {}Hz/{}ch",
                pcm.sample_rate(),
                pcm.num_channels(),
                self.sample_rate,
                self.channels
            )));
        }

        let id = Uuid::new_v4();
        let stop = Arc::new(AtomicBool::new(false));

        let thread = {
            let stop = stop.clone();
            let device = self.device.clone();
            let events = self.events.clone();
            let period = self.period_frames;
            thread::Builder::new()
                .name("audio-play".into())
                .spawn(move || play_thread(id, &pcm, &device, &stop, period, &events))
                .map_err(|e| Error::audio(format!("cannot spawn playback thread: {}", e)))?
        };

        self.active.insert(
            id,
            PlaybackHandle {
                id,
                stop,
                thread: Some(thread),
            },
        );
        log::debug!("Playback {} started ({} active)", id, self.active.len());
        Ok(id)
    }

    /// Hard-stop every active playback and clear the set. No-op when empty.
    pub fn stop_all(&mut self) {
        if self.active.is_empty() {
            return;
        }
        for (_, mut handle) in self.active.drain() {
            handle.stop();
            log::debug!("Playback {} stopped", handle.id());
        }
        match self.device.lock() {
            Ok(mut device) => device.drop_pending(),
            Err(_) => log::error!("Output device lock poisoned"),
        }
    }

    /// Remove a handle whose thread reported completion. Returns false for
    /// handles this session does not know (stale events from a closed
    /// session).
    pub fn complete(&mut self, id: HandleId) -> bool {
        match self.active.remove(&id) {
            Some(mut handle) => {
                handle.join();
                true
            }
            None => false,
        }
    }

    /// Stop everything and release the output context.
    pub fn close(mut self) {
        self.stop_all();
    }
}

impl Drop for AudioSession {
    fn drop(&mut self) {
        self.stop_all();
        log::debug!("Audio session released ({}Hz)", self.sample_rate);
    }
}

fn play_thread(
    id: HandleId,
    pcm: &PcmBuffer,
    device: &SharedDevice,
    stop: &AtomicBool,
    period: usize,
    events: &mpsc::UnboundedSender<PlaybackEvent>,
) {
    let total = pcm.frame_count();
    let mut pos = 0;

    while pos < total {
        if stop.load(Ordering::Acquire) {
            return;
        }
        let end = (pos + period).min(total);
        let chunk = pcm.interleave(pos, end);

        let written = match device.lock() {
            Ok(mut device) => device.write(&chunk),
            Err(_) => Err(anyhow::anyhow!("output device lock poisoned")),
        };
        if let Err(e) = written {
            log::error!("Playback {} write failed: {:#}", id, e);
            let _ = events.send(PlaybackEvent::Failed(id, e.to_string()));
            return;
        }
        pos = end;
    }

    if !stop.load(Ordering::Acquire) {
        let _ = events.send(PlaybackEvent::Finished(id));
    }
}
