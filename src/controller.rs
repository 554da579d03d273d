use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::audio::{AudioSession, OutputBackend, PlaybackEvent, bytes_to_pcm, decode_base64};
use crate::error::{Error, Result};
use crate::providers::TtsProvider;
use crate::state_machine::PlaybackState;

/// PCM layout of TTS payloads and how playback chunks it.
#[derive(Debug, Clone, Copy)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: usize,
    pub period_frames: usize,
}

type ErrorHook = Box<dyn Fn(&Error) + Send + Sync>;

/// Start/stop toggle over the audio player.
///
/// Audio is an optional extra next to the text, so failures are logged and
/// the state falls back to `Idle`; nothing is returned to the caller.
pub struct PlaybackController {
    state: PlaybackState,
    session: Option<AudioSession>,
    tts: Arc<dyn TtsProvider>,
    backend: Arc<dyn OutputBackend>,
    format: AudioFormat,
    tts_timeout: Duration,
    events_tx: mpsc::UnboundedSender<PlaybackEvent>,
    error_hook: Option<ErrorHook>,
}

impl PlaybackController {
    /// Returns the controller and the receiver for playback events, which the
    /// caller feeds back through [`PlaybackController::handle_event`].
    pub fn new(
        tts: Arc<dyn TtsProvider>,
        backend: Arc<dyn OutputBackend>,
        format: AudioFormat,
        tts_timeout: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<PlaybackEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let controller = Self {
            state: PlaybackState::Idle,
            session: None,
            tts,
            backend,
            format,
            tts_timeout,
            events_tx,
            error_hook: None,
        };
        (controller, events_rx)
    }

    /// Observe audio errors that are otherwise only logged.
    pub fn with_error_hook(mut self, hook: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        self.error_hook = Some(Box::new(hook));
        self
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn active_handles(&self) -> usize {
        self.session.as_ref().map_or(0, AudioSession::active_count)
    }

    /// The single control: starts narration of `text` when idle, stops
    /// everything when playing. Returns the resulting state.
    pub async fn toggle(&mut self, text: &str) -> PlaybackState {
        match self.state {
            PlaybackState::Idle => {
                self.start(text).await;
            }
            PlaybackState::Playing => self.stop(),
        }
        self.state
    }

    /// Start narration. Rejected (returns false) while already playing.
    pub async fn start(&mut self, text: &str) -> bool {
        if self.state == PlaybackState::Playing {
            log::warn!("Start rejected: playback already active");
            return false;
        }

        self.state = PlaybackState::Playing;
        match self.begin(text).await {
            Ok(true) => {
                log::info!("Audio-Bila playing");
            }
            Ok(false) => {
                log::info!("No audio available for this review");
                self.release();
            }
            Err(e) => {
                self.report(&e);
                self.release();
            }
        }
        true
    }

    /// fetch → decode → fresh session → play, strictly in that order.
    async fn begin(&mut self, text: &str) -> Result<bool> {
        let payload = tokio::time::timeout(self.tts_timeout, self.tts.generate_audio(text))
            .await
            .map_err(|_| Error::audio("TTS request timed out"))??;

        if payload.trim().is_empty() {
            return Ok(false);
        }

        let bytes = decode_base64(&payload)?;
        let pcm = bytes_to_pcm(&bytes, self.format.sample_rate, self.format.channels);
        if pcm.is_empty() {
            log::warn!("Audio payload decoded to zero frames ({} bytes)", bytes.len());
            return Ok(false);
        }
        log::debug!(
            "Decoded {} frames ({:.1}s) of narration",
            pcm.frame_count(),
            pcm.duration_secs()
        );

        let mut session = AudioSession::create(
            self.backend.as_ref(),
            self.format.sample_rate,
            self.format.channels,
            self.format.period_frames,
            self.events_tx.clone(),
        )?;
        session.play(pcm)?;
        self.session = Some(session);
        Ok(true)
    }

    /// Hard stop. Safe to call in any state.
    pub fn stop(&mut self) {
        if self.state == PlaybackState::Playing {
            log::info!("Audio-Bila stopped");
        }
        self.release();
    }

    /// Apply a completion or failure reported by a playback thread.
    pub fn handle_event(&mut self, event: PlaybackEvent) {
        let (id, failure) = match event {
            PlaybackEvent::Finished(id) => (id, None),
            PlaybackEvent::Failed(id, msg) => (id, Some(msg)),
        };

        let Some(session) = self.session.as_mut() else {
            log::debug!("Ignoring event for {} with no session", id);
            return;
        };
        if !session.complete(id) {
            log::debug!("Ignoring stale event for {}", id);
            return;
        }

        if let Some(msg) = failure {
            self.report(&Error::audio(msg));
        }
        if session_is_drained(&self.session) {
            log::info!("Audio-Bila finished");
            self.release();
        }
    }

    fn release(&mut self) {
        if let Some(session) = self.session.take() {
            session.close();
        }
        self.state = PlaybackState::Idle;
    }

    fn report(&self, e: &Error) {
        log::error!("Audio playback error: {}", e);
        if let Some(hook) = &self.error_hook {
            hook(e);
        }
    }
}

fn session_is_drained(session: &Option<AudioSession>) -> bool {
    session.as_ref().is_none_or(|s| s.active_count() == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NullBackend;
    use async_trait::async_trait;
    use base64::{Engine as _, engine::general_purpose};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedTts {
        payload: Result<String>,
        calls: AtomicUsize,
    }

    impl FixedTts {
        fn ok(payload: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                payload: Ok(payload.into()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TtsProvider for FixedTts {
        async fn generate_audio(&self, _text: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.payload {
                Ok(p) => Ok(p.clone()),
                Err(e) => Err(Error::audio(e.to_string())),
            }
        }
    }

    struct HangingTts;

    #[async_trait]
    impl TtsProvider for HangingTts {
        async fn generate_audio(&self, _text: &str) -> Result<String> {
            std::future::pending().await
        }
    }

    fn pcm_payload(seconds: f64, rate: u32) -> String {
        let frames = (seconds * rate as f64) as usize;
        let bytes: Vec<u8> = (0..frames)
            .flat_map(|i| ((i % 200) as i16 * 100).to_le_bytes())
            .collect();
        general_purpose::STANDARD.encode(bytes)
    }

    fn format() -> AudioFormat {
        AudioFormat {
            sample_rate: 8000,
            channels: 1,
            period_frames: 80,
        }
    }

    fn controller(
        tts: Arc<dyn TtsProvider>,
    ) -> (PlaybackController, mpsc::UnboundedReceiver<PlaybackEvent>) {
        PlaybackController::new(
            tts,
            Arc::new(NullBackend::realtime()),
            format(),
            Duration::from_secs(2),
        )
    }

    #[tokio::test]
    async fn toggle_round_trip_leaves_no_handles() {
        let (mut ctl, _rx) = controller(FixedTts::ok(pcm_payload(10.0, 8000)));

        assert_eq!(ctl.toggle("texte").await, PlaybackState::Playing);
        assert_eq!(ctl.active_handles(), 1);

        assert_eq!(ctl.toggle("texte").await, PlaybackState::Idle);
        assert_eq!(ctl.active_handles(), 0);
    }

    #[tokio::test]
    async fn stop_when_idle_is_noop() {
        let (mut ctl, _rx) = controller(FixedTts::ok(""));
        ctl.stop();
        ctl.stop();
        assert_eq!(ctl.state(), PlaybackState::Idle);
        assert_eq!(ctl.active_handles(), 0);
    }

    #[tokio::test]
    async fn empty_payload_stays_idle_without_error() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let seen = errors.clone();
        let tts = FixedTts::ok("");
        let (ctl, _rx) = controller(tts.clone());
        let mut ctl = ctl.with_error_hook(move |e| seen.lock().unwrap().push(e.to_string()));

        assert_eq!(ctl.toggle("texte").await, PlaybackState::Idle);
        assert_eq!(tts.calls.load(Ordering::SeqCst), 1);
        assert_eq!(ctl.active_handles(), 0);
        assert!(errors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_payload_resets_and_reports() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let seen = errors.clone();
        let (ctl, _rx) = controller(FixedTts::ok("@@ pas du base64 @@"));
        let mut ctl = ctl.with_error_hook(move |e| seen.lock().unwrap().push(e.to_string()));

        assert_eq!(ctl.toggle("texte").await, PlaybackState::Idle);
        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Invalid audio payload"));
    }

    #[tokio::test]
    async fn tts_failure_resets_to_idle() {
        let tts = Arc::new(FixedTts {
            payload: Err(Error::audio("503")),
            calls: AtomicUsize::new(0),
        });
        let (mut ctl, _rx) = controller(tts);
        assert_eq!(ctl.toggle("texte").await, PlaybackState::Idle);
    }

    #[tokio::test]
    async fn tts_timeout_resets_to_idle() {
        let (mut ctl, _rx) = PlaybackController::new(
            Arc::new(HangingTts),
            Arc::new(NullBackend::default()),
            format(),
            Duration::from_millis(50),
        );
        assert_eq!(ctl.toggle("texte").await, PlaybackState::Idle);
    }

    #[tokio::test]
    async fn natural_completion_returns_to_idle() {
        let (mut ctl, mut rx) = controller(FixedTts::ok(pcm_payload(0.05, 8000)));
        assert_eq!(ctl.toggle("texte").await, PlaybackState::Playing);

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, PlaybackEvent::Finished(_)));

        ctl.handle_event(event);
        assert_eq!(ctl.state(), PlaybackState::Idle);
        assert_eq!(ctl.active_handles(), 0);
    }

    #[tokio::test]
    async fn stale_completion_does_not_stop_new_playback() {
        let (mut ctl, mut rx) = controller(FixedTts::ok(pcm_payload(0.05, 8000)));
        ctl.toggle("texte").await;
        let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();

        // Stop and restart before the first completion is delivered
        ctl.stop();
        ctl.toggle("texte").await;
        assert_eq!(ctl.state(), PlaybackState::Playing);

        ctl.handle_event(first);
        assert_eq!(ctl.state(), PlaybackState::Playing);
        assert_eq!(ctl.active_handles(), 1);
        ctl.stop();
    }

    #[tokio::test]
    async fn start_rejected_while_playing() {
        let tts = FixedTts::ok(pcm_payload(10.0, 8000));
        let (mut ctl, _rx) = controller(tts.clone());
        assert!(ctl.start("texte").await);
        assert!(!ctl.start("texte").await);
        assert_eq!(tts.calls.load(Ordering::SeqCst), 1);
        assert_eq!(ctl.active_handles(), 1);
        ctl.stop();
    }
}
