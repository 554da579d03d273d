/// Audio player state. Only the playback controller changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
}

impl PlaybackState {
    /// Label of the toggle control in this state.
    pub fn control_label(self) -> &'static str {
        match self {
            PlaybackState::Idle => "Écouter l'Audio-Bila",
            PlaybackState::Playing => "Arrêter l'Audio-Bila",
        }
    }
}
