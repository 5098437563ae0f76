use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlayerError {
    /// The media engine refused to start playback
    #[error("Playback failed: {0}")]
    Playback(String),

    #[error("Fullscreen unavailable: {0}")]
    Fullscreen(String),
}

pub type PlayerResult<T> = Result<T, PlayerError>;
