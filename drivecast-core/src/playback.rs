use serde::{Deserialize, Serialize};
use std::fmt;

/// Current playback state of the media element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// Fetching or buffering; also entered on seek
    #[default]
    Loading,
    /// Enough data to start playing
    Ready,
    Playing,
    Paused,
}

impl PlaybackState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Playing => "playing",
            Self::Paused => "paused",
        }
    }

    /// State after a media event.
    ///
    /// `Ended` lands on `Paused` here; advancing to the next track is the
    /// session's decision.
    #[must_use]
    pub const fn on_event(self, event: MediaEvent) -> Self {
        match event {
            MediaEvent::CanPlay => match self {
                Self::Loading => Self::Ready,
                other => other,
            },
            MediaEvent::Play | MediaEvent::Playing => Self::Playing,
            MediaEvent::Pause | MediaEvent::Error | MediaEvent::Ended => Self::Paused,
            MediaEvent::Seeking | MediaEvent::Waiting => Self::Loading,
            MediaEvent::VolumeChange { .. } => self,
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Playback events raised by the media element
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaEvent {
    CanPlay,
    Play,
    Pause,
    Playing,
    Seeking,
    Waiting,
    Error,
    Ended,
    VolumeChange { volume: f32 },
}
