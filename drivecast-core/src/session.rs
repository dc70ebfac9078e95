//! Playback controller for one preview session.
//!
//! [`PlaybackSession`] owns all per-session state and changes only through
//! [`PlaybackSession::apply`]. It performs no I/O: it returns [`Effect`]s for
//! the engine to carry out. Every async completion is tagged with the
//! [`Generation`] it was started for and is discarded once the session has
//! moved on to another track.

use crate::color::ThemeColor;
use crate::lrc::{LyricLine, Lyrics};
use crate::playback::{MediaEvent, PlaybackState};
use crate::playlist::{AudioEntry, Playlist};
use std::sync::Arc;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "drivecast::session";

/// Counter bumped on every track switch, continued across replaced sessions
pub type Generation = u64;

/// Lyrics of the current track
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LyricsStatus {
    #[default]
    Loading,
    /// No companion file, or it had no usable lines
    Unavailable,
    Loaded(Arc<[LyricLine]>),
}

impl LyricsStatus {
    #[must_use]
    pub fn lines(&self) -> Option<&Arc<[LyricLine]>> {
        match self {
            Self::Loaded(lines) => Some(lines),
            _ => None,
        }
    }
}

/// Result of loading the cover art of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverOutcome {
    Extracted(ThemeColor),
    /// Missing or undecodable thumbnail
    Broken,
}

/// Inputs to the controller
#[derive(Debug, Clone)]
pub enum SessionMessage {
    /// Event from the media element
    Media(MediaEvent),
    /// User picked an entry from the playlist
    Select { name: String },
    /// Folder listing finished
    PlaylistBuilt { folder: String, playlist: Playlist },
    /// Lyric fetch finished; `None` when there is no lyric file
    LyricsFetched {
        generation: Generation,
        lyrics: Option<Lyrics>,
    },
    /// Cover fetch and color extraction finished
    CoverFetched {
        generation: Generation,
        outcome: CoverOutcome,
    },
}

/// Events for renderers
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A session started for `folder`; previous session state is gone
    SessionOpened {
        folder: String,
    },
    /// A new track became current; its resources are being loaded
    TrackChanged {
        track: AudioEntry,
        generation: Generation,
    },
    StateChanged {
        state: PlaybackState,
    },
    PlaylistUpdated {
        playlist: Playlist,
    },
    LyricsLoaded {
        generation: Generation,
        lines: Arc<[LyricLine]>,
    },
    LyricsUnavailable {
        generation: Generation,
    },
    ThemeChanged {
        color: ThemeColor,
    },
    ThumbnailBroken {
        generation: Generation,
    },
    VolumeChanged {
        volume: f32,
    },
}

/// Work requested by the controller
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Cancel the previous track's fetches and load lyrics and cover for `track`
    LoadTrack {
        generation: Generation,
        track: AudioEntry,
    },
    /// Publish an event to renderers
    Emit(SessionEvent),
}

/// Snapshot of a session handed to readers outside the engine loop
pub type SessionView = PlaybackSession;

/// State of one playback session, scoped to a folder
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    folder: String,
    initial: AudioEntry,
    current: AudioEntry,
    playlist: Playlist,
    /// Whether the folder listing has been delivered
    playlist_ready: bool,
    state: PlaybackState,
    theme: ThemeColor,
    thumbnail_broken: bool,
    lyrics: LyricsStatus,
    volume: f32,
    generation: Generation,
}

impl PlaybackSession {
    /// Create a session for `initial`, a file inside `folder`
    #[must_use]
    pub fn new(folder: impl Into<String>, initial: AudioEntry, theme: ThemeColor) -> Self {
        Self {
            folder: folder.into(),
            current: initial.clone(),
            initial,
            playlist: Playlist::default(),
            playlist_ready: false,
            state: PlaybackState::Loading,
            theme,
            thumbnail_broken: false,
            lyrics: LyricsStatus::Loading,
            volume: 1.0,
            generation: 0,
        }
    }

    /// Continue numbering tracks after `generation`.
    ///
    /// A session that replaces another must start above the old session's
    /// last generation so late completions from it can never match.
    #[must_use]
    pub const fn continuing_from(mut self, generation: Generation) -> Self {
        self.generation = generation;
        self
    }

    /// Start loading the initial track
    pub fn start(&mut self) -> Vec<Effect> {
        let mut effects = vec![Effect::Emit(SessionEvent::SessionOpened {
            folder: self.folder.clone(),
        })];
        let initial = self.initial.clone();
        effects.extend(self.switch_to(initial));
        effects
    }

    /// Apply a message and return the resulting effects
    pub fn apply(&mut self, message: SessionMessage) -> Vec<Effect> {
        match message {
            SessionMessage::Media(event) => self.on_media_event(event),
            SessionMessage::Select { name } => self.on_select(&name),
            SessionMessage::PlaylistBuilt { folder, playlist } => {
                self.on_playlist_built(&folder, playlist)
            }
            SessionMessage::LyricsFetched { generation, lyrics } => {
                self.on_lyrics_fetched(generation, lyrics)
            }
            SessionMessage::CoverFetched {
                generation,
                outcome,
            } => self.on_cover_fetched(generation, outcome),
        }
    }

    fn on_media_event(&mut self, event: MediaEvent) -> Vec<Effect> {
        match event {
            MediaEvent::Ended => {
                if let Some(next) = self.playlist.next_after(&self.current.name).cloned() {
                    info!(target: LOG_TARGET, "Track ended, advancing to {}", next.name);
                    return self.switch_to(next);
                }
                debug!(target: LOG_TARGET, "Track ended, no next track");
                self.set_state(PlaybackState::Paused)
            }
            MediaEvent::VolumeChange { volume } => {
                self.volume = volume.clamp(0.0, 1.0);
                vec![Effect::Emit(SessionEvent::VolumeChanged {
                    volume: self.volume,
                })]
            }
            MediaEvent::Error => {
                warn!(
                    target: LOG_TARGET,
                    "Media error while playing {}", self.current.path
                );
                self.set_state(self.state.on_event(event))
            }
            _ => self.set_state(self.state.on_event(event)),
        }
    }

    fn on_select(&mut self, name: &str) -> Vec<Effect> {
        if name == self.current.name {
            return Vec::new();
        }
        match self.playlist.find(name).cloned() {
            Some(entry) => self.switch_to(entry),
            None => {
                warn!(target: LOG_TARGET, "Ignoring selection of unknown track {}", name);
                Vec::new()
            }
        }
    }

    fn on_playlist_built(&mut self, folder: &str, playlist: Playlist) -> Vec<Effect> {
        if folder != self.folder {
            debug!(
                target: LOG_TARGET,
                "Discarding playlist for {} (session folder is {})", folder, self.folder
            );
            return Vec::new();
        }
        self.playlist = playlist;
        self.playlist_ready = true;
        vec![Effect::Emit(SessionEvent::PlaylistUpdated {
            playlist: self.playlist.clone(),
        })]
    }

    fn on_lyrics_fetched(&mut self, generation: Generation, lyrics: Option<Lyrics>) -> Vec<Effect> {
        if generation != self.generation {
            debug!(
                target: LOG_TARGET,
                "Discarding stale lyrics (generation {} != {})", generation, self.generation
            );
            return Vec::new();
        }

        match lyrics.filter(|l| !l.is_empty()) {
            Some(lyrics) => {
                let lines = lyrics.into_shared();
                self.lyrics = LyricsStatus::Loaded(Arc::clone(&lines));
                vec![Effect::Emit(SessionEvent::LyricsLoaded { generation, lines })]
            }
            None => {
                self.lyrics = LyricsStatus::Unavailable;
                vec![Effect::Emit(SessionEvent::LyricsUnavailable { generation })]
            }
        }
    }

    fn on_cover_fetched(&mut self, generation: Generation, outcome: CoverOutcome) -> Vec<Effect> {
        if generation != self.generation {
            debug!(
                target: LOG_TARGET,
                "Discarding stale cover (generation {} != {})", generation, self.generation
            );
            return Vec::new();
        }

        match outcome {
            CoverOutcome::Extracted(color) => {
                self.theme = color;
                self.thumbnail_broken = false;
                vec![Effect::Emit(SessionEvent::ThemeChanged { color })]
            }
            CoverOutcome::Broken => {
                // Theme keeps its previous value
                self.thumbnail_broken = true;
                vec![Effect::Emit(SessionEvent::ThumbnailBroken { generation })]
            }
        }
    }

    fn switch_to(&mut self, track: AudioEntry) -> Vec<Effect> {
        self.generation += 1;
        self.current = track.clone();
        self.state = PlaybackState::Loading;
        self.thumbnail_broken = false;
        self.lyrics = LyricsStatus::Loading;

        info!(
            target: LOG_TARGET,
            "Now on {} (generation {})", track.path, self.generation
        );

        vec![
            Effect::Emit(SessionEvent::TrackChanged {
                track: track.clone(),
                generation: self.generation,
            }),
            Effect::Emit(SessionEvent::StateChanged {
                state: PlaybackState::Loading,
            }),
            Effect::LoadTrack {
                generation: self.generation,
                track,
            },
        ]
    }

    fn set_state(&mut self, state: PlaybackState) -> Vec<Effect> {
        if state == self.state {
            return Vec::new();
        }
        debug!(target: LOG_TARGET, "Playback state {} -> {}", self.state, state);
        self.state = state;
        vec![Effect::Emit(SessionEvent::StateChanged { state })]
    }

    #[must_use]
    pub fn folder(&self) -> &str {
        &self.folder
    }

    #[must_use]
    pub const fn current(&self) -> &AudioEntry {
        &self.current
    }

    #[must_use]
    pub const fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    #[must_use]
    pub const fn playlist_ready(&self) -> bool {
        self.playlist_ready
    }

    #[must_use]
    pub const fn state(&self) -> PlaybackState {
        self.state
    }

    #[must_use]
    pub const fn theme(&self) -> ThemeColor {
        self.theme
    }

    #[must_use]
    pub const fn thumbnail_broken(&self) -> bool {
        self.thumbnail_broken
    }

    #[must_use]
    pub const fn lyrics(&self) -> &LyricsStatus {
        &self.lyrics
    }

    #[must_use]
    pub const fn volume(&self) -> f32 {
        self.volume
    }

    #[must_use]
    pub const fn generation(&self) -> Generation {
        self.generation
    }
}
