use dioxus::prelude::*;
use drivecast_core::session::Generation;
use drivecast_core::{AudioEntry, LyricsStatus, PlaybackState, Playlist, ThemeColor};

/// Panel shown below the player
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Playlist,
    Lyrics,
}

/// Preview display state, one signal per concern so components only
/// re-render for what they read.
#[derive(Clone, Copy)]
pub struct PreviewState {
    pub folder: Signal<String>,
    /// Current track; `None` until the first session opens
    pub track: Signal<Option<AudioEntry>>,
    /// Generation of the current track
    pub generation: Signal<Generation>,
    pub playback: Signal<PlaybackState>,
    pub playlist: Signal<Playlist>,
    /// Whether the folder listing has finished, successfully or not
    pub playlist_ready: Signal<bool>,
    pub lyrics: Signal<LyricsStatus>,
    /// Highlighted lyric line
    pub active_line: Signal<Option<usize>>,
    pub theme: Signal<ThemeColor>,
    /// Cover could not be shown; the placeholder icon is used instead
    pub thumbnail_broken: Signal<bool>,
    pub volume: Signal<f32>,
    pub tab: Signal<Tab>,
}

impl PreviewState {
    #[must_use]
    pub fn new(theme: ThemeColor) -> Self {
        Self {
            folder: Signal::new(String::new()),
            track: Signal::new(None),
            generation: Signal::new(0),
            playback: Signal::new(PlaybackState::Loading),
            playlist: Signal::new(Playlist::default()),
            playlist_ready: Signal::new(false),
            lyrics: Signal::new(LyricsStatus::Loading),
            active_line: Signal::new(None),
            theme: Signal::new(theme),
            thumbnail_broken: Signal::new(false),
            volume: Signal::new(1.0),
            tab: Signal::new(Tab::default()),
        }
    }

    /// A new folder was opened; forget everything about the previous one
    pub fn reset(&mut self, folder: String) {
        self.folder.set(folder);
        self.track.set(None);
        self.playlist.set(Playlist::default());
        self.playlist_ready.set(false);
        self.lyrics.set(LyricsStatus::Loading);
        self.active_line.set(None);
        self.thumbnail_broken.set(false);
    }

    /// Switch to a new track; lyrics and cover reload
    pub fn set_track(&mut self, track: AudioEntry, generation: Generation) {
        self.track.set(Some(track));
        self.generation.set(generation);
        self.lyrics.set(LyricsStatus::Loading);
        self.active_line.set(None);
        self.thumbnail_broken.set(false);
    }

    pub fn set_playlist(&mut self, playlist: Playlist) {
        self.playlist.set(playlist);
        self.playlist_ready.set(true);
    }

    /// Apply a lyrics result if it belongs to the current track
    pub fn set_lyrics(&mut self, generation: Generation, lyrics: LyricsStatus) -> bool {
        if generation != *self.generation.peek() {
            return false;
        }
        self.lyrics.set(lyrics);
        self.active_line.set(None);
        true
    }

    /// Name of the current track, empty before the first one loads
    #[must_use]
    pub fn track_name(&self) -> String {
        self.track
            .read()
            .as_ref()
            .map(|t| t.name.clone())
            .unwrap_or_default()
    }
}
