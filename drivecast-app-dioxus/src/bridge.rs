use crate::state::PreviewState;
use dioxus::prelude::*;
use drivecast_core::{LyricsStatus, PlayerEngine, SessionEvent};
use std::sync::Arc;
use tracing::{debug, info};

const LOG_TARGET: &str = "drivecast::bridge";

/// Bridge `PlayerEngine` events to Dioxus signals.
/// This function spawns an async task that listens to engine events
/// and updates the preview state signals accordingly.
pub fn use_engine_bridge(engine: Arc<PlayerEngine>, preview: PreviewState) {
    use_future(move || {
        let engine = engine.clone();
        async move {
            let mut rx = engine.subscribe();

            // The session may have opened before this subscription existed
            if let Some(view) = engine.view().await {
                restore_view(&view, preview);
            }

            loop {
                match rx.recv().await {
                    Ok(event) => {
                        handle_session_event(event, preview);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        info!(target: LOG_TARGET, "Session event channel closed");
                        break;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        info!(target: LOG_TARGET, "Missed {} session events, resyncing", n);
                        if let Some(view) = engine.view().await {
                            restore_view(&view, preview);
                        }
                    }
                }
            }
        }
    });
}

/// Copy a whole session snapshot into the signals
fn restore_view(view: &drivecast_core::SessionView, mut preview: PreviewState) {
    preview.reset(view.folder().to_string());
    preview.set_track(view.current().clone(), view.generation());
    preview.playback.set(view.state());
    if view.playlist_ready() {
        preview.set_playlist(view.playlist().clone());
    }
    preview.set_lyrics(view.generation(), view.lyrics().clone());
    preview.theme.set(view.theme());
    preview.thumbnail_broken.set(view.thumbnail_broken());
    preview.volume.set(view.volume());
}

fn handle_session_event(event: SessionEvent, mut preview: PreviewState) {
    match event {
        SessionEvent::SessionOpened { folder } => {
            preview.reset(folder);
        }
        SessionEvent::TrackChanged { track, generation } => {
            preview.set_track(track, generation);
        }
        SessionEvent::StateChanged { state } => {
            preview.playback.set(state);
        }
        SessionEvent::PlaylistUpdated { playlist } => {
            preview.set_playlist(playlist);
        }
        SessionEvent::LyricsLoaded { generation, lines } => {
            let count = lines.len();
            if preview.set_lyrics(generation, LyricsStatus::Loaded(lines)) {
                info!(target: LOG_TARGET, "Showing {} lyric lines", count);
            } else {
                debug!(target: LOG_TARGET, "Ignoring lyrics for generation {}", generation);
            }
        }
        SessionEvent::LyricsUnavailable { generation } => {
            preview.set_lyrics(generation, LyricsStatus::Unavailable);
        }
        SessionEvent::ThemeChanged { color } => {
            preview.theme.set(color);
        }
        SessionEvent::ThumbnailBroken { generation } => {
            if generation == *preview.generation.peek() {
                preview.thumbnail_broken.set(true);
            }
        }
        SessionEvent::VolumeChanged { volume } => {
            preview.volume.set(volume);
        }
    }
}
