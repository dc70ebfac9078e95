//! Async runtime around [`PlaybackSession`].
//!
//! The engine loop is the only writer of session state. It turns commands
//! into session messages, carries out the resulting effects, and broadcasts
//! [`SessionEvent`]s. Fetch tasks run under a cancellation hierarchy:
//! root (shutdown) > session (one opened folder) > track (one generation).
//! Generations keep counting when a session is replaced, so a result from an
//! older session can never match the current track.

use crate::color::{ThemeColor, decode_cover, extract_theme_color};
use crate::drive::{DriveItem, DriveSource, lyrics_path_for, split_path};
use crate::lrc::Lyrics;
use crate::playback::MediaEvent;
use crate::playlist::{AudioEntry, PlaylistBuilder};
use crate::session::{
    CoverOutcome, Effect, Generation, PlaybackSession, SessionEvent, SessionMessage, SessionView,
};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "drivecast::engine";

/// Engine tunables taken from the player config
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub max_folder_pages: usize,
    pub fallback_theme: ThemeColor,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_folder_pages: 100,
            fallback_theme: ThemeColor::FALLBACK,
        }
    }
}

#[derive(Debug)]
enum EngineCommand {
    Open { folder: String, entry: AudioEntry },
    Message(SessionMessage),
}

/// The session being played plus its cancellation scopes
struct ActiveSession {
    session: PlaybackSession,
    token: CancellationToken,
    track_token: Option<CancellationToken>,
}

/// Drives playback sessions against a drive backend
pub struct PlayerEngine {
    drive: Arc<dyn DriveSource>,
    settings: EngineSettings,
    event_tx: broadcast::Sender<SessionEvent>,
    command_tx: mpsc::UnboundedSender<EngineCommand>,
    command_rx: Mutex<Option<mpsc::UnboundedReceiver<EngineCommand>>>,
    view: RwLock<Option<SessionView>>,
    cancel_token: CancellationToken,
}

impl PlayerEngine {
    /// Create a new engine
    ///
    /// `cancel_token` is the root token; cancelling it stops the loop and
    /// every fetch task.
    #[must_use]
    pub fn new(
        drive: Arc<dyn DriveSource>,
        settings: EngineSettings,
        cancel_token: Option<CancellationToken>,
    ) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(64);
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        Arc::new(Self {
            drive,
            settings,
            event_tx,
            command_tx,
            command_rx: Mutex::new(Some(command_rx)),
            view: RwLock::new(None),
            cancel_token: cancel_token.unwrap_or_default(),
        })
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Get a clone of the root cancellation token
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Start the engine loop in a background task
    #[must_use]
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Open a session for `entry` inside `folder`, replacing any current one
    pub fn open(&self, folder: impl Into<String>, entry: AudioEntry) {
        self.send(EngineCommand::Open {
            folder: folder.into(),
            entry,
        });
    }

    /// Open a session for the audio file at drive path `path`.
    ///
    /// The file's metadata is looked up first; if that fails the session
    /// still opens with a name-only entry.
    pub async fn open_path(&self, path: &str) {
        let (folder, name) = split_path(path);
        let item = match self.drive.fetch_item(path).await {
            Ok(item) => DriveItem { name, ..item },
            Err(e) => {
                warn!(target: LOG_TARGET, "Could not describe {}: {}", path, e);
                DriveItem::named(name)
            }
        };
        let entry = AudioEntry::new(&folder, item);
        self.open(folder, entry);
    }

    /// Switch to the playlist entry called `name`
    pub fn select(&self, name: impl Into<String>) {
        self.send(EngineCommand::Message(SessionMessage::Select { name: name.into() }));
    }

    /// Forward an event from the media element
    pub fn media(&self, event: MediaEvent) {
        self.send(EngineCommand::Message(SessionMessage::Media(event)));
    }

    /// Snapshot of the current session, if one is open
    pub async fn view(&self) -> Option<SessionView> {
        self.view.read().await.clone()
    }

    fn send(&self, command: EngineCommand) {
        if self.command_tx.send(command).is_err() {
            debug!(target: LOG_TARGET, "Engine stopped, dropping command");
        }
    }

    /// Run the engine loop
    async fn run(&self) {
        let Some(mut rx) = self.command_rx.lock().await.take() else {
            warn!(target: LOG_TARGET, "Engine loop is already running");
            return;
        };

        info!(target: LOG_TARGET, "Player engine started (drive: {})", self.drive.name());
        let mut active: Option<ActiveSession> = None;

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(target: LOG_TARGET, "Player engine shutting down");
                    break;
                }
                command = rx.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    let effects = match command {
                        EngineCommand::Open { folder, entry } => {
                            let mut last_generation = 0;
                            if let Some(previous) = active.take() {
                                previous.token.cancel();
                                last_generation = previous.session.generation();
                            }
                            let (state, effects) =
                                self.open_session(folder, entry, last_generation);
                            active = Some(state);
                            effects
                        }
                        EngineCommand::Message(message) => {
                            let Some(state) = active.as_mut() else {
                                debug!(target: LOG_TARGET, "No open session, ignoring {:?}", message);
                                continue;
                            };
                            state.session.apply(message)
                        }
                    };

                    // Snapshot first so readers woken by an event see its state
                    if let Some(state) = active.as_mut() {
                        *self.view.write().await = Some(state.session.clone());
                        self.execute(state, effects);
                    }
                }
            }
        }

        if let Some(state) = active {
            state.token.cancel();
        }
    }

    fn open_session(
        &self,
        folder: String,
        entry: AudioEntry,
        last_generation: Generation,
    ) -> (ActiveSession, Vec<Effect>) {
        info!(target: LOG_TARGET, "Opening {} in {}", entry.name, folder);

        let session = PlaybackSession::new(folder.clone(), entry, self.settings.fallback_theme)
            .continuing_from(last_generation);
        let mut state = ActiveSession {
            session,
            token: self.cancel_token.child_token(),
            track_token: None,
        };

        let effects = state.session.start();
        self.spawn_playlist(folder, state.token.clone());
        (state, effects)
    }

    fn execute(&self, state: &mut ActiveSession, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Emit(event) => {
                    // No receivers is fine
                    let _ = self.event_tx.send(event);
                }
                Effect::LoadTrack { generation, track } => {
                    if let Some(previous) = state.track_token.take() {
                        previous.cancel();
                    }
                    let token = state.token.child_token();
                    self.spawn_lyrics(generation, &track, token.clone());
                    self.spawn_cover(generation, &track, token.clone());
                    state.track_token = Some(token);
                }
            }
        }
    }

    fn spawn_playlist(&self, folder: String, token: CancellationToken) {
        let drive = Arc::clone(&self.drive);
        let tx = self.command_tx.clone();
        let max_pages = self.settings.max_folder_pages;

        tokio::spawn(async move {
            let builder = PlaylistBuilder::new(drive.as_ref(), max_pages);
            let playlist = tokio::select! {
                biased;
                () = token.cancelled() => {
                    debug!(target: LOG_TARGET, "Playlist build for {} cancelled", folder);
                    return;
                }
                playlist = builder.build(&folder) => playlist,
            };
            if token.is_cancelled() {
                return;
            }
            let _ = tx.send(EngineCommand::Message(SessionMessage::PlaylistBuilt {
                folder,
                playlist,
            }));
        });
    }

    fn spawn_lyrics(&self, generation: Generation, track: &AudioEntry, token: CancellationToken) {
        let drive = Arc::clone(&self.drive);
        let tx = self.command_tx.clone();
        let path = lyrics_path_for(&track.path);

        tokio::spawn(async move {
            let fetched = tokio::select! {
                biased;
                () = token.cancelled() => {
                    debug!(target: LOG_TARGET, "Lyrics fetch for {} cancelled", path);
                    return;
                }
                fetched = drive.fetch_text(&path) => fetched,
            };

            let lyrics = match fetched {
                Ok(Some(text)) => {
                    let lyrics = Lyrics::parse(&text);
                    info!(target: LOG_TARGET, "Loaded {} lyric lines from {}", lyrics.len(), path);
                    Some(lyrics)
                }
                Ok(None) => {
                    info!(target: LOG_TARGET, "No lyrics at {}", path);
                    None
                }
                Err(e) => {
                    warn!(target: LOG_TARGET, "Failed to fetch lyrics {}: {}", path, e);
                    None
                }
            };

            if token.is_cancelled() {
                debug!(target: LOG_TARGET, "Dropping lyrics for replaced track {}", path);
                return;
            }
            let _ = tx.send(EngineCommand::Message(SessionMessage::LyricsFetched {
                generation,
                lyrics,
            }));
        });
    }

    fn spawn_cover(&self, generation: Generation, track: &AudioEntry, token: CancellationToken) {
        let drive = Arc::clone(&self.drive);
        let tx = self.command_tx.clone();
        let path = track.path.clone();
        let fallback = self.settings.fallback_theme;

        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                () = token.cancelled() => {
                    debug!(target: LOG_TARGET, "Cover fetch for {} cancelled", path);
                    return;
                }
                outcome = load_cover(drive.as_ref(), &path, fallback) => outcome,
            };
            if token.is_cancelled() {
                return;
            }
            let _ = tx.send(EngineCommand::Message(SessionMessage::CoverFetched {
                generation,
                outcome,
            }));
        });
    }
}

/// Fetch the thumbnail of `path` and sample its theme color
async fn load_cover(drive: &dyn DriveSource, path: &str, fallback: ThemeColor) -> CoverOutcome {
    let bytes = match drive.fetch_thumbnail(path).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            debug!(target: LOG_TARGET, "No thumbnail for {}", path);
            return CoverOutcome::Broken;
        }
        Err(e) => {
            warn!(target: LOG_TARGET, "Failed to fetch thumbnail for {}: {}", path, e);
            return CoverOutcome::Broken;
        }
    };

    let decoded = tokio::task::spawn_blocking(move || {
        decode_cover(&bytes).map(|image| extract_theme_color(&image, fallback))
    })
    .await;

    match decoded {
        Ok(Ok(color)) => {
            debug!(target: LOG_TARGET, "Theme color for {} is {}", path, color);
            CoverOutcome::Extracted(color)
        }
        Ok(Err(e)) => {
            warn!(target: LOG_TARGET, "Undecodable thumbnail for {}: {}", path, e);
            CoverOutcome::Broken
        }
        Err(e) => {
            warn!(target: LOG_TARGET, "Cover decoding task failed for {}: {}", path, e);
            CoverOutcome::Broken
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::FolderPage;
    use crate::error::{CoreError, Result};
    use crate::playlist::tests::file;
    use crate::session::LyricsStatus;
    use async_trait::async_trait;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Drive with a single folder page and per-path lyrics, some of them slow
    /// or held until a gate opens
    #[derive(Default)]
    struct FakeDrive {
        items: Vec<DriveItem>,
        lyrics: HashMap<String, (Duration, Option<String>)>,
        gates: HashMap<String, Arc<Notify>>,
        thumbnails: HashMap<String, Vec<u8>>,
    }

    #[async_trait]
    impl DriveSource for FakeDrive {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn fetch_folder_page(&self, _folder: &str, _next: Option<&str>) -> Result<FolderPage> {
            Ok(FolderPage::new(self.items.clone(), None))
        }

        async fn fetch_item(&self, path: &str) -> Result<DriveItem> {
            let (_, name) = split_path(path);
            self.items
                .iter()
                .find(|item| item.name == name)
                .cloned()
                .ok_or_else(|| CoreError::HttpStatus {
                    status: 404,
                    url: path.to_string(),
                })
        }

        async fn fetch_text(&self, path: &str) -> Result<Option<String>> {
            if let Some(gate) = self.gates.get(path) {
                gate.notified().await;
            }
            match self.lyrics.get(path) {
                Some((delay, text)) => {
                    tokio::time::sleep(*delay).await;
                    Ok(text.clone())
                }
                None => Err(CoreError::HttpStatus {
                    status: 500,
                    url: path.to_string(),
                }),
            }
        }

        async fn fetch_thumbnail(&self, path: &str) -> Result<Option<Vec<u8>>> {
            Ok(self.thumbnails.get(path).cloned())
        }
    }

    fn music_folder() -> Vec<DriveItem> {
        vec![
            file("a.mp3", "audio/mpeg"),
            file("a.lrc", "text/plain"),
            file("b.mp3", "audio/mpeg"),
        ]
    }

    async fn next_matching<F>(rx: &mut broadcast::Receiver<SessionEvent>, mut pred: F) -> SessionEvent
    where
        F: FnMut(&SessionEvent) -> bool,
    {
        loop {
            let event = rx.recv().await.unwrap();
            if pred(&event) {
                return event;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_lyrics_never_reach_next_track() {
        let mut lyrics = HashMap::new();
        lyrics.insert(
            "/Music/a.lrc".to_string(),
            (Duration::from_secs(5), Some("[00:01]from a".to_string())),
        );
        lyrics.insert(
            "/Music/b.lrc".to_string(),
            (Duration::ZERO, Some("[00:01]from b".to_string())),
        );
        let drive = Arc::new(FakeDrive {
            items: music_folder(),
            lyrics,
            ..FakeDrive::default()
        });

        let engine = PlayerEngine::new(drive, EngineSettings::default(), None);
        let mut rx = engine.subscribe();
        let _handle = Arc::clone(&engine).start();

        engine.open_path("/Music/a.mp3").await;
        next_matching(&mut rx, |e| matches!(e, SessionEvent::PlaylistUpdated { .. })).await;
        engine.select("b.mp3");

        let mut lyric_events = Vec::new();
        let loaded = next_matching(&mut rx, |e| {
            let is_lyrics = matches!(
                e,
                SessionEvent::LyricsLoaded { .. } | SessionEvent::LyricsUnavailable { .. }
            );
            if is_lyrics {
                lyric_events.push(e.clone());
            }
            matches!(e, SessionEvent::LyricsLoaded { generation: 2, .. })
        })
        .await;

        let SessionEvent::LyricsLoaded { lines, .. } = loaded else {
            unreachable!();
        };
        assert_eq!(lines[0].text, "from b");
        assert_eq!(lyric_events.len(), 1);

        // Let track a's fetch run out its delay
        tokio::time::sleep(Duration::from_secs(10)).await;

        while let Ok(event) = rx.try_recv() {
            assert!(
                !matches!(event, SessionEvent::LyricsLoaded { generation: 1, .. }),
                "stale lyrics leaked: {event:?}"
            );
        }

        let view = engine.view().await.unwrap();
        assert_eq!(view.current().name, "b.mp3");
        assert_eq!(view.lyrics().lines().unwrap()[0].text, "from b");
    }

    #[tokio::test]
    async fn test_lyrics_from_replaced_session_are_discarded() {
        let gate = Arc::new(Notify::new());
        let mut lyrics = HashMap::new();
        lyrics.insert(
            "/A/a.lrc".to_string(),
            (Duration::ZERO, Some("[00:01]from A".to_string())),
        );
        lyrics.insert(
            "/B/b.lrc".to_string(),
            (Duration::ZERO, Some("[00:01]from B".to_string())),
        );
        let mut gates = HashMap::new();
        gates.insert("/A/a.lrc".to_string(), Arc::clone(&gate));
        let drive = Arc::new(FakeDrive {
            items: vec![file("a.mp3", "audio/mpeg"), file("b.mp3", "audio/mpeg")],
            lyrics,
            gates,
            ..FakeDrive::default()
        });

        let engine = PlayerEngine::new(drive, EngineSettings::default(), None);
        let mut rx = engine.subscribe();
        let _handle = Arc::clone(&engine).start();

        engine.open_path("/A/a.mp3").await;
        next_matching(&mut rx, |e| matches!(e, SessionEvent::TrackChanged { .. })).await;

        // Session A's lyrics finish while session B is being opened
        gate.notify_one();
        engine.open("/B", AudioEntry::new("/B", file("b.mp3", "audio/mpeg")));

        next_matching(&mut rx, |e| {
            matches!(e, SessionEvent::SessionOpened { folder } if folder == "/B")
        })
        .await;

        let mut shown = Vec::new();
        let generation_b = loop {
            match rx.recv().await.unwrap() {
                SessionEvent::TrackChanged { generation, .. } => assert!(generation > 1),
                SessionEvent::LyricsLoaded { generation, lines } => {
                    shown.push(lines[0].text.clone());
                    if lines[0].text == "from B" {
                        break generation;
                    }
                }
                _ => {}
            }
        };
        assert_eq!(shown, vec!["from B".to_string()]);

        // Give any late completion from session A time to arrive
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        while let Ok(event) = rx.try_recv() {
            assert!(
                !matches!(event, SessionEvent::LyricsLoaded { .. }),
                "lyrics from a replaced session leaked: {event:?}"
            );
        }

        let view = engine.view().await.unwrap();
        assert_eq!(view.folder(), "/B");
        assert_eq!(view.generation(), generation_b);
        assert_eq!(view.lyrics().lines().unwrap()[0].text, "from B");
    }

    #[tokio::test]
    async fn test_ended_advances_through_playlist() {
        let drive = Arc::new(FakeDrive {
            items: music_folder(),
            ..FakeDrive::default()
        });
        let engine = PlayerEngine::new(drive, EngineSettings::default(), None);
        let mut rx = engine.subscribe();
        let _handle = Arc::clone(&engine).start();

        engine.open_path("/Music/a.mp3").await;
        let SessionEvent::PlaylistUpdated { playlist } =
            next_matching(&mut rx, |e| matches!(e, SessionEvent::PlaylistUpdated { .. })).await
        else {
            unreachable!();
        };
        assert_eq!(playlist.len(), 2);

        engine.media(MediaEvent::Play);
        engine.media(MediaEvent::Ended);

        let SessionEvent::TrackChanged { track, generation } =
            next_matching(&mut rx, |e| matches!(e, SessionEvent::TrackChanged { .. })).await
        else {
            unreachable!();
        };
        assert_eq!(track.path, "/Music/b.mp3");
        assert_eq!(generation, 2);
    }

    #[tokio::test]
    async fn test_failed_lyrics_fetch_is_unavailable() {
        let drive = Arc::new(FakeDrive {
            items: music_folder(),
            ..FakeDrive::default()
        });
        let engine = PlayerEngine::new(drive, EngineSettings::default(), None);
        let mut rx = engine.subscribe();
        let _handle = Arc::clone(&engine).start();

        engine.open_path("/Music/a.mp3").await;
        let event = next_matching(&mut rx, |e| {
            matches!(
                e,
                SessionEvent::LyricsLoaded { .. } | SessionEvent::LyricsUnavailable { .. }
            )
        })
        .await;

        assert_eq!(event, SessionEvent::LyricsUnavailable { generation: 1 });
        assert_eq!(
            engine.view().await.unwrap().lyrics(),
            &LyricsStatus::Unavailable
        );
    }

    #[tokio::test]
    async fn test_cover_sets_theme_and_missing_cover_is_broken() {
        let image = RgbaImage::from_pixel(16, 16, Rgba([200, 10, 10, 255]));
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();

        let mut thumbnails = HashMap::new();
        thumbnails.insert("/Music/a.mp3".to_string(), png);
        let drive = Arc::new(FakeDrive {
            items: music_folder(),
            thumbnails,
            ..FakeDrive::default()
        });

        let engine = PlayerEngine::new(drive, EngineSettings::default(), None);
        let mut rx = engine.subscribe();
        let _handle = Arc::clone(&engine).start();

        engine.open_path("/Music/a.mp3").await;
        let mut theme = None;
        let mut playlist_ready = false;
        while theme.is_none() || !playlist_ready {
            match rx.recv().await.unwrap() {
                SessionEvent::ThemeChanged { color } => theme = Some(color),
                SessionEvent::PlaylistUpdated { .. } => playlist_ready = true,
                _ => {}
            }
        }
        assert_eq!(theme, Some(ThemeColor::new(200, 10, 10)));

        engine.select("b.mp3");
        let event =
            next_matching(&mut rx, |e| matches!(e, SessionEvent::ThumbnailBroken { .. })).await;
        assert_eq!(event, SessionEvent::ThumbnailBroken { generation: 2 });
        assert_eq!(
            engine.view().await.unwrap().theme(),
            ThemeColor::new(200, 10, 10)
        );
    }

    #[tokio::test]
    async fn test_unknown_file_opens_with_name_only_entry() {
        let drive = Arc::new(FakeDrive::default());
        let engine = PlayerEngine::new(drive, EngineSettings::default(), None);
        let mut rx = engine.subscribe();
        let _handle = Arc::clone(&engine).start();

        engine.open_path("/Elsewhere/song.ogg").await;
        let SessionEvent::TrackChanged { track, .. } =
            next_matching(&mut rx, |e| matches!(e, SessionEvent::TrackChanged { .. })).await
        else {
            unreachable!();
        };
        assert_eq!(track.name, "song.ogg");
        assert_eq!(track.path, "/Elsewhere/song.ogg");
    }

    #[tokio::test]
    async fn test_cancel_stops_engine() {
        let engine = PlayerEngine::new(
            Arc::new(FakeDrive::default()),
            EngineSettings::default(),
            None,
        );
        let handle = Arc::clone(&engine).start();
        engine.cancel_token().cancel();
        handle.await.unwrap();
        assert!(engine.view().await.is_none());
    }
}
