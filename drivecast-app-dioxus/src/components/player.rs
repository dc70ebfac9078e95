use crate::lyric_sync::AUDIO_ELEMENT_ID;
use crate::state::PreviewState;
use dioxus::prelude::*;
use drivecast_core::{Endpoints, MediaEvent, PlaybackState, PlayerEngine};
use std::sync::Arc;
use tracing::warn;

const LOG_TARGET: &str = "drivecast::player";

/// Cover art, track title and the `<audio>` element.
///
/// Every media event of the element is forwarded to the engine, which owns
/// the playback state.
#[component]
pub fn Player() -> Element {
    let mut preview = use_context::<PreviewState>();
    let engine = use_context::<Arc<PlayerEngine>>();
    let endpoints = use_context::<Endpoints>();

    let Some(track) = preview.track.read().clone() else {
        return rsx! {
            div {
                class: "player",
                div { class: "status", "Opening\u{2026}" }
            }
        };
    };

    let src = match endpoints.raw(&track.path) {
        Ok(url) => url.to_string(),
        Err(e) => {
            warn!(target: LOG_TARGET, "No stream URL for {}: {}", track.path, e);
            String::new()
        }
    };
    let cover = if *preview.thumbnail_broken.read() {
        None
    } else {
        endpoints.thumbnail(&track.path).ok().map(|url| url.to_string())
    };

    let state = *preview.playback.read();
    let folder = preview.folder.read().clone();
    let volume = format!("{:.0}%", *preview.volume.read() * 100.0);
    let status = match state {
        PlaybackState::Loading => "Loading",
        PlaybackState::Ready => "Ready",
        PlaybackState::Playing => "Playing",
        PlaybackState::Paused => "Paused",
    };

    rsx! {
        div {
            class: "player",

            div {
                class: "cover",
                if let Some(cover) = cover {
                    img {
                        src: "{cover}",
                        alt: "Cover",
                        onerror: move |_| preview.thumbnail_broken.set(true),
                    }
                } else {
                    div { class: "cover-placeholder", "\u{266B}" }
                }
            }

            div {
                class: "meta",
                div { class: "title", title: "{track.path}", "{track.name}" }
                div { class: "folder", "{folder}" }
                div {
                    class: "status-row",
                    span { class: "status status-{state}", "{status}" }
                    span { class: "volume", title: "Volume", "\u{1F50A} {volume}" }
                }
            }

            audio {
                id: AUDIO_ELEMENT_ID,
                src: "{src}",
                controls: true,
                autoplay: true,
                preload: "auto",
                oncanplay: {
                    let engine = engine.clone();
                    move |_| engine.media(MediaEvent::CanPlay)
                },
                onplay: {
                    let engine = engine.clone();
                    move |_| engine.media(MediaEvent::Play)
                },
                onpause: {
                    let engine = engine.clone();
                    move |_| engine.media(MediaEvent::Pause)
                },
                onplaying: {
                    let engine = engine.clone();
                    move |_| engine.media(MediaEvent::Playing)
                },
                onseeking: {
                    let engine = engine.clone();
                    move |_| engine.media(MediaEvent::Seeking)
                },
                onwaiting: {
                    let engine = engine.clone();
                    move |_| engine.media(MediaEvent::Waiting)
                },
                onerror: {
                    let engine = engine.clone();
                    move |_| engine.media(MediaEvent::Error)
                },
                onended: {
                    let engine = engine.clone();
                    move |_| engine.media(MediaEvent::Ended)
                },
                onvolumechange: {
                    let engine = engine.clone();
                    move |_| {
                        let engine = engine.clone();
                        spawn(async move {
                            if let Some(volume) = read_volume().await {
                                engine.media(MediaEvent::VolumeChange { volume });
                            }
                        });
                    }
                },
            }
        }
    }
}

/// Current volume of the audio element, in `0.0..=1.0`
async fn read_volume() -> Option<f32> {
    let js = format!(
        "const el = document.getElementById('{AUDIO_ELEMENT_ID}'); return el ? el.volume : null;"
    );
    let value = document::eval(&js).await.ok()?;
    #[allow(clippy::cast_possible_truncation)]
    value.as_f64().map(|v| v.clamp(0.0, 1.0) as f32)
}
