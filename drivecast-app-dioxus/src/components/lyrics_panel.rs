use crate::lyric_sync::{AUDIO_ELEMENT_ID, lyric_line_id};
use crate::state::PreviewState;
use dioxus::prelude::*;
use drivecast_core::{DurationExt, LyricsStatus};

/// Timed lyrics of the current track with the active line highlighted
#[component]
pub fn LyricsPanel() -> Element {
    let preview = use_context::<PreviewState>();
    let lyrics = preview.lyrics.read().clone();
    let active = *preview.active_line.read();

    let lines = match lyrics {
        LyricsStatus::Loading => {
            return rsx! {
                div { class: "empty", "Loading lyrics\u{2026}" }
            };
        }
        LyricsStatus::Unavailable => {
            return rsx! {
                div { class: "empty", "No lyrics for this track" }
            };
        }
        LyricsStatus::Loaded(lines) => lines,
    };

    rsx! {
        div {
            class: "lyrics",
            for (i, line) in lines.iter().enumerate() {
                {
                    let seconds = line.time.as_secs_f64();
                    let clock = line.time.clock();

                    rsx! {
                        p {
                            key: "{i}",
                            id: lyric_line_id(i),
                            class: if active == Some(i) { "line active" } else { "line" },
                            title: "{clock}",
                            onclick: move |_| seek_to(seconds),
                            "{line.text}"
                        }
                    }
                }
            }
        }
    }
}

/// Jump playback to `seconds`
fn seek_to(seconds: f64) {
    let js = format!(
        "const el = document.getElementById('{AUDIO_ELEMENT_ID}'); if (el) el.currentTime = {seconds};"
    );
    let _ = document::eval(&js);
}
