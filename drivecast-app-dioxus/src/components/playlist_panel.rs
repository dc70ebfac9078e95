use crate::state::PreviewState;
use dioxus::prelude::*;
use drivecast_core::PlayerEngine;
use std::sync::Arc;

/// Audio files of the current folder; clicking one plays it
#[component]
pub fn PlaylistPanel() -> Element {
    let preview = use_context::<PreviewState>();
    let engine = use_context::<Arc<PlayerEngine>>();

    let current = preview.track_name();
    let playlist = preview.playlist.read().clone();

    if !*preview.playlist_ready.read() {
        return rsx! {
            div { class: "empty", "Loading playlist\u{2026}" }
        };
    }

    if playlist.is_empty() {
        return rsx! {
            div { class: "empty", "No other audio files in this folder" }
            if !playlist.is_complete() {
                div { class: "notice", "The folder could not be listed" }
            }
        };
    }

    rsx! {
        ul {
            class: "playlist",
            for (i, entry) in playlist.entries().iter().enumerate() {
                {
                    let number = i + 1;
                    let name = entry.name.clone();
                    let is_current = name == current;
                    let engine = engine.clone();

                    rsx! {
                        li {
                            key: "{entry.name}",
                            class: if is_current { "entry current" } else { "entry" },
                            onclick: move |_| engine.select(name.clone()),
                            span { class: "number", "{number}" }
                            span { class: "name", "{entry.name}" }
                        }
                    }
                }
            }
        }
        if !playlist.is_complete() {
            div { class: "notice", "Some files of this folder could not be listed" }
        }
    }
}
