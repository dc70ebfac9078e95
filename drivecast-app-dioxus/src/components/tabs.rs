use crate::state::{PreviewState, Tab};
use dioxus::prelude::*;

/// Playlist / Lyrics switcher
#[component]
pub fn Tabs() -> Element {
    let mut preview = use_context::<PreviewState>();
    let current = *preview.tab.read();
    let track_count = preview.playlist.read().len();

    rsx! {
        div {
            class: "tabs",
            button {
                class: if current == Tab::Playlist { "tab selected" } else { "tab" },
                onclick: move |_| preview.tab.set(Tab::Playlist),
                "Playlist ({track_count})"
            }
            button {
                class: if current == Tab::Lyrics { "tab selected" } else { "tab" },
                onclick: move |_| preview.tab.set(Tab::Lyrics),
                "Lyrics"
            }
        }
    }
}
