use crate::components::{LyricsPanel, Player, PlaylistPanel, Tabs};
use crate::lyric_sync::use_lyric_sync;
use crate::state::{PreviewState, Tab};
use dioxus::prelude::*;
use drivecast_core::PlayerConfig;

/// Embedded stylesheet (compiled into the binary)
const PLAYER_CSS: &str = include_str!("../assets/player.css");

/// Root application component.
/// Renders the player header and the tabbed playlist / lyrics panels,
/// tinted with the current theme color.
#[component]
pub fn App() -> Element {
    let preview = use_context::<PreviewState>();
    let player = use_context::<PlayerConfig>();

    use_lyric_sync(preview, player.lyric_poll_interval());

    let theme = *preview.theme.read();
    let style = format!(
        "--theme: {}; --theme-soft: {}; --theme-faint: {};",
        theme.css(),
        theme.css_alpha(0.35),
        theme.css_alpha(0.12)
    );

    rsx! {
        style { "{PLAYER_CSS}" }
        div {
            class: "app",
            style: "{style}",

            Player {}
            Tabs {}

            div {
                class: "panel",
                if *preview.tab.read() == Tab::Playlist {
                    PlaylistPanel {}
                } else {
                    LyricsPanel {}
                }
            }
        }
    }
}
