mod lyrics_panel;
mod player;
mod playlist_panel;
mod tabs;

pub use lyrics_panel::LyricsPanel;
pub use player::Player;
pub use playlist_panel::PlaylistPanel;
pub use tabs::Tabs;
