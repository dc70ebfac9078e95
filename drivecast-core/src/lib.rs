pub mod color;
pub mod config;
pub mod drive;
pub mod endpoints;
pub mod engine;
pub mod error;
pub mod lrc;
pub mod paths;
pub mod playback;
pub mod playlist;
pub mod session;
pub mod sync;
pub mod time;

pub use color::ThemeColor;
pub use config::{
    ConfigValidation, DriveConfig, DrivecastConfig, LoggingConfig, PlayerConfig, ProtectedRoute,
};

/// Re-export toml error type for config parsing error handling
pub use toml::de::Error as TomlParseError;
pub use drive::{DriveItem, DriveSource, FolderPage};
pub use endpoints::Endpoints;
pub use engine::{EngineSettings, PlayerEngine};
pub use error::{CoreError, Result};
pub use lrc::{LyricLine, Lyrics};
pub use paths::{CONFIG_DIR_NAME, CONFIG_FILE_NAME, LOG_FILE_NAME, config_dir};
pub use playback::{MediaEvent, PlaybackState};
pub use playlist::{AudioEntry, Playlist, PlaylistBuilder};
pub use session::{LyricsStatus, SessionEvent, SessionView};
pub use sync::{LyricFocus, LyricSync, PositionProbe};
pub use time::DurationExt;
