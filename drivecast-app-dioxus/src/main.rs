#![cfg_attr(feature = "bundle", windows_subsystem = "windows")]
mod app;
mod bridge;
mod components;
mod lyric_sync;
mod state;

use crate::app::App;
use crate::bridge::use_engine_bridge;
use crate::state::PreviewState;
use clap::Parser;
use dioxus::desktop::{LogicalSize, WindowBuilder};
use dioxus::prelude::*;
use drivecast_core::{
    CoreError, DrivecastConfig, EngineSettings, PlayerConfig, PlayerEngine, SessionEvent,
    TomlParseError,
};
use drivecast_drive_http::HttpDrive;
use rfd::{MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const APP_NAME: &str = "Drivecast";

/// Preview an audio file from a drive, with its folder as a playlist
#[derive(Parser)]
#[command(name = "drivecast")]
#[command(version)]
#[command(about = "Audio previewer with synced lyrics for drive folders")]
struct Cli {
    /// Drive path of the audio file to open, e.g. "/Music/Album/01 Song.mp3"
    path: String,

    /// Path to the config TOML file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(DrivecastConfig::config_path);

    // Check config for logging.enabled before full config load
    let file_logging_enabled = check_file_logging_enabled(&config_path);
    init_tracing(file_logging_enabled);

    // Load config or create template on first run
    let config = match DrivecastConfig::load_or_create(&config_path) {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { path }) => {
            // Config was just created - show dialog informing user
            show_new_config_dialog(&path);
            std::process::exit(0);
        }
        Err(CoreError::ConfigParseError(parse_error)) => {
            // Config has TOML syntax errors - show dialog with reset option
            show_config_parse_error_dialog(&parse_error, &config_path);
            std::process::exit(1);
        }
        Err(e) => {
            error!("{e}");
            show_generic_error_dialog(&e.to_string());
            std::process::exit(1);
        }
    };

    // Validate config fields and show dialog if any are missing
    let validation = config.validate();
    if !validation.is_valid() {
        show_config_error_dialog(&validation.error_message(), &config_path);
    }

    let drive = match HttpDrive::from_config(&config.drive, &config.player.thumbnail_size) {
        Ok(drive) => drive,
        Err(e) => {
            error!("Failed to create drive client: {e}");
            show_generic_error_dialog(&e.to_string());
            std::process::exit(1);
        }
    };
    let endpoints = drive.endpoints().clone();

    // Create tokio runtime for background tasks
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    // Create shared cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    // Set up Ctrl+C handler to trigger graceful shutdown
    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {}", e);
    }

    let settings = EngineSettings {
        max_folder_pages: config.player.max_folder_pages,
        fallback_theme: config.player.fallback_theme(),
    };
    let engine = PlayerEngine::new(Arc::new(drive), settings, Some(cancel_token.clone()));

    // Spawn background tasks
    runtime.spawn(start_engine(Arc::clone(&engine)));
    runtime.spawn(log_session_events(Arc::clone(&engine)));
    runtime.spawn(open_initial_track(Arc::clone(&engine), cli.path));

    let window = WindowBuilder::new()
        .with_title(APP_NAME)
        .with_resizable(true)
        .with_inner_size(LogicalSize::new(480.0, 720.0))
        .with_min_inner_size(LogicalSize::new(360.0, 480.0));

    let dioxus_config = dioxus::desktop::Config::default()
        .with_window(window)
        .with_disable_context_menu(true);

    // Launch Dioxus application
    // Use with_context to inject the engine, URL builder, player config and cancellation token
    dioxus::LaunchBuilder::desktop()
        .with_cfg(dioxus_config)
        .with_context(engine)
        .with_context(endpoints)
        .with_context(config.player)
        .with_context(cancel_token)
        .launch(app);
}

/// Root component that sets up context and renders the app
fn app() -> Element {
    let player: PlayerConfig = use_context();

    // Create preview state with granular signals
    let preview = use_context_provider(|| PreviewState::new(player.fallback_theme()));

    // Get the engine from context (injected via with_context)
    let engine: Arc<PlayerEngine> = use_context();

    // Bridge engine events to Dioxus signals
    use_engine_bridge(engine, preview);

    rsx! {
        document::Title { "{APP_NAME}" },
        App {}
    }
}

/// Run the engine loop until shutdown
async fn start_engine(engine: Arc<PlayerEngine>) {
    info!("Starting player engine...");
    let handle = engine.start();
    let _ = handle.await;
}

/// Resolve the file given on the command line and open its session
async fn open_initial_track(engine: Arc<PlayerEngine>, path: String) {
    info!("Opening {}", path);
    engine.open_path(&path).await;
}

/// Log session events to the console
async fn log_session_events(engine: Arc<PlayerEngine>) {
    let mut rx = engine.subscribe();

    loop {
        match rx.recv().await {
            Ok(event) => match &event {
                SessionEvent::SessionOpened { folder } => {
                    info!("Session opened for folder {}", folder);
                }
                SessionEvent::TrackChanged { track, generation } => {
                    info!("Track changed: {} (generation {})", track.path, generation);
                }
                SessionEvent::StateChanged { state } => {
                    info!("Playback state: {}", state);
                }
                SessionEvent::PlaylistUpdated { playlist } => {
                    info!(
                        "Playlist updated: {} tracks{}",
                        playlist.len(),
                        if playlist.is_complete() { "" } else { " (incomplete)" }
                    );
                }
                SessionEvent::LyricsLoaded { lines, .. } => {
                    info!("Lyrics loaded: {} lines", lines.len());
                }
                SessionEvent::LyricsUnavailable { .. } => {
                    info!("No lyrics for current track");
                }
                SessionEvent::ThemeChanged { color } => {
                    info!("Theme color: {}", color);
                }
                SessionEvent::ThumbnailBroken { .. } => {
                    info!("No usable cover for current track");
                }
                SessionEvent::VolumeChanged { .. } => {
                    // Too chatty while dragging the slider
                }
            },
            Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                info!("Session event channel closed");
                break;
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                info!("Missed {} session events", n);
            }
        }
    }
}

/// Show a native OS dialog for missing or invalid configuration and exit
fn show_config_error_dialog(problems: &str, config_path: &Path) {
    let message = format!(
        "{problems}\n\nPlease edit the configuration file to fix these values.\n\n\
        Config file:\n{}",
        config_path.display()
    );

    let result = MessageDialog::new()
        .set_level(MessageLevel::Error)
        .set_title("Drivecast - Configuration Required")
        .set_description(&message)
        .set_buttons(MessageButtons::OkCancelCustom(
            "Open Config".into(),
            "Exit".into(),
        ))
        .show();

    if matches!(result, MessageDialogResult::Custom(ref s) if s == "Open Config") {
        if let Err(e) = open::that(config_path) {
            error!("Failed to open config file: {e}");
        }
    }

    // Always exit after showing the dialog
    std::process::exit(1);
}

/// Show dialog when config is newly created
fn show_new_config_dialog(config_path: &Path) {
    let message = "A configuration file has been created.\n\n\
        Please edit it with the address of your drive:\n\
        \u{2022} drive.base_url\n\n\
        Protected folders can be unlocked with drive.protected_routes.";

    let result = MessageDialog::new()
        .set_level(MessageLevel::Info)
        .set_title("Drivecast - Configuration Created")
        .set_description(message)
        .set_buttons(MessageButtons::OkCancelCustom(
            "Open Config".into(),
            "Exit".into(),
        ))
        .show();

    if matches!(result, MessageDialogResult::Custom(ref s) if s == "Open Config") {
        if let Err(e) = open::that(config_path) {
            error!("Failed to open config file: {e}");
        }
    }
}

/// Show dialog when config file has TOML parsing errors
fn show_config_parse_error_dialog(parse_error: &TomlParseError, config_path: &Path) {
    let message = format!(
        "Your configuration file has a syntax error and cannot be loaded.\n\n\
        Error: {parse_error}\n\n\
        You can either:\n\
        \u{2022} Open the config file and fix the syntax error\n\
        \u{2022} Reset to a fresh configuration template"
    );

    let result = MessageDialog::new()
        .set_level(MessageLevel::Error)
        .set_title("Drivecast - Configuration Error")
        .set_description(&message)
        .set_buttons(MessageButtons::OkCancelCustom(
            "Open Config".into(),
            "Reset Config".into(),
        ))
        .show();

    match result {
        MessageDialogResult::Custom(button) if button == "Open Config" => {
            if let Err(e) = open::that(config_path) {
                error!("Failed to open config file: {e}");
            }
        }
        MessageDialogResult::Custom(button) if button == "Reset Config" => {
            if let Err(e) = std::fs::write(config_path, drivecast_core::config::CONFIG_TEMPLATE) {
                error!("Failed to reset config file: {e}");
                MessageDialog::new()
                    .set_level(MessageLevel::Error)
                    .set_title("Drivecast - Reset Failed")
                    .set_description(format!("Failed to reset configuration:\n{e}"))
                    .set_buttons(MessageButtons::Ok)
                    .show();
            } else {
                MessageDialog::new()
                    .set_level(MessageLevel::Info)
                    .set_title("Drivecast - Configuration Reset")
                    .set_description(
                        "Configuration has been reset to the default template.\n\n\
                        Please set drive.base_url and restart the app.",
                    )
                    .set_buttons(MessageButtons::Ok)
                    .show();
                if let Err(e) = open::that(config_path) {
                    error!("Failed to open config file: {e}");
                }
            }
        }
        _ => {
            // User closed dialog or clicked an unexpected button - just exit
        }
    }

    std::process::exit(1);
}

/// Show a generic error dialog for unexpected errors
fn show_generic_error_dialog(error_message: &str) {
    let message = format!(
        "An unexpected error occurred:\n\n{error_message}\n\n\
        Please check your configuration file or report this issue."
    );

    MessageDialog::new()
        .set_level(MessageLevel::Error)
        .set_title("Drivecast - Error")
        .set_description(&message)
        .set_buttons(MessageButtons::Ok)
        .show();
}

/// Check if file logging is enabled by reading the config file.
/// This is done before full config loading to set up tracing first.
/// Returns `false` if config doesn't exist or can't be parsed.
fn check_file_logging_enabled(config_path: &Path) -> bool {
    // Minimal structs to parse just the logging.enabled field
    #[derive(serde::Deserialize)]
    struct PartialConfig {
        #[serde(default)]
        logging: PartialLoggingConfig,
    }
    #[derive(serde::Deserialize, Default)]
    struct PartialLoggingConfig {
        #[serde(default)]
        enabled: bool,
    }

    let Ok(content) = std::fs::read_to_string(config_path) else {
        return false;
    };

    toml::from_str::<PartialConfig>(&content)
        .map(|c| c.logging.enabled)
        .unwrap_or(false)
}

/// Initialize tracing with console output and optional file logging
fn init_tracing(file_logging_enabled: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reqwest_retry=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer();

    if file_logging_enabled {
        let log_path = drivecast_core::paths::log_file_path();

        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
