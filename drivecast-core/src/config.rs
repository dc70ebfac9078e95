use crate::color::ThemeColor;
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DrivecastConfig {
    #[serde(default)]
    pub drive: DriveConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Root URL of the drive deployment, e.g. `https://drive.example.com`
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries for transient failures (5xx, timeouts)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub protected_routes: Vec<ProtectedRoute>,
}

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_max_retries() -> u32 {
    3
}

impl DriveConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            protected_routes: Vec::new(),
        }
    }
}

/// A password-protected folder and the token that unlocks it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedRoute {
    pub route: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_lyric_poll_interval_ms")]
    pub lyric_poll_interval_ms: u64,
    /// Thumbnail size requested from the drive: "small", "medium" or "large"
    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: String,
    /// Theme color used until a cover has been sampled
    #[serde(default = "default_fallback_theme_color")]
    pub fallback_theme_color: String,
    #[serde(default = "default_max_folder_pages")]
    pub max_folder_pages: usize,
}

const fn default_lyric_poll_interval_ms() -> u64 {
    100
}

fn default_thumbnail_size() -> String {
    "medium".to_string()
}

fn default_fallback_theme_color() -> String {
    "#6b7280".to_string()
}

const fn default_max_folder_pages() -> usize {
    100
}

impl PlayerConfig {
    #[must_use]
    pub fn lyric_poll_interval(&self) -> Duration {
        Duration::from_millis(self.lyric_poll_interval_ms.max(1))
    }

    /// Configured fallback color, or the built-in one if it does not parse
    #[must_use]
    pub fn fallback_theme(&self) -> ThemeColor {
        ThemeColor::from_hex(&self.fallback_theme_color).unwrap_or(ThemeColor::FALLBACK)
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            lyric_poll_interval_ms: default_lyric_poll_interval_ms(),
            thumbnail_size: default_thumbnail_size(),
            fallback_theme_color: default_fallback_theme_color(),
            max_folder_pages: default_max_folder_pages(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to `~/.config/drivecast/drivecast.log`
    #[serde(default)]
    pub enabled: bool,
}

/// Problems found in an otherwise parseable config
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigValidation {
    pub missing_fields: Vec<String>,
    pub invalid_fields: Vec<String>,
}

impl ConfigValidation {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.missing_fields.is_empty() && self.invalid_fields.is_empty()
    }

    /// Bullet list of every problem, for a single dialog
    #[must_use]
    pub fn error_message(&self) -> String {
        let mut sections = Vec::new();
        if !self.missing_fields.is_empty() {
            sections.push(format!(
                "The following required configuration fields are missing or empty:\n\n{}",
                bullets(&self.missing_fields)
            ));
        }
        if !self.invalid_fields.is_empty() {
            sections.push(format!(
                "The following configuration fields are invalid:\n\n{}",
                bullets(&self.invalid_fields)
            ));
        }
        sections.join("\n\n")
    }
}

fn bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|f| format!("  \u{2022} {f}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl DrivecastConfig {
    /// Get the default config file path (~/.config/drivecast/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from `path` or write the template there on first run
    ///
    /// # Errors
    ///
    /// Returns `ConfigNotFound` after creating the template, or an error if
    /// the file cannot be read or parsed.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, CONFIG_TEMPLATE)?;

            return Err(CoreError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse config from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this schema.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Collect every missing or invalid field
    #[must_use]
    pub fn validate(&self) -> ConfigValidation {
        let mut validation = ConfigValidation::default();

        let base_url = self.drive.base_url.trim();
        if base_url.is_empty() {
            validation.missing_fields.push("drive.base_url".into());
        } else if url::Url::parse(base_url).is_err() {
            validation
                .invalid_fields
                .push(format!("drive.base_url ({base_url} is not a valid URL)"));
        }

        for (i, route) in self.drive.protected_routes.iter().enumerate() {
            if !route.route.starts_with('/') {
                validation.invalid_fields.push(format!(
                    "drive.protected_routes[{i}].route (must start with /)"
                ));
            }
        }

        if ThemeColor::from_hex(&self.player.fallback_theme_color).is_none() {
            validation.invalid_fields.push(format!(
                "player.fallback_theme_color ({} is not a #rrggbb color)",
                self.player.fallback_theme_color
            ));
        }

        if !matches!(
            self.player.thumbnail_size.as_str(),
            "small" | "medium" | "large"
        ) {
            validation.invalid_fields.push(format!(
                "player.thumbnail_size ({} is not small, medium or large)",
                self.player.thumbnail_size
            ));
        }

        validation
    }
}

/// Template written on first run
pub const CONFIG_TEMPLATE: &str = r##"# Drivecast Configuration
# ~/.config/drivecast/config.toml

[drive]
# Required: root URL of your drive deployment
base_url = ""
timeout_secs = 10
# Retries for transient failures (5xx responses, timeouts)
max_retries = 3

# Password-protected folders. Requests for paths under a route carry its token.
# [[drive.protected_routes]]
# route = "/Private"
# token = ""

[player]
lyric_poll_interval_ms = 100
# Cover art size: "small", "medium" or "large"
thumbnail_size = "medium"
# Theme color used until a cover has been sampled
fallback_theme_color = "#6b7280"
# Upper bound on folder listing pages fetched for the playlist
max_folder_pages = 100

[logging]
# Also write logs to ~/.config/drivecast/drivecast.log
enabled = false
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_template_parses_with_defaults() {
        let config = DrivecastConfig::parse(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.drive.base_url, "");
        assert_eq!(config.drive.timeout_secs, 10);
        assert_eq!(config.drive.max_retries, 3);
        assert!(config.drive.protected_routes.is_empty());
        assert_eq!(config.player.lyric_poll_interval_ms, 100);
        assert_eq!(config.player.thumbnail_size, "medium");
        assert_eq!(config.player.max_folder_pages, 100);
        assert_eq!(config.player.fallback_theme(), ThemeColor::FALLBACK);
        assert!(!config.logging.enabled);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = DrivecastConfig::parse("").unwrap();
        assert_eq!(config.drive.timeout(), Duration::from_secs(10));
        assert_eq!(config.player.lyric_poll_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_template_requires_base_url() {
        let validation = DrivecastConfig::parse(CONFIG_TEMPLATE).unwrap().validate();
        assert_eq!(validation.missing_fields, vec!["drive.base_url".to_string()]);
        assert!(validation.invalid_fields.is_empty());
        assert!(validation.error_message().contains("drive.base_url"));
    }

    #[test]
    fn test_protected_routes() {
        let config = DrivecastConfig::parse(
            r#"
            [drive]
            base_url = "https://drive.example.com"

            [[drive.protected_routes]]
            route = "/Private"
            token = "secret"
            "#,
        )
        .unwrap();

        assert!(config.validate().is_valid());
        assert_eq!(
            config.drive.protected_routes,
            vec![ProtectedRoute {
                route: "/Private".into(),
                token: "secret".into(),
            }]
        );
    }

    #[test]
    fn test_validation_collects_every_problem() {
        let config = DrivecastConfig::parse(
            r##"
            [drive]
            base_url = "not a url"

            [[drive.protected_routes]]
            route = "Private"
            token = "x"

            [player]
            fallback_theme_color = "grey"
            thumbnail_size = "huge"
            "##,
        )
        .unwrap();

        let validation = config.validate();
        assert!(validation.missing_fields.is_empty());
        assert_eq!(validation.invalid_fields.len(), 4);
        assert_eq!(config.player.fallback_theme(), ThemeColor::FALLBACK);
    }

    #[test]
    fn test_syntax_error_is_parse_error() {
        let err = DrivecastConfig::parse("[drive\nbase_url = ").unwrap_err();
        assert!(matches!(err, CoreError::ConfigParseError(_)));
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut config = DrivecastConfig::default();
        config.drive.base_url = "https://drive.example.com".into();
        config.player.thumbnail_size = "large".into();

        let text = toml::to_string(&config).unwrap();
        let parsed = DrivecastConfig::parse(&text).unwrap();
        assert_eq!(parsed.drive.base_url, "https://drive.example.com");
        assert_eq!(parsed.player.thumbnail_size, "large");
    }

    #[test]
    fn test_load_or_create_writes_template() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let err = DrivecastConfig::load_or_create(&path).unwrap_err();
        assert!(matches!(err, CoreError::ConfigNotFound { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), CONFIG_TEMPLATE);

        let config = DrivecastConfig::load_or_create(&path).unwrap();
        assert_eq!(config.drive.timeout_secs, 10);
    }
}
