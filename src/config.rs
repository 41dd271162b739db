//! Daemon configuration.
//!
//! Read from a TOML file at `$INKY_FRAME_CONFIG`, falling back to
//! `<data-dir>/config.toml`. A missing file means defaults; a malformed
//! file is logged and also means defaults, so a bad edit never prevents the
//! daemon from starting.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the web interface listens on.
    pub bind: String,
    /// Root for settings, config and (by default) photos.
    pub data_dir: Option<PathBuf>,
    /// Photo directory; defaults to `<data-dir>/photos`.
    pub photos_dir: Option<PathBuf>,
    /// Seconds between autonomous refreshes.
    pub refresh_interval_secs: u64,
    pub display: DisplayConfig,
    pub buttons: ButtonConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub driver: DriverKind,
    pub width: u32,
    pub height: u32,
    pub spi_device: String,
    pub gpio_chip: String,
    /// Where the file driver writes its canvas; defaults to
    /// `<data-dir>/canvas.png`.
    pub canvas_path: Option<PathBuf>,
}

/// Which panel implementation to use. Chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    #[default]
    Uc8159,
    File,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonConfig {
    pub enabled: bool,
    pub gpio_chip: String,
    /// BCM pins for buttons A-D, bound in order to 0°, 90°, 180°, 270°.
    pub pins: [u32; 4],
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // The bind address and hourly cadence match the service this
            // replaces.
            bind: "0.0.0.0:5000".to_owned(),
            data_dir: None,
            photos_dir: None,
            refresh_interval_secs: 3600,
            display: DisplayConfig::default(),
            buttons: ButtonConfig::default(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            driver: DriverKind::default(),
            width: 600,
            height: 448,
            spi_device: "/dev/spidev0.0".to_owned(),
            gpio_chip: "/dev/gpiochip0".to_owned(),
            canvas_path: None,
        }
    }
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            gpio_chip: "/dev/gpiochip0".to_owned(),
            // Inky Impression buttons A, B, C, D.
            pins: [5, 6, 16, 24],
        }
    }
}

impl Config {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    pub fn photos_dir(&self) -> PathBuf {
        self.photos_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join("photos"))
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir().join("settings.json")
    }
}

impl DisplayConfig {
    pub fn canvas_path(&self) -> PathBuf {
        self.canvas_path
            .clone()
            .unwrap_or_else(|| default_data_dir().join("canvas.png"))
    }
}

/// Load configuration from the default location.
pub fn load() -> Config {
    let path = env::var_os("INKY_FRAME_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| default_data_dir().join("config.toml"));
    load_from(&path)
}

fn load_from(path: &Path) -> Config {
    match fs::read_to_string(path) {
        Ok(raw) => match toml::from_str::<Config>(&raw) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Config file unparsable, using defaults"
                );
                Config::default()
            }
        },
        Err(_) => {
            info!(path = %path.display(), "No config file, using defaults");
            Config::default()
        }
    }
}

/// `~/.local/share/inky-frame` on Linux.
fn default_data_dir() -> PathBuf {
    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .expect("Could not determine user data directory");
    path.push("inky-frame");
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = load_from(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.bind, "0.0.0.0:5000");
        assert_eq!(config.refresh_interval_secs, 3600);
        assert_eq!(config.display.driver, DriverKind::Uc8159);
        assert_eq!((config.display.width, config.display.height), (600, 448));
        assert_eq!(config.buttons.pins, [5, 6, 16, 24]);
        assert!(config.buttons.enabled);
    }

    #[test]
    fn test_partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "refresh_interval_secs = 600\n\n[display]\ndriver = \"file\"\n",
        )
        .unwrap();

        let config = load_from(&path);
        assert_eq!(config.refresh_interval_secs, 600);
        assert_eq!(config.display.driver, DriverKind::File);
        assert_eq!(config.bind, "0.0.0.0:5000");
        assert_eq!(config.display.width, 600);
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "this is { not toml").unwrap();

        let config = load_from(&path);
        assert_eq!(config.bind, "0.0.0.0:5000");
        assert_eq!(config.display.driver, DriverKind::Uc8159);
    }

    #[test]
    fn test_photos_dir_defaults_under_data_dir() {
        let config = Config {
            data_dir: Some(PathBuf::from("/var/lib/frame")),
            ..Config::default()
        };
        assert_eq!(config.photos_dir(), PathBuf::from("/var/lib/frame/photos"));
        assert_eq!(
            config.settings_path(),
            PathBuf::from("/var/lib/frame/settings.json")
        );
    }
}
