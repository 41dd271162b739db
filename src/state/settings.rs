//! Durable settings store.
//!
//! A single JSON record on disk holding the current orientation. The file is
//! read once at startup and rewritten synchronously on every orientation
//! change. A missing or malformed file is repaired with the default record.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::orientation::Orientation;
use crate::error::FrameError;

/// The sole durable record: `{"orientation": "0" | "90" | "180" | "270"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Settings {
    pub orientation: Orientation,
}

/// Read the settings record, repairing the store when needed.
///
/// On a missing file or unparsable content the default record is written
/// back and returned, so a corrupt store heals itself on the next start.
pub fn load(path: &Path) -> Settings {
    match fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str::<Settings>(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Settings file unparsable, rewriting defaults"
                );
                repair(path)
            }
        },
        Err(e) => {
            info!(
                path = %path.display(),
                error = %e,
                "Settings file unreadable, writing defaults"
            );
            repair(path)
        }
    }
}

/// Persist the full settings record.
pub fn save(path: &Path, settings: &Settings) -> Result<(), FrameError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(settings)?;
    fs::write(path, json)?;
    Ok(())
}

fn repair(path: &Path) -> Settings {
    let defaults = Settings::default();
    if let Err(e) = save(path, &defaults) {
        warn!(path = %path.display(), error = %e, "Could not repair settings store");
    }
    defaults
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let settings = Settings {
            orientation: Orientation::Deg90,
        };
        save(&path, &settings).unwrap();

        // Simulates a process restart: a fresh load must see the new value.
        let restored = load(&path);
        assert_eq!(restored.orientation, Orientation::Deg90);
    }

    #[test]
    fn test_wire_format() {
        let settings = Settings {
            orientation: Orientation::Deg90,
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert_eq!(json, r#"{"orientation":"90"}"#);
    }

    #[test]
    fn test_missing_file_returns_default_and_creates_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let settings = load(&path);
        assert_eq!(settings, Settings::default());

        // The load must have the side effect of creating the record.
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, r#"{"orientation":"0"}"#);
    }

    #[test]
    fn test_corrupt_file_repaired_with_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json at all").unwrap();

        let settings = load(&path);
        assert_eq!(settings.orientation, Orientation::Deg0);

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, r#"{"orientation":"0"}"#);
    }
}
