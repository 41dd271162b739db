//! Process-wide frame state.
//!
//! This module owns:
//! - The orientation value and display geometry (orientation.rs)
//! - The durable settings record backing the orientation (settings.rs)
//! - `FrameState`, the guarded live state injected into every component
//!   that needs it

pub mod orientation;
pub mod settings;

use std::path::PathBuf;
use std::sync::RwLock;

use tracing::{error, info};

pub use orientation::{DisplayGeometry, Orientation};
pub use settings::Settings;

/// Live frame state shared between the web handlers, the scheduler, the
/// button listeners and the refresh engine.
///
/// The orientation is a single scalar guarded by a lock: readers never
/// observe a torn value, and every write goes through [`set_orientation`],
/// which also persists the settings record. There is no other mutation
/// entry point.
///
/// [`set_orientation`]: FrameState::set_orientation
pub struct FrameState {
    orientation: RwLock<Orientation>,
    settings_path: PathBuf,
    geometry: DisplayGeometry,
}

impl FrameState {
    pub fn new(settings: Settings, settings_path: PathBuf, geometry: DisplayGeometry) -> Self {
        Self {
            orientation: RwLock::new(settings.orientation),
            settings_path,
            geometry,
        }
    }

    /// The live orientation value. Never returns a stale persisted value:
    /// the in-memory slot is authoritative for the process lifetime.
    pub fn orientation(&self) -> Orientation {
        *self.orientation.read().expect("orientation lock poisoned")
    }

    /// Update the orientation and synchronously persist the full settings
    /// record.
    ///
    /// A persistence failure is logged but does not undo the in-memory
    /// change: the new orientation stays in effect for the remainder of the
    /// process.
    pub fn set_orientation(&self, value: Orientation) {
        {
            let mut slot = self.orientation.write().expect("orientation lock poisoned");
            *slot = value;
        }
        info!(orientation = %value, "Orientation changed");

        let record = Settings { orientation: value };
        if let Err(e) = settings::save(&self.settings_path, &record) {
            error!(
                path = %self.settings_path.display(),
                error = %e,
                "Failed to persist orientation; in-memory value remains in effect"
            );
        }
    }

    /// Native pixel dimensions of the panel this process composes for.
    pub fn geometry(&self) -> DisplayGeometry {
        self.geometry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_orientation_updates_live_value_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let state = FrameState::new(
            Settings::default(),
            path.clone(),
            DisplayGeometry::new(600, 448),
        );
        assert_eq!(state.orientation(), Orientation::Deg0);

        state.set_orientation(Orientation::Deg270);
        assert_eq!(state.orientation(), Orientation::Deg270);

        // A fresh load simulates a restart and must see the persisted value.
        let reloaded = settings::load(&path);
        assert_eq!(reloaded.orientation, Orientation::Deg270);
    }

    #[test]
    fn test_persist_failure_keeps_in_memory_value() {
        // A directory as the settings path makes every write fail.
        let dir = tempfile::tempdir().unwrap();
        let state = FrameState::new(
            Settings::default(),
            dir.path().to_path_buf(),
            DisplayGeometry::new(600, 448),
        );

        state.set_orientation(Orientation::Deg90);
        assert_eq!(state.orientation(), Orientation::Deg90);
    }
}
