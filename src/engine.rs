//! The refresh engine.
//!
//! One thread owns the panel and consumes a command queue fed by the
//! scheduler, the web handlers and the button listeners. Because the panel
//! has exactly one owner there are never interleaved `set_image`/`show`
//! calls; a refresh that arrives while another is in flight queues behind
//! it and runs afterwards instead of being dropped.
//!
//! Every command is isolated: a failure is logged and the engine moves on
//! to the next command, so a broken photo or a flaky panel never stops the
//! queue (or the scheduler feeding it).

use std::sync::Arc;
use std::thread;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::display::Panel;
use crate::error::FrameError;
use crate::photos::PhotoStore;
use crate::render::{self, ScaleMode, SourceImage};
use crate::state::{DisplayGeometry, FrameState, Orientation};

/// Depth of the command queue. Senders treat the queue as fire-and-forget;
/// a full queue just means refreshes are already pending.
const QUEUE_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub enum FrameCommand {
    /// Select a random photo and display it in fill mode.
    Refresh,
    /// Display one specific photo.
    Show { photo: String, mode: ScaleMode },
    /// Change the orientation (persisting it) and refresh.
    SetOrientation(Orientation),
}

pub struct Engine {
    state: Arc<FrameState>,
    store: PhotoStore,
    panel: Option<Box<dyn Panel>>,
}

impl Engine {
    pub fn new(state: Arc<FrameState>, store: PhotoStore, panel: Option<Box<dyn Panel>>) -> Self {
        Self {
            state,
            store,
            panel,
        }
    }

    /// Start the engine on its own thread, returning the command handle.
    pub fn spawn(self) -> (mpsc::Sender<FrameCommand>, thread::JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let handle = thread::Builder::new()
            .name("frame-engine".to_owned())
            .spawn(move || self.run(rx))
            .expect("failed to spawn engine thread");
        (tx, handle)
    }

    fn run(mut self, mut rx: mpsc::Receiver<FrameCommand>) {
        while let Some(command) = rx.blocking_recv() {
            self.handle(command);
        }
        info!("Command queue closed, engine stopping");
    }

    /// Execute one command, absorbing its failure.
    pub fn handle(&mut self, command: FrameCommand) {
        let result = match command {
            FrameCommand::Refresh => self.refresh(),
            FrameCommand::Show { ref photo, mode } => self.show_photo(photo, mode),
            FrameCommand::SetOrientation(orientation) => {
                self.state.set_orientation(orientation);
                // Policy: a reorientation reselects, same as the autonomous
                // refresh path.
                self.refresh()
            }
        };
        if let Err(e) = result {
            error!(error = %e, "Display update failed");
        }
    }

    fn refresh(&mut self) -> Result<(), FrameError> {
        let Some(panel) = self.panel.as_mut() else {
            warn!("No panel attached, skipping display update");
            return Ok(());
        };
        let Some(photo) = self.store.pick_random() else {
            info!("No photos available, skipping display update");
            return Ok(());
        };
        display_photo(panel.as_mut(), &self.state, &self.store, &photo, ScaleMode::Fill)
    }

    fn show_photo(&mut self, photo: &str, mode: ScaleMode) -> Result<(), FrameError> {
        let Some(panel) = self.panel.as_mut() else {
            warn!(photo, "No panel attached, skipping display update");
            return Ok(());
        };
        display_photo(panel.as_mut(), &self.state, &self.store, photo, mode)
    }
}

/// The normalize-and-display critical section shared by every trigger.
fn display_photo(
    panel: &mut dyn Panel,
    state: &FrameState,
    store: &PhotoStore,
    photo: &str,
    mode: ScaleMode,
) -> Result<(), FrameError> {
    let path = store.resolve(photo)?;
    let source = SourceImage::open(&path)?;
    let orientation = state.orientation();
    let geometry = DisplayGeometry::new(panel.width(), panel.height());
    let canvas = render::normalize(&source, orientation, geometry, mode);

    panel.set_image(&canvas)?;
    panel.show()?;
    info!(photo, %orientation, ?mode, "Display updated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DisplayError;
    use crate::state::Settings;
    use image::{Rgb, RgbImage};
    use std::sync::Mutex;

    /// Records every panel interaction so tests can assert the display was
    /// driven (or left untouched).
    #[derive(Default)]
    struct PanelLog {
        images: Vec<(u32, u32)>,
        shows: usize,
    }

    struct MockPanel {
        log: Arc<Mutex<PanelLog>>,
    }

    impl Panel for MockPanel {
        fn width(&self) -> u32 {
            600
        }
        fn height(&self) -> u32 {
            448
        }
        fn set_image(&mut self, canvas: &RgbImage) -> Result<(), DisplayError> {
            self.log
                .lock()
                .unwrap()
                .images
                .push((canvas.width(), canvas.height()));
            Ok(())
        }
        fn show(&mut self) -> Result<(), DisplayError> {
            self.log.lock().unwrap().shows += 1;
            Ok(())
        }
    }

    struct Fixture {
        engine: Engine,
        log: Arc<Mutex<PanelLog>>,
        settings_path: std::path::PathBuf,
        _dir: tempfile::TempDir,
    }

    fn fixture(with_panel: bool) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let settings_path = dir.path().join("settings.json");
        let store = PhotoStore::new(dir.path().join("photos")).unwrap();
        let state = Arc::new(FrameState::new(
            Settings::default(),
            settings_path.clone(),
            DisplayGeometry::new(600, 448),
        ));
        let log = Arc::new(Mutex::new(PanelLog::default()));
        let panel: Option<Box<dyn Panel>> = with_panel.then(|| {
            Box::new(MockPanel {
                log: Arc::clone(&log),
            }) as Box<dyn Panel>
        });
        Fixture {
            engine: Engine::new(state, store, panel),
            log,
            settings_path,
            _dir: dir,
        }
    }

    fn add_photo(engine: &Engine, name: &str) {
        let img = RgbImage::from_pixel(30, 20, Rgb([120, 40, 200]));
        img.save(engine.store.root().join(name)).unwrap();
    }

    #[test]
    fn test_empty_photo_set_leaves_panel_untouched() {
        let mut fx = fixture(true);
        fx.engine.handle(FrameCommand::Refresh);

        let log = fx.log.lock().unwrap();
        assert!(log.images.is_empty());
        assert_eq!(log.shows, 0);
    }

    #[test]
    fn test_refresh_submits_native_sized_canvas() {
        let mut fx = fixture(true);
        add_photo(&fx.engine, "one.png");

        fx.engine.handle(FrameCommand::Refresh);

        let log = fx.log.lock().unwrap();
        assert_eq!(log.images, vec![(600, 448)]);
        assert_eq!(log.shows, 1);
    }

    #[test]
    fn test_show_specific_photo_in_fit_mode() {
        let mut fx = fixture(true);
        add_photo(&fx.engine, "pick.png");

        fx.engine.handle(FrameCommand::Show {
            photo: "pick.png".to_owned(),
            mode: ScaleMode::Fit,
        });

        let log = fx.log.lock().unwrap();
        assert_eq!(log.images, vec![(600, 448)]);
        assert_eq!(log.shows, 1);
    }

    #[test]
    fn test_missing_photo_does_not_stop_the_engine() {
        let mut fx = fixture(true);
        fx.engine.handle(FrameCommand::Show {
            photo: "gone.png".to_owned(),
            mode: ScaleMode::Fit,
        });
        assert_eq!(fx.log.lock().unwrap().shows, 0);

        // The engine stays usable after the failure.
        add_photo(&fx.engine, "ok.png");
        fx.engine.handle(FrameCommand::Refresh);
        assert_eq!(fx.log.lock().unwrap().shows, 1);
    }

    #[test]
    fn test_set_orientation_persists_and_refreshes() {
        let mut fx = fixture(true);
        add_photo(&fx.engine, "one.png");

        fx.engine
            .handle(FrameCommand::SetOrientation(Orientation::Deg90));

        let log = fx.log.lock().unwrap();
        // The canvas is native-sized even when composed sideways.
        assert_eq!(log.images, vec![(600, 448)]);
        assert_eq!(log.shows, 1);

        let persisted = crate::state::settings::load(&fx.settings_path);
        assert_eq!(persisted.orientation, Orientation::Deg90);
    }

    #[test]
    fn test_headless_engine_skips_without_error() {
        let mut fx = fixture(false);
        add_photo(&fx.engine, "one.png");

        // Must not panic or error; uploads and state changes keep working
        // without a panel.
        fx.engine.handle(FrameCommand::Refresh);
        fx.engine
            .handle(FrameCommand::SetOrientation(Orientation::Deg180));

        let persisted = crate::state::settings::load(&fx.settings_path);
        assert_eq!(persisted.orientation, Orientation::Deg180);
    }
}
