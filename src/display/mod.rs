//! Panel abstraction and driver selection.
//!
//! Everything above this module talks to the physical display through the
//! [`Panel`] trait. The concrete driver is chosen once at startup from
//! configuration; a failed hardware init leaves the daemon permanently
//! headless (uploads and orientation changes keep working, display updates
//! are skipped with a logged error).

pub mod file;
pub mod uc8159;

use image::RgbImage;
use thiserror::Error;
use tracing::{error, info};

use crate::config::{DisplayConfig, DriverKind};

pub use file::FilePanel;
pub use uc8159::Uc8159;

/// Errors at the hardware boundary.
#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("spi i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("gpio error: {0}")]
    Gpio(#[from] linux_embedded_hal::gpio_cdev::errors::Error),

    #[error("panel stayed busy for more than {0:?}")]
    BusyTimeout(std::time::Duration),

    #[error("canvas is {got_w}x{got_h} but the panel is {want_w}x{want_h}")]
    GeometryMismatch {
        want_w: u32,
        want_h: u32,
        got_w: u32,
        got_h: u32,
    },

    #[error("failed to encode canvas: {0}")]
    Encode(#[from] image::ImageError),
}

/// The capability set the rest of the daemon needs from a display:
/// fixed dimensions, accept a canvas, commit it to the panel.
pub trait Panel: Send {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Stage a canvas. The canvas dimensions must equal the panel's.
    fn set_image(&mut self, canvas: &RgbImage) -> Result<(), DisplayError>;

    /// Commit the staged canvas to the physical panel.
    fn show(&mut self) -> Result<(), DisplayError>;
}

/// Open the configured driver.
///
/// Hardware init failure is logged and yields `None`: a missing panel is a
/// valid state for the whole process lifetime, never an error raised to
/// callers.
pub fn open(config: &DisplayConfig) -> Option<Box<dyn Panel>> {
    match config.driver {
        DriverKind::Uc8159 => match Uc8159::open(config) {
            Ok(panel) => {
                info!(
                    width = panel.width(),
                    height = panel.height(),
                    "Initialized UC8159 panel"
                );
                Some(Box::new(panel))
            }
            Err(e) => {
                error!(error = %e, "Could not initialize UC8159 panel, running headless");
                None
            }
        },
        DriverKind::File => {
            let panel = FilePanel::new(config.width, config.height, config.canvas_path());
            info!(path = %panel.path().display(), "Using file-backed panel");
            Some(Box::new(panel))
        }
        DriverKind::Disabled => {
            info!("Display driver disabled by configuration");
            None
        }
    }
}
