//! File-backed panel for development hosts.
//!
//! Behaves like the hardware panel but commits the canvas to a PNG on
//! disk, so the whole pipeline can be exercised on a machine without SPI.

use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::{info, warn};

use super::{DisplayError, Panel};

pub struct FilePanel {
    width: u32,
    height: u32,
    path: PathBuf,
    staged: Option<RgbImage>,
}

impl FilePanel {
    pub fn new(width: u32, height: u32, path: PathBuf) -> Self {
        Self {
            width,
            height,
            path,
            staged: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Panel for FilePanel {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn set_image(&mut self, canvas: &RgbImage) -> Result<(), DisplayError> {
        if (canvas.width(), canvas.height()) != (self.width, self.height) {
            return Err(DisplayError::GeometryMismatch {
                want_w: self.width,
                want_h: self.height,
                got_w: canvas.width(),
                got_h: canvas.height(),
            });
        }
        self.staged = Some(canvas.clone());
        Ok(())
    }

    fn show(&mut self) -> Result<(), DisplayError> {
        match self.staged.as_ref() {
            Some(canvas) => {
                canvas.save(&self.path)?;
                info!(path = %self.path.display(), "Wrote canvas");
                Ok(())
            }
            None => {
                warn!("show() without a staged canvas, nothing to write");
                Ok(())
            }
        }
    }
}
