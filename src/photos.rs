//! Photo storage and selection.
//!
//! Photos live in one flat directory. Identifiers are bare filenames; the
//! extension allow-list matches what the web UI accepts and what the
//! normalizer can decode. Uploads get a timestamp prefix so repeated
//! filenames never collide.

use std::fs;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use walkdir::WalkDir;

use crate::error::FrameError;

/// File types accepted for upload and eligible for display.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Handle to the photo directory. Cheap to clone; carries no open file
/// state.
#[derive(Debug, Clone)]
pub struct PhotoStore {
    root: PathBuf,
}

impl PhotoStore {
    /// Open the store, creating the directory if needed.
    pub fn new(root: PathBuf) -> Result<Self, FrameError> {
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All eligible photo filenames, sorted for stable listings.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_owned))
            .filter(|name| is_supported(name))
            .collect();
        names.sort();
        names
    }

    /// Uniform random choice over the eligible photos.
    pub fn pick_random(&self) -> Option<String> {
        self.list().choose(&mut rand::thread_rng()).cloned()
    }

    /// Resolve a photo identifier to its on-disk path.
    ///
    /// Identifiers must be bare filenames: anything with a path separator
    /// is rejected before touching the filesystem.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, FrameError> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(FrameError::InvalidPhotoName(name.to_owned()));
        }
        if !is_supported(name) {
            return Err(FrameError::UnsupportedFileType(name.to_owned()));
        }
        let path = self.root.join(name);
        if !path.is_file() {
            return Err(FrameError::MissingPhoto(name.to_owned()));
        }
        Ok(path)
    }

    /// Store an uploaded photo under a timestamped name and return that
    /// name.
    pub fn save_upload(&self, original_name: &str, bytes: &[u8]) -> Result<String, FrameError> {
        // Browsers may send a full client-side path; keep the last
        // component only.
        let base = Path::new(original_name)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| FrameError::InvalidPhotoName(original_name.to_owned()))?;
        // Windows-style separators are ordinary characters on Linux and
        // survive `file_name`; refuse them rather than store odd names.
        if base.contains(['/', '\\']) {
            return Err(FrameError::InvalidPhotoName(original_name.to_owned()));
        }
        if !is_supported(base) {
            return Err(FrameError::UnsupportedFileType(base.to_owned()));
        }

        let stamped = format!("{}_{}", chrono::Local::now().format("%Y%m%d_%H%M%S"), base);
        fs::write(self.root.join(&stamped), bytes)?;
        Ok(stamped)
    }

    /// Delete a stored photo.
    pub fn delete(&self, name: &str) -> Result<(), FrameError> {
        let path = self.resolve(name)?;
        fs::remove_file(path)?;
        Ok(())
    }
}

fn is_supported(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
