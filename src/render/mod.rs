//! Image normalization pipeline.
//!
//! This module handles:
//! - EXIF orientation correction (exif.rs)
//! - Fit/fill scaling, letterboxing and the final panel rotation
//!   (normalize.rs)

pub mod exif;
pub mod normalize;

pub use normalize::{normalize, ScaleMode, SourceImage};
