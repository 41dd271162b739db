//! The normalization pipeline: photo in, display-ready canvas out.
//!
//! `normalize` is a pure transformation. Steps, in order:
//!
//! 1. EXIF correction (exif.rs)
//! 2. Flatten alpha/palette sources onto white, yielding opaque RGB
//! 3. Pick the working target frame (panel geometry, swapped when sideways)
//! 4. Scale by the fit/fill ratio with Lanczos resampling
//! 5. Paste centered on a white canvas (negative offsets crop, fill mode)
//! 6. Rotate the composed canvas onto the panel's native axes
//!
//! The output dimensions equal the panel's native geometry for every
//! orientation and mode. That invariant is what the rest of the daemon
//! relies on and is pinned down by the tests at the bottom.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageDecoder, ImageReader, Rgb, RgbImage};
use tracing::{debug, warn};

use crate::error::FrameError;
use crate::render::exif;
use crate::state::{DisplayGeometry, Orientation};

/// Letterbox and flatten fill colour.
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// How the source is scaled into the target frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleMode {
    /// Scale to cover the whole frame, cropping excess source content.
    /// Used by the autonomous refresh path.
    Fill,
    /// Scale so the whole source is visible, letterboxed with background
    /// fill. Used when displaying a freshly uploaded photo.
    Fit,
}

/// A decoded photograph plus its EXIF orientation tag, alive for the
/// duration of one normalization call.
pub struct SourceImage {
    pub image: DynamicImage,
    /// Raw EXIF orientation tag (1-8), `None` when absent or unreadable.
    pub exif_tag: Option<u8>,
}

impl SourceImage {
    /// Decode a photo from disk, capturing the EXIF orientation tag.
    ///
    /// A failure to read the orientation metadata is non-fatal: the photo
    /// is used as decoded and a warning is emitted.
    pub fn open(path: &Path) -> Result<Self, FrameError> {
        let reader = ImageReader::open(path)?.with_guessed_format()?;
        let mut decoder = reader.into_decoder()?;
        let exif_tag = match decoder.orientation() {
            Ok(orientation) => Some(exif::tag_from_metadata(orientation)),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Could not read EXIF orientation, using bitmap as decoded"
                );
                None
            }
        };
        let image = DynamicImage::from_decoder(decoder)?;
        Ok(Self { image, exif_tag })
    }
}

/// Scaled dimensions and paste offsets for a source inside a target frame.
///
/// Offsets use floor division, so fill-mode overshoot splits evenly with
/// the extra pixel cropped from the right/bottom. Negative offsets mean the
/// paste crops.
pub(crate) fn layout(
    (source_w, source_h): (u32, u32),
    (target_w, target_h): (u32, u32),
    mode: ScaleMode,
) -> (u32, u32, i64, i64) {
    let width_ratio = f64::from(target_w) / f64::from(source_w);
    let height_ratio = f64::from(target_h) / f64::from(source_h);
    let ratio = match mode {
        ScaleMode::Fill => width_ratio.max(height_ratio),
        ScaleMode::Fit => width_ratio.min(height_ratio),
    };

    let scaled_w = ((f64::from(source_w) * ratio).round() as u32).max(1);
    let scaled_h = ((f64::from(source_h) * ratio).round() as u32).max(1);
    let x = (i64::from(target_w) - i64::from(scaled_w)).div_euclid(2);
    let y = (i64::from(target_h) - i64::from(scaled_h)).div_euclid(2);
    (scaled_w, scaled_h, x, y)
}

/// Turn a photograph into a canvas exactly matching the panel's native
/// pixel dimensions in the given orientation.
pub fn normalize(
    source: &SourceImage,
    orientation: Orientation,
    geometry: DisplayGeometry,
    mode: ScaleMode,
) -> RgbImage {
    let upright = match source.exif_tag {
        Some(tag) if tag != 1 => exif::correct(source.image.clone(), tag),
        _ => source.image.clone(),
    };
    let bitmap = flatten_to_rgb(upright);

    let (target_w, target_h) = geometry.working(orientation);
    let (scaled_w, scaled_h, x, y) = layout(
        (bitmap.width(), bitmap.height()),
        (target_w, target_h),
        mode,
    );
    debug!(
        source_w = bitmap.width(),
        source_h = bitmap.height(),
        scaled_w,
        scaled_h,
        x,
        y,
        "Composing canvas"
    );

    // Skip the resample entirely when the scale resolves to 1:1.
    let resized = if (scaled_w, scaled_h) == (bitmap.width(), bitmap.height()) {
        bitmap
    } else {
        imageops::resize(&bitmap, scaled_w, scaled_h, FilterType::Lanczos3)
    };

    let mut canvas = RgbImage::from_pixel(target_w, target_h, BACKGROUND);
    imageops::overlay(&mut canvas, &resized, x, y);

    // Align working-axis content to the panel's native axes. The frame is
    // never expanded here: for sideways orientations the working canvas was
    // already composed with swapped dimensions.
    match orientation {
        Orientation::Deg0 => canvas,
        Orientation::Deg90 => imageops::rotate90(&canvas),
        Orientation::Deg180 => imageops::rotate180(&canvas),
        Orientation::Deg270 => imageops::rotate270(&canvas),
    }
}

/// Composite alpha or palette-with-transparency sources onto a white
/// background, yielding an opaque RGB bitmap.
fn flatten_to_rgb(image: DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }
    let rgba = image.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u32::from(pixel[3]);
        let blend =
            |channel: u8| ((u32::from(channel) * alpha + 255 * (255 - alpha)) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }
    out
}
