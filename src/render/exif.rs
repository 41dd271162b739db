//! EXIF orientation correction.
//!
//! Cameras record a 1–8 orientation tag instead of rotating pixel data.
//! The tag must be undone before any scaling or composing so the bitmap is
//! right-side-up in its own axes. Tag semantics follow the EXIF standard;
//! the rotations named in the tag table are counter-clockwise, which is why
//! tag 6 maps to `rotate90` (clockwise) below.

use image::metadata::Orientation as DecoderOrientation;
use image::DynamicImage;
use tracing::warn;

/// Convert the `image` decoder's orientation metadata back to the raw EXIF
/// tag value (1–8).
pub fn tag_from_metadata(orientation: DecoderOrientation) -> u8 {
    match orientation {
        DecoderOrientation::NoTransforms => 1,
        DecoderOrientation::FlipHorizontal => 2,
        DecoderOrientation::Rotate180 => 3,
        DecoderOrientation::FlipVertical => 4,
        DecoderOrientation::Rotate90FlipH => 5,
        DecoderOrientation::Rotate90 => 6,
        DecoderOrientation::Rotate270FlipH => 7,
        DecoderOrientation::Rotate270 => 8,
    }
}

/// Apply the flip/rotate combination that undoes an EXIF orientation tag.
///
/// Tag 1 is a no-op. Values outside 1–8 are invalid EXIF; they are logged
/// and the bitmap is returned unmodified rather than failing the photo.
pub fn correct(image: DynamicImage, tag: u8) -> DynamicImage {
    match tag {
        1 => image,
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.fliph().rotate270(),
        6 => image.rotate90(),
        7 => image.fliph().rotate90(),
        8 => image.rotate270(),
        other => {
            warn!(tag = other, "Ignoring invalid EXIF orientation tag");
            image
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// A 3x2 bitmap where every pixel is distinct, so any wrong flip or
    /// rotation changes the pixel layout.
    fn asymmetric_bitmap() -> DynamicImage {
        let mut img = RgbImage::new(3, 2);
        for y in 0..2 {
            for x in 0..3 {
                img.put_pixel(x, y, Rgb([x as u8 * 40, y as u8 * 90, 7]));
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    /// Apply the camera-side distortion for a tag: the inverse of the
    /// correction. Tags 2–5 and 7 are involutions; 6 and 8 invert each
    /// other.
    fn distort(image: &DynamicImage, tag: u8) -> DynamicImage {
        match tag {
            1 => image.clone(),
            2 => image.fliph(),
            3 => image.rotate180(),
            4 => image.flipv(),
            5 => image.fliph().rotate270(),
            6 => image.rotate270(),
            7 => image.fliph().rotate90(),
            8 => image.rotate90(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_all_tags_round_trip() {
        let original = asymmetric_bitmap();
        for tag in 1..=8u8 {
            let distorted = distort(&original, tag);
            let recovered = correct(distorted, tag);
            assert_eq!(
                recovered.to_rgb8().as_raw(),
                original.to_rgb8().as_raw(),
                "tag {} did not recover the original layout",
                tag
            );
        }
    }

    #[test]
    fn test_invalid_tag_leaves_bitmap_unchanged() {
        let original = asymmetric_bitmap();
        let out = correct(original.clone(), 0);
        assert_eq!(out.to_rgb8().as_raw(), original.to_rgb8().as_raw());
        let out = correct(original.clone(), 9);
        assert_eq!(out.to_rgb8().as_raw(), original.to_rgb8().as_raw());
    }

    #[test]
    fn test_sideways_tags_swap_dimensions() {
        let original = asymmetric_bitmap();
        for tag in [5, 6, 7, 8] {
            let corrected = correct(original.clone(), tag);
            assert_eq!((corrected.width(), corrected.height()), (2, 3));
        }
    }

    #[test]
    fn test_metadata_tag_mapping_is_bijective() {
        use image::metadata::Orientation as O;
        let all = [
            O::NoTransforms,
            O::FlipHorizontal,
            O::Rotate180,
            O::FlipVertical,
            O::Rotate90FlipH,
            O::Rotate90,
            O::Rotate270FlipH,
            O::Rotate270,
        ];
        let mut tags: Vec<u8> = all.iter().map(|&o| tag_from_metadata(o)).collect();
        tags.sort_unstable();
        assert_eq!(tags, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
