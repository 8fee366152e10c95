//! Text recognition boundary
//!
//! The extraction engine treats recognition as an opaque service: crop a zone,
//! hand the raster to a [`Recognizer`], get best-effort text back. Failures
//! are non-fatal to the caller.

pub mod tesseract;

use anyhow::Result;
use image::DynamicImage;

use crate::editor::ZoneRect;

/// Opaque text-recognition service over an in-memory image region.
pub trait Recognizer {
    /// Best-effort text for the region. Errors are absorbed by the caller as
    /// an empty field; they never abort a batch.
    fn recognize(&self, region: &DynamicImage) -> Result<String>;
}

/// Crop a zone's rectangle out of an image, clamped to the image bounds.
///
/// Returns `None` when the clamped region has no area (zone lies entirely
/// outside this image).
pub fn crop_zone(img: &DynamicImage, rect: &ZoneRect) -> Option<DynamicImage> {
    let n = rect.normalized();
    let (w, h) = (img.width(), img.height());

    let x1 = (n.x1.max(0.0) as u32).min(w);
    let y1 = (n.y1.max(0.0) as u32).min(h);
    let x2 = (n.x2.max(0.0).ceil() as u32).min(w);
    let y2 = (n.y2.max(0.0).ceil() as u32).min(h);

    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some(img.crop_imm(x1, y1, x2 - x1, y2 - y1))
}

/// Prepare a cropped region for recognition: grayscale plus a light sharpen.
pub fn prepare_region(region: &DynamicImage) -> DynamicImage {
    let gray = region.grayscale();
    // 3x3 sharpen kernel
    gray.filter3x3(&[0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbaImage};

    fn blank(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::new(w, h))
    }

    #[test]
    fn test_crop_zone_within_bounds() {
        let img = blank(100, 80);
        let rect = ZoneRect { x1: 10.0, y1: 20.0, x2: 40.0, y2: 50.0 };
        let cropped = crop_zone(&img, &rect).unwrap();
        assert_eq!((cropped.width(), cropped.height()), (30, 30));
    }

    #[test]
    fn test_crop_zone_clamps_to_image() {
        let img = blank(100, 80);
        let rect = ZoneRect { x1: 90.0, y1: 70.0, x2: 300.0, y2: 300.0 };
        let cropped = crop_zone(&img, &rect).unwrap();
        assert_eq!((cropped.width(), cropped.height()), (10, 10));
    }

    #[test]
    fn test_crop_zone_outside_image_is_none() {
        let img = blank(100, 80);
        let rect = ZoneRect { x1: 200.0, y1: 200.0, x2: 300.0, y2: 300.0 };
        assert!(crop_zone(&img, &rect).is_none());
    }

    #[test]
    fn test_crop_zone_accepts_unnormalized_rect() {
        let img = blank(100, 80);
        let rect = ZoneRect { x1: 40.0, y1: 50.0, x2: 10.0, y2: 20.0 };
        let cropped = crop_zone(&img, &rect).unwrap();
        assert_eq!((cropped.width(), cropped.height()), (30, 30));
    }
}
