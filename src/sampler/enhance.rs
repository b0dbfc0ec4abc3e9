//! Region-of-interest extraction and decode-oriented image enhancement.
//!
//! The enhancement chain is fixed: grayscale, linear contrast stretch, hard
//! binarization at the mid threshold. Color is discarded; the target
//! symbologies are monochrome.

use crate::types::FrameData;
use image::GrayImage;

const BINARIZE_THRESHOLD: u8 = 128;

/// Crop the centered region of interest from an RGB8 frame and convert it to
/// luma in one pass.
pub fn luma_roi(frame: &FrameData, roi_fraction: f32) -> GrayImage {
    let fraction = roi_fraction.clamp(0.1, 1.0);
    let roi_width = ((frame.width as f32 * fraction) as u32).max(1);
    let roi_height = ((frame.height as f32 * fraction) as u32).max(1);
    let x0 = (frame.width - roi_width) / 2;
    let y0 = (frame.height - roi_height) / 2;

    let mut out = GrayImage::new(roi_width, roi_height);
    for y in 0..roi_height {
        for x in 0..roi_width {
            let idx = (((y0 + y) * frame.width + (x0 + x)) * 3) as usize;
            let luma = if idx + 2 < frame.data.len() {
                let r = frame.data[idx] as u32;
                let g = frame.data[idx + 1] as u32;
                let b = frame.data[idx + 2] as u32;
                ((r * 299 + g * 587 + b * 114) / 1000) as u8
            } else {
                0
            };
            out.put_pixel(x, y, image::Luma([luma]));
        }
    }
    out
}

/// Linear contrast stretch followed by hard binarization. Improves decode
/// reliability on low-contrast captures.
pub fn enhance(image: &GrayImage) -> GrayImage {
    let mut min = u8::MAX;
    let mut max = u8::MIN;
    for pixel in image.pixels() {
        let v = pixel.0[0];
        min = min.min(v);
        max = max.max(v);
    }

    let range = max.saturating_sub(min);
    let mut out = GrayImage::new(image.width(), image.height());
    for (x, y, pixel) in image.enumerate_pixels() {
        let stretched = if range == 0 {
            pixel.0[0]
        } else {
            (((pixel.0[0] - min) as u32 * 255) / range as u32) as u8
        };
        let binary = if stretched >= BINARIZE_THRESHOLD { 255 } else { 0 };
        out.put_pixel(x, y, image::Luma([binary]));
    }
    out
}
