//! Coarse perceptual frame hashing for change detection.
//!
//! The hash is a 16x16 grid of quantized luma samples over the region of
//! interest. It exists purely to decide whether consecutive frames changed
//! enough to warrant a decode attempt; it is recomputed every tick and never
//! persisted.

use image::GrayImage;

pub const HASH_GRID: u32 = 16;
const HASH_CELLS: usize = (HASH_GRID * HASH_GRID) as usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHash {
    cells: [u8; HASH_CELLS],
}

impl FrameHash {
    /// Sample the image on a 16x16 grid, quantizing each luma value to 16
    /// levels so sensor noise does not register as change.
    pub fn compute(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        let mut cells = [0u8; HASH_CELLS];

        if width == 0 || height == 0 {
            return Self { cells };
        }

        for gy in 0..HASH_GRID {
            for gx in 0..HASH_GRID {
                let x = (gx * width / HASH_GRID).min(width - 1);
                let y = (gy * height / HASH_GRID).min(height - 1);
                let luma = image.get_pixel(x, y).0[0];
                cells[(gy * HASH_GRID + gx) as usize] = luma >> 4;
            }
        }

        Self { cells }
    }

    /// Fraction of grid cells whose quantized luma differs from the other
    /// hash. 0.0 means identical, 1.0 means every cell changed.
    pub fn change_ratio(&self, other: &FrameHash) -> f32 {
        let changed = self
            .cells
            .iter()
            .zip(other.cells.iter())
            .filter(|(a, b)| a != b)
            .count();
        changed as f32 / HASH_CELLS as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_image(width: u32, height: u32, luma: u8) -> GrayImage {
        GrayImage::from_pixel(width, height, image::Luma([luma]))
    }

    #[test]
    fn test_identical_images_have_zero_change() {
        let a = FrameHash::compute(&flat_image(320, 240, 100));
        let b = FrameHash::compute(&flat_image(320, 240, 100));
        assert_eq!(a.change_ratio(&b), 0.0);
    }

    #[test]
    fn test_inverted_images_fully_change() {
        let a = FrameHash::compute(&flat_image(320, 240, 0));
        let b = FrameHash::compute(&flat_image(320, 240, 255));
        assert_eq!(a.change_ratio(&b), 1.0);
    }

    #[test]
    fn test_quantization_absorbs_sensor_noise() {
        let a = FrameHash::compute(&flat_image(320, 240, 96));
        let b = FrameHash::compute(&flat_image(320, 240, 98));
        assert_eq!(a.change_ratio(&b), 0.0);
    }

    #[test]
    fn test_partial_change() {
        let mut img = flat_image(160, 160, 32);
        // Repaint the left half far enough to cross quantization buckets.
        for y in 0..160 {
            for x in 0..80 {
                img.put_pixel(x, y, image::Luma([224]));
            }
        }
        let a = FrameHash::compute(&flat_image(160, 160, 32));
        let b = FrameHash::compute(&img);
        let ratio = a.change_ratio(&b);
        assert!(ratio > 0.3 && ratio < 0.7, "ratio was {}", ratio);
    }

    #[test]
    fn test_empty_image_does_not_panic() {
        let empty = GrayImage::new(0, 0);
        let hash = FrameHash::compute(&empty);
        assert_eq!(hash.change_ratio(&hash), 0.0);
    }
}
