//! Synthetic ideal-module barcode rendering.
//!
//! Generates flat, noise-free EAN symbols for decoder and pipeline tests so
//! the suite runs without hardware or fixture files. Left-half digits use
//! L/G parity selected by the leading digit; right-half digits use R codes.

use crate::types::FrameData;
use image::GrayImage;

/// L-code module patterns for digits 0-9, 7 modules each.
const L_CODES: [u8; 10] = [
    0b0001101, 0b0011001, 0b0010011, 0b0111101, 0b0100011, 0b0110001, 0b0101111, 0b0111011,
    0b0110111, 0b0001011,
];

/// First-digit parity selection for the six left-half digits of an EAN-13
/// symbol; bit set means G parity at that position.
const PARITY: [u8; 10] = [
    0b000000, 0b001011, 0b001101, 0b001110, 0b010011, 0b011001, 0b011100, 0b010101, 0b010110,
    0b011010,
];

fn r_code(digit: usize) -> u8 {
    !L_CODES[digit] & 0x7f
}

fn g_code(digit: usize) -> u8 {
    let r = r_code(digit);
    let mut reversed = 0u8;
    for bit in 0..7 {
        if r & (1 << bit) != 0 {
            reversed |= 1 << (6 - bit);
        }
    }
    reversed
}

fn push_pattern(modules: &mut Vec<bool>, pattern: u8, bits: u32) {
    for bit in (0..bits).rev() {
        modules.push(pattern & (1 << bit) != 0);
    }
}

fn digits_of(code: &str) -> Vec<usize> {
    code.bytes()
        .map(|b| {
            assert!(b.is_ascii_digit(), "barcode text must be digits");
            (b - b'0') as usize
        })
        .collect()
}

/// The 95 modules of an EAN-13 symbol, true = dark.
pub fn ean13_modules(code: &str) -> Vec<bool> {
    let digits = digits_of(code);
    assert_eq!(digits.len(), 13, "EAN-13 takes exactly 13 digits");

    let parity = PARITY[digits[0]];
    let mut modules = Vec::with_capacity(95);
    push_pattern(&mut modules, 0b101, 3);
    for (i, &digit) in digits[1..7].iter().enumerate() {
        let use_g = parity & (1 << (5 - i)) != 0;
        let pattern = if use_g { g_code(digit) } else { L_CODES[digit] };
        push_pattern(&mut modules, pattern, 7);
    }
    push_pattern(&mut modules, 0b01010, 5);
    for &digit in &digits[7..13] {
        push_pattern(&mut modules, r_code(digit), 7);
    }
    push_pattern(&mut modules, 0b101, 3);
    modules
}

/// The 67 modules of an EAN-8 symbol, true = dark.
pub fn ean8_modules(code: &str) -> Vec<bool> {
    let digits = digits_of(code);
    assert_eq!(digits.len(), 8, "EAN-8 takes exactly 8 digits");

    let mut modules = Vec::with_capacity(67);
    push_pattern(&mut modules, 0b101, 3);
    for &digit in &digits[0..4] {
        push_pattern(&mut modules, L_CODES[digit], 7);
    }
    push_pattern(&mut modules, 0b01010, 5);
    for &digit in &digits[4..8] {
        push_pattern(&mut modules, r_code(digit), 7);
    }
    push_pattern(&mut modules, 0b101, 3);
    modules
}

/// Render a module row as a grayscale image with quiet zones and vertical
/// padding.
pub fn barcode_image(modules: &[bool], module_width: u32, height: u32) -> GrayImage {
    const QUIET_MODULES: u32 = 10;
    const V_PAD: u32 = 8;

    let width = (modules.len() as u32 + 2 * QUIET_MODULES) * module_width;
    let mut img = GrayImage::from_pixel(width, height + 2 * V_PAD, image::Luma([255]));

    for (i, &dark) in modules.iter().enumerate() {
        if !dark {
            continue;
        }
        let x0 = (QUIET_MODULES + i as u32) * module_width;
        for x in x0..x0 + module_width {
            for y in V_PAD..V_PAD + height {
                img.put_pixel(x, y, image::Luma([0]));
            }
        }
    }
    img
}

pub fn ean13_image(code: &str, module_width: u32, height: u32) -> GrayImage {
    barcode_image(&ean13_modules(code), module_width, height)
}

pub fn ean8_image(code: &str, module_width: u32, height: u32) -> GrayImage {
    barcode_image(&ean8_modules(code), module_width, height)
}

/// An RGB8 camera frame with an EAN-13 symbol centered in it, sized to land
/// inside a 60% center region of interest.
pub fn ean13_frame(code: &str, frame_width: u32, frame_height: u32) -> FrameData {
    let symbol = ean13_image(code, 3, 60);
    grayscale_into_frame(&symbol, frame_width, frame_height)
}

/// A flat single-luma frame, for change-detection tests.
pub fn flat_frame(luma: u8, width: u32, height: u32) -> FrameData {
    FrameData::new(
        vec![luma; (width * height * 3) as usize],
        width,
        height,
        "synthetic".to_string(),
    )
}

fn grayscale_into_frame(symbol: &GrayImage, frame_width: u32, frame_height: u32) -> FrameData {
    assert!(symbol.width() <= frame_width && symbol.height() <= frame_height);
    let mut data = vec![255u8; (frame_width * frame_height * 3) as usize];
    let x0 = (frame_width - symbol.width()) / 2;
    let y0 = (frame_height - symbol.height()) / 2;

    for (x, y, pixel) in symbol.enumerate_pixels() {
        let idx = (((y0 + y) * frame_width + (x0 + x)) * 3) as usize;
        data[idx] = pixel.0[0];
        data[idx + 1] = pixel.0[0];
        data[idx + 2] = pixel.0[0];
    }
    FrameData::new(data, frame_width, frame_height, "synthetic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ean13_module_count() {
        let modules = ean13_modules("4006381333931");
        assert_eq!(modules.len(), 95);
        // Guards at both ends.
        assert_eq!(&modules[0..3], &[true, false, true]);
        assert_eq!(&modules[92..95], &[true, false, true]);
        // Center guard.
        assert_eq!(&modules[45..50], &[false, true, false, true, false]);
    }

    #[test]
    fn test_ean8_module_count() {
        let modules = ean8_modules("12345670");
        assert_eq!(modules.len(), 67);
        assert_eq!(&modules[0..3], &[true, false, true]);
    }

    #[test]
    fn test_every_digit_spans_two_bars() {
        // Each EAN digit pattern has exactly 2 bars and 2 spaces; total dark
        // modules per digit is between 2 and 5.
        for digit in 0..10 {
            let dark = L_CODES[digit].count_ones();
            assert!((2u32..=5).contains(&dark));
            assert_eq!(r_code(digit).count_ones(), 7 - dark);
            assert_eq!(g_code(digit).count_ones(), 7 - dark);
        }
    }

    #[test]
    fn test_rendered_image_dimensions() {
        let img = ean13_image("4006381333931", 2, 40);
        assert_eq!(img.width(), (95 + 20) * 2);
        assert_eq!(img.height(), 40 + 16);
    }

    #[test]
    fn test_frame_embeds_symbol_centered() {
        let frame = ean13_frame("4006381333931", 640, 480);
        assert_eq!(frame.width, 640);
        // The center row crosses the symbol.
        let has_dark = (0..640u32).any(|x| frame.data[((240 * 640 + x) * 3) as usize] == 0);
        assert!(has_dark);
    }
}
