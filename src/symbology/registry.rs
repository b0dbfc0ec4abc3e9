//! Translation between the canonical format vocabulary and the spellings the
//! decoding backends use.
//!
//! The library backend (rxing) spells formats upper-snake (`EAN_13`); the
//! native detector spells them lower-snake (`ean_13`). Each canonical format
//! has exactly one mapping into each vocabulary and the reverse maps are
//! exact inverses.

use crate::types::CanonicalFormat;
use lazy_static::lazy_static;
use std::collections::HashMap;

const MULTIFORMAT_NAMES: [(CanonicalFormat, &str); 4] = [
    (CanonicalFormat::Ean13, "EAN_13"),
    (CanonicalFormat::Ean8, "EAN_8"),
    (CanonicalFormat::UpcA, "UPC_A"),
    (CanonicalFormat::Code128, "CODE_128"),
];

const NATIVE_NAMES: [(CanonicalFormat, &str); 4] = [
    (CanonicalFormat::Ean13, "ean_13"),
    (CanonicalFormat::Ean8, "ean_8"),
    (CanonicalFormat::UpcA, "upc_a"),
    (CanonicalFormat::Code128, "code_128"),
];

lazy_static! {
    static ref FROM_MULTIFORMAT: HashMap<&'static str, CanonicalFormat> =
        MULTIFORMAT_NAMES.iter().map(|(c, n)| (*n, *c)).collect();
    static ref FROM_NATIVE: HashMap<&'static str, CanonicalFormat> =
        NATIVE_NAMES.iter().map(|(c, n)| (*n, *c)).collect();
}

pub struct FormatRegistry;

impl FormatRegistry {
    /// Canonical → library-backend spelling.
    pub fn to_multiformat(format: CanonicalFormat) -> &'static str {
        MULTIFORMAT_NAMES
            .iter()
            .find(|(c, _)| *c == format)
            .map(|(_, n)| *n)
            .unwrap_or("EAN_13")
    }

    /// Canonical → native-detector spelling.
    pub fn to_native(format: CanonicalFormat) -> &'static str {
        NATIVE_NAMES
            .iter()
            .find(|(c, _)| *c == format)
            .map(|(_, n)| *n)
            .unwrap_or("ean_13")
    }

    /// Library-backend spelling → canonical.
    pub fn from_multiformat(name: &str) -> Option<CanonicalFormat> {
        FROM_MULTIFORMAT.get(name).copied()
    }

    /// Native-detector spelling → canonical.
    pub fn from_native(name: &str) -> Option<CanonicalFormat> {
        FROM_NATIVE.get(name).copied()
    }

    /// Whether a name, in any of the three vocabularies, denotes one of the
    /// supported product-barcode formats.
    pub fn is_product_barcode_format(name: &str) -> bool {
        FROM_MULTIFORMAT.contains_key(name)
            || FROM_NATIVE.contains_key(name)
            || CanonicalFormat::ALL.iter().any(|c| c.as_str() == name)
    }

    /// Whether a backend-reported symbology is one the pipeline refuses to
    /// surface. Any spelling of QR is excluded regardless of casing or
    /// punctuation; non-product symbologies are never reported.
    pub fn is_excluded_symbology(name: &str) -> bool {
        let normalized: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        normalized.contains("qr")
    }

    /// Canonical → typed rxing format, for building decode hints.
    pub fn to_rxing(format: CanonicalFormat) -> rxing::BarcodeFormat {
        match format {
            CanonicalFormat::Ean13 => rxing::BarcodeFormat::EAN_13,
            CanonicalFormat::Ean8 => rxing::BarcodeFormat::EAN_8,
            CanonicalFormat::UpcA => rxing::BarcodeFormat::UPC_A,
            CanonicalFormat::Code128 => rxing::BarcodeFormat::CODE_128,
        }
    }

    /// Typed rxing format → canonical. None for every symbology outside the
    /// product set.
    pub fn from_rxing(format: &rxing::BarcodeFormat) -> Option<CanonicalFormat> {
        match format {
            rxing::BarcodeFormat::EAN_13 => Some(CanonicalFormat::Ean13),
            rxing::BarcodeFormat::EAN_8 => Some(CanonicalFormat::Ean8),
            rxing::BarcodeFormat::UPC_A => Some(CanonicalFormat::UpcA),
            rxing::BarcodeFormat::CODE_128 => Some(CanonicalFormat::Code128),
            _ => None,
        }
    }
}
