//! Library-backed decoding via rxing's multi-format reader.
//!
//! The accepted format set is restricted to the four product symbologies and
//! exhaustive-search mode stays off: this pipeline trades recall for frame
//! latency, since its domain is retail barcodes near the frame center.

use crate::decoder::DecoderBackend;
use crate::errors::ScanError;
use crate::symbology::FormatRegistry;
use crate::types::{CanonicalFormat, ScanResult, ScannerCapabilities};
use image::GrayImage;
use rxing::common::HybridBinarizer;
use rxing::{
    BinaryBitmap, DecodeHintType, DecodeHintValue, DecodingHintDictionary, Exceptions,
    Luma8LuminanceSource, MultiFormatReader, RXingResult, Reader,
};
use std::collections::{HashMap, HashSet};
use std::path::Path;

pub struct MultiFormatDecoder {
    hints: DecodingHintDictionary,
}

impl MultiFormatDecoder {
    pub fn new() -> Self {
        let formats: HashSet<rxing::BarcodeFormat> = CanonicalFormat::ALL
            .iter()
            .map(|f| FormatRegistry::to_rxing(*f))
            .collect();

        let mut hints: DecodingHintDictionary = HashMap::new();
        hints.insert(
            DecodeHintType::POSSIBLE_FORMATS,
            DecodeHintValue::PossibleFormats(formats),
        );
        hints.insert(DecodeHintType::TRY_HARDER, DecodeHintValue::TryHarder(false));

        Self { hints }
    }

    fn decode_luma(&self, luma: &GrayImage) -> Result<Option<ScanResult>, ScanError> {
        let source = Luma8LuminanceSource::new(luma.as_raw().clone(), luma.width(), luma.height());
        let mut bitmap = BinaryBitmap::new(HybridBinarizer::new(source));
        let mut reader = MultiFormatReader::default();

        match reader.decode_with_hints(&mut bitmap, &self.hints) {
            Ok(result) => Ok(self.normalize(result)),
            Err(Exceptions::NotFoundException(_)) => Ok(None),
            Err(e) => Err(ScanError::DecodeError(e.to_string())),
        }
    }

    /// Translate a raw detection into the canonical vocabulary. Detections
    /// outside the product-format set are dropped rather than surfaced.
    fn normalize(&self, result: RXingResult) -> Option<ScanResult> {
        let format = FormatRegistry::from_rxing(result.getBarcodeFormat())?;
        let text = result.getText().to_string();
        if text.is_empty() {
            return None;
        }
        Some(ScanResult::new(text, format))
    }
}

impl Default for MultiFormatDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderBackend for MultiFormatDecoder {
    fn name(&self) -> &'static str {
        "multiformat"
    }

    fn initialize(&mut self) -> Result<(), ScanError> {
        log::debug!(
            "Multi-format decoder initialized with {} accepted formats",
            CanonicalFormat::ALL.len()
        );
        Ok(())
    }

    fn capabilities(&self) -> ScannerCapabilities {
        ScannerCapabilities::for_formats(CanonicalFormat::ALL.to_vec(), true)
    }

    fn decode_frame(&self, image: &GrayImage) -> Result<Option<ScanResult>, ScanError> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(None);
        }
        self.decode_luma(image)
    }

    fn decode_image(&self, path: &Path) -> Result<ScanResult, ScanError> {
        let picture = image::open(path)
            .map_err(|e| ScanError::ImageError(format!("Failed to open {:?}: {}", path, e)))?;

        match self.decode_luma(&picture.to_luma8())? {
            Some(result) => Ok(result),
            None => Err(ScanError::DecodeError(
                "No product barcode found in the image".to_string(),
            )),
        }
    }

    fn supports_continuous(&self) -> bool {
        true
    }
}
