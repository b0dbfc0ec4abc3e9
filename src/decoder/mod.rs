//! Decoding backends.
//!
//! Two interchangeable implementations sit behind one trait: a library-backed
//! multi-format reader and a platform-native detector. A factory picks the
//! native detector when the platform advertises one; the choice is made once
//! per session and never reconsidered mid-scan.

pub mod multiformat;
pub mod native;

use crate::config::DecoderConfig;
use crate::errors::ScanError;
use crate::types::{ScanResult, ScannerCapabilities};
use image::GrayImage;
use std::path::Path;
use std::sync::Arc;

pub use multiformat::MultiFormatDecoder;
pub use native::NativeDetector;

/// A decoding backend. Implementations normalize every detection to
/// `ScanResult` with a canonical format name.
pub trait DecoderBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// One-time setup; called by the factory before the backend is shared.
    fn initialize(&mut self) -> Result<(), ScanError>;

    /// Capability descriptor, immutable for the backend's lifetime.
    fn capabilities(&self) -> ScannerCapabilities;

    /// Attempt to decode a single processed bitmap. `Ok(None)` means no code
    /// is present in the frame, which is an expected outcome while polling.
    fn decode_frame(&self, image: &GrayImage) -> Result<Option<ScanResult>, ScanError>;

    /// One-shot decode from a user-supplied picture file. Nothing found is an
    /// error here: the user explicitly asserted the picture contains a code.
    fn decode_image(&self, path: &Path) -> Result<ScanResult, ScanError>;

    /// Whether the backend can drive an externally-timed continuous decode
    /// loop instead of sampled single-frame decoding.
    fn supports_continuous(&self) -> bool {
        false
    }
}

/// Select and initialize the decoding backend for a session.
pub fn select_backend(config: &DecoderConfig) -> Result<Arc<dyn DecoderBackend>, ScanError> {
    if config.prefer_native {
        if let Some(mut detector) = NativeDetector::probe() {
            detector.initialize()?;
            log::info!("Using platform-native barcode detector");
            return Ok(Arc::new(detector));
        }
        log::debug!("No platform-native detector available, falling back");
    }

    let mut decoder = MultiFormatDecoder::new();
    decoder.initialize()?;
    log::info!("Using multi-format library decoder");
    Ok(Arc::new(decoder))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_always_yields_a_backend() {
        let backend = select_backend(&DecoderConfig {
            prefer_native: true,
            use_continuous_when_available: false,
        })
        .unwrap();
        assert_eq!(backend.capabilities().supported_formats.len(), 4);
    }

    #[test]
    fn test_factory_honors_library_preference() {
        let backend = select_backend(&DecoderConfig {
            prefer_native: false,
            use_continuous_when_available: false,
        })
        .unwrap();
        assert_eq!(backend.name(), "multiformat");
    }
}
