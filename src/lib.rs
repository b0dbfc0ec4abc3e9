//! scanstream: camera barcode capture and validation pipeline.
//!
//! This crate acquires a live camera feed under uncertain hardware
//! capability, samples frames on a fixed interval, skips frames that did not
//! change, hands candidate bitmaps to one of two interchangeable decoding
//! backends, and checksum-verifies every decode before surfacing a canonical
//! `ScanResult`.
//!
//! # Features
//! - Constraint-tier camera acquisition with graceful fallback
//! - Region-of-interest cropping and change-gated frame skipping
//! - Library-backed and platform-native decoding behind one trait
//! - Mod-10 checksum validation for EAN-13/EAN-8/UPC-A (and ISBN-13)
//! - Explicitly owned, explicitly disposed scanner sessions
//!
//! # Usage
//! ```rust,no_run
//! use scanstream::{NokhwaBackend, ScannerService, ScanstreamConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), scanstream::ScanError> {
//! let mut scanner = ScannerService::new(Arc::new(NokhwaBackend::new()), ScanstreamConfig::load_or_default());
//! scanner.on_result(|result| println!("{} ({})", result.text, result.format));
//! scanner.initialize().await?;
//! # Ok(())
//! # }
//! ```

pub mod camera;
pub mod config;
pub mod decoder;
pub mod errors;
pub mod permissions;
pub mod sampler;
pub mod service;
pub mod symbology;
pub mod types;

// Testing utilities - synthetic barcodes and fakes for offline testing
pub mod testing;

// Re-exports for convenience
pub use camera::{CameraSession, CaptureBackend, CaptureStream, NokhwaBackend};
pub use config::ScanstreamConfig;
pub use decoder::{select_backend, DecoderBackend, MultiFormatDecoder, NativeDetector};
pub use errors::ScanError;
pub use sampler::FrameSampler;
pub use service::{FrameSink, ScannerService, ScannerState};
pub use symbology::{validate, DetectedFormat, FormatRegistry, ValidationResult};
pub use types::{
    CameraPermissionStatus, CanonicalFormat, ConstraintLevel, FrameData, PermissionState,
    ScanResult, ScannerCapabilities,
};

/// Initialize logging for the scanning pipeline
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "scanstream=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

#[cfg(test)]
mod lib_tests {
    use super::*;

    #[test]
    fn test_crate_info() {
        let info = get_info();
        assert_eq!(info.name, "scanstream");
        assert!(!info.version.is_empty());
        assert!(!info.description.is_empty());
    }

    #[test]
    fn test_public_surface_reexports() {
        // The canonical vocabulary is reachable from the crate root.
        assert_eq!(CanonicalFormat::ALL.len(), 4);
        assert!(validate("4006381333931").valid);
    }
}
