//! Product-barcode symbology support: format vocabulary translation and
//! checksum validation.

pub mod registry;
pub mod validator;

pub use registry::FormatRegistry;
pub use validator::{validate, DetectedFormat, ValidationResult};
