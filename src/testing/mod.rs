//! Testing utilities: synthetic barcode frames and fake pipeline components
//! for offline testing without camera hardware.

pub mod fakes;
pub mod synthetic;

pub use fakes::{CollectingSink, FakeCaptureBackend, FakeDecoder, NullSink};
