//! Fake pipeline components for hardware-free tests.
//!
//! The fake capture backend counts opened and live streams so tests can
//! assert the exclusive-ownership and no-leak properties of the acquisition
//! cascade and the stop/start race.

use crate::camera::backend::{CaptureBackend, CaptureStream};
use crate::camera::constraints::StreamRequest;
use crate::decoder::DecoderBackend;
use crate::errors::ScanError;
use crate::service::FrameSink;
use crate::types::{
    CameraDeviceInfo, CanonicalFormat, ConstraintLevel, FrameData, ScanResult,
    ScannerCapabilities, StreamCapabilities,
};
use image::GrayImage;
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct FakeBackendInner {
    devices: Mutex<Vec<CameraDeviceInfo>>,
    frame: Mutex<FrameData>,
    failing_levels: Mutex<HashSet<ConstraintLevel>>,
    open_delay: Mutex<Option<Duration>>,
    open_count: AtomicUsize,
    live_streams: AtomicUsize,
    shutdown_count: AtomicUsize,
    torch: Mutex<bool>,
    zoom: Mutex<f32>,
}

/// A scriptable capture backend.
#[derive(Clone)]
pub struct FakeCaptureBackend {
    inner: Arc<FakeBackendInner>,
}

impl FakeCaptureBackend {
    pub fn new() -> Self {
        let frame = crate::testing::synthetic::flat_frame(200, 320, 240);
        Self {
            inner: Arc::new(FakeBackendInner {
                devices: Mutex::new(vec![
                    CameraDeviceInfo::new("0".to_string(), "Integrated Camera".to_string()),
                    CameraDeviceInfo::new("1".to_string(), "Rear Camera".to_string()),
                ]),
                frame: Mutex::new(frame),
                failing_levels: Mutex::new(HashSet::new()),
                open_delay: Mutex::new(None),
                open_count: AtomicUsize::new(0),
                live_streams: AtomicUsize::new(0),
                shutdown_count: AtomicUsize::new(0),
                torch: Mutex::new(false),
                zoom: Mutex::new(1.0),
            }),
        }
    }

    /// Make acquisition at the given tier fail as over-constrained.
    pub fn fail_tier(&self, level: ConstraintLevel) {
        self.inner
            .failing_levels
            .lock()
            .expect("lock poisoned")
            .insert(level);
    }

    pub fn set_devices(&self, devices: Vec<CameraDeviceInfo>) {
        *self.inner.devices.lock().expect("lock poisoned") = devices;
    }

    pub fn set_frame(&self, frame: FrameData) {
        *self.inner.frame.lock().expect("lock poisoned") = frame;
    }

    /// Delay every open call, to simulate slow acquisition in race tests.
    pub fn set_open_delay(&self, delay: Duration) {
        *self.inner.open_delay.lock().expect("lock poisoned") = Some(delay);
    }

    pub fn open_count(&self) -> usize {
        self.inner.open_count.load(Ordering::SeqCst)
    }

    pub fn live_streams(&self) -> usize {
        self.inner.live_streams.load(Ordering::SeqCst)
    }

    pub fn shutdown_count(&self) -> usize {
        self.inner.shutdown_count.load(Ordering::SeqCst)
    }

    pub fn torch_state(&self) -> bool {
        *self.inner.torch.lock().expect("lock poisoned")
    }

    pub fn zoom_state(&self) -> f32 {
        *self.inner.zoom.lock().expect("lock poisoned")
    }
}

impl Default for FakeCaptureBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for FakeCaptureBackend {
    fn enumerate(&self) -> Result<Vec<CameraDeviceInfo>, ScanError> {
        Ok(self.inner.devices.lock().expect("lock poisoned").clone())
    }

    fn open(&self, request: &StreamRequest) -> Result<Box<dyn CaptureStream>, ScanError> {
        let delay = *self.inner.open_delay.lock().expect("lock poisoned");
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        if self
            .inner
            .failing_levels
            .lock()
            .expect("lock poisoned")
            .contains(&request.level)
        {
            return Err(ScanError::Overconstrained(format!(
                "tier {} scripted to fail",
                request.level
            )));
        }

        self.inner.open_count.fetch_add(1, Ordering::SeqCst);
        self.inner.live_streams.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeStream {
            inner: self.inner.clone(),
            device_id: request.device_id.clone().unwrap_or_else(|| "0".to_string()),
            open: true,
        }))
    }
}

struct FakeStream {
    inner: Arc<FakeBackendInner>,
    device_id: String,
    open: bool,
}

impl CaptureStream for FakeStream {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn read_frame(&mut self) -> Result<FrameData, ScanError> {
        if !self.open {
            return Err(ScanError::InvalidState("stream closed".to_string()));
        }
        Ok(self.inner.frame.lock().expect("lock poisoned").clone())
    }

    fn capabilities(&self) -> StreamCapabilities {
        StreamCapabilities {
            supports_torch: true,
            supports_zoom: true,
            supports_focus: true,
            max_zoom: Some(5.0),
        }
    }

    fn set_torch(&mut self, enabled: bool) -> Result<(), ScanError> {
        *self.inner.torch.lock().expect("lock poisoned") = enabled;
        Ok(())
    }

    fn set_zoom(&mut self, level: f32) -> Result<(), ScanError> {
        *self.inner.zoom.lock().expect("lock poisoned") = level;
        Ok(())
    }

    fn shutdown(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        self.inner.live_streams.fetch_sub(1, Ordering::SeqCst);
        self.inner.shutdown_count.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for FakeStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A scriptable decoder backend. Pops one scripted outcome per frame; an
/// empty script reads as "nothing found".
pub struct FakeDecoder {
    script: Mutex<VecDeque<Result<Option<ScanResult>, ScanError>>>,
    decode_count: AtomicUsize,
}

impl FakeDecoder {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            decode_count: AtomicUsize::new(0),
        }
    }

    pub fn queue(&self, outcome: Result<Option<ScanResult>, ScanError>) {
        self.script.lock().expect("lock poisoned").push_back(outcome);
    }

    pub fn decode_count(&self) -> usize {
        self.decode_count.load(Ordering::SeqCst)
    }
}

impl Default for FakeDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderBackend for FakeDecoder {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn initialize(&mut self) -> Result<(), ScanError> {
        Ok(())
    }

    fn capabilities(&self) -> ScannerCapabilities {
        ScannerCapabilities::for_formats(CanonicalFormat::ALL.to_vec(), false)
    }

    fn decode_frame(&self, _image: &GrayImage) -> Result<Option<ScanResult>, ScanError> {
        self.decode_count.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .expect("lock poisoned")
            .pop_front()
            .unwrap_or(Ok(None))
    }

    fn decode_image(&self, _path: &Path) -> Result<ScanResult, ScanError> {
        match self.script.lock().expect("lock poisoned").pop_front() {
            Some(Ok(Some(result))) => Ok(result),
            Some(Err(e)) => Err(e),
            _ => Err(ScanError::DecodeError(
                "No product barcode found in the image".to_string(),
            )),
        }
    }
}

/// Discards every presented frame.
pub struct NullSink;

impl FrameSink for NullSink {
    fn present(&mut self, _frame: &FrameData) {}
}

/// Records the dimensions of every presented frame.
#[derive(Clone, Default)]
pub struct CollectingSink {
    frames: Arc<Mutex<Vec<(u32, u32)>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presented(&self) -> Vec<(u32, u32)> {
        self.frames.lock().expect("lock poisoned").clone()
    }
}

impl FrameSink for CollectingSink {
    fn present(&mut self, frame: &FrameData) {
        self.frames
            .lock()
            .expect("lock poisoned")
            .push((frame.width, frame.height));
    }
}
