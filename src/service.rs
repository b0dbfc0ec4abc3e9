//! The scanner orchestrator: wires the camera session, frame sampler, and
//! decoder backend together behind a small state machine.
//!
//! Every asynchronous continuation carries the epoch current when it was
//! started and re-checks it before touching shared state; a continuation
//! whose epoch has advanced discards its outcome silently. This is what
//! keeps a slow, stale acquisition from clobbering a session that was
//! stopped and restarted in the interim.

use crate::camera::backend::CaptureBackend;
use crate::camera::session::CameraSession;
use crate::config::ScanstreamConfig;
use crate::decoder::{select_backend, DecoderBackend};
use crate::errors::ScanError;
use crate::sampler::{enhance, FrameSampler};
use crate::symbology::{validate, DetectedFormat};
use crate::types::{
    CameraPermissionStatus, CanonicalFormat, ConstraintLevel, FrameData, ScanResult,
    ScannerCapabilities,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Where preview frames go. Stands in for the caller's video surface; the
/// active session is the only writer.
pub trait FrameSink: Send {
    fn present(&mut self, frame: &FrameData);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScannerState {
    Uninitialized,
    Initializing,
    Idle,
    Scanning,
    Error,
    Disposed,
}

pub type ResultCallback = Arc<dyn Fn(ScanResult) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(ScanError) + Send + Sync>;

pub struct ScannerService {
    config: ScanstreamConfig,
    state: ScannerState,
    epoch: Arc<AtomicU64>,
    session: Arc<Mutex<CameraSession>>,
    decoder: Option<Arc<dyn DecoderBackend>>,
    capabilities: Option<ScannerCapabilities>,
    permission: Option<CameraPermissionStatus>,
    on_result: ResultCallback,
    on_error: ErrorCallback,
    loop_task: Option<tokio::task::JoinHandle<()>>,
    torch_on: bool,
}

impl ScannerService {
    pub fn new(backend: Arc<dyn CaptureBackend>, config: ScanstreamConfig) -> Self {
        let session = CameraSession::new(backend, config.camera.clone());
        Self {
            config,
            state: ScannerState::Uninitialized,
            epoch: Arc::new(AtomicU64::new(0)),
            session: Arc::new(Mutex::new(session)),
            decoder: None,
            capabilities: None,
            permission: None,
            on_result: Arc::new(|result| {
                log::info!("Scan result: {} ({})", result.text, result.format)
            }),
            on_error: Arc::new(|error| log::warn!("Scan error: {}", error)),
            loop_task: None,
            torch_on: false,
        }
    }

    /// Inject a specific decoder backend instead of running factory
    /// selection at initialization.
    pub fn with_decoder(mut self, decoder: Arc<dyn DecoderBackend>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn on_result<F>(&mut self, callback: F)
    where
        F: Fn(ScanResult) + Send + Sync + 'static,
    {
        self.on_result = Arc::new(callback);
    }

    pub fn on_error<F>(&mut self, callback: F)
    where
        F: Fn(ScanError) + Send + Sync + 'static,
    {
        self.on_error = Arc::new(callback);
    }

    pub fn state(&self) -> ScannerState {
        self.state
    }

    pub fn capabilities(&self) -> Option<ScannerCapabilities> {
        self.capabilities.clone()
    }

    pub fn permission(&self) -> Option<CameraPermissionStatus> {
        self.permission.clone()
    }

    /// Select the decoder backend and probe camera permission. Does not yet
    /// acquire a stream.
    pub async fn initialize(&mut self) -> Result<(), ScanError> {
        match self.state {
            ScannerState::Uninitialized | ScannerState::Initializing | ScannerState::Error => {}
            ScannerState::Idle | ScannerState::Scanning => return Ok(()),
            ScannerState::Disposed => {
                return Err(ScanError::InvalidState(
                    "Scanner has been disposed".to_string(),
                ))
            }
        }
        self.state = ScannerState::Initializing;

        if self.decoder.is_none() {
            self.decoder = Some(select_backend(&self.config.decoder)?);
        }
        let decoder = self.decoder.as_ref().expect("decoder just selected");
        self.capabilities = Some(decoder.capabilities());

        let session = self.session.clone();
        let permission = tokio::task::spawn_blocking(move || {
            session.lock().expect("lock poisoned").check_permission()
        })
        .await
        .map_err(|e| ScanError::AcquisitionError(format!("Permission probe failed: {}", e)))?;

        if crate::permissions::is_denied(&permission) {
            log::warn!(
                "Camera permission denied: {}",
                permission.detail.as_deref().unwrap_or("no detail")
            );
        }
        self.permission = Some(permission);

        self.state = ScannerState::Idle;
        log::info!("Scanner initialized with {} backend", decoder.name());
        Ok(())
    }

    /// Acquire a camera stream through the constraint cascade, attach it to
    /// the sink, and start surfacing results. Calling while already scanning
    /// logs and does nothing.
    pub async fn start(&mut self, mut sink: Box<dyn FrameSink>) -> Result<(), ScanError> {
        match self.state {
            ScannerState::Scanning => {
                log::warn!("start() called while already scanning; ignoring");
                return Ok(());
            }
            ScannerState::Idle | ScannerState::Error => {}
            _ => {
                return Err(ScanError::InvalidState(
                    "Scanner must be initialized before starting".to_string(),
                ))
            }
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        let decoder = self
            .decoder
            .clone()
            .ok_or_else(|| ScanError::InvalidState("No decoder backend".to_string()))?;

        // Pick the device: explicit preference, else the rear-facing label
        // heuristic over enumerated devices.
        let device = match self.config.camera.preferred_device.clone() {
            Some(id) => Some(id),
            None => {
                let session = self.session.clone();
                tokio::task::spawn_blocking(move || {
                    let session = session.lock().expect("lock poisoned");
                    session.enumerate_devices().ok().and_then(|devices| {
                        session
                            .select_preferred_device(&devices)
                            .map(|d| d.id.clone())
                    })
                })
                .await
                .map_err(|e| ScanError::AcquisitionError(format!("Enumeration failed: {}", e)))?
            }
        };

        if self.is_stale(epoch) {
            self.release_quietly().await;
            return Ok(());
        }

        // Walk the constraint cascade. Each tier is a distinct acquisition
        // call; only device-level failures abort early.
        let session = self.session.clone();
        let cascade_device = device.clone();
        let cascade_epoch = self.epoch.clone();
        let acquired = tokio::task::spawn_blocking(move || {
            run_cascade(&session, cascade_device.as_deref(), &cascade_epoch, epoch)
        })
        .await
        .map_err(|e| ScanError::AcquisitionError(format!("Acquisition task failed: {}", e)))?;

        match acquired {
            Ok(Some(level)) => log::info!("Camera acquired at constraint tier {}", level),
            // Superseded while acquiring; the stream was already released.
            Ok(None) => return Ok(()),
            Err(e) => {
                self.state = ScannerState::Error;
                (self.on_error)(e.clone());
                return Err(e);
            }
        }

        if self.is_stale(epoch) {
            self.release_quietly().await;
            return Ok(());
        }

        // Bounded wait for video readiness: the first readable frame must
        // arrive within the configured timeout or the start attempt is fatal.
        let readiness = Duration::from_secs(self.config.camera.readiness_timeout_secs);
        let session = self.session.clone();
        let first_frame = tokio::time::timeout(
            readiness,
            tokio::task::spawn_blocking(move || {
                session.lock().expect("lock poisoned").read_frame()
            }),
        )
        .await;

        let frame = match first_frame {
            Err(_) => {
                self.release_quietly().await;
                self.state = ScannerState::Error;
                let err = ScanError::Timeout(format!(
                    "Video not ready within {}s of stream attachment",
                    self.config.camera.readiness_timeout_secs
                ));
                (self.on_error)(err.clone());
                return Err(err);
            }
            Ok(Err(e)) => {
                self.release_quietly().await;
                self.state = ScannerState::Error;
                return Err(ScanError::AcquisitionError(format!(
                    "Readiness task failed: {}",
                    e
                )));
            }
            Ok(Ok(Err(e))) => {
                self.release_quietly().await;
                self.state = ScannerState::Error;
                (self.on_error)(e.clone());
                return Err(e);
            }
            Ok(Ok(Ok(frame))) => frame,
        };

        if self.is_stale(epoch) {
            self.release_quietly().await;
            return Ok(());
        }

        sink.present(&frame);

        if let Some(caps) = self.capabilities.as_mut() {
            if let Some(stream_caps) = self.session.lock().expect("lock poisoned").stream_capabilities() {
                caps.merge_stream(&stream_caps);
            }
        }

        self.torch_on = false;
        self.state = ScannerState::Scanning;

        let continuous =
            decoder.supports_continuous() && self.config.decoder.use_continuous_when_available;
        let context = LoopContext {
            session: self.session.clone(),
            decoder,
            epoch: self.epoch.clone(),
            my_epoch: epoch,
            on_result: self.on_result.clone(),
            on_error: self.on_error.clone(),
            config: self.config.clone(),
            continuous,
            sink,
        };
        self.loop_task = Some(tokio::spawn(run_scan_loop(context)));
        Ok(())
    }

    /// Stop scanning: end the sampling loop, reset torch and zoom, release
    /// the stream. Idempotent; also clears any stream a cancelled start
    /// attempt may have left behind.
    pub async fn stop(&mut self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.loop_task.take() {
            task.abort();
        }

        let session = self.session.clone();
        let _ = tokio::task::spawn_blocking(move || {
            let mut session = session.lock().expect("lock poisoned");
            if session.has_active_stream() {
                if let Err(e) = session.set_torch(false) {
                    log::debug!("Torch reset skipped: {}", e);
                }
                if let Err(e) = session.set_zoom(1.0) {
                    log::debug!("Zoom reset skipped: {}", e);
                }
            }
            session.release();
        })
        .await;

        self.torch_on = false;
        if self.state != ScannerState::Disposed && self.state != ScannerState::Uninitialized {
            self.state = ScannerState::Idle;
        }
    }

    /// Release every resource. Terminal: no further transitions are valid.
    pub async fn dispose(&mut self) {
        self.stop().await;
        self.state = ScannerState::Disposed;
        self.decoder = None;
        log::debug!("Scanner disposed");
    }

    /// One-shot decode from a user-supplied picture file.
    pub async fn scan_from_image(&self, path: &Path) -> Result<ScanResult, ScanError> {
        match self.state {
            ScannerState::Idle | ScannerState::Scanning | ScannerState::Error => {}
            _ => {
                return Err(ScanError::InvalidState(
                    "Scanner must be initialized before decoding images".to_string(),
                ))
            }
        }
        let decoder = self
            .decoder
            .clone()
            .ok_or_else(|| ScanError::InvalidState("No decoder backend".to_string()))?;

        let path = path.to_path_buf();
        let result = tokio::task::spawn_blocking(move || decoder.decode_image(&path))
            .await
            .map_err(|e| ScanError::DecodeError(format!("Decode task failed: {}", e)))??;

        match confirm_checksum(&result) {
            Ok(()) => Ok(result),
            Err(reason) => Err(ScanError::DecodeError(reason)),
        }
    }

    /// Switch to the next enumerated camera. Valid only while scanning; the
    /// sampling loop keeps running across the swap.
    pub async fn switch_camera(&mut self) -> Result<(), ScanError> {
        if self.state != ScannerState::Scanning {
            return Err(ScanError::InvalidState(
                "Camera switching is only available while scanning".to_string(),
            ));
        }

        let session = self.session.clone();
        let switch_epoch = self.epoch.clone();
        let my_epoch = self.epoch.load(Ordering::SeqCst);
        let outcome = tokio::task::spawn_blocking(move || -> Result<String, ScanError> {
            let next = {
                let guard = session.lock().expect("lock poisoned");
                let devices = guard.enumerate_devices()?;
                if devices.len() < 2 {
                    // Leave the current stream untouched.
                    return Err(ScanError::ControlNotSupported(
                        "No other camera to switch to".to_string(),
                    ));
                }
                let current = guard.active_device_id();
                let position = devices
                    .iter()
                    .position(|d| Some(&d.id) == current.as_ref())
                    .unwrap_or(0);
                devices[(position + 1) % devices.len()].id.clone()
            };
            run_cascade(&session, Some(next.as_str()), &switch_epoch, my_epoch)?;
            Ok(next)
        })
        .await
        .map_err(|e| ScanError::AcquisitionError(format!("Switch task failed: {}", e)))?;

        match outcome {
            Ok(device) => {
                log::info!("Switched to camera {}", device);
                self.torch_on = false;
                Ok(())
            }
            Err(e @ ScanError::ControlNotSupported(_)) => Err(e),
            Err(e) => {
                // The previous stream is gone; this is an acquisition failure.
                self.state = ScannerState::Error;
                (self.on_error)(e.clone());
                Err(e)
            }
        }
    }

    /// Toggle the torch. Valid only while scanning; unsupported hardware
    /// reports a non-fatal condition.
    pub async fn toggle_flashlight(&mut self) -> Result<bool, ScanError> {
        if self.state != ScannerState::Scanning {
            return Err(ScanError::InvalidState(
                "Flashlight is only available while scanning".to_string(),
            ));
        }
        let target = !self.torch_on;
        let session = self.session.clone();
        tokio::task::spawn_blocking(move || {
            session.lock().expect("lock poisoned").set_torch(target)
        })
        .await
        .map_err(|e| ScanError::ControlNotSupported(format!("Torch task failed: {}", e)))??;

        self.torch_on = target;
        Ok(target)
    }

    /// Set the zoom level. Valid only while scanning.
    pub async fn set_zoom(&mut self, level: f32) -> Result<(), ScanError> {
        if self.state != ScannerState::Scanning {
            return Err(ScanError::InvalidState(
                "Zoom is only available while scanning".to_string(),
            ));
        }
        let session = self.session.clone();
        tokio::task::spawn_blocking(move || {
            session.lock().expect("lock poisoned").set_zoom(level)
        })
        .await
        .map_err(|e| ScanError::ControlNotSupported(format!("Zoom task failed: {}", e)))?
    }

    fn is_stale(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) != epoch
    }

    async fn release_quietly(&self) {
        let session = self.session.clone();
        let _ = tokio::task::spawn_blocking(move || {
            session.lock().expect("lock poisoned").release();
        })
        .await;
    }
}

impl Drop for ScannerService {
    fn drop(&mut self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.loop_task.take() {
            task.abort();
        }
        if let Ok(mut session) = self.session.try_lock() {
            session.release();
        }
    }
}

/// Walk the constraint cascade for one device. Expected over-constrained
/// failures are logged per tier; only the final tier's failure is fatal.
///
/// The epoch is re-checked after a successful acquire while the session lock
/// is still held: a cascade that was superseded mid-flight releases its
/// freshly opened stream immediately and reports `Ok(None)`.
fn run_cascade(
    session: &Arc<Mutex<CameraSession>>,
    device: Option<&str>,
    epoch: &AtomicU64,
    my_epoch: u64,
) -> Result<Option<ConstraintLevel>, ScanError> {
    let mut session = session.lock().expect("lock poisoned");
    let mut last_error = None;
    for level in ConstraintLevel::CASCADE {
        match session.acquire(device, level) {
            Ok(()) => {
                if epoch.load(Ordering::SeqCst) != my_epoch {
                    session.release();
                    return Ok(None);
                }
                return Ok(Some(level));
            }
            Err(e) if e.is_tier_recoverable() => {
                log::debug!("Constraint tier {} unavailable: {}", level, e);
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_error
        .unwrap_or_else(|| ScanError::AcquisitionError("No constraint tier succeeded".to_string())))
}

/// A decoded result is surfaced only when its text is consistent with the
/// reported format's checksum rule. A failed check on a live frame is a
/// misread, not user input; it is dropped as noise.
fn confirm_checksum(result: &ScanResult) -> Result<(), String> {
    match result.format {
        // Code-128 carries a symbol-level checksum the decoder already
        // verified and stripped; there is nothing to re-check at text level.
        CanonicalFormat::Code128 => Ok(()),
        expected => {
            let validation = validate(&result.text);
            if !validation.valid {
                return Err(validation
                    .reason
                    .unwrap_or_else(|| "Checksum verification failed".to_string()));
            }
            let consistent = matches!(
                (expected, validation.format),
                (CanonicalFormat::Ean13, DetectedFormat::Ean13 | DetectedFormat::Isbn13)
                    | (CanonicalFormat::Ean8, DetectedFormat::Ean8)
                    | (CanonicalFormat::UpcA, DetectedFormat::UpcA)
            );
            if consistent {
                Ok(())
            } else {
                Err(format!(
                    "Format mismatch: decoder reported {} but text validates as {}",
                    expected, validation.format
                ))
            }
        }
    }
}

struct LoopContext {
    session: Arc<Mutex<CameraSession>>,
    decoder: Arc<dyn DecoderBackend>,
    epoch: Arc<AtomicU64>,
    my_epoch: u64,
    on_result: ResultCallback,
    on_error: ErrorCallback,
    config: ScanstreamConfig,
    continuous: bool,
    sink: Box<dyn FrameSink>,
}

/// The sampling loop. Ticks are strictly sequential: a tick's decode settles
/// before the next tick is considered. Every continuation re-checks the
/// epoch and exits silently once it is stale.
async fn run_scan_loop(mut ctx: LoopContext) {
    let mut sampler = FrameSampler::new(ctx.config.sampler.clone());
    let mut interval =
        tokio::time::interval(Duration::from_millis(ctx.config.sampler.tick_interval_ms));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        if ctx.epoch.load(Ordering::SeqCst) != ctx.my_epoch {
            break;
        }

        let session = ctx.session.clone();
        let frame = match tokio::task::spawn_blocking(move || {
            session.lock().expect("lock poisoned").read_frame()
        })
        .await
        {
            Ok(Ok(frame)) => frame,
            // The stream is mid-swap (camera switch); just poll again.
            Ok(Err(ScanError::InvalidState(_))) => continue,
            Ok(Err(e)) => {
                if ctx.epoch.load(Ordering::SeqCst) == ctx.my_epoch {
                    (ctx.on_error)(e);
                }
                continue;
            }
            Err(_) => break,
        };

        if ctx.epoch.load(Ordering::SeqCst) != ctx.my_epoch {
            break;
        }
        ctx.sink.present(&frame);

        let bitmap = if ctx.continuous {
            Some(enhance::enhance(&enhance::luma_roi(&frame, 1.0)))
        } else {
            sampler.process(&frame)
        };
        let Some(bitmap) = bitmap else { continue };

        let decoder = ctx.decoder.clone();
        let outcome =
            tokio::task::spawn_blocking(move || decoder.decode_frame(&bitmap)).await;

        if ctx.epoch.load(Ordering::SeqCst) != ctx.my_epoch {
            break;
        }
        match outcome {
            Ok(Ok(Some(result))) => match confirm_checksum(&result) {
                Ok(()) => (ctx.on_result)(result),
                Err(reason) => log::debug!("Dropping inconsistent read: {}", reason),
            },
            // Nothing in this frame; keep polling.
            Ok(Ok(None)) => {}
            // One bad frame does not tear the session down.
            Ok(Err(e)) => (ctx.on_error)(e),
            Err(_) => break,
        }
    }
    log::debug!("Scan loop for epoch {} ended", ctx.my_epoch);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn result(text: &str, format: CanonicalFormat) -> ScanResult {
        ScanResult {
            text: text.to_string(),
            format,
            timestamp: Utc::now(),
            confidence: None,
            bounding_box: None,
            corner_points: None,
        }
    }

    #[test]
    fn test_confirm_valid_ean13() {
        assert!(confirm_checksum(&result("4006381333931", CanonicalFormat::Ean13)).is_ok());
    }

    #[test]
    fn test_confirm_rejects_bad_checksum() {
        let err = confirm_checksum(&result("4006381333932", CanonicalFormat::Ean13)).unwrap_err();
        assert!(err.contains("Checksum mismatch"));
    }

    #[test]
    fn test_confirm_isbn_consistent_with_ean13() {
        assert!(confirm_checksum(&result("9781234567897", CanonicalFormat::Ean13)).is_ok());
    }

    #[test]
    fn test_confirm_rejects_format_mismatch() {
        let err = confirm_checksum(&result("12345670", CanonicalFormat::Ean13)).unwrap_err();
        assert!(err.contains("Format mismatch"));
    }

    #[test]
    fn test_code128_passes_untouched() {
        assert!(confirm_checksum(&result("GTIN-XYZ", CanonicalFormat::Code128)).is_ok());
    }
}
