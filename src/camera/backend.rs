//! Capture backend abstraction and the nokhwa production implementation.
//!
//! `CaptureBackend` stands in for the platform's media-capture capability;
//! `CaptureStream` is one exclusively-owned live stream. Tests substitute
//! the fakes in `crate::testing`.

use crate::camera::constraints::StreamRequest;
use crate::errors::ScanError;
use crate::types::{CameraDeviceInfo, ConstraintLevel, FrameData, StreamCapabilities};
use nokhwa::{
    pixel_format::RgbFormat,
    query,
    utils::{
        ApiBackend, CameraFormat, CameraIndex, ControlValueSetter, FrameFormat,
        KnownCameraControl, RequestedFormat, RequestedFormatType, Resolution,
    },
    Camera,
};

/// One live camera stream. Exclusively owned by a `CameraSession` from
/// acquisition until `shutdown`.
pub trait CaptureStream: Send {
    fn device_id(&self) -> &str;

    /// Blocking read of the next frame as RGB8.
    fn read_frame(&mut self) -> Result<FrameData, ScanError>;

    /// Control capabilities advertised by the underlying track. Queried once
    /// at open and cached; never re-probed per frame.
    fn capabilities(&self) -> StreamCapabilities;

    fn set_torch(&mut self, enabled: bool) -> Result<(), ScanError>;

    fn set_zoom(&mut self, level: f32) -> Result<(), ScanError>;

    /// Stop every underlying track. Infallible by contract: release errors
    /// are logged, never propagated.
    fn shutdown(&mut self);
}

/// Factory for streams plus device enumeration.
pub trait CaptureBackend: Send + Sync {
    fn enumerate(&self) -> Result<Vec<CameraDeviceInfo>, ScanError>;

    fn open(&self, request: &StreamRequest) -> Result<Box<dyn CaptureStream>, ScanError>;
}

/// Production backend over nokhwa's native capture APIs.
#[derive(Debug, Default)]
pub struct NokhwaBackend;

impl NokhwaBackend {
    pub fn new() -> Self {
        Self
    }
}

impl CaptureBackend for NokhwaBackend {
    fn enumerate(&self) -> Result<Vec<CameraDeviceInfo>, ScanError> {
        let cameras = query(ApiBackend::Auto)
            .map_err(|e| ScanError::AcquisitionError(format!("Failed to query cameras: {}", e)))?;

        let mut devices = Vec::new();
        for info in cameras {
            devices.push(
                CameraDeviceInfo::new(info.index().to_string(), info.human_name())
                    .with_description(info.description().to_string()),
            );
        }
        Ok(devices)
    }

    fn open(&self, request: &StreamRequest) -> Result<Box<dyn CaptureStream>, ScanError> {
        let device_id = request.device_id.clone().unwrap_or_else(|| "0".to_string());
        let index = device_id
            .parse::<u32>()
            .map_err(|_| ScanError::DeviceNotFound(format!("Invalid device ID: {}", device_id)))?;

        let requested = match request.resolution {
            // Constrained tiers ask for an exact format so an unsatisfiable
            // request fails here instead of silently degrading.
            Some([width, height]) => RequestedFormat::new::<RgbFormat>(RequestedFormatType::Exact(
                CameraFormat::new(
                    Resolution::new(width, height),
                    FrameFormat::MJPEG,
                    request.fps,
                ),
            )),
            None => RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
        };

        let mut camera = Camera::new(CameraIndex::Index(index), requested)
            .map_err(|e| classify_open_error(&e.to_string(), request.level))?;

        camera
            .open_stream()
            .map_err(|e| classify_open_error(&e.to_string(), request.level))?;

        if request.close_focus || request.continuous_exposure {
            apply_focus_hints(&mut camera, request);
        }

        let capabilities = probe_capabilities(&mut camera);
        log::info!(
            "Opened camera {} at tier {} ({:?})",
            device_id,
            request.level,
            camera.resolution()
        );

        Ok(Box::new(NokhwaStream {
            camera,
            device_id,
            capabilities,
            open: true,
        }))
    }
}

/// Map a nokhwa open failure onto the pipeline taxonomy. Device-level
/// failures are terminal at every tier; anything else at a constrained tier
/// is over-constrained and drives the cascade onward.
fn classify_open_error(message: &str, level: ConstraintLevel) -> ScanError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("not found") || lower.contains("no device") || lower.contains("no such") {
        ScanError::DeviceNotFound(format!(
            "Camera not found or disconnected - check the connection ({})",
            message
        ))
    } else if lower.contains("busy") || lower.contains("in use") || lower.contains("access") {
        ScanError::DeviceInUse(format!(
            "Camera is in use by another application - close it and retry ({})",
            message
        ))
    } else if level != ConstraintLevel::Minimal {
        ScanError::Overconstrained(format!("tier {}: {}", level, message))
    } else {
        ScanError::AcquisitionError(message.to_string())
    }
}

/// Best-effort application of the optimal tier's focus and exposure
/// requests. The tier's defining constraint is its resolution; missing
/// focus controls do not fail the acquisition.
fn apply_focus_hints(camera: &mut Camera, request: &StreamRequest) {
    if request.close_focus {
        if let Err(e) = camera.set_camera_control(
            KnownCameraControl::Focus,
            ControlValueSetter::Integer(0),
        ) {
            log::debug!("Close-focus request not honored: {}", e);
        }
    }
    if request.continuous_exposure {
        if let Err(e) = camera.set_camera_control(
            KnownCameraControl::Exposure,
            ControlValueSetter::Integer(1),
        ) {
            log::debug!("Continuous-exposure request not honored: {}", e);
        }
    }
}

fn probe_capabilities(camera: &mut Camera) -> StreamCapabilities {
    let mut caps = StreamCapabilities::default();
    match camera.camera_controls() {
        Ok(controls) => {
            for control in controls {
                match control.control() {
                    KnownCameraControl::Zoom => caps.supports_zoom = true,
                    KnownCameraControl::Focus => caps.supports_focus = true,
                    _ => {}
                }
            }
        }
        Err(e) => {
            log::debug!("Control enumeration failed, assuming none: {}", e);
        }
    }
    // No torch control is reachable through this capture path.
    caps.supports_torch = false;
    caps
}

struct NokhwaStream {
    camera: Camera,
    device_id: String,
    capabilities: StreamCapabilities,
    open: bool,
}

// The camera handle stays behind a single owner and is only ever driven
// from blocking sections; mirror the platform wrappers' Send opt-in.
unsafe impl Send for NokhwaStream {}

impl CaptureStream for NokhwaStream {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn read_frame(&mut self) -> Result<FrameData, ScanError> {
        let buffer = self
            .camera
            .frame()
            .map_err(|e| ScanError::DeviceInUse(format!("Failed to capture frame: {}", e)))?;

        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| ScanError::ImageError(format!("Failed to decode frame buffer: {}", e)))?;

        let width = decoded.width();
        let height = decoded.height();
        Ok(FrameData::new(
            decoded.into_raw(),
            width,
            height,
            self.device_id.clone(),
        ))
    }

    fn capabilities(&self) -> StreamCapabilities {
        self.capabilities
    }

    fn set_torch(&mut self, _enabled: bool) -> Result<(), ScanError> {
        // Torch is not reachable through this capture path on any platform
        // nokhwa serves; surface the standard non-fatal condition.
        Err(ScanError::ControlNotSupported(
            "Torch is not supported by this camera".to_string(),
        ))
    }

    fn set_zoom(&mut self, level: f32) -> Result<(), ScanError> {
        if !self.capabilities.supports_zoom {
            return Err(ScanError::ControlNotSupported(
                "Zoom is not supported by this camera".to_string(),
            ));
        }
        self.camera
            .set_camera_control(
                KnownCameraControl::Zoom,
                ControlValueSetter::Integer(level.round() as i64),
            )
            .map_err(|e| ScanError::ControlNotSupported(format!("Zoom rejected: {}", e)))
    }

    fn shutdown(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        if let Err(e) = self.camera.stop_stream() {
            log::warn!("Error stopping camera stream: {}", e);
        }
    }
}

impl Drop for NokhwaStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}
