//! The stream-owning camera session.
//!
//! A session turns a device preference into a live stream, one constraint
//! tier per `acquire` call. The stream is exclusively owned from acquisition
//! until `release`, which stops every track; a stream is never left open.

use crate::camera::backend::{CaptureBackend, CaptureStream};
use crate::camera::constraints::StreamRequest;
use crate::config::CameraConfig;
use crate::errors::ScanError;
use crate::permissions;
use crate::types::{
    CameraDeviceInfo, CameraPermissionStatus, ConstraintLevel, FrameData, PermissionState,
    StreamCapabilities,
};
use std::sync::Arc;

/// Device labels matching this list (case-insensitive) are preferred when no
/// explicit device is configured; rear-facing cameras scan barcodes best.
const PREFERRED_LABEL_HINTS: [&str; 4] = ["back", "rear", "environment", "main"];

pub struct CameraSession {
    backend: Arc<dyn CaptureBackend>,
    config: CameraConfig,
    stream: Option<Box<dyn CaptureStream>>,
}

impl CameraSession {
    pub fn new(backend: Arc<dyn CaptureBackend>, config: CameraConfig) -> Self {
        Self {
            backend,
            config,
            stream: None,
        }
    }

    /// Probe camera permission. Uses the platform query where one exists; an
    /// undetermined answer falls back to requesting a throwaway stream and
    /// immediately releasing it, translating not-allowed errors to denied.
    pub fn check_permission(&self) -> CameraPermissionStatus {
        let status = permissions::check_permission();
        if status.state != PermissionState::Prompting {
            return status;
        }

        match self.backend.open(&StreamRequest::probe(None)) {
            Ok(mut stream) => {
                stream.shutdown();
                CameraPermissionStatus::granted()
            }
            Err(ScanError::PermissionDenied(detail)) => CameraPermissionStatus::denied(detail),
            Err(ScanError::DeviceInUse(detail)) if detail.to_ascii_lowercase().contains("access") =>
            {
                CameraPermissionStatus::denied(detail)
            }
            Err(e) => CameraPermissionStatus::prompting(format!(
                "Could not determine permission: {}",
                e
            )),
        }
    }

    /// Acquire a stream at exactly one constraint tier. The session does not
    /// downgrade on failure; the caller walks the cascade so each tier's
    /// failure is logged distinctly.
    pub fn acquire(
        &mut self,
        device_id: Option<&str>,
        level: ConstraintLevel,
    ) -> Result<(), ScanError> {
        if self.stream.is_some() {
            log::warn!("Acquire with a stream already held; releasing previous stream");
            self.release();
        }

        let request = StreamRequest::for_tier(device_id, level, &self.config);
        let stream = self.backend.open(&request)?;
        log::debug!(
            "Acquired stream from device {} at tier {}",
            stream.device_id(),
            level
        );
        self.stream = Some(stream);
        Ok(())
    }

    /// List video-input devices. When every label is empty (common before the
    /// first permission grant), a throwaway stream is opened purely to unlock
    /// labels, then enumeration runs again.
    pub fn enumerate_devices(&self) -> Result<Vec<CameraDeviceInfo>, ScanError> {
        let devices = self.backend.enumerate()?;
        if devices.is_empty() || devices.iter().any(|d| !d.label.is_empty()) {
            return Ok(devices);
        }

        log::debug!("Device labels empty; opening throwaway stream to unlock them");
        match self.backend.open(&StreamRequest::probe(None)) {
            Ok(mut stream) => stream.shutdown(),
            Err(e) => log::debug!("Label-unlock probe failed: {}", e),
        }
        self.backend.enumerate()
    }

    /// Choose the device to scan with: any label matching the rear-facing
    /// heuristic wins, otherwise the first device.
    pub fn select_preferred_device<'d>(
        &self,
        devices: &'d [CameraDeviceInfo],
    ) -> Option<&'d CameraDeviceInfo> {
        devices
            .iter()
            .find(|d| {
                let label = d.label.to_ascii_lowercase();
                PREFERRED_LABEL_HINTS.iter().any(|hint| label.contains(hint))
            })
            .or_else(|| devices.first())
    }

    /// Stop every track of the current stream and clear it. Idempotent:
    /// calling with no active stream is a no-op.
    pub fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown();
            log::debug!("Camera stream released");
        }
    }

    pub fn has_active_stream(&self) -> bool {
        self.stream.is_some()
    }

    pub fn active_device_id(&self) -> Option<String> {
        self.stream.as_ref().map(|s| s.device_id().to_string())
    }

    pub fn read_frame(&mut self) -> Result<FrameData, ScanError> {
        match self.stream.as_mut() {
            Some(stream) => stream.read_frame(),
            None => Err(ScanError::InvalidState("No active camera stream".to_string())),
        }
    }

    pub fn stream_capabilities(&self) -> Option<StreamCapabilities> {
        self.stream.as_ref().map(|s| s.capabilities())
    }

    /// Apply a torch request, only if the track advertises the capability.
    pub fn set_torch(&mut self, enabled: bool) -> Result<(), ScanError> {
        match self.stream.as_mut() {
            Some(stream) => {
                if !stream.capabilities().supports_torch {
                    return Err(ScanError::ControlNotSupported(
                        "Torch is not supported by the active camera".to_string(),
                    ));
                }
                stream.set_torch(enabled)
            }
            None => Err(ScanError::InvalidState("No active camera stream".to_string())),
        }
    }

    /// Apply a zoom request, only if the track advertises the capability.
    pub fn set_zoom(&mut self, level: f32) -> Result<(), ScanError> {
        match self.stream.as_mut() {
            Some(stream) => {
                if !stream.capabilities().supports_zoom {
                    return Err(ScanError::ControlNotSupported(
                        "Zoom is not supported by the active camera".to_string(),
                    ));
                }
                stream.set_zoom(level)
            }
            None => Err(ScanError::InvalidState("No active camera stream".to_string())),
        }
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.release();
    }
}
