//! Core data types shared across the capture pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The product-barcode format vocabulary exposed outside the capture
/// pipeline. This is the only format enumeration collaborators ever see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalFormat {
    Ean13,
    Ean8,
    UpcA,
    Code128,
}

impl CanonicalFormat {
    pub const ALL: [CanonicalFormat; 4] = [
        CanonicalFormat::Ean13,
        CanonicalFormat::Ean8,
        CanonicalFormat::UpcA,
        CanonicalFormat::Code128,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalFormat::Ean13 => "EAN-13",
            CanonicalFormat::Ean8 => "EAN-8",
            CanonicalFormat::UpcA => "UPC-A",
            CanonicalFormat::Code128 => "Code-128",
        }
    }
}

impl std::fmt::Display for CanonicalFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Axis-aligned bounding rectangle of a detected code, in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A single detection corner, in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CornerPoint {
    pub x: f32,
    pub y: f32,
}

/// One successful decode. Produced once per detection, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub text: String,
    pub format: CanonicalFormat,
    pub timestamp: DateTime<Utc>,
    pub confidence: Option<f32>,
    pub bounding_box: Option<BoundingBox>,
    pub corner_points: Option<Vec<CornerPoint>>,
}

impl ScanResult {
    pub fn new(text: String, format: CanonicalFormat) -> Self {
        Self {
            text,
            format,
            timestamp: Utc::now(),
            confidence: None,
            bounding_box: None,
            corner_points: None,
        }
    }

    pub fn with_corner_points(mut self, points: Vec<CornerPoint>) -> Self {
        self.bounding_box = bounding_box_of(&points);
        self.corner_points = Some(points);
        self
    }
}

fn bounding_box_of(points: &[CornerPoint]) -> Option<BoundingBox> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(BoundingBox {
        x: min_x,
        y: min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    })
}

/// One level of the camera-acquisition fallback cascade. Tried in descending
/// order; acquisition ends at the first success or exhaustion of all tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintLevel {
    /// High resolution, fixed close-focus distance, continuous exposure and
    /// white balance.
    Optimal,
    /// Mid resolution, no focus or exposure requests.
    Basic,
    /// No constraints beyond device selection.
    Minimal,
}

impl ConstraintLevel {
    pub const CASCADE: [ConstraintLevel; 3] = [
        ConstraintLevel::Optimal,
        ConstraintLevel::Basic,
        ConstraintLevel::Minimal,
    ];
}

impl std::fmt::Display for ConstraintLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstraintLevel::Optimal => write!(f, "optimal"),
            ConstraintLevel::Basic => write!(f, "basic"),
            ConstraintLevel::Minimal => write!(f, "minimal"),
        }
    }
}

/// Outcome of a camera permission probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionState {
    Granted,
    Denied,
    /// Not yet determined; the platform will prompt on first acquisition.
    Prompting,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraPermissionStatus {
    pub state: PermissionState,
    /// Human-readable detail, remediation-oriented when denied.
    pub detail: Option<String>,
}

impl CameraPermissionStatus {
    pub fn granted() -> Self {
        Self {
            state: PermissionState::Granted,
            detail: None,
        }
    }

    pub fn denied(detail: impl Into<String>) -> Self {
        Self {
            state: PermissionState::Denied,
            detail: Some(detail.into()),
        }
    }

    pub fn prompting(detail: impl Into<String>) -> Self {
        Self {
            state: PermissionState::Prompting,
            detail: Some(detail.into()),
        }
    }
}

/// A video-input device as reported by enumeration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraDeviceInfo {
    pub id: String,
    pub label: String,
    pub description: String,
}

impl CameraDeviceInfo {
    pub fn new(id: String, label: String) -> Self {
        Self {
            id,
            label,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: String) -> Self {
        self.description = description;
        self
    }
}

/// Control capabilities advertised by an active camera stream.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StreamCapabilities {
    pub supports_torch: bool,
    pub supports_zoom: bool,
    pub supports_focus: bool,
    pub max_zoom: Option<f32>,
}

/// Merged capability report for UI feedback. Decoder-side fields are fixed
/// once the backend is initialized; control fields track the active stream
/// and read false/None while no stream is held.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerCapabilities {
    pub supported_formats: Vec<CanonicalFormat>,
    pub supports_flashlight: bool,
    pub supports_zoom: bool,
    pub supports_focus: bool,
    pub max_zoom: Option<f32>,
    pub supports_continuous: bool,
}

impl ScannerCapabilities {
    pub fn for_formats(formats: Vec<CanonicalFormat>, supports_continuous: bool) -> Self {
        Self {
            supported_formats: formats,
            supports_flashlight: false,
            supports_zoom: false,
            supports_focus: false,
            max_zoom: None,
            supports_continuous,
        }
    }

    pub fn merge_stream(&mut self, caps: &StreamCapabilities) {
        self.supports_flashlight = caps.supports_torch;
        self.supports_zoom = caps.supports_zoom;
        self.supports_focus = caps.supports_focus;
        self.max_zoom = caps.max_zoom;
    }
}

/// A captured frame in RGB8 with pipeline metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameData {
    pub id: Uuid,
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
}

impl FrameData {
    pub fn new(data: Vec<u8>, width: u32, height: u32, device_id: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            data,
            width,
            height,
            device_id,
            timestamp: Utc::now(),
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_format_names() {
        assert_eq!(CanonicalFormat::Ean13.as_str(), "EAN-13");
        assert_eq!(CanonicalFormat::Code128.to_string(), "Code-128");
        assert_eq!(CanonicalFormat::ALL.len(), 4);
    }

    #[test]
    fn test_cascade_order() {
        assert_eq!(ConstraintLevel::CASCADE[0], ConstraintLevel::Optimal);
        assert_eq!(ConstraintLevel::CASCADE[2], ConstraintLevel::Minimal);
    }

    #[test]
    fn test_scan_result_bounding_box_from_corners() {
        let result = ScanResult::new("4006381333931".to_string(), CanonicalFormat::Ean13)
            .with_corner_points(vec![
                CornerPoint { x: 10.0, y: 20.0 },
                CornerPoint { x: 110.0, y: 20.0 },
                CornerPoint { x: 110.0, y: 60.0 },
                CornerPoint { x: 10.0, y: 60.0 },
            ]);
        let bbox = result.bounding_box.unwrap();
        assert_eq!(bbox.x, 10.0);
        assert_eq!(bbox.y, 20.0);
        assert_eq!(bbox.width, 100.0);
        assert_eq!(bbox.height, 40.0);
    }

    #[test]
    fn test_frame_data_metadata() {
        let frame = FrameData::new(vec![0u8; 12], 2, 2, "0".to_string());
        assert_eq!(frame.size_bytes(), 12);
        assert_eq!(frame.width, 2);
    }
}
