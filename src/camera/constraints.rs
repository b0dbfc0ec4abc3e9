//! Constraint-tier negotiation.
//!
//! Each tier of the acquisition cascade is one explicit request; the session
//! never silently downgrades. Failures at a constrained tier are expected
//! and drive the caller to the next tier.

use crate::config::CameraConfig;
use crate::types::ConstraintLevel;

/// A single stream request at one constraint tier.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub device_id: Option<String>,
    pub level: ConstraintLevel,
    /// Requested resolution; None means no format constraint at all.
    pub resolution: Option<[u32; 2]>,
    pub fps: u32,
    /// Request a fixed close-focus distance (barcodes are near-field).
    pub close_focus: bool,
    /// Request continuous auto-exposure and auto-white-balance.
    pub continuous_exposure: bool,
}

impl StreamRequest {
    /// Build the request for one tier of the cascade.
    pub fn for_tier(
        device_id: Option<&str>,
        level: ConstraintLevel,
        config: &CameraConfig,
    ) -> Self {
        let device_id = device_id.map(str::to_string);
        match level {
            ConstraintLevel::Optimal => Self {
                device_id,
                level,
                resolution: Some(config.optimal_resolution),
                fps: config.fps,
                close_focus: true,
                continuous_exposure: true,
            },
            ConstraintLevel::Basic => Self {
                device_id,
                level,
                resolution: Some(config.basic_resolution),
                fps: config.fps,
                close_focus: false,
                continuous_exposure: false,
            },
            ConstraintLevel::Minimal => Self {
                device_id,
                level,
                resolution: None,
                fps: config.fps,
                close_focus: false,
                continuous_exposure: false,
            },
        }
    }

    /// A throwaway request used for permission probing and label unlocking.
    pub fn probe(device_id: Option<&str>) -> Self {
        Self {
            device_id: device_id.map(str::to_string),
            level: ConstraintLevel::Minimal,
            resolution: None,
            fps: 30,
            close_focus: false,
            continuous_exposure: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanstreamConfig;

    #[test]
    fn test_optimal_tier_carries_all_constraints() {
        let config = ScanstreamConfig::default();
        let request = StreamRequest::for_tier(Some("1"), ConstraintLevel::Optimal, &config.camera);
        assert_eq!(request.resolution, Some([1920, 1080]));
        assert!(request.close_focus);
        assert!(request.continuous_exposure);
        assert_eq!(request.device_id.as_deref(), Some("1"));
    }

    #[test]
    fn test_minimal_tier_is_unconstrained() {
        let config = ScanstreamConfig::default();
        let request = StreamRequest::for_tier(None, ConstraintLevel::Minimal, &config.camera);
        assert!(request.resolution.is_none());
        assert!(!request.close_focus);
        assert!(!request.continuous_exposure);
    }
}
