use thiserror::Error;

/// Errors surfaced by the capture-and-decode pipeline.
///
/// Per-frame "nothing found" outcomes are not errors; decoders return
/// `Ok(None)` for those. Validation failures are `ValidationResult` values,
/// not errors.
#[derive(Debug, Clone, Error)]
pub enum ScanError {
    #[error("Camera permission denied: {0}")]
    PermissionDenied(String),

    #[error("Camera acquisition error: {0}")]
    AcquisitionError(String),

    /// The requested constraint tier could not be satisfied. Expected during
    /// the acquisition cascade; the caller moves on to the next tier.
    #[error("Requested camera constraints not satisfiable: {0}")]
    Overconstrained(String),

    #[error("Camera device not found: {0}")]
    DeviceNotFound(String),

    #[error("Camera device busy or unreadable: {0}")]
    DeviceInUse(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Camera control not supported: {0}")]
    ControlNotSupported(String),

    #[error("Invalid scanner state: {0}")]
    InvalidState(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ScanError {
    /// Whether the failure should drive the acquisition cascade to the next
    /// constraint tier rather than aborting the start attempt.
    pub fn is_tier_recoverable(&self) -> bool {
        matches!(self, ScanError::Overconstrained(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_detail() {
        let err = ScanError::PermissionDenied("blocked by system settings".to_string());
        assert!(err.to_string().contains("Camera permission denied"));
        assert!(err.to_string().contains("blocked by system settings"));
    }

    #[test]
    fn test_tier_recoverable() {
        assert!(ScanError::Overconstrained("1080p".to_string()).is_tier_recoverable());
        assert!(!ScanError::DeviceNotFound("0".to_string()).is_tier_recoverable());
        assert!(!ScanError::PermissionDenied("no".to_string()).is_tier_recoverable());
    }
}
