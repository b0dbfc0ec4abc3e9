use scanstream::camera::CameraSession;
use scanstream::config::ScanstreamConfig;
use scanstream::testing::FakeCaptureBackend;
use scanstream::types::{CameraDeviceInfo, ConstraintLevel};
use scanstream::ScanError;
use std::sync::Arc;

fn session_over(backend: &FakeCaptureBackend) -> CameraSession {
    CameraSession::new(
        Arc::new(backend.clone()),
        ScanstreamConfig::default().camera,
    )
}

#[test]
fn test_cascade_failure_leaves_no_leaked_stream() {
    let backend = FakeCaptureBackend::new();
    backend.fail_tier(ConstraintLevel::Optimal);
    let mut session = session_over(&backend);

    let optimal = session.acquire(Some("0"), ConstraintLevel::Optimal);
    assert!(matches!(optimal, Err(ScanError::Overconstrained(_))));
    assert!(!session.has_active_stream());

    session
        .acquire(Some("0"), ConstraintLevel::Basic)
        .expect("basic tier succeeds");
    assert!(session.has_active_stream());

    // Exactly one stream is live after the failed optimal attempt.
    assert_eq!(backend.live_streams(), 1);
    assert_eq!(backend.open_count(), 1);
}

#[test]
fn test_release_is_idempotent() {
    let backend = FakeCaptureBackend::new();
    let mut session = session_over(&backend);

    session
        .acquire(None, ConstraintLevel::Minimal)
        .expect("acquire succeeds");
    assert_eq!(backend.live_streams(), 1);

    session.release();
    session.release();

    assert_eq!(backend.live_streams(), 0);
    // The track was stopped exactly once.
    assert_eq!(backend.shutdown_count(), 1);
}

#[test]
fn test_reacquire_replaces_stream_exclusively() {
    let backend = FakeCaptureBackend::new();
    let mut session = session_over(&backend);

    session.acquire(Some("0"), ConstraintLevel::Minimal).unwrap();
    session.acquire(Some("1"), ConstraintLevel::Minimal).unwrap();

    assert_eq!(backend.open_count(), 2);
    assert_eq!(backend.live_streams(), 1);
    assert_eq!(session.active_device_id().as_deref(), Some("1"));
}

#[test]
fn test_drop_releases_stream() {
    let backend = FakeCaptureBackend::new();
    {
        let mut session = session_over(&backend);
        session.acquire(None, ConstraintLevel::Minimal).unwrap();
        assert_eq!(backend.live_streams(), 1);
    }
    assert_eq!(backend.live_streams(), 0);
}

#[test]
fn test_preferred_device_heuristic() {
    let backend = FakeCaptureBackend::new();
    let session = session_over(&backend);

    let devices = vec![
        CameraDeviceInfo::new("0".to_string(), "FaceTime HD Camera".to_string()),
        CameraDeviceInfo::new("1".to_string(), "USB REAR camera".to_string()),
    ];
    let picked = session.select_preferred_device(&devices).unwrap();
    assert_eq!(picked.id, "1");

    let unlabeled = vec![
        CameraDeviceInfo::new("5".to_string(), "Camera A".to_string()),
        CameraDeviceInfo::new("6".to_string(), "Camera B".to_string()),
    ];
    let fallback = session.select_preferred_device(&unlabeled).unwrap();
    assert_eq!(fallback.id, "5");

    assert!(session.select_preferred_device(&[]).is_none());
}

#[test]
fn test_controls_reach_the_stream() {
    let backend = FakeCaptureBackend::new();
    let mut session = session_over(&backend);
    session.acquire(None, ConstraintLevel::Minimal).unwrap();

    session.set_torch(true).expect("fake stream supports torch");
    assert!(backend.torch_state());

    session.set_zoom(2.5).expect("fake stream supports zoom");
    assert_eq!(backend.zoom_state(), 2.5);
}

#[test]
fn test_controls_without_stream_are_invalid_state() {
    let backend = FakeCaptureBackend::new();
    let mut session = session_over(&backend);
    assert!(matches!(
        session.set_torch(true),
        Err(ScanError::InvalidState(_))
    ));
    assert!(matches!(
        session.set_zoom(2.0),
        Err(ScanError::InvalidState(_))
    ));
}

#[test]
fn test_enumerate_lists_backend_devices() {
    let backend = FakeCaptureBackend::new();
    let session = session_over(&backend);
    let devices = session.enumerate_devices().unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].id, "0");
}

#[test]
fn test_enumerate_unlocks_empty_labels_via_probe() {
    let backend = FakeCaptureBackend::new();
    backend.set_devices(vec![
        CameraDeviceInfo::new("0".to_string(), String::new()),
        CameraDeviceInfo::new("1".to_string(), String::new()),
    ]);
    let session = session_over(&backend);

    let devices = session.enumerate_devices().unwrap();
    assert_eq!(devices.len(), 2);
    // The throwaway probe stream was opened and fully released.
    assert_eq!(backend.open_count(), 1);
    assert_eq!(backend.live_streams(), 0);
}
