use scanstream::config::ScanstreamConfig;
use scanstream::testing::{CollectingSink, FakeCaptureBackend, FakeDecoder, NullSink};
use scanstream::types::{CanonicalFormat, ScanResult};
use scanstream::{ScanError, ScannerService, ScannerState};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn fast_config() -> ScanstreamConfig {
    let mut config = ScanstreamConfig::default();
    config.sampler.tick_interval_ms = 20;
    config.camera.readiness_timeout_secs = 2;
    config
}

struct Harness {
    backend: FakeCaptureBackend,
    decoder: Arc<FakeDecoder>,
    service: ScannerService,
    results: Arc<Mutex<Vec<ScanResult>>>,
    errors: Arc<Mutex<Vec<ScanError>>>,
}

async fn harness() -> Harness {
    let backend = FakeCaptureBackend::new();
    let decoder = Arc::new(FakeDecoder::new());
    let mut service = ScannerService::new(Arc::new(backend.clone()), fast_config())
        .with_decoder(decoder.clone());

    let results = Arc::new(Mutex::new(Vec::new()));
    let errors = Arc::new(Mutex::new(Vec::new()));
    {
        let results = results.clone();
        service.on_result(move |r| results.lock().unwrap().push(r));
        let errors = errors.clone();
        service.on_error(move |e| errors.lock().unwrap().push(e));
    }

    service.initialize().await.expect("initialize succeeds");
    Harness {
        backend,
        decoder,
        service,
        results,
        errors,
    }
}

fn valid_result() -> ScanResult {
    ScanResult::new("4006381333931".to_string(), CanonicalFormat::Ean13)
}

#[tokio::test]
async fn test_initialize_reaches_idle_with_capabilities() {
    let h = harness().await;
    assert_eq!(h.service.state(), ScannerState::Idle);
    let caps = h.service.capabilities().expect("capabilities cached");
    assert_eq!(caps.supported_formats.len(), 4);
    assert!(h.service.permission().is_some());
}

#[tokio::test]
async fn test_pipeline_delivers_validated_results_and_keeps_scanning() {
    let mut h = harness().await;
    h.decoder.queue(Ok(Some(valid_result())));

    h.service.start(Box::new(NullSink)).await.expect("start");
    assert_eq!(h.service.state(), ScannerState::Scanning);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.results.lock().unwrap().len(), 1);
    // One scan does not stop the session; a later read is delivered too.
    assert_eq!(h.service.state(), ScannerState::Scanning);
    h.decoder.queue(Ok(Some(valid_result())));
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.results.lock().unwrap().len(), 2);

    h.service.stop().await;
    assert_eq!(h.service.state(), ScannerState::Idle);
    assert_eq!(h.backend.live_streams(), 0);
}

#[tokio::test]
async fn test_checksum_invalid_read_is_dropped_as_noise() {
    let mut h = harness().await;
    h.decoder.queue(Ok(Some(ScanResult::new(
        "4006381333932".to_string(),
        CanonicalFormat::Ean13,
    ))));

    h.service.start(Box::new(NullSink)).await.expect("start");
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(h.results.lock().unwrap().is_empty());
    assert!(h.errors.lock().unwrap().is_empty());
    assert!(h.decoder.decode_count() >= 1);
    h.service.stop().await;
}

#[tokio::test]
async fn test_decode_error_is_reported_but_scanning_continues() {
    let mut h = harness().await;
    h.decoder
        .queue(Err(ScanError::DecodeError("backend hiccup".to_string())));
    h.decoder.queue(Ok(Some(valid_result())));

    h.service.start(Box::new(NullSink)).await.expect("start");
    tokio::time::sleep(Duration::from_millis(250)).await;

    assert_eq!(h.errors.lock().unwrap().len(), 1);
    assert_eq!(h.results.lock().unwrap().len(), 1);
    assert_eq!(h.service.state(), ScannerState::Scanning);
    h.service.stop().await;
}

#[tokio::test]
async fn test_start_while_scanning_is_a_noop() {
    let mut h = harness().await;
    h.service.start(Box::new(NullSink)).await.expect("start");
    let opens_after_first = h.backend.open_count();

    h.service
        .start(Box::new(NullSink))
        .await
        .expect("re-entrant start is not an error");

    assert_eq!(h.backend.open_count(), opens_after_first);
    assert_eq!(h.backend.live_streams(), 1);
    h.service.stop().await;
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let mut h = harness().await;
    h.service.start(Box::new(NullSink)).await.expect("start");
    h.service.stop().await;
    h.service.stop().await;
    assert_eq!(h.service.state(), ScannerState::Idle);
    assert_eq!(h.backend.live_streams(), 0);
}

#[tokio::test]
async fn test_stop_start_race_never_leaves_two_streams() {
    let mut h = harness().await;
    h.backend.set_open_delay(Duration::from_millis(150));

    // Abandon a start attempt while its acquisition is still in flight.
    let _ = tokio::time::timeout(
        Duration::from_millis(30),
        h.service.start(Box::new(NullSink)),
    )
    .await;

    h.service.stop().await;
    h.backend.set_open_delay(Duration::from_millis(1));
    h.service.start(Box::new(NullSink)).await.expect("restart");

    // Give the abandoned acquisition time to finish and discard itself.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(h.backend.live_streams(), 1);
    assert_eq!(h.service.state(), ScannerState::Scanning);

    h.service.stop().await;
    assert_eq!(h.backend.live_streams(), 0);
}

#[tokio::test]
async fn test_controls_require_scanning_and_reset_on_stop() {
    let mut h = harness().await;
    assert!(matches!(
        h.service.toggle_flashlight().await,
        Err(ScanError::InvalidState(_))
    ));
    assert!(matches!(
        h.service.set_zoom(2.0).await,
        Err(ScanError::InvalidState(_))
    ));

    h.service.start(Box::new(NullSink)).await.expect("start");
    assert_eq!(h.service.toggle_flashlight().await.unwrap(), true);
    assert!(h.backend.torch_state());
    h.service.set_zoom(3.0).await.expect("zoom while scanning");
    assert_eq!(h.backend.zoom_state(), 3.0);

    h.service.stop().await;
    assert!(!h.backend.torch_state());
    assert_eq!(h.backend.zoom_state(), 1.0);
}

#[tokio::test]
async fn test_switch_camera_swaps_device_exclusively() {
    let mut h = harness().await;
    assert!(matches!(
        h.service.switch_camera().await,
        Err(ScanError::InvalidState(_))
    ));

    h.service.start(Box::new(NullSink)).await.expect("start");
    let before = h.backend.open_count();
    h.service.switch_camera().await.expect("switch");

    assert_eq!(h.backend.open_count(), before + 1);
    assert_eq!(h.backend.live_streams(), 1);
    assert_eq!(h.service.state(), ScannerState::Scanning);
    h.service.stop().await;
}

#[tokio::test]
async fn test_scan_from_image_validates_checksum() {
    let h = harness().await;

    h.decoder.queue(Ok(Some(valid_result())));
    let result = h
        .service
        .scan_from_image(Path::new("ignored.png"))
        .await
        .expect("valid image decodes");
    assert_eq!(result.text, "4006381333931");

    h.decoder.queue(Ok(Some(ScanResult::new(
        "4006381333932".to_string(),
        CanonicalFormat::Ean13,
    ))));
    let invalid = h.service.scan_from_image(Path::new("ignored.png")).await;
    assert!(matches!(invalid, Err(ScanError::DecodeError(_))));
}

#[tokio::test]
async fn test_first_frame_is_presented_to_the_sink() {
    let mut h = harness().await;
    let sink = CollectingSink::new();
    h.service
        .start(Box::new(sink.clone()))
        .await
        .expect("start");
    tokio::time::sleep(Duration::from_millis(100)).await;

    let presented = sink.presented();
    assert!(!presented.is_empty());
    assert_eq!(presented[0], (320, 240));
    h.service.stop().await;
}

#[tokio::test]
async fn test_dispose_is_terminal() {
    let mut h = harness().await;
    h.service.dispose().await;
    assert_eq!(h.service.state(), ScannerState::Disposed);
    assert_eq!(h.backend.live_streams(), 0);

    assert!(h.service.initialize().await.is_err());
    assert!(h.service.start(Box::new(NullSink)).await.is_err());
}
