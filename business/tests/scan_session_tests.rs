//! Integration tests for the scan session controller against the mock camera.

use std::sync::Arc;
use std::time::Duration;

use qrdesk_business::{
    BusinessConfig, CameraState, HistoryRecorder, PermissionState, RecordingNotifier,
    ScanSession, SessionError,
};
use qrdesk_input::{CameraError, DecodeError, MockCamera, MockDecoder};
use qrdesk_states::{KeyValueStore, MemoryStore, SCAN_HISTORY_KEY};

struct Harness {
    camera: Arc<MockCamera>,
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
    session: ScanSession,
}

impl Harness {
    fn new(camera: MockCamera, decoder: MockDecoder) -> Self {
        Self::with_store(camera, decoder, MemoryStore::new())
    }

    fn with_store(camera: MockCamera, decoder: MockDecoder, store: MemoryStore) -> Self {
        let camera = Arc::new(camera);
        let store = Arc::new(store);
        let notifier = Arc::new(RecordingNotifier::new());
        let history = HistoryRecorder::load(store.clone(), 10);
        let session = ScanSession::new(
            camera.clone(),
            Arc::new(decoder),
            notifier.clone(),
            history,
            &BusinessConfig::default(),
        );
        Self {
            camera,
            store,
            notifier,
            session,
        }
    }

    async fn two_cameras() -> Self {
        let mut harness = Self::new(
            MockCamera::with_devices(&[("cam1", "Front"), ("cam2", "Back")]),
            MockDecoder::no_code(),
        );
        harness.session.initialize().await.expect("devices");
        harness
    }
}

mod one_decode_per_session {
    use super::*;

    #[tokio::test]
    async fn test_second_frame_in_same_session_adds_nothing() {
        let mut h = Harness::two_cameras().await;
        h.session.start().await.expect("start");
        assert_eq!(h.session.state(), &CameraState::Active);

        assert!(h.camera.emit_decoded("https://example.com"));
        assert!(h.camera.emit_decoded("https://other.com"));

        let scanned = h.session.next_scan().await;
        assert_eq!(scanned.as_deref(), Some("https://example.com"));
        assert_eq!(h.session.state(), &CameraState::Idle);
        assert_eq!(h.session.next_scan().await, None);

        let history = h.session.history().entries();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].text, "https://example.com");
        assert_eq!(h.session.last_result(), Some("https://example.com"));
        assert_eq!(h.notifier.titles(), vec!["QR Code Scanned"]);
        assert_eq!(h.camera.open_handles(), 0);
    }

    #[tokio::test]
    async fn test_new_session_clears_last_result() {
        let mut h = Harness::two_cameras().await;
        h.session.start().await.expect("start");
        h.camera.emit_decoded("first");
        h.session.next_scan().await.expect("scan");

        h.session.start().await.expect("restart");
        assert_eq!(h.session.last_result(), None);

        h.camera.emit_decoded("second");
        assert_eq!(h.session.next_scan().await.as_deref(), Some("second"));
        assert_eq!(h.session.history().len(), 2);
        assert_eq!(h.session.history().entries()[0].text, "second");
    }

    #[tokio::test]
    async fn test_stream_end_returns_to_idle_without_result() {
        let mut h = Harness::two_cameras().await;
        h.session.start().await.expect("start");
        h.camera.end_stream();

        assert_eq!(h.session.next_scan().await, None);
        assert_eq!(h.session.state(), &CameraState::Idle);
        assert!(h.session.history().is_empty());
        assert_eq!(h.camera.open_handles(), 0);
    }
}

mod interrupted_scan {
    use super::*;

    async fn slow_stopping_camera() -> Harness {
        let camera = MockCamera::with_devices(&[("cam1", "Front")])
            .with_stop_delay(Duration::from_millis(200));
        let mut harness = Harness::new(camera, MockDecoder::no_code());
        harness.session.initialize().await.expect("devices");
        harness
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_scan_keeps_result_and_stop_recovers() {
        let mut h = slow_stopping_camera().await;
        h.session.start().await.expect("start");
        assert!(h.camera.emit_decoded("https://example.com"));

        let waited = tokio::time::timeout(Duration::from_millis(50), h.session.next_scan()).await;
        assert!(waited.is_err(), "release should still be in progress");
        assert_eq!(h.session.state(), &CameraState::Stopping);

        assert_eq!(h.session.history().len(), 1);
        assert_eq!(h.session.last_result(), Some("https://example.com"));
        assert_eq!(h.notifier.titles(), vec!["QR Code Scanned"]);

        h.session.stop().await;
        assert_eq!(h.session.state(), &CameraState::Idle);
        assert!(h.session.can_start());

        h.session.start().await.expect("start again");
        assert_eq!(h.session.state(), &CameraState::Active);
        h.session.shutdown().await;
        assert_eq!(h.camera.open_handles(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_finishes_interrupted_stop() {
        let mut h = slow_stopping_camera().await;
        h.session.start().await.expect("start");
        h.camera.emit_decoded("first");

        let waited = tokio::time::timeout(Duration::from_millis(50), h.session.next_scan()).await;
        assert!(waited.is_err());

        h.session.start().await.expect("start after interrupted stop");
        assert_eq!(h.camera.started(), vec!["cam1", "cam1"]);
        h.camera.emit_decoded("second");
        assert_eq!(h.session.next_scan().await.as_deref(), Some("second"));
        assert_eq!(h.session.history().entries()[0].text, "second");
        assert_eq!(h.session.history().len(), 2);
    }
}

mod state_machine {
    use super::*;

    #[tokio::test]
    async fn test_stop_is_idempotent_from_every_state() {
        let mut h = Harness::two_cameras().await;

        h.session.stop().await;
        assert_eq!(h.session.state(), &CameraState::Idle);

        h.session.start().await.expect("start");
        h.session.stop().await;
        h.session.stop().await;
        assert_eq!(h.session.state(), &CameraState::Idle);
        assert_eq!(h.camera.stopped(), vec!["cam1"]);

        h.camera
            .fail_next_start(CameraError::DeviceBusy("cam1".to_owned()));
        assert!(h.session.start().await.is_err());
        h.session.stop().await;
        assert!(matches!(h.session.state(), CameraState::Error(_)));
    }

    #[tokio::test]
    async fn test_start_rejected_unless_idle() {
        let mut h = Harness::two_cameras().await;
        h.session.start().await.expect("start");

        assert_eq!(
            h.session.start().await,
            Err(SessionError::InvalidState(CameraState::Active))
        );
        assert_eq!(h.camera.started(), vec!["cam1"]);
        h.session.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_start_needs_acknowledgment() {
        let mut h = Harness::two_cameras().await;
        h.camera
            .fail_next_start(CameraError::DeviceBusy("cam1".to_owned()));

        let err = h.session.start().await.expect_err("busy");
        assert_eq!(
            err,
            SessionError::Camera(CameraError::DeviceBusy("cam1".to_owned()))
        );
        assert!(matches!(h.session.state(), CameraState::Error(_)));
        assert_eq!(h.notifier.titles(), vec!["Camera Error"]);
        assert!(matches!(
            h.session.start().await,
            Err(SessionError::InvalidState(CameraState::Error(_)))
        ));

        h.session.acknowledge_error();
        assert_eq!(h.session.state(), &CameraState::Idle);
        h.session.start().await.expect("retry succeeds");
        assert_eq!(h.session.state(), &CameraState::Active);
        h.session.shutdown().await;
    }

    #[tokio::test]
    async fn test_denied_permission_disables_start() {
        let mut h = Harness::new(MockCamera::denied(), MockDecoder::no_code());
        let err = h.session.initialize().await.expect_err("denied");
        assert!(matches!(
            err,
            SessionError::Camera(CameraError::PermissionDenied(_))
        ));
        assert_eq!(h.session.permission(), PermissionState::Denied);
        assert_eq!(h.session.start().await, Err(SessionError::NoDeviceSelected));
        assert!(h.camera.started().is_empty());
    }

    #[tokio::test]
    async fn test_no_devices_warns() {
        let mut h = Harness::new(MockCamera::empty(), MockDecoder::no_code());
        assert!(h.session.initialize().await.is_err());
        assert_eq!(h.session.permission(), PermissionState::Unavailable);
        assert_eq!(h.notifier.titles(), vec!["No Camera Found"]);
    }

    #[tokio::test]
    async fn test_initialize_enumerates_once() {
        let mut h = Harness::two_cameras().await;
        h.session.initialize().await.expect("cached");
        assert_eq!(h.camera.list_calls(), 1);

        h.session.retry_devices().await.expect("retry");
        assert_eq!(h.camera.list_calls(), 2);
    }
}

mod device_switching {
    use super::*;

    #[tokio::test]
    async fn test_switch_while_active_never_opens_two_handles() {
        let mut h = Harness::two_cameras().await;
        h.session.start().await.expect("start");

        h.session.switch_device("cam2").await.expect("switch");
        h.session.switch_device("cam1").await.expect("switch back");
        h.session.switch_device("cam2").await.expect("switch again");

        assert_eq!(h.session.state(), &CameraState::Active);
        assert_eq!(h.session.selected_device(), Some("cam2"));
        assert_eq!(h.camera.max_open_handles(), 1);
        assert_eq!(h.camera.started(), vec!["cam1", "cam2", "cam1", "cam2"]);
        assert_eq!(h.camera.stopped(), vec!["cam1", "cam2", "cam1"]);
        h.session.shutdown().await;
        assert_eq!(h.camera.open_handles(), 0);
    }

    #[tokio::test]
    async fn test_switch_while_idle_only_selects() {
        let mut h = Harness::two_cameras().await;
        h.session.switch_device("cam2").await.expect("select");
        assert_eq!(h.session.selected_device(), Some("cam2"));
        assert_eq!(h.session.state(), &CameraState::Idle);
        assert!(h.camera.started().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_device_is_rejected() {
        let mut h = Harness::two_cameras().await;
        assert_eq!(
            h.session.select_device("cam9"),
            Err(SessionError::UnknownDevice("cam9".to_owned()))
        );
        assert_eq!(
            h.session.switch_device("cam9").await,
            Err(SessionError::UnknownDevice("cam9".to_owned()))
        );
        assert_eq!(h.session.selected_device(), Some("cam1"));
    }
}

mod image_upload {
    use super::*;

    #[tokio::test]
    async fn test_image_without_code_reports_and_leaves_state() {
        let mut h = Harness::new(
            MockCamera::with_devices(&[("cam1", "")]),
            MockDecoder::no_code(),
        );
        h.session.initialize().await.expect("devices");

        let err = h
            .session
            .scan_image(b"not a code".to_vec())
            .await
            .expect_err("no code");
        assert_eq!(err, SessionError::Decode(DecodeError::NoCode));
        assert_eq!(h.session.state(), &CameraState::Idle);
        assert!(h.session.history().is_empty());
        assert_eq!(h.notifier.titles(), vec!["Image Scan Failed"]);
    }

    #[tokio::test]
    async fn test_upload_records_without_touching_active_camera() {
        let mut h = Harness::new(
            MockCamera::with_devices(&[("cam1", "")]),
            MockDecoder::returning("from upload"),
        );
        h.session.initialize().await.expect("devices");
        h.session.start().await.expect("start");

        let text = h.session.scan_image(vec![0; 8]).await.expect("decoded");
        assert_eq!(text, "from upload");
        assert_eq!(h.session.state(), &CameraState::Active);
        assert_eq!(h.camera.open_handles(), 1);
        assert_eq!(h.session.history().len(), 1);
        assert_eq!(h.session.last_result(), Some("from upload"));

        h.session.shutdown().await;
    }
}

mod persisted_history {
    use super::*;

    #[tokio::test]
    async fn test_corrupt_history_reads_empty_and_is_replaced() {
        let mut h = Harness::with_store(
            MockCamera::with_devices(&[("cam1", "")]),
            MockDecoder::returning("fresh"),
            MemoryStore::with_value(SCAN_HISTORY_KEY, "{not json"),
        );
        assert!(h.session.history().is_empty());

        h.session.scan_image(vec![1]).await.expect("decoded");
        let raw = h
            .store
            .get(SCAN_HISTORY_KEY)
            .expect("read")
            .expect("written");
        assert!(raw.contains(r#""version":1"#));
        assert!(raw.contains("fresh"));
    }

    #[tokio::test]
    async fn test_legacy_array_loads() {
        let legacy = r#"[{"url":"https://old.example","timestamp":"2024-01-02T03:04:05Z"}]"#;
        let h = Harness::with_store(
            MockCamera::empty(),
            MockDecoder::no_code(),
            MemoryStore::with_value(SCAN_HISTORY_KEY, legacy),
        );
        assert_eq!(h.session.history().len(), 1);
        assert_eq!(
            h.session.history().entries()[0].text,
            "https://old.example"
        );
    }

    #[tokio::test]
    async fn test_future_version_loads_empty() {
        let future = r#"{"version":99,"items":[]}"#;
        let h = Harness::with_store(
            MockCamera::empty(),
            MockDecoder::no_code(),
            MemoryStore::with_value(SCAN_HISTORY_KEY, future),
        );
        assert!(h.session.history().is_empty());
    }

    #[tokio::test]
    async fn test_history_capped_at_ten_most_recent_first() {
        let mut h = Harness::new(
            MockCamera::with_devices(&[("cam1", "")]),
            MockDecoder::no_code(),
        );
        h.session.initialize().await.expect("devices");

        for i in 0..12 {
            h.session.start().await.expect("start");
            h.camera.emit_decoded(&format!("code-{i}"));
            h.session.next_scan().await.expect("scan");
        }

        let texts: Vec<_> = h
            .session
            .history()
            .entries()
            .iter()
            .map(|r| r.text.as_str())
            .collect();
        assert_eq!(texts.len(), 10);
        assert_eq!(texts.first(), Some(&"code-11"));
        assert_eq!(texts.last(), Some(&"code-2"));
    }
}
