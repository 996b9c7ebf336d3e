//! CLI workflow tests.
//!
//! These tests don't spawn the binary. They drive the same controllers the
//! commands use against a file store in a temporary data directory, building
//! fresh controllers for each step as separate CLI invocations would.

#![cfg(test)]

use std::path::Path;
use std::sync::Arc;

use qrdesk_business::{
    BusinessConfig, DirectorySink, HistoryRecorder, ImageExporter, RecordingNotifier,
    RenderedCodes, SavedCodeDraft, SavedCodes, ScanSession,
};
use qrdesk_input::{FrameDirectoryCamera, ImageDecoder, RqrrDecoder};
use qrdesk_states::{FileStore, KeyValueStore, SAVED_CODES_KEY, SCAN_HISTORY_KEY};

struct Invocation {
    store: Arc<FileStore>,
    notifier: Arc<RecordingNotifier>,
    config: BusinessConfig,
}

impl Invocation {
    fn new(data_dir: &Path) -> Self {
        Self {
            store: Arc::new(FileStore::new(data_dir)),
            notifier: Arc::new(RecordingNotifier::new()),
            config: BusinessConfig::default(),
        }
    }

    fn saved_codes(&self) -> SavedCodes {
        SavedCodes::load(self.store.clone(), self.notifier.clone(), &self.config)
    }

    fn scan_session(&self, camera_dir: &Path) -> ScanSession {
        let decoder: Arc<dyn ImageDecoder> = Arc::new(RqrrDecoder);
        ScanSession::new(
            Arc::new(FrameDirectoryCamera::new(camera_dir, decoder.clone())),
            decoder,
            self.notifier.clone(),
            HistoryRecorder::load(self.store.clone(), self.config.history_limit),
            &self.config,
        )
    }
}

fn draft(url: &str, name: &str, size: u32) -> SavedCodeDraft {
    SavedCodeDraft {
        url: url.to_owned(),
        name: name.to_owned(),
        size,
        ..SavedCodeDraft::default()
    }
}

#[test]
fn test_saved_codes_survive_between_invocations() {
    let data = tempfile::tempdir().expect("tempdir");

    let id = Invocation::new(data.path())
        .saved_codes()
        .save(&draft("https://example.com", "Home", 200))
        .expect("save")
        .id;
    assert!(data.path().join(format!("{SAVED_CODES_KEY}.json")).is_file());

    let second = Invocation::new(data.path());
    let mut codes = second.saved_codes();
    assert_eq!(codes.get(id).map(|c| c.name.as_str()), Some("Home"));
    assert!(codes.delete(id).expect("delete"));

    let third = Invocation::new(data.path()).saved_codes();
    assert!(third.list().is_empty());
}

#[tokio::test]
async fn test_export_saved_code_to_download_dir() {
    let data = tempfile::tempdir().expect("tempdir");
    let run = Invocation::new(data.path());
    let code = run
        .saved_codes()
        .save(&draft("https://example.com", "Menu/Card", 150))
        .expect("save");

    let rendered = Arc::new(RenderedCodes::new());
    let element_id = rendered.render_saved(&code).expect("render");
    let sink = Arc::new(DirectorySink::new(data.path().join("downloads")));
    let exporter = ImageExporter::new(rendered, sink.clone(), run.notifier.clone(), &run.config);
    exporter
        .export_as_image(&element_id, code.size, Some(&code.name))
        .await;

    let written = sink.written();
    assert_eq!(written, vec![data.path().join("downloads").join("Menu_Card.png")]);
    let image = image::open(&written[0]).expect("png");
    assert_eq!((image.width(), image.height()), (150, 150));
}

#[tokio::test]
async fn test_camera_scan_is_recorded_in_history_file() {
    let data = tempfile::tempdir().expect("tempdir");
    let cameras = data.path().join("cameras");
    let run = Invocation::new(data.path());

    // Produce a frame by exporting a code, as a user would print and film it.
    let rendered = Arc::new(RenderedCodes::new());
    rendered
        .render_preview("https://example.com/scan", Default::default())
        .expect("render");
    let sink = Arc::new(DirectorySink::new(cameras.join("webcam")));
    ImageExporter::new(rendered, sink.clone(), run.notifier.clone(), &run.config)
        .export_as_image("qr-code", 240, Some("frame-001"))
        .await;
    assert_eq!(sink.written().len(), 1);

    let mut session = run.scan_session(&cameras);
    session.initialize().await.expect("cameras");
    assert_eq!(session.selected_device(), Some("webcam"));
    session.start().await.expect("start");
    assert_eq!(
        session.next_scan().await.as_deref(),
        Some("https://example.com/scan")
    );
    session.shutdown().await;

    let raw = run
        .store
        .get(SCAN_HISTORY_KEY)
        .expect("read")
        .expect("history written");
    assert!(raw.contains("https://example.com/scan"));

    let later = Invocation::new(data.path());
    let history = HistoryRecorder::load(later.store.clone(), 10);
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn test_scan_image_of_blank_picture_fails() {
    let data = tempfile::tempdir().expect("tempdir");
    let run = Invocation::new(data.path());
    let blank = data.path().join("blank.png");
    image::GrayImage::from_pixel(80, 80, image::Luma([255]))
        .save(&blank)
        .expect("write blank");

    let bytes = std::fs::read(&blank).expect("read");
    let mut session = run.scan_session(&data.path().join("cameras"));
    assert!(session.scan_image(bytes).await.is_err());
    assert_eq!(run.notifier.titles(), vec!["Image Scan Failed"]);
    assert_eq!(run.store.get(SCAN_HISTORY_KEY).expect("read"), None);
}
