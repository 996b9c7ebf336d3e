//! A camera backed by directories of still frames.
//!
//! Each subdirectory of the root is one device. Its image files, in file name
//! order, are the frames the device "captures". An optional `LABEL` file in
//! the device directory holds the display label.
//!
//! ```text
//! cameras/
//! ├── desk/
//! │   ├── LABEL          "Desk webcam"
//! │   ├── 0001.png
//! │   └── 0002.png
//! └── phone/
//!     └── frame.jpg
//! ```
//!
//! Frames are sampled at the configured rate and decoded on the blocking pool.
//! When `repeat` is off the stream ends after the last frame, which the scan
//! session observes as the capture source going away.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use flume::Sender;
use log::{debug, info, trace};
use tokio_util::sync::CancellationToken;

use crate::camera::{CameraBackend, CameraDevice, CameraError, CaptureConfig, CaptureHandle, FrameEvent};
use crate::decoder::{ImageDecoder, crop_to_scan_box};

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];
const LABEL_FILE: &str = "LABEL";

pub struct FrameDirectoryCamera {
    root: PathBuf,
    decoder: Arc<dyn ImageDecoder>,
    repeat: bool,
    open: Arc<Mutex<HashSet<String>>>,
}

impl FrameDirectoryCamera {
    pub fn new(root: impl Into<PathBuf>, decoder: Arc<dyn ImageDecoder>) -> Self {
        Self {
            root: root.into(),
            decoder,
            repeat: false,
            open: Arc::default(),
        }
    }

    /// Loop over the frames until stopped instead of ending after the last one.
    pub fn repeating(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn device_dir(&self, device_id: &str) -> Option<PathBuf> {
        let valid = !device_id.is_empty()
            && !device_id.contains(['/', '\\'])
            && device_id != "."
            && device_id != "..";
        valid.then(|| self.root.join(device_id))
    }

    fn claim(&self, device_id: &str) -> Result<(), CameraError> {
        let mut open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        if !open.insert(device_id.to_owned()) {
            return Err(CameraError::DeviceBusy(device_id.to_owned()));
        }
        Ok(())
    }

    fn unclaim(open: &Mutex<HashSet<String>>, device_id: &str) {
        open.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(device_id);
    }
}

impl std::fmt::Debug for FrameDirectoryCamera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameDirectoryCamera")
            .field("root", &self.root)
            .field("repeat", &self.repeat)
            .finish_non_exhaustive()
    }
}

fn map_io(root: &Path, e: &std::io::Error) -> CameraError {
    match e.kind() {
        ErrorKind::PermissionDenied => CameraError::PermissionDenied(root.display().to_string()),
        ErrorKind::NotFound => CameraError::NoDevices,
        _ => CameraError::Backend(format!("{}: {e}", root.display())),
    }
}

async fn read_label(dir: &Path) -> String {
    tokio::fs::read_to_string(dir.join(LABEL_FILE))
        .await
        .map(|s| s.trim().to_owned())
        .unwrap_or_default()
}

async fn list_frames(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut frames = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_frame = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| FRAME_EXTENSIONS.contains(&ext.as_str()));
        if is_frame {
            frames.push(path);
        }
    }
    frames.sort();
    Ok(frames)
}

fn decode_frame(decoder: &dyn ImageDecoder, path: &Path, scan_box: Option<u32>) -> FrameEvent {
    let image = match image::open(path) {
        Ok(image) => image,
        Err(e) => {
            debug!("Skipping unreadable frame {}: {e}", path.display());
            return FrameEvent::NoCode;
        }
    };
    match decoder.decode(&crop_to_scan_box(image, scan_box)) {
        Ok(text) => FrameEvent::Decoded(text),
        Err(e) => {
            trace!("No code in {}: {e}", path.display());
            FrameEvent::NoCode
        }
    }
}

#[async_trait]
impl CameraBackend for FrameDirectoryCamera {
    async fn list_cameras(&self) -> Result<Vec<CameraDevice>, CameraError> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| map_io(&self.root, &e))?;

        let mut devices = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| map_io(&self.root, &e))?
        {
            let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());
            if !is_dir {
                continue;
            }
            let id = entry.file_name().to_string_lossy().into_owned();
            let label = read_label(&entry.path()).await;
            devices.push(CameraDevice::new(id, label));
        }

        if devices.is_empty() {
            return Err(CameraError::NoDevices);
        }
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(devices)
    }

    async fn start(
        &self,
        device_id: &str,
        config: &CaptureConfig,
        frames: Sender<FrameEvent>,
    ) -> Result<CaptureHandle, CameraError> {
        let dir = self
            .device_dir(device_id)
            .ok_or_else(|| CameraError::DeviceNotFound(device_id.to_owned()))?;
        if !tokio::fs::metadata(&dir).await.is_ok_and(|m| m.is_dir()) {
            return Err(CameraError::DeviceNotFound(device_id.to_owned()));
        }

        self.claim(device_id)?;
        let paths = match list_frames(&dir).await {
            Ok(paths) => paths,
            Err(e) => {
                Self::unclaim(&self.open, device_id);
                return Err(map_io(&dir, &e));
            }
        };
        info!("Camera {device_id} opened with {} frame(s)", paths.len());

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_capture(
            CaptureLoop {
                device_id: device_id.to_owned(),
                paths,
                repeat: self.repeat,
                config: *config,
                decoder: Arc::clone(&self.decoder),
                open: Arc::clone(&self.open),
            },
            cancel.clone(),
            frames,
        ));

        Ok(CaptureHandle::new(device_id, cancel).with_task(task))
    }

    async fn stop(&self, handle: CaptureHandle) -> Result<(), CameraError> {
        let device_id = handle.device_id().to_owned();
        let result = handle.release().await;
        // The capture loop unclaims on exit; this covers a loop that panicked.
        Self::unclaim(&self.open, &device_id);
        debug!("Camera {device_id} released");
        result
    }
}

struct CaptureLoop {
    device_id: String,
    paths: Vec<PathBuf>,
    repeat: bool,
    config: CaptureConfig,
    decoder: Arc<dyn ImageDecoder>,
    open: Arc<Mutex<HashSet<String>>>,
}

async fn run_capture(capture: CaptureLoop, cancel: CancellationToken, frames: Sender<FrameEvent>) {
    let mut ticker = tokio::time::interval(capture.config.frame_interval());
    let mut index = 0usize;

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if index >= capture.paths.len() {
            if !capture.repeat {
                debug!("Camera {} ran out of frames", capture.device_id);
                break;
            }
            index = 0;
            // An empty repeating device captures nothing until stopped.
            if capture.paths.is_empty() {
                continue;
            }
        }

        let path = capture.paths[index].clone();
        index += 1;

        let decoder = Arc::clone(&capture.decoder);
        let scan_box = capture.config.scan_box;
        let event = tokio::task::spawn_blocking(move || decode_frame(&*decoder, &path, scan_box))
            .await
            .unwrap_or(FrameEvent::NoCode);

        if cancel.is_cancelled() || frames.send_async(event).await.is_err() {
            break;
        }
    }

    FrameDirectoryCamera::unclaim(&capture.open, &capture.device_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDecoder;
    use std::fs;

    fn camera_root() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        let desk = dir.path().join("desk");
        fs::create_dir(&desk).expect("mkdir");
        fs::write(desk.join(LABEL_FILE), "Desk webcam\n").expect("label");
        for name in ["0001.png", "0002.png"] {
            image::GrayImage::new(8, 8)
                .save(desk.join(name))
                .expect("frame");
        }
        fs::write(desk.join("notes.txt"), b"ignored").expect("notes");

        fs::create_dir(dir.path().join("back")).expect("mkdir");
        fs::write(dir.path().join("stray.png"), b"not a device").expect("stray");
        dir
    }

    fn camera(root: &Path, decoder: MockDecoder) -> FrameDirectoryCamera {
        FrameDirectoryCamera::new(root, Arc::new(decoder))
    }

    #[tokio::test]
    async fn lists_directories_as_devices() {
        let root = camera_root();
        let devices = camera(root.path(), MockDecoder::no_code())
            .list_cameras()
            .await
            .expect("devices");

        assert_eq!(
            devices,
            vec![
                CameraDevice::new("back", ""),
                CameraDevice::new("desk", "Desk webcam"),
            ]
        );
    }

    #[tokio::test]
    async fn missing_root_means_no_devices() {
        let root = tempfile::tempdir().expect("tempdir");
        let cam = camera(&root.path().join("nope"), MockDecoder::no_code());
        assert_eq!(cam.list_cameras().await, Err(CameraError::NoDevices));

        let empty = camera(root.path(), MockDecoder::no_code());
        assert_eq!(empty.list_cameras().await, Err(CameraError::NoDevices));
    }

    #[tokio::test]
    async fn unknown_device_is_rejected() {
        let root = camera_root();
        let cam = camera(root.path(), MockDecoder::no_code());
        let (tx, _rx) = flume::unbounded();

        let err = cam
            .start("../desk", &CaptureConfig::default(), tx.clone())
            .await
            .expect_err("path traversal");
        assert_eq!(err, CameraError::DeviceNotFound("../desk".to_owned()));

        let err = cam
            .start("garage", &CaptureConfig::default(), tx)
            .await
            .expect_err("missing device");
        assert_eq!(err, CameraError::DeviceNotFound("garage".to_owned()));
    }

    #[tokio::test]
    async fn streams_frames_then_ends() {
        let root = camera_root();
        let cam = camera(root.path(), MockDecoder::returning("https://example.com"));
        let (tx, rx) = flume::unbounded();
        let config = CaptureConfig {
            fps: 1000,
            scan_box: None,
        };

        let handle = cam.start("desk", &config, tx).await.expect("start");

        let decoded = FrameEvent::Decoded("https://example.com".to_owned());
        assert_eq!(rx.recv_async().await, Ok(decoded.clone()));
        assert_eq!(rx.recv_async().await, Ok(decoded));
        assert!(rx.recv_async().await.is_err(), "stream should end");

        cam.stop(handle).await.expect("stop");
    }

    #[tokio::test]
    async fn second_open_is_busy_until_released() {
        let root = camera_root();
        let cam = camera(root.path(), MockDecoder::no_code()).repeating(true);
        let config = CaptureConfig::default();

        let (tx, _rx) = flume::unbounded();
        let handle = cam.start("desk", &config, tx).await.expect("first start");

        let (tx2, _rx2) = flume::unbounded();
        let err = cam
            .start("desk", &config, tx2.clone())
            .await
            .expect_err("busy");
        assert_eq!(err, CameraError::DeviceBusy("desk".to_owned()));

        cam.stop(handle).await.expect("stop");
        let again = cam.start("desk", &config, tx2).await.expect("reopen");
        cam.stop(again).await.expect("stop");
    }
}
