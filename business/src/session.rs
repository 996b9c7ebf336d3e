//! Scan session controller.
//!
//! [`ScanSession`] owns the camera state machine
//! (`Idle → Starting → Active → Stopping → Idle`, with `Error` on a failed
//! start) and the single capture handle that may be open at a time. Frames
//! arrive as [`FrameEvent`]s on a per-session channel; the first decoded one
//! stops the stream and is recorded in the history. Uploaded images go
//! straight to the decoder and never touch the camera.

use std::fmt;
use std::sync::Arc;

use flume::Receiver;
use log::{debug, info, trace, warn};
use qrdesk_input::{
    CameraBackend, CameraDevice, CameraError, CaptureConfig, CaptureHandle, DecodeError,
    FrameEvent, ImageDecoder,
};

use crate::config::BusinessConfig;
use crate::devices::{DeviceEnumerator, PermissionState};
use crate::error::SessionError;
use crate::history::HistoryRecorder;
use crate::notify::{Notice, Notifier};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CameraState {
    #[default]
    Idle,
    Starting,
    Active,
    Stopping,
    /// A start failed. Cleared by [`ScanSession::acknowledge_error`].
    Error(String),
}

impl fmt::Display for CameraState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Starting => f.write_str("starting"),
            Self::Active => f.write_str("active"),
            Self::Stopping => f.write_str("stopping"),
            Self::Error(reason) => write!(f, "in error ({reason})"),
        }
    }
}

/// The open stream of an Active session.
struct ActiveCapture {
    handle: CaptureHandle,
    frames: Receiver<FrameEvent>,
    /// Set once a decode has been accepted; later frames are ignored.
    honored: bool,
}

/// Drives one reader: device selection, camera sessions and image uploads.
pub struct ScanSession {
    camera: Arc<dyn CameraBackend>,
    decoder: Arc<dyn ImageDecoder>,
    notifier: Arc<dyn Notifier>,
    enumerator: DeviceEnumerator,
    history: HistoryRecorder,
    capture: CaptureConfig,
    state: CameraState,
    selected: Option<String>,
    active: Option<ActiveCapture>,
    last_result: Option<String>,
}

impl ScanSession {
    pub fn new(
        camera: Arc<dyn CameraBackend>,
        decoder: Arc<dyn ImageDecoder>,
        notifier: Arc<dyn Notifier>,
        history: HistoryRecorder,
        config: &BusinessConfig,
    ) -> Self {
        Self {
            enumerator: DeviceEnumerator::new(Arc::clone(&camera)),
            camera,
            decoder,
            notifier,
            history,
            capture: config.capture,
            state: CameraState::Idle,
            selected: None,
            active: None,
            last_result: None,
        }
    }

    /// Enumerates cameras and selects the first one.
    ///
    /// Enumeration runs once; later calls return the cached outcome. On
    /// failure a warning notice is sent and the session stays unable to start.
    pub async fn initialize(&mut self) -> Result<Vec<CameraDevice>, SessionError> {
        let outcome = self.enumerator.list_cameras().await.map(<[_]>::to_vec);
        self.after_enumeration(outcome)
    }

    /// Enumerates again, for example after the user granted access.
    pub async fn retry_devices(&mut self) -> Result<Vec<CameraDevice>, SessionError> {
        let outcome = self.enumerator.retry().await.map(<[_]>::to_vec);
        self.after_enumeration(outcome)
    }

    fn after_enumeration(
        &mut self,
        outcome: Result<Vec<CameraDevice>, CameraError>,
    ) -> Result<Vec<CameraDevice>, SessionError> {
        match outcome {
            Ok(devices) => {
                let still_listed = self
                    .selected
                    .as_ref()
                    .is_some_and(|id| devices.iter().any(|d| &d.id == id));
                if !still_listed {
                    self.selected = self.enumerator.default_device().map(|d| d.id.clone());
                }
                debug!("Selected camera {:?}", self.selected);
                Ok(devices)
            }
            Err(e) => {
                self.selected = None;
                let notice = match &e {
                    CameraError::PermissionDenied(_) => Notice::warning(
                        "Camera Access Denied",
                        "Please allow camera access to scan QR codes.",
                    ),
                    _ => Notice::warning(
                        "No Camera Found",
                        "Connect a camera or upload an image instead.",
                    ),
                };
                self.notifier.notify(notice);
                Err(e.into())
            }
        }
    }

    pub fn devices(&self) -> &[CameraDevice] {
        self.enumerator.devices()
    }

    pub fn permission(&self) -> PermissionState {
        self.enumerator.permission()
    }

    pub fn state(&self) -> &CameraState {
        &self.state
    }

    pub fn selected_device(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Payload of the most recent successful scan in this session.
    pub fn last_result(&self) -> Option<&str> {
        self.last_result.as_deref()
    }

    pub fn history(&self) -> &HistoryRecorder {
        &self.history
    }

    /// Whether [`ScanSession::start`] would be accepted right now.
    pub fn can_start(&self) -> bool {
        self.is_idle()
            && self.selected.is_some()
            && self.permission() != PermissionState::Denied
    }

    /// Changes the selected camera while no stream is open.
    ///
    /// Use [`ScanSession::switch_device`] during an active session.
    pub fn select_device(&mut self, device_id: &str) -> Result<(), SessionError> {
        self.settle();
        if matches!(self.state, CameraState::Active | CameraState::Starting) {
            return Err(SessionError::InvalidState(self.state.clone()));
        }
        self.ensure_known(device_id)?;
        self.selected = Some(device_id.to_owned());
        debug!("Selected camera {device_id}");
        Ok(())
    }

    /// Selects `device_id`, restarting the stream on it when one is open.
    ///
    /// The current handle is fully released before the new one is requested.
    pub async fn switch_device(&mut self, device_id: &str) -> Result<(), SessionError> {
        self.ensure_known(device_id)?;
        if self.state != CameraState::Active {
            self.selected = Some(device_id.to_owned());
            return Ok(());
        }

        info!("Switching camera to {device_id}");
        self.stop().await;
        self.selected = Some(device_id.to_owned());
        self.start().await
    }

    fn ensure_known(&self, device_id: &str) -> Result<(), SessionError> {
        if self.enumerator.contains(device_id) {
            Ok(())
        } else {
            Err(SessionError::UnknownDevice(device_id.to_owned()))
        }
    }

    /// Opens a capture stream on the selected camera.
    ///
    /// Rejected without a state change when nothing is selected, the session
    /// is not Idle, or camera access was denied. A backend failure moves the
    /// session to Error and sends a "Camera Error" notice.
    pub async fn start(&mut self) -> Result<(), SessionError> {
        let Some(device_id) = self.selected.clone() else {
            return Err(SessionError::NoDeviceSelected);
        };
        self.settle();
        if self.state != CameraState::Idle {
            return Err(SessionError::InvalidState(self.state.clone()));
        }
        if self.permission() == PermissionState::Denied {
            return Err(SessionError::PermissionDenied);
        }

        self.state = CameraState::Starting;
        self.last_result = None;
        debug!("Starting camera {device_id}");

        let (tx, rx) = flume::unbounded();
        match self.camera.start(&device_id, &self.capture, tx).await {
            Ok(handle) => {
                self.active = Some(ActiveCapture {
                    handle,
                    frames: rx,
                    honored: false,
                });
                self.state = CameraState::Active;
                info!("Camera {device_id} is scanning");
                Ok(())
            }
            Err(e) => {
                warn!("Failed to start camera {device_id}: {e}");
                self.state = CameraState::Error(e.to_string());
                let description = match &e {
                    CameraError::DeviceBusy(_) => "The camera is in use by another application.",
                    _ => "Could not access the camera. Please check permissions.",
                };
                self.notifier.notify(Notice::error("Camera Error", description));
                Err(e.into())
            }
        }
    }

    /// Stops the open stream, if any. A no-op from Idle or Error.
    ///
    /// Also finishes a stop that was interrupted by dropping the future that
    /// ran it.
    pub async fn stop(&mut self) {
        self.settle();
        if !matches!(self.state, CameraState::Active | CameraState::Starting) {
            trace!("Stop ignored while {}", self.state);
            return;
        }
        self.state = CameraState::Stopping;
        self.release_capture().await;
        self.state = CameraState::Idle;
        debug!("Camera stopped");
    }

    /// Returns from Error to Idle so a start can be retried.
    pub fn acknowledge_error(&mut self) {
        if let CameraState::Error(reason) = &self.state {
            debug!("Acknowledged camera error: {reason}");
            self.state = CameraState::Idle;
        }
    }

    /// Releases any open stream before the session goes away.
    pub async fn shutdown(&mut self) {
        self.stop().await;
    }

    /// Waits for the first decoded frame of the active session.
    ///
    /// Returns `None` when no session is active or the stream ends without a
    /// code. Dropping the future loses no frame: a decode is recorded before
    /// the stream is released, and an interrupted release is finished by the
    /// next `stop` or `start`.
    pub async fn next_scan(&mut self) -> Option<String> {
        self.settle();
        loop {
            let frames = match (&self.state, &self.active) {
                (CameraState::Active, Some(active)) => active.frames.clone(),
                _ => return None,
            };

            match frames.recv_async().await {
                Ok(event) => {
                    if let Some(text) = self.handle_frame(event).await {
                        return Some(text);
                    }
                }
                Err(_) => {
                    info!("Capture stream ended without a code");
                    self.state = CameraState::Stopping;
                    self.release_capture().await;
                    self.state = CameraState::Idle;
                    return None;
                }
            }
        }
    }

    async fn handle_frame(&mut self, event: FrameEvent) -> Option<String> {
        let text = match event {
            FrameEvent::NoCode => {
                trace!("Frame without code");
                return None;
            }
            FrameEvent::Decoded(text) => text,
        };

        if self.state != CameraState::Active {
            debug!("Ignoring decode while {}", self.state);
            return None;
        }
        let active = self.active.as_mut()?;
        if active.honored {
            debug!("Ignoring decode after one was accepted");
            return None;
        }
        active.honored = true;
        self.record_success(&text);

        self.state = CameraState::Stopping;
        self.release_capture().await;
        self.state = CameraState::Idle;
        Some(text)
    }

    /// Decodes an uploaded image without touching the camera.
    pub async fn scan_image(&mut self, bytes: Vec<u8>) -> Result<String, SessionError> {
        let decoder = Arc::clone(&self.decoder);
        let outcome = tokio::task::spawn_blocking(move || decoder.decode_bytes(&bytes))
            .await
            .unwrap_or_else(|e| Err(DecodeError::Unreadable(e.to_string())));

        match outcome {
            Ok(text) => {
                self.record_success(&text);
                Ok(text)
            }
            Err(e) => {
                warn!("Image scan failed: {e}");
                self.notifier.notify(Notice::error(
                    "Image Scan Failed",
                    "Could not detect a QR code in the uploaded image.",
                ));
                Err(e.into())
            }
        }
    }

    /// Whether the session is Idle, counting a stop whose release already ran.
    fn is_idle(&self) -> bool {
        match self.state {
            CameraState::Idle => true,
            CameraState::Stopping => self.active.is_none(),
            _ => false,
        }
    }

    /// Completes a `Stopping → Idle` transition left half done when the future
    /// driving it was dropped. The capture handle was already taken, and
    /// dropping it cancelled the stream.
    fn settle(&mut self) {
        if self.state == CameraState::Stopping && self.active.is_none() {
            debug!("Finishing interrupted camera stop");
            self.state = CameraState::Idle;
        }
    }

    async fn release_capture(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        let ActiveCapture { handle, frames, .. } = active;
        drop(frames);

        let device_id = handle.device_id().to_owned();
        if let Err(e) = self.camera.stop(handle).await {
            warn!("Camera {device_id} reported an error while stopping: {e}");
        }
    }

    fn record_success(&mut self, text: &str) {
        self.history.record(text);
        self.last_result = Some(text.to_owned());
        info!("Scanned {text:?}");
        self.notifier.notify(Notice::success(
            "QR Code Scanned",
            "Successfully scanned QR code",
        ));
    }
}
