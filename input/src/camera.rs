//! Camera devices and the capture stream contract.
//!
//! A [`CameraBackend`] hands out at most one [`CaptureHandle`] per device. While
//! the handle is open the backend pushes one [`FrameEvent`] per sampled frame
//! into the channel it was given at start. Releasing the handle (or dropping
//! it) stops the stream and frees the device.

use async_trait::async_trait;
use flume::Sender;
use log::warn;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A camera as reported by enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    /// Opaque backend identifier.
    pub id: String,
    /// Human-readable label. May be empty when the platform hides labels.
    pub label: String,
}

impl CameraDevice {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    /// Label to show to the user, falling back to `Camera <id>`.
    pub fn display_label(&self) -> String {
        if self.label.trim().is_empty() {
            format!("Camera {}", self.id)
        } else {
            self.label.clone()
        }
    }
}

/// Error types for camera operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CameraError {
    /// The user or platform refused camera access.
    #[error("Camera access denied: {0}")]
    PermissionDenied(String),
    /// Enumeration succeeded but found nothing to capture from.
    #[error("No camera devices found")]
    NoDevices,
    /// The device already has an open capture handle.
    #[error("Camera {0} is already in use")]
    DeviceBusy(String),
    /// The requested device id is unknown to the backend.
    #[error("Camera {0} not found")]
    DeviceNotFound(String),
    /// Any other backend failure.
    #[error("Camera backend error: {0}")]
    Backend(String),
}

/// Outcome of sampling one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    /// A code was found and decoded.
    Decoded(String),
    /// The frame held no recognizable code.
    NoCode,
}

/// Capture parameters passed to [`CameraBackend::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Frames sampled per second.
    pub fps: u32,
    /// Edge length in pixels of the centered square that is decoded.
    /// `None` decodes the whole frame.
    pub scan_box: Option<u32>,
}

/// Edge of the default viewfinder square.
pub const DEFAULT_SCAN_BOX: u32 = 250;

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            fps: 10,
            scan_box: Some(DEFAULT_SCAN_BOX),
        }
    }
}

impl CaptureConfig {
    /// Delay between two sampled frames.
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(1000 / u64::from(self.fps.max(1)))
    }
}

/// Exclusive handle on an open capture stream.
///
/// Wraps the stream's `CancellationToken` and, for backends that drive the
/// stream from a task, its `JoinHandle`. Dropping the handle cancels the
/// stream, so a forgotten handle still frees the device.
#[derive(Debug)]
pub struct CaptureHandle {
    device_id: String,
    cancel_token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl CaptureHandle {
    pub fn new(device_id: impl Into<String>, cancel_token: CancellationToken) -> Self {
        Self {
            device_id: device_id.into(),
            cancel_token,
            task: None,
        }
    }

    /// Attaches the task producing frames for this handle.
    pub fn with_task(mut self, task: JoinHandle<()>) -> Self {
        self.task = Some(task);
        self
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Returns a clone of the cancellation token.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Cancels the stream and waits for its producer task to finish.
    ///
    /// Once this returns the device is free.
    pub async fn release(mut self) -> Result<(), CameraError> {
        self.cancel_token.cancel();
        if let Some(task) = self.task.take() {
            task.await.map_err(|e| {
                warn!("Capture task for {} ended abnormally: {e}", self.device_id);
                CameraError::Backend(e.to_string())
            })?;
        }
        Ok(())
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

/// Camera access, enabling mock implementations for testing.
#[async_trait]
pub trait CameraBackend: Send + Sync {
    /// Lists devices in backend order.
    ///
    /// # Returns
    /// - `Ok(devices)` with at least one device
    /// - `Err(CameraError::PermissionDenied)` if access was refused
    /// - `Err(CameraError::NoDevices)` if nothing can capture
    async fn list_cameras(&self) -> Result<Vec<CameraDevice>, CameraError>;

    /// Opens a capture stream on `device_id` and starts pushing frame events
    /// into `frames`.
    ///
    /// Returns once the stream has begun capturing.
    async fn start(
        &self,
        device_id: &str,
        config: &CaptureConfig,
        frames: Sender<FrameEvent>,
    ) -> Result<CaptureHandle, CameraError>;

    /// Stops the stream behind `handle` and releases the device.
    async fn stop(&self, handle: CaptureHandle) -> Result<(), CameraError>;
}
