//! Scripted camera and decoder for tests.
//!
//! [`MockCamera`] never produces frames on its own: tests push them with
//! [`MockCamera::emit`] into whichever stream is currently open. It records
//! how many handles are open at once so tests can assert the one-handle rule.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use flume::Sender;
use image::DynamicImage;
use tokio_util::sync::CancellationToken;

use crate::camera::{CameraBackend, CameraDevice, CameraError, CaptureConfig, CaptureHandle, FrameEvent};
use crate::decoder::{DecodeError, ImageDecoder};

#[derive(Debug)]
struct MockCameraState {
    devices: Result<Vec<CameraDevice>, CameraError>,
    start_failures: VecDeque<CameraError>,
    open: HashSet<String>,
    max_open: usize,
    stream: Option<Sender<FrameEvent>>,
    list_calls: usize,
    started: Vec<String>,
    stopped: Vec<String>,
    stop_delay: Option<Duration>,
}

/// Mock camera backend with scripted devices and failures.
#[derive(Debug)]
pub struct MockCamera {
    state: Mutex<MockCameraState>,
}

impl MockCamera {
    /// Creates a camera exposing `(id, label)` devices in order.
    pub fn with_devices(devices: &[(&str, &str)]) -> Self {
        let devices = devices
            .iter()
            .map(|(id, label)| CameraDevice::new(*id, *label))
            .collect();
        Self::from_listing(Ok(devices))
    }

    /// Creates a camera whose enumeration is refused.
    pub fn denied() -> Self {
        Self::from_listing(Err(CameraError::PermissionDenied(
            "NotAllowedError".to_owned(),
        )))
    }

    /// Creates a camera with nothing attached.
    pub fn empty() -> Self {
        Self::from_listing(Err(CameraError::NoDevices))
    }

    fn from_listing(devices: Result<Vec<CameraDevice>, CameraError>) -> Self {
        Self {
            state: Mutex::new(MockCameraState {
                devices,
                start_failures: VecDeque::new(),
                open: HashSet::new(),
                max_open: 0,
                stream: None,
                list_calls: 0,
                started: Vec::new(),
                stopped: Vec::new(),
                stop_delay: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockCameraState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes the next `start` call fail with `error`.
    pub fn fail_next_start(&self, error: CameraError) {
        self.lock().start_failures.push_back(error);
    }

    /// Makes every `stop` wait `delay` after freeing the device, like a
    /// backend joining its capture task.
    pub fn with_stop_delay(self, delay: Duration) -> Self {
        self.lock().stop_delay = Some(delay);
        self
    }

    /// Pushes a frame into the open stream. Returns false when no stream is
    /// open or the receiver is gone.
    pub fn emit(&self, event: FrameEvent) -> bool {
        self.lock()
            .stream
            .as_ref()
            .is_some_and(|tx| tx.send(event).is_ok())
    }

    /// Pushes a decoded frame into the open stream.
    pub fn emit_decoded(&self, text: &str) -> bool {
        self.emit(FrameEvent::Decoded(text.to_owned()))
    }

    /// Ends the open stream as if the capture source disappeared.
    pub fn end_stream(&self) {
        self.lock().stream = None;
    }

    /// Number of capture handles currently open.
    pub fn open_handles(&self) -> usize {
        self.lock().open.len()
    }

    /// Highest number of simultaneously open handles ever observed.
    pub fn max_open_handles(&self) -> usize {
        self.lock().max_open
    }

    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    /// Device ids passed to successful `start` calls, in order.
    pub fn started(&self) -> Vec<String> {
        self.lock().started.clone()
    }

    /// Device ids passed to `stop`, in order.
    pub fn stopped(&self) -> Vec<String> {
        self.lock().stopped.clone()
    }
}

#[async_trait]
impl CameraBackend for MockCamera {
    async fn list_cameras(&self) -> Result<Vec<CameraDevice>, CameraError> {
        let mut state = self.lock();
        state.list_calls += 1;
        state.devices.clone()
    }

    async fn start(
        &self,
        device_id: &str,
        _config: &CaptureConfig,
        frames: Sender<FrameEvent>,
    ) -> Result<CaptureHandle, CameraError> {
        let mut state = self.lock();
        if let Some(error) = state.start_failures.pop_front() {
            return Err(error);
        }

        let known = state
            .devices
            .as_ref()
            .is_ok_and(|devices| devices.iter().any(|d| d.id == device_id));
        if !known {
            return Err(CameraError::DeviceNotFound(device_id.to_owned()));
        }
        if !state.open.insert(device_id.to_owned()) {
            return Err(CameraError::DeviceBusy(device_id.to_owned()));
        }

        state.max_open = state.max_open.max(state.open.len());
        state.stream = Some(frames);
        state.started.push(device_id.to_owned());
        Ok(CaptureHandle::new(device_id, CancellationToken::new()))
    }

    async fn stop(&self, handle: CaptureHandle) -> Result<(), CameraError> {
        let delay = {
            let mut state = self.lock();
            state.open.remove(handle.device_id());
            state.stopped.push(handle.device_id().to_owned());
            state.stream = None;
            state.stop_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        handle.release().await
    }
}

/// Mock decoder returning a fixed result for every image.
#[derive(Debug)]
pub struct MockDecoder {
    result: Result<String, DecodeError>,
    calls: Mutex<usize>,
}

impl MockDecoder {
    /// Decodes every image to `text`.
    pub fn returning(text: &str) -> Self {
        Self::with_result(Ok(text.to_owned()))
    }

    /// Finds no code in any image.
    pub fn no_code() -> Self {
        Self::with_result(Err(DecodeError::NoCode))
    }

    pub fn with_result(result: Result<String, DecodeError>) -> Self {
        Self {
            result,
            calls: Mutex::new(0),
        }
    }

    /// How many decode attempts were made.
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn answer(&self) -> Result<String, DecodeError> {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        self.result.clone()
    }
}

impl ImageDecoder for MockDecoder {
    fn decode(&self, _image: &DynamicImage) -> Result<String, DecodeError> {
        self.answer()
    }

    /// Skips image parsing so tests can pass arbitrary bytes.
    fn decode_bytes(&self, _bytes: &[u8]) -> Result<String, DecodeError> {
        self.answer()
    }
}
