use std::path::PathBuf;

use qrdesk_input::{CameraError, DecodeError};
use qrdesk_states::{ParseColorError, StorageError};

use crate::session::CameraState;

/// Rejections from the scan session controller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("No camera selected")]
    NoDeviceSelected,
    #[error("Not allowed while the camera is {0}")]
    InvalidState(CameraState),
    #[error("Camera access was denied")]
    PermissionDenied,
    #[error("Unknown camera {0:?}")]
    UnknownDevice(String),
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Problems with generator input, checked before anything is stored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please enter a URL")]
    MissingUrl,
    #[error("Please enter a name for your QR code")]
    MissingName,
    #[error(transparent)]
    InvalidColor(#[from] ParseColorError),
    #[error("Size {size} is outside {min}..={max}")]
    SizeOutOfRange { size: u32, min: u32, max: u32 },
}

#[derive(Debug, thiserror::Error)]
pub enum SavedCodeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("Cannot encode QR code: {0}")]
    Encode(String),
}

/// Failures inside the export rasterizer. Never returned to callers.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("No rendered element with id {0:?}")]
    ElementNotFound(String),
    #[error("Cannot allocate a {0}x{0} surface")]
    SurfaceUnavailable(u32),
    #[error("PNG encoding failed: {0}")]
    Encode(String),
    #[error("Rasterizer task failed: {0}")]
    Task(String),
    #[error("Cannot write {path}: {source}")]
    Delivery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
