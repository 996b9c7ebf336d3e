//! Acquisition sources for qrdesk: cameras and QR image decoders.
//!
//! Decoding QR symbols is not done here. This crate only defines the seams the
//! scan session talks to and the implementations behind them.
//!
//! # Modules
//!
//! - [`camera`]: [`CameraBackend`] trait, devices, capture handles and frame events
//! - [`decoder`]: [`ImageDecoder`] trait and the `rqrr`-backed [`RqrrDecoder`]
//! - [`frames`]: [`FrameDirectoryCamera`], a camera whose devices are directories of frames
//! - [`mock`]: scripted camera and decoder for tests
//!
//! All sources use trait-based abstractions for testability:
//! - Production implementations work with real files and images
//! - Mock implementations enable unit testing without side effects

pub mod camera;
pub mod decoder;
pub mod frames;
pub mod mock;

pub use camera::{
    CameraBackend, CameraDevice, CameraError, CaptureConfig, CaptureHandle, DEFAULT_SCAN_BOX,
    FrameEvent,
};
pub use decoder::{DecodeError, ImageDecoder, RqrrDecoder, crop_to_scan_box};
pub use frames::FrameDirectoryCamera;
pub use mock::{MockCamera, MockDecoder};
