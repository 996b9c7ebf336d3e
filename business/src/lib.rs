//! Reader and generator controllers for qrdesk.
//!
//! Everything here talks to the outside world through injected traits:
//! cameras and decoders from `qrdesk-input`, storage from `qrdesk-states`,
//! and the [`Notifier`], [`RenderTarget`] and [`DownloadSink`] seams defined
//! in this crate.

mod config;
mod error;

pub mod devices;
pub mod export;
pub mod history;
pub mod notify;
pub mod render;
pub mod saved_codes;
pub mod session;

pub use config::BusinessConfig;
pub use devices::{DeviceEnumerator, PermissionState};
pub use error::{ExportError, RenderError, SavedCodeError, SessionError, ValidationError};
pub use export::{DirectorySink, Download, DownloadSink, ImageExporter, MemorySink, export_filename};
pub use history::HistoryRecorder;
pub use notify::{LogNotifier, Notice, Notifier, RecordingNotifier, Severity};
pub use render::{CodeStyle, PREVIEW_ELEMENT_ID, QrGraphic, RenderTarget, RenderedCodes};
pub use saved_codes::{SavedCodeDraft, SavedCodes};
pub use session::{CameraState, ScanSession};
