//! Export rasterizer.
//!
//! Turns a rendered [`QrGraphic`] into a PNG (or its SVG text) and hands it to
//! a [`DownloadSink`]. Exports are fire-and-forget: every failure ends in a log
//! line and, where the user asked for something, a notice. Nothing is
//! returned and nothing panics.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage};
use log::{Level, debug, error, info, log_enabled, trace, warn};
use qrdesk_states::ShapeStyle;

use crate::config::BusinessConfig;
use crate::error::ExportError;
use crate::notify::{Notice, Notifier};
use crate::render::{QrGraphic, ROUNDED_RADIUS_PX, RenderTarget};

pub const PNG_MIME: &str = "image/png";
pub const SVG_MIME: &str = "image/svg+xml";

/// A finished file waiting to be saved by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl Download {
    pub fn new(filename: impl Into<String>, mime_type: &'static str, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime_type,
            bytes,
        }
    }

    /// `data:` URI holding the file, base64 encoded.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }
}

/// Receives finished downloads, enabling mock implementations for testing.
pub trait DownloadSink: Send + Sync {
    fn deliver(&self, download: Download) -> Result<(), ExportError>;
}

/// Writes downloads into a directory, creating it on first use.
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    written: Mutex<Vec<PathBuf>>,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Mutex::default(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where a download named `filename` ends up.
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Files written by this sink, oldest first.
    pub fn written(&self) -> Vec<PathBuf> {
        self.written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&self, download: Download) -> Result<(), ExportError> {
        fs::create_dir_all(&self.dir).map_err(|source| ExportError::Delivery {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.path_for(&download.filename);
        fs::write(&path, &download.bytes).map_err(|source| ExportError::Delivery {
            path: path.clone(),
            source,
        })?;
        info!("Wrote {} ({} bytes)", path.display(), download.bytes.len());
        self.written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path);
        Ok(())
    }
}

/// Keeps downloads in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    downloads: Mutex<Vec<Download>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn downloads(&self) -> Vec<Download> {
        self.downloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DownloadSink for MemorySink {
    fn deliver(&self, download: Download) -> Result<(), ExportError> {
        self.downloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(download);
        Ok(())
    }
}

/// An off-screen square drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Surface {
    size: u32,
}

impl Surface {
    /// Returns `None` for an empty surface or one past `limit`.
    fn acquire(size: u32, limit: u32) -> Option<Self> {
        (size > 0 && size <= limit).then_some(Self { size })
    }

    /// Scales the module grid onto the surface.
    fn draw(self, graphic: &QrGraphic) -> RgbaImage {
        let style = graphic.style();
        let background = Rgba(style.background.rgba());
        let foreground = Rgba(style.foreground.rgba());
        let edge = graphic.edge() as u64;
        let out = u64::from(self.size);
        let radius = if style.shape == ShapeStyle::Rounded {
            f64::from(ROUNDED_RADIUS_PX) * f64::from(self.size) / f64::from(style.size.max(1))
        } else {
            0.0
        };

        RgbaImage::from_fn(self.size, self.size, |px, py| {
            if radius > 0.0 && outside_rounded_corner(px, py, self.size, radius) {
                return Rgba([0, 0, 0, 0]);
            }
            let mx = (u64::from(px) * edge / out) as usize;
            let my = (u64::from(py) * edge / out) as usize;
            if graphic.is_dark(mx, my) {
                foreground
            } else {
                background
            }
        })
    }
}

/// Whether the pixel center lies outside a corner arc of `radius`.
fn outside_rounded_corner(px: u32, py: u32, size: u32, radius: f64) -> bool {
    let size = f64::from(size);
    let overshoot = |c: f64| {
        if c < radius {
            radius - c
        } else if c > size - radius {
            c - (size - radius)
        } else {
            0.0
        }
    };
    let dx = overshoot(f64::from(px) + 0.5);
    let dy = overshoot(f64::from(py) + 0.5);
    dx > 0.0 && dy > 0.0 && dx * dx + dy * dy > radius * radius
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgba8)
        .map_err(|e| ExportError::Encode(e.to_string()))?;
    Ok(png)
}

/// Builds a safe file name: blank names fall back to `default_name`, path
/// separators become `_`, and the extension is appended once.
pub fn export_filename(name: Option<&str>, default_name: &str, extension: &str) -> String {
    let stem = name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or(default_name);
    let stem: String = stem
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect();
    let suffix = format!(".{extension}");
    if stem.to_ascii_lowercase().ends_with(&suffix) {
        stem
    } else {
        format!("{stem}{suffix}")
    }
}

/// Rasterizes rendered codes and delivers them as downloads.
pub struct ImageExporter {
    target: Arc<dyn RenderTarget>,
    sink: Arc<dyn DownloadSink>,
    notifier: Arc<dyn Notifier>,
    default_name: String,
    max_surface_size: u32,
}

impl ImageExporter {
    pub fn new(
        target: Arc<dyn RenderTarget>,
        sink: Arc<dyn DownloadSink>,
        notifier: Arc<dyn Notifier>,
        config: &BusinessConfig,
    ) -> Self {
        Self {
            target,
            sink,
            notifier,
            default_name: config.default_export_name.clone(),
            max_surface_size: config.max_surface_size,
        }
    }

    /// Exports `element_id` as an `output_size` square PNG.
    pub async fn export_as_image(&self, element_id: &str, output_size: u32, filename: Option<&str>) {
        if let Err(e) = self.try_export_png(element_id, output_size, filename).await {
            self.report(&e);
        }
    }

    /// Exports `element_id` as SVG text.
    pub fn export_as_svg(&self, element_id: &str, filename: Option<&str>) {
        if let Err(e) = self.try_export_svg(element_id, filename) {
            self.report(&e);
        }
    }

    async fn try_export_png(
        &self,
        element_id: &str,
        output_size: u32,
        filename: Option<&str>,
    ) -> Result<(), ExportError> {
        let graphic = self.lookup(element_id)?;
        let surface = Surface::acquire(output_size, self.max_surface_size)
            .ok_or(ExportError::SurfaceUnavailable(output_size))?;

        let png = tokio::task::spawn_blocking(move || encode_png(&surface.draw(&graphic)))
            .await
            .map_err(|e| ExportError::Task(e.to_string()))??;

        let download = Download::new(
            export_filename(filename, &self.default_name, "png"),
            PNG_MIME,
            png,
        );
        debug!(
            "Rasterized {element_id} at {output_size}px into {} byte PNG",
            download.bytes.len()
        );
        if log_enabled!(Level::Trace) {
            trace!("{element_id} as data URI: {}", download.data_uri());
        }
        self.sink.deliver(download)
    }

    fn try_export_svg(&self, element_id: &str, filename: Option<&str>) -> Result<(), ExportError> {
        let svg = self.lookup(element_id)?.to_svg();
        self.sink.deliver(Download::new(
            export_filename(filename, &self.default_name, "svg"),
            SVG_MIME,
            svg.into_bytes(),
        ))
    }

    fn lookup(&self, element_id: &str) -> Result<QrGraphic, ExportError> {
        self.target
            .element(element_id)
            .ok_or_else(|| ExportError::ElementNotFound(element_id.to_owned()))
    }

    fn report(&self, error: &ExportError) {
        match error {
            ExportError::ElementNotFound(_) => {
                warn!("Export skipped: {error}");
                self.notifier.notify(Notice::error(
                    "Export Failed",
                    "Could not find the QR code to export.",
                ));
            }
            ExportError::SurfaceUnavailable(_) => warn!("Export skipped: {error}"),
            ExportError::Encode(_) | ExportError::Task(_) | ExportError::Delivery { .. } => {
                error!("Export failed: {error}");
                self.notifier.notify(Notice::error(
                    "Export Failed",
                    "Could not create the image file.",
                ));
            }
        }
    }
}
