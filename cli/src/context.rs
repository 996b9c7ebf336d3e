//! Wiring of the controllers to the real store, camera, decoder and sink.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, bail};
use qrdesk_business::{
    DirectorySink, HistoryRecorder, ImageExporter, LogNotifier, Notifier, RenderedCodes,
    SavedCodes, ScanSession,
};
use qrdesk_input::{FrameDirectoryCamera, ImageDecoder, RqrrDecoder};
use qrdesk_states::{FileStore, SavedCode};

use crate::config::AppConfig;
use crate::output::Output;

pub struct AppContext {
    pub config: AppConfig,
    pub out: Arc<Output>,
    notifier: Arc<dyn Notifier>,
    store: Arc<FileStore>,
}

impl AppContext {
    /// With `quiet`, controller notices go to the log and only command
    /// results reach the console.
    pub fn new(config: AppConfig, quiet: bool) -> Self {
        let store = Arc::new(FileStore::new(&config.data_dir));
        let out = Arc::new(Output::new());
        let notifier: Arc<dyn Notifier> = if quiet {
            Arc::new(LogNotifier)
        } else {
            out.clone()
        };
        Self {
            config,
            out,
            notifier,
            store,
        }
    }

    pub fn saved_codes(&self) -> SavedCodes {
        SavedCodes::load(self.store.clone(), self.notifier.clone(), &self.config.business)
    }

    pub fn history(&self) -> HistoryRecorder {
        HistoryRecorder::load(self.store.clone(), self.config.business.history_limit)
    }

    /// Exporter writing into `out_dir`, or the configured download directory.
    pub fn exporter(
        &self,
        rendered: Arc<RenderedCodes>,
        out_dir: Option<PathBuf>,
    ) -> (ImageExporter, Arc<DirectorySink>) {
        let sink = Arc::new(DirectorySink::new(
            out_dir.unwrap_or_else(|| self.config.download_dir.clone()),
        ));
        let exporter = ImageExporter::new(
            rendered,
            sink.clone(),
            self.notifier.clone(),
            &self.config.business,
        );
        (exporter, sink)
    }

    /// Scan session on the frame-directory cameras under the camera dir.
    pub fn scan_session(&self, repeat: bool) -> ScanSession {
        let decoder: Arc<dyn ImageDecoder> = Arc::new(RqrrDecoder);
        let camera = FrameDirectoryCamera::new(&self.config.camera_dir, decoder.clone())
            .repeating(repeat);
        ScanSession::new(
            Arc::new(camera),
            decoder,
            self.notifier.clone(),
            self.history(),
            &self.config.business,
        )
    }

    pub fn camera_dir(&self) -> &Path {
        &self.config.camera_dir
    }
}

/// Finds a saved code by full ID or unique ID prefix.
pub fn resolve_code<'a>(codes: &'a SavedCodes, id: &str) -> Result<&'a SavedCode> {
    let id = id.trim().to_ascii_lowercase();
    if id.is_empty() {
        bail!("Saved code ID must not be empty");
    }
    let mut matches = codes
        .list()
        .iter()
        .filter(|code| code.id.to_string().starts_with(&id));

    match (matches.next(), matches.next()) {
        (Some(code), None) => Ok(code),
        (None, _) => bail!("No saved code matches {id:?}"),
        (Some(_), Some(_)) => bail!("{id:?} matches more than one saved code; use more characters"),
    }
}
