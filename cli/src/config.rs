//! Runtime configuration for the CLI.
//!
//! Read from `QRDESK_*` environment variables, then defaults are filled in:
//! data lives in `<platform data dir>/qrdesk`, cameras in `<data>/cameras`
//! and exports in `<data>/downloads`.

use std::env::vars;
use std::path::PathBuf;

use anyhow::{Context as _, Result, bail};
use qrdesk_business::BusinessConfig;
use qrdesk_input::CaptureConfig;
use serde::Deserialize;
use tracing::debug;

const ENV_PREFIX: &str = "QRDESK_";

// Every field is optional; defaults are applied in `from_raw`.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    data_dir: Option<PathBuf>,
    camera_dir: Option<PathBuf>,
    download_dir: Option<PathBuf>,
    fps: Option<u32>,
    scan_box: Option<u32>,
    history_limit: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub camera_dir: PathBuf,
    pub download_dir: PathBuf,
    pub business: BusinessConfig,
}

impl AppConfig {
    /// Reads the environment. `data_dir` from the command line wins over
    /// `QRDESK_DATA_DIR`.
    pub fn init(data_dir: Option<PathBuf>) -> Result<Self> {
        let raw = read_env(vars())?;
        Self::from_raw(raw, data_dir)
    }

    fn from_raw(raw: RawConfig, data_dir_override: Option<PathBuf>) -> Result<Self> {
        let RawConfig {
            data_dir,
            camera_dir,
            download_dir,
            fps,
            scan_box,
            history_limit,
        } = raw;

        let data_dir = match data_dir_override.or(data_dir) {
            Some(dir) => dir,
            None => dirs::data_dir()
                .map(|dir| dir.join("qrdesk"))
                .context("Cannot determine a data directory; set QRDESK_DATA_DIR")?,
        };
        let camera_dir = camera_dir.unwrap_or_else(|| data_dir.join("cameras"));
        let download_dir = download_dir.unwrap_or_else(|| data_dir.join("downloads"));

        let defaults = BusinessConfig::default();
        let fps = fps.unwrap_or(defaults.capture.fps);
        if fps == 0 {
            bail!("QRDESK_FPS must be at least 1");
        }
        // 0 decodes the whole frame.
        let scan_box = match scan_box {
            Some(0) => None,
            Some(edge) => Some(edge),
            None => defaults.capture.scan_box,
        };
        let history_limit = history_limit.unwrap_or(defaults.history_limit);
        if history_limit == 0 {
            bail!("QRDESK_HISTORY_LIMIT must be at least 1");
        }

        let business = defaults
            .with_history_limit(history_limit)
            .with_capture(CaptureConfig { fps, scan_box });

        debug!(
            "Using data dir {}, cameras {}, downloads {}",
            data_dir.display(),
            camera_dir.display(),
            download_dir.display()
        );
        Ok(Self {
            data_dir,
            camera_dir,
            download_dir,
            business,
        })
    }
}

fn read_env<I>(vars: I) -> Result<RawConfig>
where
    I: IntoIterator<Item = (String, String)>,
{
    let ours = vars
        .into_iter()
        .filter_map(|(key, value)| Some((key.strip_prefix(ENV_PREFIX)?.to_owned(), value)));
    serde_env::from_iter(ours).context("Invalid QRDESK_* environment variable")
}
