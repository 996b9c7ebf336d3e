//! Command implementations for the qrdesk CLI.
//!
//! Each subcommand is implemented in its own module.

pub mod cameras;
pub mod completions;
pub mod delete;
pub mod export;
pub mod generate;
pub mod history;
pub mod list;
pub mod save;
pub mod scan;
pub mod scan_image;

pub use cameras::run_cameras;
pub use completions::generate_completions;
pub use delete::run_delete;
pub use export::run_export;
pub use generate::run_generate;
pub use history::run_history;
pub use list::run_list;
pub use save::run_save;
pub use scan::run_scan;
pub use scan_image::run_scan_image;

use anyhow::{Result, bail};
use qrdesk_business::DirectorySink;

use crate::output::Output;

/// Reports the file an export wrote, or fails when nothing was written.
///
/// Export problems were already shown to the user as notices.
fn report_export(out: &Output, sink: &DirectorySink) -> Result<()> {
    match sink.written().last() {
        Some(path) => {
            out.success(format!("Exported {}", path.display()));
            Ok(())
        }
        None => bail!("Nothing was exported to {}", sink.dir().display()),
    }
}
