//! List cameras command.

use anyhow::Result;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::instrument;

use crate::context::AppContext;

#[derive(Tabled)]
struct CameraRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Label")]
    label: String,
}

#[instrument(skip_all, name = "cameras")]
pub async fn run_cameras(ctx: &AppContext) -> Result<()> {
    let mut session = ctx.scan_session(false);
    let devices = match session.initialize().await {
        Ok(devices) => devices,
        Err(e) => {
            ctx.out.dim(format!(
                "Cameras are directories of image frames under {}",
                ctx.camera_dir().display()
            ));
            return Err(e.into());
        }
    };

    let rows: Vec<CameraRow> = devices
        .iter()
        .map(|device| CameraRow {
            id: device.id.clone(),
            label: device.display_label(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    ctx.out.print(table);

    if let Some(default) = session.selected_device() {
        ctx.out.labeled_indent("Default", default, 2);
    }
    Ok(())
}
