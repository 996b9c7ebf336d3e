mod cli;
mod commands;
mod config;
mod context;
mod output;
mod timing;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::{
    generate_completions, run_cameras, run_delete, run_export, run_generate, run_history,
    run_list, run_save, run_scan, run_scan_image,
};
use crate::config::AppConfig;
use crate::context::AppContext;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    timing::init_tracing(cli.verbose, cli.timing);

    if let Commands::Completions { shell } = cli.command {
        generate_completions(shell);
        return Ok(());
    }

    let ctx = AppContext::new(AppConfig::init(cli.data_dir)?, cli.quiet);

    match cli.command {
        Commands::Generate(args) => run_generate(&ctx, args).await,
        Commands::Save { text, name, style } => run_save(&ctx, &text, &name, &style),
        Commands::List => run_list(&ctx),
        Commands::Delete { id } => run_delete(&ctx, &id),
        Commands::Export(args) => run_export(&ctx, args).await,
        Commands::Cameras => run_cameras(&ctx).await,
        Commands::Scan { camera, repeat } => run_scan(&ctx, camera, repeat).await,
        Commands::ScanImage { path } => run_scan_image(&ctx, &path).await,
        Commands::History => run_history(&ctx),
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    }
}
