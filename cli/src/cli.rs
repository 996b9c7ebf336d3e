use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use qrdesk_business::SavedCodeDraft;
use qrdesk_states::ShapeStyle;

#[derive(Parser)]
#[command(name = "qrdesk")]
#[command(about = "Generate, save, export and scan QR codes", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show timing/latency information
    #[arg(long, global = true)]
    pub timing: bool,

    /// Enable verbose debug output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Send notices to the log instead of the console
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Directory holding saved codes and scan history
    #[arg(long, global = true, env = "QRDESK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

/// Styling shared by the generator commands.
#[derive(Args, Debug, Clone)]
pub struct StyleArgs {
    /// Background color, #RGB or #RRGGBB
    #[arg(long, default_value = "#FFFFFF")]
    pub bg: String,

    /// Foreground color, #RGB or #RRGGBB
    #[arg(long, default_value = "#000000")]
    pub fg: String,

    /// Display shape: square, dots or rounded
    #[arg(long, default_value = "square")]
    pub shape: ShapeStyle,

    /// Edge length in pixels
    #[arg(long, short = 's', default_value_t = 200)]
    pub size: u32,

    /// Leave out the quiet zone around the code
    #[arg(long)]
    pub no_margin: bool,
}

impl StyleArgs {
    pub fn draft(&self, url: &str, name: Option<&str>) -> SavedCodeDraft {
        SavedCodeDraft {
            url: url.to_owned(),
            name: name.unwrap_or_default().to_owned(),
            background_color: self.bg.clone(),
            foreground_color: self.fg.clone(),
            shape: self.shape,
            size: self.size,
            include_margin: !self.no_margin,
        }
    }
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Text or URL to encode
    pub text: String,

    #[command(flatten)]
    pub style: StyleArgs,

    /// File name for the export (and the saved code with --save)
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// Export directory (defaults to the download directory)
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,

    /// Export SVG instead of PNG
    #[arg(long)]
    pub svg: bool,

    /// Also add the code to the saved library
    #[arg(long)]
    pub save: bool,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Saved code ID or a unique prefix of it
    pub id: String,

    /// Export directory (defaults to the download directory)
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,

    /// Export SVG instead of PNG
    #[arg(long)]
    pub svg: bool,

    /// Override the output size in pixels
    #[arg(long)]
    pub size: Option<u32>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a code and export it as an image
    Generate(GenerateArgs),
    /// Save a code to the library
    Save {
        /// Text or URL to encode
        text: String,

        /// Name shown in the library
        #[arg(long, short = 'n')]
        name: String,

        #[command(flatten)]
        style: StyleArgs,
    },
    /// List saved codes
    List,
    /// Delete a saved code
    Delete {
        /// Saved code ID or a unique prefix of it
        id: String,
    },
    /// Export a saved code at its saved size
    Export(ExportArgs),
    /// List cameras
    Cameras,
    /// Scan with a camera until the first code is found
    Scan {
        /// Camera ID (defaults to the first camera)
        #[arg(long, short = 'c')]
        camera: Option<String>,

        /// Replay the camera's frames until a code is found or Ctrl-C
        #[arg(long)]
        repeat: bool,
    },
    /// Scan a QR code from an image file
    ScanImage {
        /// Image to decode
        path: PathBuf,
    },
    /// Show scan history, most recent first
    History,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory as _;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_defaults() {
        let cli = Cli::try_parse_from(["qrdesk", "generate", "https://example.com"])
            .expect("should parse");
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert!(!args.svg && !args.save);
        let draft = args.style.draft(&args.text, args.name.as_deref());
        assert_eq!(draft, SavedCodeDraft::default());
    }

    #[test]
    fn test_style_flags() {
        let cli = Cli::try_parse_from([
            "qrdesk", "save", "hello", "--name", "Greeting", "--shape", "rounded", "--size",
            "300", "--no-margin", "--fg", "#123",
        ])
        .expect("should parse");
        let Commands::Save { text, name, style } = cli.command else {
            panic!("expected save");
        };
        let draft = style.draft(&text, Some(&name));
        assert_eq!(draft.shape, ShapeStyle::Rounded);
        assert_eq!(draft.size, 300);
        assert!(!draft.include_margin);
        assert_eq!(draft.foreground_color, "#123");
        assert_eq!(draft.name, "Greeting");
    }

    #[test]
    fn test_quiet_is_global() {
        let cli = Cli::try_parse_from(["qrdesk", "history", "-q"]).expect("should parse");
        assert!(cli.quiet);
        assert!(matches!(cli.command, Commands::History));

        let cli = Cli::try_parse_from(["qrdesk", "list"]).expect("should parse");
        assert!(!cli.quiet);
    }

    #[test]
    fn test_unknown_shape_is_rejected() {
        assert!(Cli::try_parse_from(["qrdesk", "generate", "x", "--shape", "hexagon"]).is_err());
    }
}
