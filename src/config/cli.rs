use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

use crate::domain::artifacts::ExportKind;

/// Command-line arguments for the mailwright binary.
#[derive(Debug, Parser)]
#[command(
    name = "mailwright",
    version,
    about = "Export email templates and sync their media assets"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "MAILWRIGHT_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Export the template as a PNG image, a PDF document or an HTML bundle.
    Export(ExportArgs),
    /// Upload media files to the configured asset store.
    Upload(UploadArgs),
    /// Remove previously uploaded assets listed in a JSON file.
    Delete(DeleteArgs),
    /// Print the editor block catalog after applying the mailwright blocks.
    Blocks(BlocksArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderOverrides {
    /// Override the CLI used to rasterize the canvas into a PNG.
    #[arg(long = "render-rasterizer-cli-path", value_name = "PATH")]
    pub rasterizer_cli_path: Option<PathBuf>,

    /// Override the CLI used to convert the document into a PDF.
    #[arg(long = "render-converter-cli-path", value_name = "PATH")]
    pub converter_cli_path: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub render: RenderOverrides,

    /// Artifact to produce: png, pdf or html.
    #[arg(value_name = "FORMAT")]
    pub format: ExportKind,

    /// Template markup; the starter template is used when omitted.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub markup: Option<PathBuf>,

    /// Template stylesheet.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub stylesheet: Option<PathBuf>,

    /// Override the directory receiving PNG and PDF downloads.
    #[arg(long = "output-dir", value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub output_dir: Option<PathBuf>,

    /// Write the HTML bundle to a file instead of stdout.
    #[arg(long = "bundle-output", value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub bundle_output: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct AssetOverrides {
    /// Override the asset store API base URL.
    #[arg(long = "assets-api-base", value_name = "URL")]
    pub api_base: Option<String>,

    /// Override the asset store cloud name.
    #[arg(long = "assets-cloud-name", value_name = "NAME")]
    pub cloud_name: Option<String>,

    /// Override the unsigned upload preset.
    #[arg(long = "assets-upload-preset", value_name = "PRESET")]
    pub upload_preset: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct UploadArgs {
    #[command(flatten)]
    pub assets: AssetOverrides,

    /// Files to upload.
    #[arg(value_name = "FILES", required = true, value_hint = ValueHint::FilePath)]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub assets: AssetOverrides,

    /// JSON file holding the assets returned by a previous upload.
    #[arg(value_name = "ASSETS_JSON", value_hint = ValueHint::FilePath)]
    pub assets_file: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct BlocksArgs {
    /// Existing block catalog (JSON) to customize.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub catalog: Option<PathBuf>,
}
