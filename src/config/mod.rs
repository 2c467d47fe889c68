//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{env, path::PathBuf, str::FromStr};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

mod cli;

pub use cli::{
    AssetOverrides, BlocksArgs, CliArgs, Command, DeleteArgs, ExportArgs, LoggingOverrides,
    RenderOverrides, UploadArgs,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "mailwright";
const ENV_PREFIX: &str = "MAILWRIGHT";
pub(crate) const DEFAULT_RASTERIZER_CLI_PATH: &str = "wkhtmltoimage";
pub(crate) const DEFAULT_CONVERTER_CLI_PATH: &str = "wkhtmltopdf";
const DEFAULT_OUTPUT_DIR: &str = ".";
const DEFAULT_ASSETS_API_BASE: &str = "https://api.cloudinary.com";
const CLOUD_NAME_ENV: &str = "CLOUDINARY_CLOUD_NAME";
const UPLOAD_PRESET_ENV: &str = "CLOUDINARY_UPLOAD_PRESET";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub render: RenderSettings,
    pub export: ExportSettings,
    pub assets: AssetSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub rasterizer_cli_path: PathBuf,
    pub converter_cli_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AssetSettings {
    pub api_base: Url,
    pub cloud_name: Option<String>,
    pub upload_preset: Option<String>,
}

impl AssetSettings {
    /// Cloud name and upload preset, when both are configured.
    pub fn upload_target(&self) -> Option<(&str, &str)> {
        Some((self.cloud_name.as_deref()?, self.upload_preset.as_deref()?))
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_env_fallbacks(|key| env::var(key).ok());
    raw.apply_logging_overrides(&cli.logging);

    match &cli.command {
        Command::Export(args) => raw.apply_export_overrides(args),
        Command::Upload(args) => raw.apply_asset_overrides(&args.assets),
        Command::Delete(args) => raw.apply_asset_overrides(&args.assets),
        Command::Blocks(_) => {}
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    render: RawRenderSettings,
    export: RawExportSettings,
    assets: RawAssetSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    rasterizer_cli_path: Option<PathBuf>,
    converter_cli_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawExportSettings {
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAssetSettings {
    api_base: Option<String>,
    cloud_name: Option<String>,
    upload_preset: Option<String>,
}

impl RawSettings {
    /// Fill asset credentials missing from files and `MAILWRIGHT__` variables
    /// with the conventional Cloudinary variables.
    fn apply_env_fallbacks(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.assets.cloud_name.is_none() {
            self.assets.cloud_name = lookup(CLOUD_NAME_ENV);
        }
        if self.assets.upload_preset.is_none() {
            self.assets.upload_preset = lookup(UPLOAD_PRESET_ENV);
        }
    }

    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_export_overrides(&mut self, args: &ExportArgs) {
        if let Some(dir) = args.output_dir.as_ref() {
            self.export.output_dir = Some(dir.clone());
        }
        self.apply_render_overrides(&args.render);
    }

    fn apply_render_overrides(&mut self, overrides: &RenderOverrides) {
        if let Some(path) = overrides.rasterizer_cli_path.as_ref() {
            self.render.rasterizer_cli_path = Some(path.clone());
        }
        if let Some(path) = overrides.converter_cli_path.as_ref() {
            self.render.converter_cli_path = Some(path.clone());
        }
    }

    fn apply_asset_overrides(&mut self, overrides: &AssetOverrides) {
        if let Some(api_base) = overrides.api_base.as_ref() {
            self.assets.api_base = Some(api_base.clone());
        }
        if let Some(name) = overrides.cloud_name.as_ref() {
            self.assets.cloud_name = Some(name.clone());
        }
        if let Some(preset) = overrides.upload_preset.as_ref() {
            self.assets.upload_preset = Some(preset.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            render,
            export,
            assets,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            render: build_render_settings(render)?,
            export: build_export_settings(export)?,
            assets: build_asset_settings(assets)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let rasterizer_cli_path = non_empty_path(
        render.rasterizer_cli_path,
        DEFAULT_RASTERIZER_CLI_PATH,
        "render.rasterizer_cli_path",
    )?;
    let converter_cli_path = non_empty_path(
        render.converter_cli_path,
        DEFAULT_CONVERTER_CLI_PATH,
        "render.converter_cli_path",
    )?;

    Ok(RenderSettings {
        rasterizer_cli_path,
        converter_cli_path,
    })
}

fn build_export_settings(export: RawExportSettings) -> Result<ExportSettings, LoadError> {
    let output_dir = non_empty_path(export.output_dir, DEFAULT_OUTPUT_DIR, "export.output_dir")?;
    Ok(ExportSettings { output_dir })
}

fn build_asset_settings(assets: RawAssetSettings) -> Result<AssetSettings, LoadError> {
    let api_base_value = assets
        .api_base
        .unwrap_or_else(|| DEFAULT_ASSETS_API_BASE.to_string());
    let api_base = Url::parse(api_base_value.trim())
        .map_err(|err| LoadError::invalid("assets.api_base", format!("invalid URL: {err}")))?;
    if !matches!(api_base.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "assets.api_base",
            "only http and https URLs are supported",
        ));
    }

    Ok(AssetSettings {
        api_base,
        cloud_name: non_blank(assets.cloud_name),
        upload_preset: non_blank(assets.upload_preset),
    })
}

fn non_empty_path(
    value: Option<PathBuf>,
    default: &str,
    key: &'static str,
) -> Result<PathBuf, LoadError> {
    let path = value.unwrap_or_else(|| PathBuf::from(default));
    if path.as_os_str().is_empty() {
        return Err(LoadError::invalid(key, "path must not be empty"));
    }
    Ok(path)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}
