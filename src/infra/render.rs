//! Rendering capabilities backed by external command-line renderers.

use std::{
    ffi::OsString,
    io::ErrorKind,
    path::{Path, PathBuf},
    process::Stdio,
    time::Instant,
};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::process::Command;
use tracing::{info, warn};

use crate::{
    application::{
        capabilities::{DocumentConverter, Rasterizer},
        error::RenderCapabilityError,
        surface::RenderNode,
    },
    domain::artifacts::{DocumentOptions, RasterImage, RasterOptions},
};

const CSS_PIXELS_PER_INCH: u32 = 96;

/// Rasterizes nodes with a `wkhtmltoimage`-compatible CLI.
#[derive(Debug, Clone)]
pub struct CommandRasterizer {
    cli_path: PathBuf,
}

impl CommandRasterizer {
    pub fn new(cli_path: PathBuf) -> Self {
        Self { cli_path }
    }
}

#[async_trait]
impl Rasterizer for CommandRasterizer {
    async fn rasterize(
        &self,
        node: &dyn RenderNode,
        _options: &RasterOptions,
    ) -> Result<RasterImage, RenderCapabilityError> {
        let args = vec![OsString::from("--format"), OsString::from("png")];
        let png = run_cli(
            "rasterize",
            &self.cli_path,
            args,
            &node.markup(),
            ".png",
        )
        .await
        .map_err(RenderCapabilityError::rasterize)?;
        Ok(RasterImage::new(png))
    }
}

/// Converts nodes into PDF documents with a `wkhtmltopdf`-compatible CLI.
#[derive(Debug, Clone)]
pub struct CommandConverter {
    cli_path: PathBuf,
}

impl CommandConverter {
    pub fn new(cli_path: PathBuf) -> Self {
        Self { cli_path }
    }
}

/// Translate document geometry into converter flags.
fn converter_args(options: &DocumentOptions) -> Vec<OsString> {
    let margin = format!("{}mm", options.margin_mm);
    let dpi = (CSS_PIXELS_PER_INCH * options.scale_factor.max(1)).to_string();
    let mut args: Vec<OsString> = vec![
        "--page-size".into(),
        options.page_format.as_str().into(),
        "--orientation".into(),
        options.orientation.as_str().into(),
        "--dpi".into(),
        dpi.into(),
    ];
    for side in ["--margin-top", "--margin-right", "--margin-bottom", "--margin-left"] {
        args.push(side.into());
        args.push(margin.clone().into());
    }
    args
}

#[async_trait]
impl DocumentConverter for CommandConverter {
    async fn convert(
        &self,
        node: &dyn RenderNode,
        options: &DocumentOptions,
    ) -> Result<Option<Bytes>, RenderCapabilityError> {
        let pdf = run_cli(
            "convert",
            &self.cli_path,
            converter_args(options),
            &node.markup(),
            ".pdf",
        )
        .await
        .map_err(RenderCapabilityError::convert)?;
        Ok(Some(pdf))
    }
}

/// Write `html` to a temporary file, run `cli args… --quiet <input> <output>`
/// and return the output file contents.
async fn run_cli(
    capability: &'static str,
    cli_path: &Path,
    mut args: Vec<OsString>,
    html: &str,
    output_suffix: &str,
) -> Result<Bytes, String> {
    let started_at = Instant::now();

    let input = tempfile::Builder::new()
        .suffix(".html")
        .tempfile()
        .map_err(|err| format!("failed to create input file: {err}"))?;
    tokio::fs::write(input.path(), html.as_bytes())
        .await
        .map_err(|err| format!("failed to write input file: {err}"))?;
    let output = tempfile::Builder::new()
        .suffix(output_suffix)
        .tempfile()
        .map_err(|err| format!("failed to create output file: {err}"))?;

    args.push("--quiet".into());
    args.push(input.path().into());
    args.push(output.path().into());

    let result = Command::new(cli_path)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|err| {
            warn!(
                target = "infra::render",
                op = "render::run_cli",
                capability,
                result = "error",
                error_code = "spawn_cli",
                cli_path = %cli_path.display(),
                error = %err,
                "Failed to spawn renderer CLI"
            );
            if err.kind() == ErrorKind::NotFound {
                format!("renderer CLI `{}` unavailable: {err}", cli_path.display())
            } else {
                format!("failed to spawn renderer CLI: {err}")
            }
        })?;

    if !result.status.success() {
        let exit_code = result.status.code();
        let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
        warn!(
            target = "infra::render",
            op = "render::run_cli",
            capability,
            result = "error",
            error_code = "renderer_cli",
            exit_code = exit_code.map(i64::from).unwrap_or(-1),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            stderr = %stderr,
            "Renderer CLI invocation failed"
        );
        return Err(format!(
            "renderer CLI exited with {exit_code:?}: {stderr}"
        ));
    }

    let data = tokio::fs::read(output.path())
        .await
        .map_err(|err| format!("failed to read renderer output: {err}"))?;
    if data.is_empty() {
        return Err("renderer produced an empty file".to_string());
    }

    info!(
        target = "infra::render",
        op = "render::run_cli",
        capability,
        result = "ok",
        elapsed_ms = started_at.elapsed().as_millis() as u64,
        output_bytes = data.len(),
        "Renderer CLI finished"
    );
    Ok(Bytes::from(data))
}
