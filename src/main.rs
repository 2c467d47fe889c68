use std::{path::Path, process, sync::Arc};

use mailwright::{
    application::{
        assets::{AssetStorage, UploadError},
        error::AppError,
        export::{ExportOrchestrator, ExportServices},
    },
    config,
    domain::{
        assets::{Asset, UploadFile},
        blocks::{BlockCatalog, customize_catalog},
        template::{STARTER_MARKUP, STARTER_PAGE_NAME, STARTER_STYLESHEET},
    },
    infra::{
        cloudinary::CloudinaryStorage,
        editor::StaticEditor,
        error::InfraError,
        host::MemoryLiveTree,
        images::HttpImageLoader,
        presenter::{BundleTarget, LocalPresenter},
        render::{CommandConverter, CommandRasterizer},
        telemetry,
    },
};
use reqwest::Client;
use serde::Serialize;
use tokio::fs;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match cli_args.command {
        config::Command::Export(args) => run_export(settings, args).await,
        config::Command::Upload(args) => run_upload(settings, args).await,
        config::Command::Delete(args) => run_delete(settings, args).await,
        config::Command::Blocks(args) => run_blocks(args).await,
    }
}

async fn run_export(settings: config::Settings, args: config::ExportArgs) -> Result<(), AppError> {
    let (markup, stylesheet) = read_template(&args).await?;

    let loader = Arc::new(HttpImageLoader::new(http_client()?));
    let tree = Arc::new(MemoryLiveTree::with_loader(loader));
    let editor = Arc::new(StaticEditor::new(Arc::clone(&tree), markup, stylesheet)?);
    let bundle_target = args
        .bundle_output
        .map_or(BundleTarget::Stdout, BundleTarget::File);

    let orchestrator = ExportOrchestrator::new(ExportServices {
        editor,
        tree,
        rasterizer: Arc::new(CommandRasterizer::new(settings.render.rasterizer_cli_path)),
        converter: Arc::new(CommandConverter::new(settings.render.converter_cli_path)),
        presenter: Arc::new(LocalPresenter::new(
            settings.export.output_dir,
            bundle_target,
        )),
    });

    info!(
        target = "mailwright::export",
        kind = %args.format,
        "Starting export"
    );
    let artifact = orchestrator.export(args.format).await?;
    info!(
        target = "mailwright::export",
        kind = %artifact.kind(),
        "Export completed"
    );
    Ok(())
}

async fn read_template(args: &config::ExportArgs) -> Result<(String, String), AppError> {
    let markup = match args.markup.as_deref() {
        Some(path) => read_text(path).await?,
        None => {
            info!(
                target = "mailwright::export",
                page = STARTER_PAGE_NAME,
                "No markup supplied, exporting the starter template"
            );
            STARTER_MARKUP.to_string()
        }
    };
    let stylesheet = match args.stylesheet.as_deref() {
        Some(path) => read_text(path).await?,
        None => STARTER_STYLESHEET.to_string(),
    };
    Ok((markup, stylesheet))
}

async fn run_upload(settings: config::Settings, args: config::UploadArgs) -> Result<(), AppError> {
    let storage = asset_storage(&settings)?;

    let mut files = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let data = fs::read(path).await.map_err(|source| UploadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        files.push(UploadFile::from_path_contents(path, data));
    }

    let assets = storage.upload(files).await?;
    info!(
        target = "mailwright::upload",
        count = assets.len(),
        "Upload completed"
    );
    print_json(&assets)
}

async fn run_delete(settings: config::Settings, args: config::DeleteArgs) -> Result<(), AppError> {
    let storage = asset_storage(&settings)?;
    let raw = read_text(&args.assets_file).await?;
    let assets: Vec<Asset> = serde_json::from_str(&raw).map_err(|err| {
        AppError::validation(format!(
            "`{}` is not a JSON list of assets: {err}",
            args.assets_file.display()
        ))
    })?;

    storage.delete(&assets).await?;
    info!(
        target = "mailwright::delete",
        count = assets.len(),
        "Delete completed"
    );
    Ok(())
}

async fn run_blocks(args: config::BlocksArgs) -> Result<(), AppError> {
    let mut catalog = match args.catalog.as_deref() {
        Some(path) => {
            let raw = read_text(path).await?;
            serde_json::from_str::<BlockCatalog>(&raw).map_err(|err| {
                AppError::validation(format!(
                    "`{}` is not a JSON block catalog: {err}",
                    path.display()
                ))
            })?
        }
        None => BlockCatalog::new(),
    };

    customize_catalog(&mut catalog);
    print_json(&catalog)
}

fn asset_storage(settings: &config::Settings) -> Result<CloudinaryStorage, AppError> {
    let (cloud_name, upload_preset) = settings.assets.upload_target().ok_or_else(|| {
        UploadError::NotConfigured(
            "set assets.cloud_name and assets.upload_preset \
             (or CLOUDINARY_CLOUD_NAME and CLOUDINARY_UPLOAD_PRESET)"
                .to_string(),
        )
    })?;
    let storage = CloudinaryStorage::new(
        http_client()?,
        settings.assets.api_base.as_str(),
        cloud_name,
        upload_preset,
    )?;
    Ok(storage)
}

fn http_client() -> Result<Client, AppError> {
    let client = Client::builder()
        .user_agent(concat!("mailwright/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|err| InfraError::HttpClient(err.to_string()))?;
    Ok(client)
}

async fn read_text(path: &Path) -> Result<String, AppError> {
    let text = fs::read_to_string(path)
        .await
        .map_err(|err| InfraError::io(path.display().to_string(), err))?;
    Ok(text)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to render output: {err}")))?;
    println!("{out}");
    Ok(())
}
