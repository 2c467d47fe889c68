//! Cloudinary-backed asset storage using unsigned upload presets.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use crate::{
    application::assets::{AssetStorage, UploadError, upload_all},
    domain::assets::{Asset, UploadFile},
};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
    original_filename: Option<String>,
    resource_type: Option<String>,
    bytes: Option<u64>,
}

impl UploadResponse {
    fn into_asset(self, file: &UploadFile) -> Asset {
        Asset {
            id: self.public_id,
            src: self.secure_url,
            name: self.original_filename.unwrap_or_else(|| file.name.clone()),
            mime_type: self.resource_type.unwrap_or_else(|| "image".to_string()),
            size: self.bytes.unwrap_or(file.data.len() as u64),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CloudinaryStorage {
    client: Client,
    endpoint: Url,
    upload_preset: String,
}

impl CloudinaryStorage {
    pub fn new(
        client: Client,
        api_base: &str,
        cloud_name: &str,
        upload_preset: impl Into<String>,
    ) -> Result<Self, UploadError> {
        let endpoint = upload_endpoint(api_base, cloud_name)?;
        Ok(Self {
            client,
            endpoint,
            upload_preset: upload_preset.into(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn submit(&self, file: UploadFile) -> Result<Asset, UploadError> {
        let started_at = Instant::now();
        let size = file.len();

        let mut part = Part::bytes(file.data.to_vec()).file_name(file.name.clone());
        if let Some(content_type) = file.content_type.as_deref() {
            part = part
                .mime_str(content_type)
                .map_err(|err| UploadError::Transport {
                    file: file.name.clone(),
                    message: format!("invalid content type `{content_type}`: {err}"),
                })?;
        }
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone());

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|err| UploadError::Transport {
                file: file.name.clone(),
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                target = "infra::cloudinary",
                op = "cloudinary::upload",
                result = "error",
                error_code = "rejected",
                file = %file.name,
                status = status.as_u16(),
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                body = %body,
                "Asset storage rejected upload"
            );
            return Err(UploadError::Rejected {
                file: file.name,
                status: status.as_u16(),
            });
        }

        let payload: UploadResponse =
            response
                .json()
                .await
                .map_err(|err| UploadError::InvalidResponse {
                    file: file.name.clone(),
                    message: err.to_string(),
                })?;
        let asset = payload.into_asset(&file);

        info!(
            target = "infra::cloudinary",
            op = "cloudinary::upload",
            result = "ok",
            file = %file.name,
            asset_id = %asset.id,
            bytes = size,
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Asset uploaded"
        );
        Ok(asset)
    }
}

fn upload_endpoint(api_base: &str, cloud_name: &str) -> Result<Url, UploadError> {
    if cloud_name.trim().is_empty() {
        return Err(UploadError::NotConfigured(
            "cloud name must not be empty".to_string(),
        ));
    }
    let mut endpoint = Url::parse(api_base).map_err(|err| {
        UploadError::NotConfigured(format!("invalid api base `{api_base}`: {err}"))
    })?;
    endpoint
        .path_segments_mut()
        .map_err(|()| UploadError::NotConfigured(format!("api base `{api_base}` cannot carry a path")))?
        .pop_if_empty()
        .extend(["v1_1", cloud_name.trim(), "image", "upload"]);
    Ok(endpoint)
}

#[async_trait]
impl AssetStorage for CloudinaryStorage {
    async fn upload(&self, files: Vec<UploadFile>) -> Result<Vec<Asset>, UploadError> {
        let count = files.len();
        let assets = upload_all(files, |file| self.submit(file)).await?;
        info!(
            target = "infra::cloudinary",
            op = "cloudinary::upload_all",
            result = "ok",
            files = count,
            "Upload batch finished"
        );
        Ok(assets)
    }

    async fn delete(&self, assets: &[Asset]) -> Result<(), UploadError> {
        for asset in assets {
            info!(
                target = "infra::cloudinary",
                op = "cloudinary::delete",
                asset_id = %asset.id,
                "Asset removal requested"
            );
        }
        Ok(())
    }
}
