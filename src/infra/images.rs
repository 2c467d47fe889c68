//! Image loading for mounted nodes.

use std::time::Instant;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::Client;
use tracing::{debug, warn};

use crate::application::surface::ImageState;

/// Resolves an image source to its terminal load state.
#[async_trait]
pub trait ImageLoader: Send + Sync {
    async fn load(&self, src: &str) -> ImageState;
}

/// Loads `http(s)` and `data:` sources and probes their intrinsic size.
#[derive(Debug, Clone)]
pub struct HttpImageLoader {
    client: Client,
}

impl HttpImageLoader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn fetch(&self, src: &str) -> Result<Vec<u8>, String> {
        if let Some(payload) = src.strip_prefix("data:") {
            return decode_data_url(payload);
        }
        if !(src.starts_with("http://") || src.starts_with("https://")) {
            return Err("unsupported image source scheme".to_string());
        }

        let response = self
            .client
            .get(src)
            .send()
            .await
            .map_err(|err| err.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("status {status}"));
        }
        let bytes = response.bytes().await.map_err(|err| err.to_string())?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ImageLoader for HttpImageLoader {
    async fn load(&self, src: &str) -> ImageState {
        let started_at = Instant::now();
        let state = match self.fetch(src).await {
            Ok(data) => probe(&data),
            Err(reason) => {
                warn!(
                    target = "infra::images",
                    op = "images::load",
                    result = "error",
                    src,
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    error = %reason,
                    "Image failed to load"
                );
                return ImageState::Failed;
            }
        };

        let result = match state {
            ImageState::Loaded { .. } => "loaded",
            _ => "unprobeable",
        };
        debug!(
            target = "infra::images",
            op = "images::load",
            result,
            src,
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Image settled"
        );
        state
    }
}

/// Determine the intrinsic size of encoded image data.
fn probe(data: &[u8]) -> ImageState {
    match imagesize::blob_size(data) {
        Ok(size) => {
            let width = u32::try_from(size.width).unwrap_or(0);
            let height = u32::try_from(size.height).unwrap_or(0);
            ImageState::loaded(width, height)
        }
        Err(_) => ImageState::Failed,
    }
}

/// Decode the part of a `data:` URL after the scheme. Only base64 payloads
/// carry binary images.
fn decode_data_url(payload: &str) -> Result<Vec<u8>, String> {
    let (meta, data) = payload
        .split_once(',')
        .ok_or_else(|| "malformed data URL".to_string())?;
    if !meta.ends_with(";base64") {
        return Err("data URL is not base64 encoded".to_string());
    }
    STANDARD
        .decode(data.trim())
        .map_err(|err| format!("invalid base64 payload: {err}"))
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;

    use super::*;

    // 1x1 transparent PNG.
    const PIXEL_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn loader() -> HttpImageLoader {
        HttpImageLoader::new(Client::new())
    }

    #[tokio::test]
    async fn data_url_images_are_probed() {
        let state = loader()
            .load(&format!("data:image/png;base64,{PIXEL_PNG}"))
            .await;
        assert_eq!(
            state,
            ImageState::Loaded {
                width: 1,
                height: 1
            }
        );
    }

    #[tokio::test]
    async fn non_base64_data_url_fails() {
        let state = loader().load("data:text/plain,hello").await;
        assert_eq!(state, ImageState::Failed);
    }

    #[tokio::test]
    async fn relative_sources_fail() {
        assert_eq!(loader().load("images/logo.png").await, ImageState::Failed);
    }

    #[tokio::test]
    async fn remote_images_are_fetched_and_probed() {
        let server = MockServer::start_async().await;
        let png = STANDARD.decode(PIXEL_PNG).expect("pixel");
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/logo.png");
                then.status(200)
                    .header("content-type", "image/png")
                    .body(png.clone());
            })
            .await;

        let state = loader().load(&server.url("/logo.png")).await;

        mock.assert_async().await;
        assert_eq!(
            state,
            ImageState::Loaded {
                width: 1,
                height: 1
            }
        );
    }

    #[tokio::test]
    async fn missing_remote_images_fail() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/gone.png");
                then.status(404);
            })
            .await;

        let state = loader().load(&server.url("/gone.png")).await;
        assert_eq!(state, ImageState::Failed);
    }
}
