//! Generation client
//!
//! Wraps a [`GenerationProvider`] and turns raw provider output into
//! pipeline assets: every image is sanitized (re-encoded as PNG) before it is
//! handed back, and finished videos are downloaded into a [`VideoAsset`].

use std::sync::Arc;

use genmedia_core::models::{ImageAsset, VideoAsset, VideoJob};
use genmedia_core::AppError;
use genmedia_processing::sanitize_image;

use crate::provider::{GenerationProvider, ImageGenerationRequest, VideoGenerationRequest};

#[derive(Clone)]
pub struct GenerationClient {
    provider: Arc<dyn GenerationProvider>,
}

impl GenerationClient {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn optimize(&self, instruction: &str) -> Result<String, AppError> {
        self.provider.optimize(instruction).await
    }

    /// Generate and sanitize images. Returns an empty list if the provider
    /// produced none.
    pub async fn generate_images(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<Vec<ImageAsset>, AppError> {
        let raw = self.provider.generate_images(request).await?;
        if raw.is_empty() {
            tracing::warn!(
                provider = %self.provider.name(),
                model = %request.model,
                "Provider returned no images"
            );
            return Ok(Vec::new());
        }

        let mut assets = Vec::with_capacity(raw.len());
        for (index, media) in raw.into_iter().enumerate() {
            // Decoding is CPU bound
            let sanitized = tokio::task::spawn_blocking(move || sanitize_image(&media.data))
                .await
                .map_err(|e| AppError::Internal(format!("Image sanitizer task failed: {}", e)))?
                .map_err(|e| match e {
                    AppError::Decode(msg) => {
                        AppError::Decode(format!("Generated image {}: {}", index + 1, msg))
                    }
                    other => other,
                })?;
            assets.push(ImageAsset::png(sanitized));
        }

        Ok(assets)
    }

    pub async fn submit_video(&self, request: &VideoGenerationRequest) -> Result<VideoJob, AppError> {
        self.provider.submit_video(request).await
    }

    pub async fn poll_video(&self, job: &VideoJob) -> Result<VideoJob, AppError> {
        self.provider.poll_video(job).await
    }

    /// Download the result of a finished job.
    pub async fn fetch_video(&self, job: &VideoJob) -> Result<VideoAsset, AppError> {
        let uri = job.result_uri.as_deref().ok_or_else(|| {
            AppError::Fetch("Video generation finished but no download link was found".to_string())
        })?;

        let media = self.provider.fetch_video_asset(uri).await.map_err(|e| match e {
            AppError::Fetch(_) => e,
            other => AppError::Fetch(other.to_string()),
        })?;

        Ok(VideoAsset::new(media.mime_type, media.data, uri))
    }
}
