//! Provider capability boundary
//!
//! A [`GenerationProvider`] is the raw vendor capability: it speaks the
//! vendor's wire format and classifies its failures into
//! [`UpstreamErrorKind`](genmedia_core::UpstreamErrorKind). Everything above
//! it (sanitizing, asset creation, orchestration) is vendor independent.

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use genmedia_core::models::{
    AspectRatio, ImageModel, ReferenceImage, VideoJob, VideoResolution,
};
use genmedia_core::AppError;

/// One image generation call.
#[derive(Debug, Clone)]
pub struct ImageGenerationRequest {
    pub prompt: String,
    pub model: ImageModel,
    /// Ignored by models that return a single image per call.
    pub count: u32,
    /// Ignored by models without aspect ratio control.
    pub aspect_ratio: AspectRatio,
    pub reference_image: Option<ReferenceImage>,
}

#[derive(Debug, Clone)]
pub struct VideoGenerationRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub resolution: VideoResolution,
    pub reference_image: Option<ReferenceImage>,
}

/// Media bytes exactly as the provider returned them.
#[derive(Clone)]
pub struct RawMedia {
    pub mime_type: String,
    pub data: Bytes,
}

impl RawMedia {
    pub fn new(mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }
}

impl Debug for RawMedia {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RawMedia")
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Provider name, for logs.
    fn name(&self) -> &str;

    /// Text completion used to rewrite prompts.
    async fn optimize(&self, instruction: &str) -> Result<String, AppError>;

    /// Generate images. An empty list is a valid answer.
    async fn generate_images(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<Vec<RawMedia>, AppError>;

    /// Start a long-running video generation.
    async fn submit_video(&self, request: &VideoGenerationRequest) -> Result<VideoJob, AppError>;

    /// Refresh the status of a video job.
    async fn poll_video(&self, job: &VideoJob) -> Result<VideoJob, AppError>;

    /// Download a finished video. Failures are `AppError::Fetch`.
    async fn fetch_video_asset(&self, uri: &str) -> Result<RawMedia, AppError>;
}
