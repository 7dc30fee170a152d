//! Gemini provider over the Generative Language REST API
//!
//! - prompt optimization: `models/{optimizer}:generateContent`
//! - batch images (Imagen): `models/{model}:predict`
//! - multimodal images (Gemini image models): `models/{model}:generateContent`
//! - video (Veo): `models/{video}:predictLongRunning`, then `GET {operation}`

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use genmedia_core::models::{ImageModel, ReferenceImage, VideoJob, MP4_MIME_TYPE, PNG_MIME_TYPE};
use genmedia_core::{AppError, Config, UpstreamErrorKind};

use crate::provider::{
    GenerationProvider, ImageGenerationRequest, RawMedia, VideoGenerationRequest,
};

const API_KEY_HEADER: &str = "x-goog-api-key";
const VIDEO_DOWNLOAD_TIMEOUT_SECS: u64 = 600;

pub struct GeminiProvider {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    optimizer_model: String,
    video_model: String,
}

impl Debug for GeminiProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GeminiProvider")
            .field("base_url", &self.base_url)
            .field("optimizer_model", &self.optimizer_model)
            .field("video_model", &self.video_model)
            .finish()
    }
}

// generateContent request/response structures
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            inline_data: None,
        }
    }

    fn image(image: &ReferenceImage) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: image.mime_type.clone(),
                data: image.to_base64(),
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GenerateContentResponse {
    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
    }
}

// predict (Imagen) structures
#[derive(Debug, Serialize)]
struct PredictRequest<I: Serialize, P: Serialize> {
    instances: Vec<I>,
    parameters: P,
}

#[derive(Debug, Serialize)]
struct ImagenInstance {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImagenParameters {
    sample_count: u32,
    aspect_ratio: String,
    output_options: OutputOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutputOptions {
    mime_type: String,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

// predictLongRunning (Veo) structures
#[derive(Debug, Serialize)]
struct VeoInstance {
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<VeoImage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VeoImage {
    bytes_base64_encoded: String,
    mime_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VeoParameters {
    aspect_ratio: String,
    resolution: String,
}

#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<GoogleError>,
    #[serde(default)]
    response: Option<OperationResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    video: Option<VideoRef>,
}

#[derive(Debug, Deserialize)]
struct VideoRef {
    uri: Option<String>,
}

impl Operation {
    fn result_uri(&self) -> Option<String> {
        self.response
            .as_ref()?
            .generate_video_response
            .as_ref()?
            .generated_samples
            .iter()
            .find_map(|s| s.video.as_ref()?.uri.clone())
    }
}

// Google error envelope: {"error": {"code", "message", "status", "details": [{"reason"}]}}
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: Option<String>,
}

impl GoogleError {
    fn has_reason(&self, reason: &str) -> bool {
        self.details
            .iter()
            .any(|d| d.reason.as_deref() == Some(reason))
    }

    fn kind(&self) -> UpstreamErrorKind {
        if self.has_reason("API_KEY_INVALID") {
            return UpstreamErrorKind::Authentication;
        }
        match self.status.as_deref() {
            Some("UNAUTHENTICATED") | Some("PERMISSION_DENIED") | Some("NOT_FOUND") => {
                UpstreamErrorKind::Authentication
            }
            Some("RESOURCE_EXHAUSTED") => UpstreamErrorKind::RateLimited,
            _ => match self.code {
                Some(401) | Some(403) => UpstreamErrorKind::Authentication,
                Some(429) => UpstreamErrorKind::RateLimited,
                _ => UpstreamErrorKind::Provider,
            },
        }
    }
}

/// Map a non-success response to a classified upstream error.
fn classify_error(status: StatusCode, body: &str) -> AppError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();

    let kind = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => UpstreamErrorKind::Authentication,
        StatusCode::TOO_MANY_REQUESTS => UpstreamErrorKind::RateLimited,
        _ => parsed
            .as_ref()
            .map(|e| e.error.kind())
            .unwrap_or(UpstreamErrorKind::Provider),
    };

    let message = match parsed {
        Some(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
        _ if body.trim().is_empty() => format!("Provider returned {}", status),
        _ => format!("Provider returned {}: {}", status, body.trim()),
    };

    AppError::upstream(kind, message)
}

fn transport_error(context: &str, err: reqwest::Error) -> AppError {
    AppError::upstream(UpstreamErrorKind::Transport, format!("{}: {}", context, err))
}

impl GeminiProvider {
    /// Build a provider from configuration. Fails if no API key is configured.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let api_key = config.require_api_key()?.to_string();

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            optimizer_model: config.optimizer_model.clone(),
            video_model: config.video_model.clone(),
        })
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    async fn read_json<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, AppError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error("Failed to read provider response", e))?;

        if !status.is_success() {
            return Err(classify_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            AppError::upstream(
                UpstreamErrorKind::InvalidResponse,
                format!("Failed to parse provider response: {}", e),
            )
        })
    }

    async fn post_json<B: Serialize, R: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<R, AppError> {
        let response = self
            .http_client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error("Failed to send request to Gemini API", e))?;

        Self::read_json(response).await
    }

    async fn get_json<R: DeserializeOwned>(&self, url: &str) -> Result<R, AppError> {
        let response = self
            .http_client
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| transport_error("Failed to send request to Gemini API", e))?;

        Self::read_json(response).await
    }

    async fn generate_batch(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<Vec<RawMedia>, AppError> {
        let body = PredictRequest {
            instances: vec![ImagenInstance {
                prompt: request.prompt.clone(),
            }],
            parameters: ImagenParameters {
                sample_count: request.count.clamp(1, request.model.max_images()),
                aspect_ratio: request.aspect_ratio.as_str().to_string(),
                output_options: OutputOptions {
                    mime_type: PNG_MIME_TYPE.to_string(),
                },
            },
        };

        let response: PredictResponse = self
            .post_json(&self.model_url(request.model.id(), "predict"), &body)
            .await?;

        response
            .predictions
            .into_iter()
            .filter_map(|p| Some((p.bytes_base64_encoded?, p.mime_type)))
            .map(|(data, mime_type)| {
                let mime_type = mime_type.unwrap_or_else(|| PNG_MIME_TYPE.to_string());
                decode_inline(&data).map(|bytes| RawMedia::new(mime_type, bytes))
            })
            .collect()
    }

    async fn generate_multimodal(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<Vec<RawMedia>, AppError> {
        let mut parts = Vec::with_capacity(2);
        if let Some(reference) = &request.reference_image {
            parts.push(Part::image(reference));
        }
        parts.push(Part::text(&request.prompt));

        let body = GenerateContentRequest {
            contents: vec![Content { parts }],
            generation_config: Some(GenerationConfig {
                response_modalities: vec!["IMAGE".to_string()],
            }),
        };

        let response: GenerateContentResponse = self
            .post_json(&self.model_url(request.model.id(), "generateContent"), &body)
            .await?;

        let images = response
            .parts()
            .filter_map(|p| p.inline_data.as_ref())
            .map(|inline| {
                decode_inline(&inline.data)
                    .map(|bytes| RawMedia::new(inline.mime_type.clone(), bytes))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(images)
    }
}

fn decode_inline(data: &str) -> Result<Vec<u8>, AppError> {
    STANDARD.decode(data).map_err(|e| {
        AppError::upstream(
            UpstreamErrorKind::InvalidResponse,
            format!("Provider returned invalid base64 image data: {}", e),
        )
    })
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn optimize(&self, instruction: &str) -> Result<String, AppError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part::text(instruction)],
            }],
            generation_config: None,
        };

        let response: GenerateContentResponse = self
            .post_json(&self.model_url(&self.optimizer_model, "generateContent"), &body)
            .await?;

        let text: String = response
            .parts()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(AppError::upstream(
                UpstreamErrorKind::InvalidResponse,
                "Prompt optimizer returned no text",
            ));
        }

        tracing::debug!(
            model = %self.optimizer_model,
            chars = text.len(),
            "Prompt optimization response received"
        );

        Ok(text)
    }

    async fn generate_images(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<Vec<RawMedia>, AppError> {
        let images = match request.model {
            ImageModel::Imagen4 => self.generate_batch(request).await?,
            ImageModel::GeminiFlashImage => self.generate_multimodal(request).await?,
        };

        tracing::debug!(
            model = %request.model,
            images = images.len(),
            "Image generation response received"
        );

        Ok(images)
    }

    async fn submit_video(&self, request: &VideoGenerationRequest) -> Result<VideoJob, AppError> {
        let body = PredictRequest {
            instances: vec![VeoInstance {
                prompt: request.prompt.clone(),
                image: request.reference_image.as_ref().map(|image| VeoImage {
                    bytes_base64_encoded: image.to_base64(),
                    mime_type: image.mime_type.clone(),
                }),
            }],
            parameters: VeoParameters {
                aspect_ratio: request.aspect_ratio.as_str().to_string(),
                resolution: request.resolution.as_str().to_string(),
            },
        };

        let operation: Operation = self
            .post_json(&self.model_url(&self.video_model, "predictLongRunning"), &body)
            .await?;

        tracing::info!(
            operation = %operation.name,
            model = %self.video_model,
            "Video generation operation created"
        );

        operation_to_job(operation)
    }

    async fn poll_video(&self, job: &VideoJob) -> Result<VideoJob, AppError> {
        let url = format!("{}/{}", self.base_url, job.id.trim_start_matches('/'));
        let operation: Operation = self.get_json(&url).await?;
        operation_to_job(operation)
    }

    async fn fetch_video_asset(&self, uri: &str) -> Result<RawMedia, AppError> {
        tracing::info!(uri = %uri, "Downloading generated video");

        let response = self
            .http_client
            .get(uri)
            .header(API_KEY_HEADER, &self.api_key)
            .timeout(Duration::from_secs(VIDEO_DOWNLOAD_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| AppError::Fetch(format!("Failed to download video: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Fetch(format!(
                "Failed to download video: {}",
                status
            )));
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.starts_with("video/"))
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .unwrap_or_else(|| MP4_MIME_TYPE.to_string());

        let data = response
            .bytes()
            .await
            .map_err(|e| AppError::Fetch(format!("Failed to read video data: {}", e)))?;

        if data.is_empty() {
            return Err(AppError::Fetch("Downloaded video is empty".to_string()));
        }

        Ok(RawMedia::new(mime_type, data))
    }
}

fn operation_to_job(operation: Operation) -> Result<VideoJob, AppError> {
    if let Some(error) = &operation.error {
        return Err(AppError::upstream(
            error.kind(),
            format!("Video generation failed: {}", error.message),
        ));
    }

    if operation.done {
        let uri = operation.result_uri();
        Ok(VideoJob::done(operation.name, uri))
    } else {
        Ok(VideoJob::pending(operation.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genmedia_core::models::{AspectRatio, JobStatus, VideoResolution};
    use mockito::Matcher;
    use serde_json::json;
    use tokio_test::assert_ok;

    const TEST_KEY: &str = "test-api-key";

    fn provider_for(server: &mockito::ServerGuard) -> GeminiProvider {
        let config = Config {
            api_key: Some(TEST_KEY.to_string()),
            api_base_url: server.url(),
            ..Config::default()
        };
        GeminiProvider::new(&config).unwrap()
    }

    fn image_request(model: ImageModel) -> ImageGenerationRequest {
        ImageGenerationRequest {
            prompt: "a lighthouse at dusk".to_string(),
            model,
            count: 2,
            aspect_ratio: AspectRatio::Portrait,
            reference_image: None,
        }
    }

    #[test]
    fn test_new_without_key_is_config_error() {
        let result = GeminiProvider::new(&Config::default());
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_classify_error() {
        let body = json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT",
                "details": [{"@type": "type.googleapis.com/google.rpc.ErrorInfo", "reason": "API_KEY_INVALID"}]
            }
        })
        .to_string();
        let err = classify_error(StatusCode::BAD_REQUEST, &body);
        assert!(err.is_authentication());
        assert!(err.to_string().contains("API key not valid"));

        let body = json!({"error": {"code": 404, "message": "Requested entity was not found.", "status": "NOT_FOUND"}}).to_string();
        assert!(classify_error(StatusCode::NOT_FOUND, &body).is_authentication());

        let err = classify_error(StatusCode::TOO_MANY_REQUESTS, "");
        assert_eq!(err.upstream_kind(), Some(UpstreamErrorKind::RateLimited));

        let err = classify_error(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert_eq!(err.upstream_kind(), Some(UpstreamErrorKind::Provider));
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_optimize_returns_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-pro:generateContent")
            .match_header(API_KEY_HEADER, TEST_KEY)
            .match_body(Matcher::PartialJson(json!({
                "contents": [{"parts": [{"text": "rewrite this"}]}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"candidates": [{"content": {"parts": [{"text": "  A vivid lighthouse  "}]}}]})
                    .to_string(),
            )
            .create_async()
            .await;

        let provider = provider_for(&server);
        let text = assert_ok!(provider.optimize("rewrite this").await);
        assert_eq!(text, "  A vivid lighthouse  ");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_optimize_blank_answer_is_invalid_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gemini-2.5-pro:generateContent")
            .with_status(200)
            .with_body(json!({"candidates": [{"content": {"parts": [{"text": "   "}]}}]}).to_string())
            .create_async()
            .await;

        let err = provider_for(&server).optimize("rewrite this").await.unwrap_err();
        let kind = err.upstream_kind();
        assert_eq!(kind, Some(UpstreamErrorKind::InvalidResponse));
        assert!(!kind.is_some_and(|k| k.is_transient()));
    }

    #[tokio::test]
    async fn test_optimize_auth_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gemini-2.5-pro:generateContent")
            .with_status(400)
            .with_body(
                json!({"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT",
                    "details": [{"reason": "API_KEY_INVALID"}]}})
                .to_string(),
            )
            .create_async()
            .await;

        let err = provider_for(&server).optimize("x").await.unwrap_err();
        assert!(err.is_authentication());
    }

    #[tokio::test]
    async fn test_generate_batch_images() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/imagen-4.0-generate-001:predict")
            .match_header(API_KEY_HEADER, TEST_KEY)
            .match_body(Matcher::PartialJson(json!({
                "instances": [{"prompt": "a lighthouse at dusk"}],
                "parameters": {"sampleCount": 2, "aspectRatio": "9:16"}
            })))
            .with_status(200)
            .with_body(
                json!({"predictions": [
                    {"bytesBase64Encoded": STANDARD.encode([1u8, 2, 3]), "mimeType": "image/png"},
                    {"bytesBase64Encoded": STANDARD.encode([4u8, 5])}
                ]})
                .to_string(),
            )
            .create_async()
            .await;

        let images = provider_for(&server)
            .generate_images(&image_request(ImageModel::Imagen4))
            .await
            .unwrap();

        assert_eq!(images.len(), 2);
        assert_eq!(images[0].data.as_ref(), &[1, 2, 3]);
        assert_eq!(images[1].mime_type, "image/png");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_multimodal_with_reference() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash-image:generateContent")
            .match_body(Matcher::PartialJson(json!({
                "contents": [{"parts": [
                    {"inlineData": {"mimeType": "image/jpeg", "data": "CQg="}},
                    {"text": "a lighthouse at dusk"}
                ]}],
                "generationConfig": {"responseModalities": ["IMAGE"]}
            })))
            .with_status(200)
            .with_body(
                json!({"candidates": [{"content": {"parts": [
                    {"text": "Here you go"},
                    {"inlineData": {"mimeType": "image/png", "data": STANDARD.encode([7u8, 7])}}
                ]}}]})
                .to_string(),
            )
            .create_async()
            .await;

        let mut request = image_request(ImageModel::GeminiFlashImage);
        request.reference_image = Some(ReferenceImage::new("image/jpeg", vec![9u8, 8]));

        let images = provider_for(&server).generate_images(&request).await.unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].data.as_ref(), &[7, 7]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_multimodal_without_images_is_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gemini-2.5-flash-image:generateContent")
            .with_status(200)
            .with_body(json!({"candidates": [{"content": {"parts": [{"text": "no"}]}}]}).to_string())
            .create_async()
            .await;

        let images = provider_for(&server)
            .generate_images(&image_request(ImageModel::GeminiFlashImage))
            .await
            .unwrap();
        assert!(images.is_empty());
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/imagen-4.0-generate-001:predict")
            .with_status(429)
            .with_body(json!({"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}).to_string())
            .create_async()
            .await;

        let err = provider_for(&server)
            .generate_images(&image_request(ImageModel::Imagen4))
            .await
            .unwrap_err();
        assert_eq!(err.upstream_kind(), Some(UpstreamErrorKind::RateLimited));
        assert_eq!(err.to_string(), "Upstream error (rate_limited): Quota exceeded");
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/imagen-4.0-generate-001:predict")
            .with_status(200)
            .with_body("<html>")
            .create_async()
            .await;

        let err = provider_for(&server)
            .generate_images(&image_request(ImageModel::Imagen4))
            .await
            .unwrap_err();
        assert_eq!(err.upstream_kind(), Some(UpstreamErrorKind::InvalidResponse));
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let config = Config {
            api_key: Some(TEST_KEY.to_string()),
            api_base_url: "http://127.0.0.1:1".to_string(),
            ..Config::default()
        };
        let provider = GeminiProvider::new(&config).unwrap();
        let err = provider.optimize("x").await.unwrap_err();
        assert_eq!(err.upstream_kind(), Some(UpstreamErrorKind::Transport));
    }

    #[tokio::test]
    async fn test_video_submit_poll_fetch() {
        let mut server = mockito::Server::new_async().await;
        let operation = "models/veo-3.1-fast-generate-preview/operations/op123";
        let video_uri = format!("{}/files/video.mp4", server.url());

        let submit = server
            .mock("POST", "/models/veo-3.1-fast-generate-preview:predictLongRunning")
            .match_body(Matcher::PartialJson(json!({
                "instances": [{"prompt": "waves"}],
                "parameters": {"aspectRatio": "16:9", "resolution": "1080p"}
            })))
            .with_status(200)
            .with_body(json!({"name": operation}).to_string())
            .create_async()
            .await;

        let poll = server
            .mock("GET", format!("/{}", operation).as_str())
            .match_header(API_KEY_HEADER, TEST_KEY)
            .with_status(200)
            .with_body(
                json!({"name": operation, "done": true, "response": {"generateVideoResponse": {
                    "generatedSamples": [{"video": {"uri": video_uri}}]
                }}})
                .to_string(),
            )
            .create_async()
            .await;

        let download = server
            .mock("GET", "/files/video.mp4")
            .match_header(API_KEY_HEADER, TEST_KEY)
            .with_status(200)
            .with_header("content-type", "video/mp4")
            .with_body(vec![0u8, 0, 0, 24, 102, 116, 121, 112])
            .create_async()
            .await;

        let provider = provider_for(&server);
        let request = VideoGenerationRequest {
            prompt: "waves".to_string(),
            aspect_ratio: AspectRatio::Landscape,
            resolution: VideoResolution::FullHd,
            reference_image: None,
        };

        let job = provider.submit_video(&request).await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.id, operation);

        let job = provider.poll_video(&job).await.unwrap();
        assert!(job.is_done());
        assert_eq!(job.result_uri.as_deref(), Some(video_uri.as_str()));

        let video = provider
            .fetch_video_asset(job.result_uri.as_deref().unwrap())
            .await
            .unwrap();
        assert_eq!(video.mime_type, "video/mp4");
        assert_eq!(video.data.len(), 8);

        submit.assert_async().await;
        poll.assert_async().await;
        download.assert_async().await;
    }

    #[tokio::test]
    async fn test_poll_operation_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/operations/op1")
            .with_status(200)
            .with_body(
                json!({"name": "operations/op1", "done": true,
                    "error": {"code": 3, "message": "Prompt was blocked"}})
                .to_string(),
            )
            .create_async()
            .await;

        let err = provider_for(&server)
            .poll_video(&VideoJob::pending("operations/op1"))
            .await
            .unwrap_err();
        assert_eq!(err.upstream_kind(), Some(UpstreamErrorKind::Provider));
        assert!(err.to_string().contains("Prompt was blocked"));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_fetch_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/files/missing.mp4")
            .with_status(500)
            .create_async()
            .await;

        let uri = format!("{}/files/missing.mp4", server.url());
        let err = provider_for(&server).fetch_video_asset(&uri).await.unwrap_err();
        assert!(matches!(err, AppError::Fetch(_)));
    }
}
