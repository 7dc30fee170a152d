use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use super::options::{AspectRatio, ImageModel, VideoResolution, WorkflowKind};
use crate::error::AppError;

pub const MAX_PROMPT_LENGTH: u64 = 4000;

/// One ordered unit of a storyboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct Scene {
    #[validate(length(min = 1, max = 128))]
    pub id: String,
    #[validate(length(max = MAX_PROMPT_LENGTH))]
    pub prompt: String,
}

impl Scene {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            prompt: prompt.into(),
        }
    }

    pub fn with_id(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
        }
    }
}

/// Image used to steer the multimodal model.
#[derive(Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    pub mime_type: String,
    pub data: Bytes,
}

impl ReferenceImage {
    pub fn new(mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Parse a `data:<mime>;base64,<payload>` URL.
    pub fn from_data_url(url: &str) -> Result<Self, AppError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| AppError::InvalidInput("Reference image is not a data URL".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| AppError::InvalidInput("Malformed data URL".to_string()))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| AppError::InvalidInput("Data URL must be base64-encoded".to_string()))?;
        if !mime_type.starts_with("image/") {
            return Err(AppError::InvalidInput(format!(
                "Reference must be an image, got {}",
                mime_type
            )));
        }

        let data = STANDARD
            .decode(payload.trim())
            .map_err(|e| AppError::Decode(format!("Invalid base64 payload: {}", e)))?;

        Ok(Self::new(mime_type, data))
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }
}

impl fmt::Debug for ReferenceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceImage")
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Everything a caller submits for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerationRequest {
    #[validate(length(max = MAX_PROMPT_LENGTH))]
    pub base_prompt: String,
    #[validate(length(max = MAX_PROMPT_LENGTH))]
    pub negative_prompt: String,
    pub model: ImageModel,
    pub aspect_ratio: AspectRatio,
    pub image_count: u32,
    #[serde(default)]
    pub styles: Vec<String>,
    pub optimizer_enabled: bool,
    #[serde(skip)]
    pub reference_image: Option<ReferenceImage>,
    #[serde(default)]
    #[validate(length(max = 50), nested)]
    pub scenes: Vec<Scene>,
    pub workflow: WorkflowKind,
    pub video_resolution: VideoResolution,
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self {
            base_prompt: String::new(),
            negative_prompt: String::new(),
            model: ImageModel::default(),
            aspect_ratio: AspectRatio::default(),
            image_count: 1,
            styles: Vec::new(),
            optimizer_enabled: true,
            reference_image: None,
            scenes: Vec::new(),
            workflow: WorkflowKind::default(),
            video_resolution: VideoResolution::default(),
        }
    }
}

impl GenerationRequest {
    pub fn single(prompt: impl Into<String>) -> Self {
        Self {
            base_prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn storyboard(scenes: Vec<Scene>) -> Self {
        Self {
            workflow: WorkflowKind::Storyboard,
            scenes,
            ..Self::default()
        }
    }

    pub fn video(prompt: impl Into<String>) -> Self {
        Self {
            base_prompt: prompt.into(),
            workflow: WorkflowKind::Video,
            ..Self::default()
        }
    }

    /// Field-level checks plus the cross-field rules of each workflow.
    pub fn validate_request(&self) -> Result<(), AppError> {
        self.validate()?;

        match self.workflow {
            WorkflowKind::Single => {
                if self.base_prompt.trim().is_empty() {
                    return Err(AppError::InvalidInput("Prompt cannot be empty".to_string()));
                }
            }
            WorkflowKind::Storyboard => {
                if self.scenes.is_empty() {
                    return Err(AppError::InvalidInput(
                        "Storyboard needs at least one scene".to_string(),
                    ));
                }
                let mut seen = HashSet::with_capacity(self.scenes.len());
                for (index, scene) in self.scenes.iter().enumerate() {
                    if !seen.insert(scene.id.as_str()) {
                        return Err(AppError::InvalidInput(format!(
                            "Duplicate scene id: {}",
                            scene.id
                        )));
                    }
                    if scene.prompt.trim().is_empty() {
                        return Err(AppError::InvalidInput(format!(
                            "Scene {} has an empty prompt",
                            index + 1
                        )));
                    }
                }
            }
            WorkflowKind::Video => {
                if self.base_prompt.trim().is_empty() {
                    return Err(AppError::InvalidInput(
                        "Video prompt cannot be empty".to_string(),
                    ));
                }
                if !self.aspect_ratio.is_video_compatible() {
                    return Err(AppError::InvalidInput(format!(
                        "Aspect ratio {} is not supported for video",
                        self.aspect_ratio
                    )));
                }
            }
        }

        Ok(())
    }

    /// Number of images a single-image run asks for.
    pub fn effective_image_count(&self) -> u32 {
        self.image_count.clamp(1, self.model.max_images())
    }

    /// The reference image, if the selected model can use it.
    pub fn active_reference(&self) -> Option<&ReferenceImage> {
        self.reference_image
            .as_ref()
            .filter(|_| self.model.supports_reference_image())
    }
}
