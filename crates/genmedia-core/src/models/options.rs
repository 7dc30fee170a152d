use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::error::AppError;

/// Image generation model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum ImageModel {
    /// Batch text-to-image model: honours image count and aspect ratio.
    #[default]
    #[serde(rename = "imagen-4.0-generate-001")]
    Imagen4,
    /// Multimodal model: accepts a reference image, one image per call.
    #[serde(rename = "gemini-2.5-flash-image")]
    GeminiFlashImage,
}

impl ImageModel {
    pub const ALL: [ImageModel; 2] = [ImageModel::Imagen4, ImageModel::GeminiFlashImage];

    pub fn id(&self) -> &'static str {
        match self {
            ImageModel::Imagen4 => "imagen-4.0-generate-001",
            ImageModel::GeminiFlashImage => "gemini-2.5-flash-image",
        }
    }

    pub fn supports_reference_image(&self) -> bool {
        matches!(self, ImageModel::GeminiFlashImage)
    }

    /// Largest number of images a single call may return.
    pub fn max_images(&self) -> u32 {
        match self {
            ImageModel::Imagen4 => 4,
            ImageModel::GeminiFlashImage => 1,
        }
    }
}

impl Display for ImageModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.id())
    }
}

impl FromStr for ImageModel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "imagen-4.0-generate-001" | "imagen4" => Ok(ImageModel::Imagen4),
            "gemini-2.5-flash-image" | "flash" => Ok(ImageModel::GeminiFlashImage),
            other => Err(AppError::InvalidInput(format!(
                "Unknown image model: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "4:3")]
    Standard,
    #[serde(rename = "3:4")]
    Tall,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Landscape,
        AspectRatio::Portrait,
        AspectRatio::Standard,
        AspectRatio::Tall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Standard => "4:3",
            AspectRatio::Tall => "3:4",
        }
    }

    /// Video generation only accepts 16:9 and 9:16.
    pub fn is_video_compatible(&self) -> bool {
        matches!(self, AspectRatio::Landscape | AspectRatio::Portrait)
    }
}

impl Display for AspectRatio {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AspectRatio::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == s.trim())
            .ok_or_else(|| AppError::InvalidInput(format!("Unsupported aspect ratio: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum VideoResolution {
    #[default]
    #[serde(rename = "720p")]
    Hd,
    #[serde(rename = "1080p")]
    FullHd,
}

impl VideoResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoResolution::Hd => "720p",
            VideoResolution::FullHd => "1080p",
        }
    }
}

impl Display for VideoResolution {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoResolution {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "720p" => Ok(VideoResolution::Hd),
            "1080p" => Ok(VideoResolution::FullHd),
            other => Err(AppError::InvalidInput(format!(
                "Unsupported video resolution: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowKind {
    #[default]
    Single,
    Storyboard,
    Video,
}

impl Display for WorkflowKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            WorkflowKind::Single => write!(f, "single"),
            WorkflowKind::Storyboard => write!(f, "storyboard"),
            WorkflowKind::Video => write!(f, "video"),
        }
    }
}

impl FromStr for WorkflowKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(WorkflowKind::Single),
            "storyboard" => Ok(WorkflowKind::Storyboard),
            "video" => Ok(WorkflowKind::Video),
            _ => Err(AppError::InvalidInput(format!("Invalid workflow: {}", s))),
        }
    }
}
