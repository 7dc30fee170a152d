use std::path::{Path, PathBuf};

use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use genmedia_core::models::{
    AspectRatio, GenerationRequest, ImageModel, MediaItem, ReferenceImage, Scene,
    VideoResolution, WorkflowKind, PNG_MIME_TYPE,
};
use genmedia_core::{AppError, Config};
use genmedia_processing::{
    load_font, inspect_image, sanitize_image, FontArc, TextOverlay, DEFAULT_FRAME_DELAY_MS,
};
use genmedia_providers::CredentialSelector;

#[derive(Parser, Debug)]
#[command(
    name = "genmedia",
    version,
    about = "Generate images, storyboards, and videos with Gemini"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Print a JSON summary of the written files
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate one or more images from a prompt
    Image {
        /// What to draw
        prompt: String,
        /// Number of images (1-4, Imagen 4 only)
        #[arg(long, default_value_t = 1)]
        count: u32,
        #[command(flatten)]
        style: StyleArgs,
        #[command(flatten)]
        overlay: OverlayArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Generate one image per scene, in order
    Storyboard {
        /// Scene prompt; repeat for every scene
        #[arg(long = "scene", required = true)]
        scenes: Vec<String>,
        /// Also write the scenes as a looping GIF
        #[arg(long)]
        animate: bool,
        /// Delay between GIF frames
        #[arg(long, default_value_t = DEFAULT_FRAME_DELAY_MS)]
        frame_delay_ms: u32,
        #[command(flatten)]
        style: StyleArgs,
        #[command(flatten)]
        overlay: OverlayArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Generate a short video clip
    Video {
        /// What happens in the clip
        prompt: String,
        /// 16:9 or 9:16
        #[arg(long, default_value_t = AspectRatio::Landscape)]
        aspect_ratio: AspectRatio,
        /// 720p or 1080p
        #[arg(long, default_value_t = VideoResolution::Hd)]
        resolution: VideoResolution,
        /// Image the first frame is based on
        #[arg(long)]
        reference: Option<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },
}

/// Prompt options shared by the image workflows.
#[derive(Args, Debug, Clone)]
pub struct StyleArgs {
    /// imagen-4.0-generate-001 or gemini-2.5-flash-image
    #[arg(long, default_value_t = ImageModel::Imagen4)]
    pub model: ImageModel,
    #[arg(long, default_value_t = AspectRatio::Landscape)]
    pub aspect_ratio: AspectRatio,
    /// Things to keep out of the image
    #[arg(long, default_value = "")]
    pub negative: String,
    /// Style tag; repeat for several
    #[arg(long = "style")]
    pub styles: Vec<String>,
    /// Use the prompt as written instead of asking the optimizer to rewrite it
    #[arg(long)]
    pub no_optimize: bool,
    /// Reference image (used by gemini-2.5-flash-image only)
    #[arg(long)]
    pub reference: Option<PathBuf>,
}

impl StyleArgs {
    fn apply(&self, request: &mut GenerationRequest) -> Result<(), AppError> {
        request.model = self.model;
        request.aspect_ratio = self.aspect_ratio;
        request.negative_prompt = self.negative.clone();
        request.styles = self.styles.clone();
        request.optimizer_enabled = !self.no_optimize;
        request.reference_image = self.reference.as_deref().map(load_reference).transpose()?;
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub struct OverlayArgs {
    /// Text drawn on a result image
    #[arg(long, requires = "font")]
    pub overlay_text: Option<String>,
    /// TTF or OTF font for the overlay
    #[arg(long)]
    pub font: Option<PathBuf>,
    #[arg(long, default_value_t = 48.0)]
    pub font_size: f32,
    /// #RRGGBB
    #[arg(long, default_value = "#FFFFFF")]
    pub color: String,
    /// Horizontal anchor, percent of the width
    #[arg(long, default_value_t = 50.0)]
    pub overlay_x: f32,
    /// Vertical anchor, percent of the height
    #[arg(long, default_value_t = 90.0)]
    pub overlay_y: f32,
    /// Zero-based index of the image to draw on
    #[arg(long, default_value_t = 0)]
    pub overlay_index: usize,
}

impl OverlayArgs {
    pub fn overlay(&self) -> Option<TextOverlay> {
        self.overlay_text.as_ref().map(|text| TextOverlay {
            text: text.clone(),
            font_size: self.font_size,
            color: self.color.clone(),
            x_percent: self.overlay_x,
            y_percent: self.overlay_y,
        })
    }

    /// Load the font and check the overlay settings before any generation
    /// call is made.
    pub fn prepare(&self) -> Result<Option<(TextOverlay, FontArc)>, AppError> {
        let Some(overlay) = self.overlay() else {
            return Ok(None);
        };
        overlay.validate()?;

        let path = self.font.as_deref().ok_or_else(|| {
            AppError::InvalidInput("--overlay-text needs --font".to_string())
        })?;
        let data = std::fs::read(path).map_err(|e| {
            AppError::InvalidInput(format!("Cannot read font {}: {}", path.display(), e))
        })?;
        Ok(Some((overlay, load_font(data)?)))
    }
}

#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Directory the results are written to
    #[arg(long, short, default_value = "out")]
    pub out: PathBuf,
}

impl Commands {
    pub fn workflow(&self) -> WorkflowKind {
        match self {
            Commands::Image { .. } => WorkflowKind::Single,
            Commands::Storyboard { .. } => WorkflowKind::Storyboard,
            Commands::Video { .. } => WorkflowKind::Video,
        }
    }

    pub fn output_dir(&self) -> &Path {
        match self {
            Commands::Image { output, .. }
            | Commands::Storyboard { output, .. }
            | Commands::Video { output, .. } => &output.out,
        }
    }

    pub fn overlay(&self) -> Option<&OverlayArgs> {
        match self {
            Commands::Image { overlay, .. } | Commands::Storyboard { overlay, .. } => Some(overlay),
            Commands::Video { .. } => None,
        }
    }

    /// Frame delay when a storyboard GIF was asked for.
    pub fn animation_delay(&self) -> Option<u32> {
        match self {
            Commands::Storyboard {
                animate: true,
                frame_delay_ms,
                ..
            } => Some(*frame_delay_ms),
            _ => None,
        }
    }

    pub fn build_request(&self) -> Result<GenerationRequest, AppError> {
        let request = match self {
            Commands::Image {
                prompt,
                count,
                style,
                ..
            } => {
                let mut request = GenerationRequest::single(prompt.clone());
                request.image_count = *count;
                style.apply(&mut request)?;
                request
            }
            Commands::Storyboard { scenes, style, .. } => {
                let scenes = scenes.iter().map(Scene::new).collect();
                let mut request = GenerationRequest::storyboard(scenes);
                style.apply(&mut request)?;
                request
            }
            Commands::Video {
                prompt,
                aspect_ratio,
                resolution,
                reference,
                ..
            } => {
                let mut request = GenerationRequest::video(prompt.clone());
                request.aspect_ratio = *aspect_ratio;
                request.video_resolution = *resolution;
                request.reference_image = reference.as_deref().map(load_reference).transpose()?;
                request
            }
        };
        Ok(request)
    }
}

/// Read a reference image from disk and re-encode it as PNG.
pub fn load_reference(path: &Path) -> Result<ReferenceImage, AppError> {
    let data = std::fs::read(path).map_err(|e| {
        AppError::InvalidInput(format!(
            "Cannot read reference image {}: {}",
            path.display(),
            e
        ))
    })?;
    let png = sanitize_image(&data)?;

    let meta = inspect_image(&png)?;
    tracing::info!(
        path = %path.display(),
        width = meta.width,
        height = meta.height,
        bytes = meta.size_bytes,
        aspect = %meta.aspect_ratio(),
        "Loaded reference image"
    );
    Ok(ReferenceImage::new(PNG_MIME_TYPE, png))
}

#[derive(Debug, Serialize)]
pub struct WrittenFile {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaItem>,
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub workflow: WorkflowKind,
    pub files: Vec<WrittenFile>,
}

/// Write every item to `dir`, creating it if needed.
pub async fn write_outputs(dir: &Path, items: &[MediaItem]) -> std::io::Result<Vec<WrittenFile>> {
    tokio::fs::create_dir_all(dir).await?;

    let mut written = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let path = dir.join(item.file_name(index));
        tokio::fs::write(&path, item.data()).await?;
        tracing::debug!(path = %path.display(), bytes = item.data().len(), "Wrote result");
        written.push(WrittenFile {
            path,
            media: Some(item.clone()),
        });
    }
    Ok(written)
}

pub async fn write_animation(dir: &Path, gif: &[u8]) -> std::io::Result<WrittenFile> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join("storyboard.gif");
    tokio::fs::write(&path, gif).await?;
    Ok(WrittenFile { path, media: None })
}

/// The credential comes from the environment; "selecting" one means telling
/// the user where to put it.
pub struct EnvCredentialSelector {
    has_key: bool,
}

impl EnvCredentialSelector {
    pub fn new(config: &Config) -> Self {
        Self {
            has_key: config.api_key.is_some(),
        }
    }
}

#[async_trait]
impl CredentialSelector for EnvCredentialSelector {
    async fn has_selected_credential(&self) -> bool {
        self.has_key
    }

    async fn open_selector(&self) -> Result<(), AppError> {
        eprintln!(
            "Set GEMINI_API_KEY (or API_KEY) in the environment or in .env, then run the command again."
        );
        Ok(())
    }
}

/// Initialize tracing for the CLI binary.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
