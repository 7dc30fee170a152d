//! Result store
//!
//! Holds the media of the last successful run. The orchestrator replaces it
//! wholesale; post-processing (overlay, animation) works on what it holds.

use genmedia_core::models::{ImageAsset, MediaItem, VideoAsset, WorkflowKind};
use genmedia_core::AppError;
use genmedia_processing::{apply_text_overlay, encode_frames, FontArc, TextOverlay};

#[derive(Debug, Default)]
pub struct ResultStore {
    workflow: Option<WorkflowKind>,
    items: Vec<MediaItem>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, workflow: WorkflowKind, items: Vec<MediaItem>) {
        self.workflow = Some(workflow);
        self.items = items;
    }

    pub fn clear(&mut self) {
        self.workflow = None;
        self.items.clear();
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn workflow(&self) -> Option<WorkflowKind> {
        self.workflow
    }

    pub fn is_storyboard(&self) -> bool {
        self.workflow == Some(WorkflowKind::Storyboard)
    }

    pub fn images(&self) -> Vec<&ImageAsset> {
        self.items.iter().filter_map(MediaItem::as_image).collect()
    }

    pub fn video(&self) -> Option<&VideoAsset> {
        self.items.iter().find_map(MediaItem::as_video)
    }

    /// Draw text on the item at `index` and store the edited image in its place.
    pub fn apply_text_overlay(
        &mut self,
        index: usize,
        overlay: &TextOverlay,
        font: &FontArc,
    ) -> Result<&ImageAsset, AppError> {
        let slot = self
            .items
            .get_mut(index)
            .ok_or_else(|| AppError::InvalidInput(format!("No result at index {}", index)))?;

        let MediaItem::Image(image) = slot else {
            return Err(AppError::InvalidInput(format!(
                "Result {} is not an image",
                index
            )));
        };

        let edited = apply_text_overlay(&image.data, overlay, font)?;
        *image = ImageAsset::png(edited);

        tracing::info!(index = index, image_id = %image.id, "Text overlay applied");
        Ok(image)
    }

    /// Encode the stored images, in order, as a looping GIF.
    pub fn animate(&self, delay_ms: u32) -> Result<Vec<u8>, AppError> {
        let frames: Vec<&[u8]> = self.images().into_iter().map(|i| i.data.as_ref()).collect();
        encode_frames(&frames, delay_ms)
    }
}
