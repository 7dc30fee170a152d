//! Image metadata inspection

use genmedia_core::AppError;
use image::ImageReader;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Image metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub size_bytes: u64,
}

impl ImageMetadata {
    /// Width over height, reduced (e.g. `16:9`).
    pub fn aspect_ratio(&self) -> String {
        fn gcd(a: u32, b: u32) -> u32 {
            if b == 0 {
                a
            } else {
                gcd(b, a % b)
            }
        }
        let divisor = gcd(self.width, self.height).max(1);
        format!("{}:{}", self.width / divisor, self.height / divisor)
    }
}

pub fn inspect_image(data: &[u8]) -> Result<ImageMetadata, AppError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| AppError::Decode(format!("Failed to read image: {}", e)))?;
    let format = reader
        .format()
        .map(|f| format!("{:?}", f))
        .unwrap_or_else(|| "unknown".to_string());
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| AppError::Decode(format!("Failed to read image dimensions: {}", e)))?;

    Ok(ImageMetadata {
        width,
        height,
        format,
        size_bytes: data.len() as u64,
    })
}
