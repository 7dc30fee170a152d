//! Frame-to-GIF animation of storyboard images.

use genmedia_core::AppError;
use image::codecs::gif::{GifEncoder, Repeat};
use image::imageops::FilterType;
use image::{Delay, Frame};

pub const DEFAULT_FRAME_DELAY_MS: u32 = 500;

/// Encode the given images, in order, as a looping GIF.
///
/// Every frame is resized to the dimensions of the first one.
pub fn encode_frames<T: AsRef<[u8]>>(frames: &[T], delay_ms: u32) -> Result<Vec<u8>, AppError> {
    if frames.len() < 2 {
        return Err(AppError::InvalidInput(
            "At least two images are needed to build an animation".to_string(),
        ));
    }

    let mut decoded = Vec::with_capacity(frames.len());
    for (index, data) in frames.iter().enumerate() {
        let img = image::load_from_memory(data.as_ref()).map_err(|e| {
            AppError::Decode(format!("Failed to decode frame {}: {}", index + 1, e))
        })?;
        decoded.push(img);
    }

    let (width, height) = (decoded[0].width(), decoded[0].height());
    let delay = Delay::from_numer_denom_ms(delay_ms, 1);

    let mut buffer = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut buffer);
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|e| AppError::Internal(format!("Failed to configure GIF encoder: {}", e)))?;

        for (index, img) in decoded.into_iter().enumerate() {
            let rgba = if img.width() == width && img.height() == height {
                img.to_rgba8()
            } else {
                img.resize_exact(width, height, FilterType::Triangle).to_rgba8()
            };
            encoder
                .encode_frame(Frame::from_parts(rgba, 0, 0, delay))
                .map_err(|e| {
                    AppError::Internal(format!("Failed to encode frame {}: {}", index + 1, e))
                })?;
        }
    }

    tracing::info!(
        frames = frames.len(),
        width = width,
        height = height,
        delay_ms = delay_ms,
        gif_bytes = buffer.len(),
        "Animation encoded"
    );

    Ok(buffer)
}
