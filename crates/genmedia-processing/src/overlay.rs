//! Text overlay on a generated image.
//!
//! Text is centred horizontally on the anchor point (given as a percentage of
//! the image size), sits on it as a baseline, and is drawn with a black outline
//! whose width scales with the font size.

use ab_glyph::{FontArc, PxScale};
use genmedia_core::AppError;
use image::{ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

const OUTLINE_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOverlay {
    pub text: String,
    pub font_size: f32,
    /// `#RRGGBB`
    pub color: String,
    pub x_percent: f32,
    pub y_percent: f32,
}

impl Default for TextOverlay {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size: 48.0,
            color: "#FFFFFF".to_string(),
            x_percent: 50.0,
            y_percent: 90.0,
        }
    }
}

impl TextOverlay {
    pub fn validate(&self) -> Result<Rgba<u8>, AppError> {
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return Err(AppError::InvalidInput(
                "Font size must be a positive number".to_string(),
            ));
        }
        for (name, value) in [("x", self.x_percent), ("y", self.y_percent)] {
            if !(0.0..=100.0).contains(&value) {
                return Err(AppError::InvalidInput(format!(
                    "Overlay {} position must be between 0 and 100, got {}",
                    name, value
                )));
            }
        }
        parse_hex_color(&self.color)
    }

    /// Outline width in pixels.
    pub fn outline_width(&self) -> i32 {
        ((self.font_size / 20.0).round() as i32).max(1)
    }
}

pub fn load_font(data: Vec<u8>) -> Result<FontArc, AppError> {
    FontArc::try_from_vec(data)
        .map_err(|e| AppError::InvalidInput(format!("Invalid font file: {}", e)))
}

/// Parse `#RRGGBB` (leading `#` optional) into an opaque colour.
pub fn parse_hex_color(value: &str) -> Result<Rgba<u8>, AppError> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AppError::InvalidInput(format!(
            "Invalid color '{}', expected #RRGGBB",
            value
        )));
    }

    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16)
            .map_err(|e| AppError::InvalidInput(format!("Invalid color '{}': {}", value, e)))
    };

    Ok(Rgba([channel(0..2)?, channel(2..4)?, channel(4..6)?, 255]))
}

/// Top-left corner for a text box of `text_width` x `text_height` anchored at
/// the percentage position.
pub fn text_origin(
    image_width: u32,
    image_height: u32,
    text_width: u32,
    text_height: u32,
    x_percent: f32,
    y_percent: f32,
) -> (i32, i32) {
    let anchor_x = image_width as f32 * x_percent / 100.0;
    let anchor_y = image_height as f32 * y_percent / 100.0;
    let x = anchor_x - text_width as f32 / 2.0;
    let y = anchor_y - text_height as f32;
    (x.round() as i32, y.round() as i32)
}

/// Draw `overlay` onto the encoded image and return the result as PNG.
pub fn apply_text_overlay(
    data: &[u8],
    overlay: &TextOverlay,
    font: &FontArc,
) -> Result<Vec<u8>, AppError> {
    let fill = overlay.validate()?;

    let mut canvas: RgbaImage = image::load_from_memory(data)
        .map_err(|e| AppError::Decode(format!("Failed to decode image: {}", e)))?
        .to_rgba8();

    if !overlay.text.trim().is_empty() {
        let scale = PxScale::from(overlay.font_size);
        let (text_width, text_height) = text_size(scale, font, &overlay.text);
        let (x, y) = text_origin(
            canvas.width(),
            canvas.height(),
            text_width,
            text_height,
            overlay.x_percent,
            overlay.y_percent,
        );

        let outline = overlay.outline_width();
        for dy in -outline..=outline {
            for dx in -outline..=outline {
                if dx == 0 && dy == 0 {
                    continue;
                }
                draw_text_mut(&mut canvas, OUTLINE_COLOR, x + dx, y + dy, scale, font, &overlay.text);
            }
        }
        draw_text_mut(&mut canvas, fill, x, y, scale, font, &overlay.text);

        tracing::debug!(
            text_len = overlay.text.len(),
            x = x,
            y = y,
            outline = outline,
            "Text overlay drawn"
        );
    }

    let mut buffer = Vec::new();
    canvas
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| AppError::Internal(format!("Failed to encode overlay image: {}", e)))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    fn create_test_image(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([40, 40, 200, 255]));
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        img.write_to(&mut cursor, ImageFormat::Png).unwrap();
        buffer
    }

    /// A font from GENMEDIA_TEST_FONT or a common system location, if any.
    const FIXTURE_FONT: &[u8] = include_bytes!("../tests/fixtures/DejaVuSans.ttf");

    fn fixture_font() -> FontArc {
        load_font(FIXTURE_FONT.to_vec()).unwrap()
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#FF8000").unwrap(), Rgba([255, 128, 0, 255]));
        assert_eq!(parse_hex_color("00ff00").unwrap(), Rgba([0, 255, 0, 255]));
        assert!(parse_hex_color("#FFF").is_err());
        assert!(parse_hex_color("#GG0000").is_err());
    }

    #[test]
    fn test_outline_width() {
        let mut overlay = TextOverlay::default();
        overlay.font_size = 10.0;
        assert_eq!(overlay.outline_width(), 1);
        overlay.font_size = 100.0;
        assert_eq!(overlay.outline_width(), 5);
    }

    #[test]
    fn test_text_origin_centres_horizontally() {
        assert_eq!(text_origin(200, 100, 60, 20, 50.0, 50.0), (70, 30));
        assert_eq!(text_origin(200, 100, 60, 20, 0.0, 100.0), (-30, 80));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let overlay = TextOverlay {
            x_percent: 120.0,
            ..TextOverlay::default()
        };
        assert!(matches!(overlay.validate(), Err(AppError::InvalidInput(_))));

        let overlay = TextOverlay {
            font_size: 0.0,
            ..TextOverlay::default()
        };
        assert!(overlay.validate().is_err());
    }

    #[test]
    fn test_load_font_rejects_garbage() {
        assert!(matches!(
            load_font(b"not a font".to_vec()),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_apply_text_overlay_keeps_dimensions() {
        let font = fixture_font();
        let input = create_test_image(160, 90);
        let overlay = TextOverlay {
            text: "Hello".to_string(),
            font_size: 24.0,
            ..TextOverlay::default()
        };

        let output = apply_text_overlay(&input, &overlay, &font).unwrap();
        let decoded = image::load_from_memory(&output).unwrap();
        assert_eq!(decoded.dimensions(), (160, 90));
        assert_ne!(decoded.to_rgba8(), image::load_from_memory(&input).unwrap().to_rgba8());
    }

    #[test]
    fn test_apply_text_overlay_empty_text_is_reencode() {
        let font = fixture_font();
        let input = create_test_image(32, 32);
        let output = apply_text_overlay(&input, &TextOverlay::default(), &font).unwrap();
        let decoded = image::load_from_memory(&output).unwrap();
        assert_eq!(decoded.to_rgba8(), image::load_from_memory(&input).unwrap().to_rgba8());
    }
}
