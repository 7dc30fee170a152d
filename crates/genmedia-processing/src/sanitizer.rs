//! Sanitizing of untrusted prompt text and provider image bytes.

use genmedia_core::AppError;
use image::ImageFormat;
use regex::Regex;
use std::io::Cursor;
use std::sync::LazyLock;

pub const NEUTRALIZED_MARKER: &str = "[instruction neutralized]";

const INJECTION_PHRASES: [&str; 6] = [
    "ignore previous instructions",
    "ignore all prior directives",
    "disregard the above prompt",
    "act as",
    "system prompt:",
    "user prompt:",
];

// Applied in order, one pass each.
static INJECTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    INJECTION_PHRASES
        .iter()
        .filter_map(|phrase| Regex::new(&format!("(?i){}", regex::escape(phrase))).ok())
        .collect()
});

fn is_allowed(c: char) -> bool {
    matches!(c, '\x20'..='\x7E' | '\n' | '\r' | '\t')
}

/// Strip characters outside printable ASCII and standard whitespace, then
/// neutralize known instruction-injection phrases.
pub fn sanitize_text(text: &str) -> String {
    let mut sanitized: String = text.chars().filter(|c| is_allowed(*c)).collect();

    for pattern in INJECTION_PATTERNS.iter() {
        if pattern.is_match(&sanitized) {
            sanitized = pattern
                .replace_all(&sanitized, NEUTRALIZED_MARKER)
                .into_owned();
        }
    }

    sanitized
}

/// Decode an image of any supported format and re-encode its pixels as PNG.
///
/// Only pixel data survives: EXIF, text chunks, and trailing bytes are dropped.
pub fn sanitize_image(data: &[u8]) -> Result<Vec<u8>, AppError> {
    let img = image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| AppError::Decode(format!("Failed to read image: {}", e)))?
        .decode()
        .map_err(|e| AppError::Decode(format!("Failed to decode image: {}", e)))?;

    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| AppError::Decode(format!("Failed to encode image as PNG: {}", e)))?;

    tracing::debug!(
        input_bytes = data.len(),
        output_bytes = buffer.len(),
        width = img.width(),
        height = img.height(),
        "Image sanitized"
    );

    Ok(buffer)
}
