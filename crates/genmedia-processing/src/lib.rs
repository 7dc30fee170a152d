//! Genmedia Processing Library
//!
//! Local, provider-independent media work: sanitizing untrusted text and
//! images, drawing text overlays, encoding storyboard frames as a GIF, and
//! probing basic image metadata.

pub mod animation;
pub mod metadata;
pub mod overlay;
pub mod sanitizer;

pub use animation::{encode_frames, DEFAULT_FRAME_DELAY_MS};
pub use metadata::{inspect_image, ImageMetadata};
pub use overlay::{apply_text_overlay, load_font, TextOverlay};
pub use sanitizer::{sanitize_image, sanitize_text, NEUTRALIZED_MARKER};

// Re-exported so callers can hold a font without depending on ab_glyph.
pub use ab_glyph::FontArc;
