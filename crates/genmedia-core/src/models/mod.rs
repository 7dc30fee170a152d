//! Data models for the generation pipeline
//!
//! Organized by concern: model/format options, the request a caller submits,
//! the media the pipeline produces, and the long-running video job handle.

mod media;
mod options;
mod request;
mod video;

pub use media::*;
pub use options::*;
pub use request::*;
pub use video::*;
