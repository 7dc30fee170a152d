//! Genmedia Providers
//!
//! The capability boundary to the hosted generation service
//! ([`GenerationProvider`]), its Gemini implementation, and the
//! [`GenerationClient`] the pipeline talks to.

pub mod client;
pub mod credentials;
pub mod gemini;
pub mod provider;

pub use client::GenerationClient;
pub use credentials::CredentialSelector;
pub use gemini::GeminiProvider;
pub use provider::{GenerationProvider, ImageGenerationRequest, RawMedia, VideoGenerationRequest};
