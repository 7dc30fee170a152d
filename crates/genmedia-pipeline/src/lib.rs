//! Generation pipeline
//!
//! Turns a [`GenerationRequest`](genmedia_core::models::GenerationRequest)
//! into media: prompt composition, the single/storyboard/video workflows,
//! progress reporting, and the store holding the last successful result.

pub mod composer;
pub mod orchestrator;
pub mod policy;
pub mod progress;
pub mod store;

#[cfg(test)]
mod test_support;

pub use composer::{PromptComposer, PromptSpec};
pub use orchestrator::Orchestrator;
pub use policy::PollPolicy;
pub use progress::{PipelineStage, ProgressEvent, ProgressReporter};
pub use store::ResultStore;
pub use tokio_util::sync::CancellationToken;
