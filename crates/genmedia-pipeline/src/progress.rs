//! Progress reporting
//!
//! A run emits [`ProgressEvent`]s over an unbounded channel; the UI layer
//! (the CLI here) observes them. Every event is also logged.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum PipelineStage {
    Composing,
    Generating,
    Scene { index: usize, total: usize },
    CredentialCheck,
    Submitting,
    Polling { attempt: u32 },
    Fetching,
    Done,
}

impl Display for PipelineStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            PipelineStage::Composing => write!(f, "composing"),
            PipelineStage::Generating => write!(f, "generating"),
            PipelineStage::Scene { index, total } => write!(f, "scene {}/{}", index + 1, total),
            PipelineStage::CredentialCheck => write!(f, "credential_check"),
            PipelineStage::Submitting => write!(f, "submitting"),
            PipelineStage::Polling { attempt } => write!(f, "polling #{}", attempt),
            PipelineStage::Fetching => write!(f, "fetching"),
            PipelineStage::Done => write!(f, "done"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    #[serde(flatten)]
    pub stage: PipelineStage,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressReporter {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A reporter that only logs.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn report(&self, stage: PipelineStage, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(stage = %stage, "{}", message);

        if let Some(tx) = &self.tx {
            let event = ProgressEvent {
                stage,
                message,
                at: Utc::now(),
            };
            if tx.send(event).is_err() {
                tracing::debug!("Progress receiver dropped");
            }
        }
    }
}
