use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Done,
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Done => write!(f, "done"),
        }
    }
}

/// Handle to a long-running video generation on the provider side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoJob {
    /// Provider operation name, used to poll.
    pub id: String,
    pub status: JobStatus,
    pub result_uri: Option<String>,
}

impl VideoJob {
    pub fn pending(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Pending,
            result_uri: None,
        }
    }

    pub fn done(id: impl Into<String>, result_uri: Option<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Done,
            result_uri,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == JobStatus::Done
    }
}
