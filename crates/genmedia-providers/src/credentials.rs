//! Credential selection side-channel
//!
//! Some hosts let the user pick the provider credential interactively. The
//! pipeline asks before starting a video job and re-opens the selector after
//! an authentication failure.

use async_trait::async_trait;

use genmedia_core::AppError;

#[async_trait]
pub trait CredentialSelector: Send + Sync {
    /// Whether the user has already chosen a credential.
    async fn has_selected_credential(&self) -> bool;

    /// Ask the user to choose (or re-choose) a credential.
    async fn open_selector(&self) -> Result<(), AppError>;
}
