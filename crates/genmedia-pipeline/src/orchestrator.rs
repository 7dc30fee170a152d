//! Pipeline orchestrator
//!
//! Runs one [`GenerationRequest`] through its workflow:
//!
//! - single: compose, generate
//! - storyboard: for each scene in order, compose (threading the previous
//!   optimized prompt forward) and generate one image
//! - video: submit, poll at a fixed interval until done, fetch
//!
//! Only one run may be in flight per orchestrator; a second concurrent run is
//! rejected, never queued. Results are published to the [`ResultStore`] only
//! when the whole run succeeds.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use genmedia_core::models::{GenerationRequest, MediaItem, VideoJob, WorkflowKind};
use genmedia_core::{AppError, ErrorMetadata, LogLevel};
use genmedia_processing::sanitize_text;
use genmedia_providers::{
    CredentialSelector, GenerationClient, ImageGenerationRequest, VideoGenerationRequest,
};

use crate::composer::{PromptComposer, PromptSpec};
use crate::policy::PollPolicy;
use crate::progress::{PipelineStage, ProgressReporter};
use crate::store::ResultStore;

/// Clears the in-flight flag when the run ends, however it ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Await `future` unless `cancel` fires first.
async fn cancellable<T, F>(cancel: &CancellationToken, future: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AppError::Cancelled),
        result = future => result,
    }
}

fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<(), AppError> {
    if cancel.is_cancelled() {
        Err(AppError::Cancelled)
    } else {
        Ok(())
    }
}

/// Copy of the request with every free-text field sanitized.
fn sanitized(request: &GenerationRequest) -> GenerationRequest {
    let mut clean = request.clone();
    clean.base_prompt = sanitize_text(&request.base_prompt);
    clean.negative_prompt = sanitize_text(&request.negative_prompt);
    clean.styles = request.styles.iter().map(|s| sanitize_text(s)).collect();
    for scene in &mut clean.scenes {
        scene.prompt = sanitize_text(&scene.prompt);
    }
    clean
}

pub struct Orchestrator {
    client: GenerationClient,
    composer: PromptComposer,
    credentials: Option<Arc<dyn CredentialSelector>>,
    poll_policy: PollPolicy,
    store: Arc<RwLock<ResultStore>>,
    in_flight: AtomicBool,
}

impl Orchestrator {
    pub fn new(client: GenerationClient) -> Self {
        Self {
            composer: PromptComposer::new(client.clone()),
            client,
            credentials: None,
            poll_policy: PollPolicy::default(),
            store: Arc::new(RwLock::new(ResultStore::new())),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn with_credential_selector(mut self, selector: Arc<dyn CredentialSelector>) -> Self {
        self.credentials = Some(selector);
        self
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    pub fn store(&self) -> Arc<RwLock<ResultStore>> {
        self.store.clone()
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one request to completion.
    ///
    /// Fails with [`AppError::RunInFlight`] if another run is in progress and
    /// with [`AppError::Cancelled`] if `cancel` fires at any suspend point.
    pub async fn run(
        &self,
        request: &GenerationRequest,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<Vec<MediaItem>, AppError> {
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(AppError::RunInFlight)?;

        let request = sanitized(request);
        request.validate_request()?;

        self.store.write().await.clear();

        let started = Instant::now();
        tracing::info!(
            workflow = %request.workflow,
            model = %request.model,
            provider = %self.client.provider_name(),
            optimizer = request.optimizer_enabled,
            "Generation run started"
        );

        let result = match request.workflow {
            WorkflowKind::Single => self.run_single(&request, progress, cancel).await,
            WorkflowKind::Storyboard => self.run_storyboard(&request, progress, cancel).await,
            WorkflowKind::Video => self.run_video(&request, progress, cancel).await,
        };

        match result {
            Ok(items) => {
                self.store
                    .write()
                    .await
                    .replace(request.workflow, items.clone());
                progress.report(PipelineStage::Done, "Generation complete.");
                tracing::info!(
                    workflow = %request.workflow,
                    items = items.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Generation run completed"
                );
                Ok(items)
            }
            Err(e) => {
                if e.is_authentication() {
                    self.reopen_credential_selector().await;
                }
                match e.log_level() {
                    LogLevel::Debug => tracing::debug!(
                        error = %e, code = e.error_code(), workflow = %request.workflow,
                        "Generation run failed"
                    ),
                    LogLevel::Warn => tracing::warn!(
                        error = %e, code = e.error_code(), workflow = %request.workflow,
                        "Generation run failed"
                    ),
                    LogLevel::Error => tracing::error!(
                        error = %e, code = e.error_code(), workflow = %request.workflow,
                        "Generation run failed"
                    ),
                }
                Err(e)
            }
        }
    }

    async fn reopen_credential_selector(&self) {
        if let Some(selector) = &self.credentials {
            if let Err(e) = selector.open_selector().await {
                tracing::warn!(error = %e, "Failed to open credential selector");
            }
        }
    }

    async fn run_single(
        &self,
        request: &GenerationRequest,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<Vec<MediaItem>, AppError> {
        let reference = request.active_reference().cloned();

        if request.optimizer_enabled {
            progress.report(PipelineStage::Composing, "Optimizing prompt...");
        }
        let spec = PromptSpec {
            has_reference_image: reference.is_some(),
            ..PromptSpec::new(
                &request.base_prompt,
                &request.negative_prompt,
                &request.styles,
                request.model,
            )
        };
        let prompt = cancellable(
            cancel,
            self.composer.compose(&spec, request.optimizer_enabled),
        )
        .await?;

        progress.report(
            PipelineStage::Generating,
            format!("Generating with {}...", request.model),
        );
        let generation = ImageGenerationRequest {
            prompt,
            model: request.model,
            count: request.effective_image_count(),
            aspect_ratio: request.aspect_ratio,
            reference_image: reference,
        };
        let images = cancellable(cancel, self.client.generate_images(&generation)).await?;

        Ok(images.into_iter().map(MediaItem::Image).collect())
    }

    async fn run_storyboard(
        &self,
        request: &GenerationRequest,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<Vec<MediaItem>, AppError> {
        let reference = request.active_reference().cloned();
        let total = request.scenes.len();
        let mut items = Vec::with_capacity(total);
        let mut previous_prompt: Option<String> = None;

        for (index, scene) in request.scenes.iter().enumerate() {
            ensure_not_cancelled(cancel)?;
            let stage = PipelineStage::Scene { index, total };
            progress.report(stage, format!("Processing scene {}/{}...", index + 1, total));

            if request.optimizer_enabled {
                progress.report(
                    stage,
                    format!("Optimizing prompt for scene {}...", index + 1),
                );
            }
            let spec = PromptSpec {
                previous_prompt: previous_prompt.as_deref(),
                scene_index: Some(index),
                has_reference_image: reference.is_some(),
                ..PromptSpec::new(
                    &scene.prompt,
                    &request.negative_prompt,
                    &request.styles,
                    request.model,
                )
            };
            let prompt = cancellable(
                cancel,
                self.composer.compose(&spec, request.optimizer_enabled),
            )
            .await?;

            progress.report(
                stage,
                format!("Generating image for scene {}...", index + 1),
            );
            let generation = ImageGenerationRequest {
                prompt: prompt.clone(),
                model: request.model,
                count: 1,
                aspect_ratio: request.aspect_ratio,
                reference_image: reference.clone(),
            };
            let images = cancellable(cancel, self.client.generate_images(&generation)).await?;

            tracing::debug!(
                scene = index + 1,
                scene_id = %scene.id,
                images = images.len(),
                "Scene generated"
            );
            items.extend(images.into_iter().map(MediaItem::Image));

            if request.optimizer_enabled {
                previous_prompt = Some(prompt);
            }
        }

        Ok(items)
    }

    async fn run_video(
        &self,
        request: &GenerationRequest,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<Vec<MediaItem>, AppError> {
        if let Some(selector) = &self.credentials {
            if !selector.has_selected_credential().await {
                progress.report(
                    PipelineStage::CredentialCheck,
                    "Please select an API key to generate videos.",
                );
                cancellable(cancel, selector.open_selector()).await?;
            }
        }

        progress.report(PipelineStage::Submitting, "Preparing video generation...");
        let generation = VideoGenerationRequest {
            prompt: request.base_prompt.clone(),
            aspect_ratio: request.aspect_ratio,
            resolution: request.video_resolution,
            reference_image: request.reference_image.clone(),
        };

        progress.report(
            PipelineStage::Submitting,
            "Starting video generation... This may take a few minutes.",
        );
        let job = cancellable(cancel, self.client.submit_video(&generation)).await?;

        progress.report(
            PipelineStage::Polling { attempt: 0 },
            "Video generation in progress... Polling for results.",
        );
        let job = self.wait_for_video(job, progress, cancel).await?;

        progress.report(
            PipelineStage::Fetching,
            "Video processed! Fetching final result...",
        );
        let video = cancellable(cancel, self.client.fetch_video(&job)).await?;

        Ok(vec![MediaItem::Video(video)])
    }

    /// Poll until the job is done. Each attempt waits the policy interval first.
    async fn wait_for_video(
        &self,
        mut job: VideoJob,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<VideoJob, AppError> {
        let policy = &self.poll_policy;
        let mut attempt: u32 = 0;
        let mut transient_failures: u32 = 0;

        while !job.is_done() {
            if policy.attempts_exhausted(attempt) {
                return Err(AppError::Timeout { attempts: attempt });
            }

            attempt += 1;
            progress.report(
                PipelineStage::Polling { attempt },
                format!("Checking status (attempt {})... Still processing.", attempt),
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AppError::Cancelled),
                _ = tokio::time::sleep(policy.interval) => {}
            }

            match cancellable(cancel, self.client.poll_video(&job)).await {
                Ok(next) => {
                    transient_failures = 0;
                    tracing::debug!(
                        operation = %next.id,
                        attempt = attempt,
                        status = %next.status,
                        "Video job polled"
                    );
                    job = next;
                }
                Err(e)
                    if e.upstream_kind().is_some_and(|k| k.is_transient())
                        && transient_failures < policy.max_transient_failures =>
                {
                    transient_failures += 1;
                    tracing::warn!(
                        operation = %job.id,
                        attempt = attempt,
                        consecutive_failures = transient_failures,
                        error = %e,
                        "Transient failure while polling video job, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(operation = %job.id, attempts = attempt, "Video job finished");
        Ok(job)
    }
}
