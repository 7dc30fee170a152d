//! In-memory provider used by the pipeline tests.

use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use genmedia_core::models::VideoJob;
use genmedia_core::{AppError, UpstreamErrorKind};
use genmedia_providers::{
    GenerationProvider, ImageGenerationRequest, RawMedia, VideoGenerationRequest,
};

pub const TEST_VIDEO_URI: &str = "https://videos.test/clip.mp4";

pub enum Reply<T> {
    Ok(T),
    Err(UpstreamErrorKind),
}

pub enum PollStep {
    Pending,
    Done,
    DoneWithoutUri,
    Fail(UpstreamErrorKind),
}

fn upstream(kind: UpstreamErrorKind) -> AppError {
    AppError::upstream(kind, format!("scripted {} failure", kind))
}

pub fn png(width: u32, height: u32, shade: u8) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([shade, 64, 128, 255]));
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    buffer
}

#[derive(Default)]
pub struct FakeProvider {
    optimize_replies: Mutex<VecDeque<Reply<String>>>,
    optimize_calls: Mutex<Vec<String>>,
    image_calls: Mutex<Vec<ImageGenerationRequest>>,
    image_failure: Mutex<Option<(usize, UpstreamErrorKind)>>,
    empty_images: Mutex<bool>,
    image_gate: Mutex<Option<Arc<Notify>>>,
    video_calls: Mutex<Vec<VideoGenerationRequest>>,
    poll_script: Mutex<VecDeque<PollStep>>,
    poll_count: Mutex<usize>,
    fetch_calls: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_optimize(&self, reply: Reply<String>) {
        self.optimize_replies.lock().unwrap().push_back(reply);
    }

    /// Make the image call with this zero-based index fail.
    pub fn fail_images_at(&self, call: usize, kind: UpstreamErrorKind) {
        *self.image_failure.lock().unwrap() = Some((call, kind));
    }

    pub fn return_no_images(&self) {
        *self.empty_images.lock().unwrap() = true;
    }

    /// Block image calls until the returned handle is notified.
    pub fn gate_images(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.image_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn script_polls(&self, steps: Vec<PollStep>) {
        *self.poll_script.lock().unwrap() = steps.into();
    }

    pub fn optimize_calls(&self) -> Vec<String> {
        self.optimize_calls.lock().unwrap().clone()
    }

    pub fn image_calls(&self) -> Vec<ImageGenerationRequest> {
        self.image_calls.lock().unwrap().clone()
    }

    pub fn video_calls(&self) -> Vec<VideoGenerationRequest> {
        self.video_calls.lock().unwrap().clone()
    }

    pub fn poll_count(&self) -> usize {
        *self.poll_count.lock().unwrap()
    }

    pub fn fetch_calls(&self) -> Vec<String> {
        self.fetch_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn optimize(&self, instruction: &str) -> Result<String, AppError> {
        let call = {
            let mut calls = self.optimize_calls.lock().unwrap();
            calls.push(instruction.to_string());
            calls.len()
        };
        match self.optimize_replies.lock().unwrap().pop_front() {
            Some(Reply::Ok(text)) => Ok(text),
            Some(Reply::Err(kind)) => Err(upstream(kind)),
            None => Ok(format!("optimized prompt {}", call)),
        }
    }

    async fn generate_images(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<Vec<RawMedia>, AppError> {
        let call = {
            let mut calls = self.image_calls.lock().unwrap();
            calls.push(request.clone());
            calls.len() - 1
        };

        let gate = self.image_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if let Some((failing, kind)) = *self.image_failure.lock().unwrap() {
            if failing == call {
                return Err(upstream(kind));
            }
        }
        if *self.empty_images.lock().unwrap() {
            return Ok(Vec::new());
        }

        let count = request.count.clamp(1, request.model.max_images());
        Ok((0..count)
            .map(|i| RawMedia::new("image/png", png(8, 8, (call * 10) as u8 + i as u8)))
            .collect())
    }

    async fn submit_video(&self, request: &VideoGenerationRequest) -> Result<VideoJob, AppError> {
        self.video_calls.lock().unwrap().push(request.clone());
        Ok(VideoJob::pending("operations/test"))
    }

    async fn poll_video(&self, job: &VideoJob) -> Result<VideoJob, AppError> {
        *self.poll_count.lock().unwrap() += 1;
        let step = self
            .poll_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(PollStep::Pending);
        match step {
            PollStep::Pending => Ok(VideoJob::pending(job.id.clone())),
            PollStep::Done => Ok(VideoJob::done(
                job.id.clone(),
                Some(TEST_VIDEO_URI.to_string()),
            )),
            PollStep::DoneWithoutUri => Ok(VideoJob::done(job.id.clone(), None)),
            PollStep::Fail(kind) => Err(upstream(kind)),
        }
    }

    async fn fetch_video_asset(&self, uri: &str) -> Result<RawMedia, AppError> {
        self.fetch_calls.lock().unwrap().push(uri.to_string());
        Ok(RawMedia::new("video/mp4", vec![0u8, 0, 0, 24]))
    }
}
