//! genmedia: generate images, storyboards, and videos from the command line.
//!
//! Set GEMINI_API_KEY (or API_KEY). Progress goes to stderr, written file
//! paths to stdout.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use genmedia_cli::{
    init_tracing, write_animation, write_outputs, Cli, EnvCredentialSelector, RunSummary,
};
use genmedia_core::{Config, ErrorMetadata};
use genmedia_pipeline::{CancellationToken, Orchestrator, PollPolicy, ProgressReporter};
use genmedia_providers::{GeminiProvider, GenerationClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = Config::from_env().context("Load configuration")?;
    config.validate().context("Validate configuration")?;

    let overlay = match cli.command.overlay() {
        Some(args) => args.prepare().context("Prepare text overlay")?,
        None => None,
    };
    let request = cli.command.build_request().context("Build request")?;

    let provider = GeminiProvider::new(&config).context("Create Gemini provider")?;
    let orchestrator = Orchestrator::new(GenerationClient::new(Arc::new(provider)))
        .with_credential_selector(Arc::new(EnvCredentialSelector::new(&config)))
        .with_poll_policy(PollPolicy::from_config(&config));

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling...");
            on_interrupt.cancel();
        }
    });

    let (reporter, mut events) = ProgressReporter::channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            eprintln!("[{}] {}", event.stage, event.message);
        }
    });

    let result = orchestrator.run(&request, &reporter, &cancel).await;
    drop(reporter);
    printer.await.ok();

    if let Err(e) = result {
        tracing::error!(
            code = e.error_code(),
            recoverable = e.is_recoverable(),
            error = %e,
            "Generation failed"
        );
        if let Some(action) = e.suggested_action() {
            eprintln!("Hint: {}", action);
        }
        anyhow::bail!(e.client_message());
    }

    let store = orchestrator.store();
    if let Some((text, font)) = overlay {
        let index = cli
            .command
            .overlay()
            .map(|args| args.overlay_index)
            .unwrap_or_default();
        store
            .write()
            .await
            .apply_text_overlay(index, &text, &font)
            .context("Apply text overlay")?;
    }

    let store = store.read().await;
    let out_dir = cli.command.output_dir();
    let mut files = write_outputs(out_dir, store.items())
        .await
        .with_context(|| format!("Write results to {}", out_dir.display()))?;

    if let Some(delay) = cli.command.animation_delay() {
        let gif = store.animate(delay).context("Encode storyboard animation")?;
        files.push(
            write_animation(out_dir, &gif)
                .await
                .context("Write storyboard animation")?,
        );
    }

    if files.is_empty() {
        eprintln!("The provider returned no results.");
    }

    if cli.json {
        let summary = RunSummary {
            workflow: cli.command.workflow(),
            files,
        };
        let out = serde_json::to_string_pretty(&summary).context("Serialize summary")?;
        println!("{}", out);
    } else {
        for file in &files {
            println!("{}", file.path.display());
        }
    }

    Ok(())
}
