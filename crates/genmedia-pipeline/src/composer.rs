//! Prompt composition
//!
//! Without optimization the final prompt is a deterministic concatenation of
//! the base prompt, style tags, and negative prompt. With optimization a
//! structured instruction block is sent to the provider's text model and its
//! trimmed answer is used verbatim. Optimizer failures are returned as-is;
//! there is no fallback to the plain prompt.

use genmedia_core::models::ImageModel;
use genmedia_core::AppError;
use genmedia_providers::GenerationClient;

const STORYBOARD_CONTINUITY_SUFFIX: &str =
    " Maintain consistency with the reference image and previous scene.";

/// Inputs of one composition.
#[derive(Debug, Clone, Copy)]
pub struct PromptSpec<'a> {
    pub base: &'a str,
    pub negative: &'a str,
    pub styles: &'a [String],
    pub model: ImageModel,
    /// Optimized prompt of the previous storyboard scene.
    pub previous_prompt: Option<&'a str>,
    /// Position in a storyboard, `None` outside storyboards.
    pub scene_index: Option<usize>,
    pub has_reference_image: bool,
}

impl<'a> PromptSpec<'a> {
    pub fn new(base: &'a str, negative: &'a str, styles: &'a [String], model: ImageModel) -> Self {
        Self {
            base,
            negative,
            styles,
            model,
            previous_prompt: None,
            scene_index: None,
            has_reference_image: false,
        }
    }
}

/// The cross-scene hint handed to the optimizer.
pub fn consistency_note(previous_prompt: &str) -> String {
    format!(
        "The previous scene's prompt was: \"{}\". Maintain character, environment, and art style consistency.",
        previous_prompt
    )
}

/// Plain composition, used when optimization is off.
pub fn compose_plain(spec: &PromptSpec<'_>) -> String {
    let mut prompt = spec.base.to_string();

    if !spec.styles.is_empty() {
        prompt.push_str(", in the style of ");
        prompt.push_str(&spec.styles.join(", "));
    }

    if !spec.negative.is_empty() {
        prompt.push_str(". Avoid: ");
        prompt.push_str(spec.negative);
        prompt.push('.');
    }

    if let Some(index) = spec.scene_index {
        if index > 0 || spec.has_reference_image {
            prompt.push_str(STORYBOARD_CONTINUITY_SUFFIX);
        }
    }

    prompt
}

/// Instruction block sent to the optimizer model.
pub fn optimization_request(spec: &PromptSpec<'_>) -> String {
    let mut request = format!(
        "Optimize the following image generation prompt for the \"{}\" model. The user wants to create a visually stunning and coherent image.\n\n",
        spec.model.id()
    );
    request.push_str(&format!("**Base Prompt:** \"{}\"\n", spec.base));

    if spec.has_reference_image {
        request.push_str("**Reference Image:** A reference image is provided. Ensure the generated image's style, subject, and composition are heavily inspired by it.\n");
    }
    if !spec.styles.is_empty() {
        request.push_str(&format!("**Desired Styles:** {}\n", spec.styles.join(", ")));
    }
    if !spec.negative.is_empty() {
        request.push_str(&format!(
            "**Negative Prompt (things to avoid):** {}\n",
            spec.negative
        ));
    }

    let continuing_scene = spec.scene_index.is_some_and(|i| i > 0);
    if let Some(previous) = spec.previous_prompt.filter(|_| continuing_scene) {
        request.push_str(&format!(
            "**Consistency Notes from previous scene:** {}\n",
            consistency_note(previous)
        ));
    }

    request.push_str("\n**Instructions:** Rewrite the prompt to be highly descriptive, detailed, and structured for the best possible output from the AI image generator. Incorporate the styles and avoid the negative elements. Focus on composition, lighting, color, and mood. The output should be ONLY the final, optimized prompt string, without any additional explanation or labels.");
    request
}

#[derive(Clone)]
pub struct PromptComposer {
    client: GenerationClient,
}

impl PromptComposer {
    pub fn new(client: GenerationClient) -> Self {
        Self { client }
    }

    pub async fn compose(
        &self,
        spec: &PromptSpec<'_>,
        wants_optimization: bool,
    ) -> Result<String, AppError> {
        if !wants_optimization {
            return Ok(compose_plain(spec));
        }

        let optimized = self.client.optimize(&optimization_request(spec)).await?;
        let optimized = optimized.trim().to_string();

        tracing::debug!(
            model = %spec.model,
            scene = ?spec.scene_index,
            chars = optimized.len(),
            "Prompt optimized"
        );

        Ok(optimized)
    }
}
