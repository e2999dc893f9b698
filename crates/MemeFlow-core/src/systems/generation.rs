use crate::error::GenerationError;
use crate::resources::templates::{CaptionPromptVars, PromptEngine};
use crate::traits::TextGenerator;
use std::sync::Arc;

/// Asks a text generation backend for captions and shapes the answer to the
/// template's box count.
pub struct CaptionGenerator {
    backend: Arc<dyn TextGenerator>,
    prompts: PromptEngine,
    language: String,
}

impl CaptionGenerator {
    pub fn new(
        backend: Arc<dyn TextGenerator>,
        prompts: PromptEngine,
        language: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            prompts,
            language: language.into(),
        }
    }

    pub fn build_prompt(
        &self,
        template_name: &str,
        box_count: usize,
    ) -> Result<String, GenerationError> {
        let prompt = self.prompts.render_caption_prompt(&CaptionPromptVars {
            template_name,
            box_count,
            language: &self.language,
        })?;
        Ok(prompt)
    }

    /// One backend request; the result always has exactly `box_count` entries.
    #[tracing::instrument(skip(self))]
    pub async fn generate(
        &self,
        template_name: &str,
        box_count: usize,
    ) -> Result<Vec<String>, GenerationError> {
        let prompt = self.build_prompt(template_name, box_count)?;
        tracing::debug!(prompt_len = prompt.len(), "Requesting captions");

        let raw = self.backend.complete(&prompt).await?;
        let lines = normalize_lines(&raw, box_count);
        tracing::debug!(
            received_lines = raw.lines().count(),
            kept = lines.iter().filter(|l| !l.is_empty()).count(),
            "Captions generated"
        );
        Ok(lines)
    }
}

/// Splits model output into exactly `box_count` captions.
///
/// Lines are trimmed and blank lines dropped; extra lines are cut and missing
/// ones become empty strings.
pub fn normalize_lines(raw: &str, box_count: usize) -> Vec<String> {
    let mut lines: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(box_count)
        .map(String::from)
        .collect();
    lines.resize(box_count, String::new());
    lines
}
