use crate::error::GenerationError;
use async_trait::async_trait;

/// Capability that turns a single prompt into free text.
///
/// Prompt construction and line normalization live in
/// [`CaptionGenerator`](crate::systems::generation::CaptionGenerator), so any
/// backend (or a test stand-in) only has to answer the prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}
