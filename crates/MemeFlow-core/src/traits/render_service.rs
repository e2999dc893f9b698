use crate::domain::TemplateId;
use crate::error::RenderError;
use async_trait::async_trait;

/// Capability that composites captions onto a template and returns the image URL.
///
/// Implementations make exactly one attempt per call. Retrying is never the
/// adapter's job; the scheduler decides what a failure means.
#[async_trait]
pub trait RenderService: Send + Sync {
    async fn render(
        &self,
        template_id: &TemplateId,
        captions: &[String],
    ) -> Result<String, RenderError>;
}
