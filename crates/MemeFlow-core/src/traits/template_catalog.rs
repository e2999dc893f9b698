use crate::domain::Template;
use async_trait::async_trait;

/// Source of templates the user can pick from.
#[async_trait]
pub trait TemplateCatalog: Send + Sync {
    async fn list_templates(&self) -> anyhow::Result<Vec<Template>>;
}
