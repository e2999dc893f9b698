use serde::{Deserialize, Serialize};

/// Stable identifier of a template as known by the rendering service.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateId(pub String);

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for TemplateId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TemplateId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TemplateId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A base image plus a fixed number of overlay text boxes.
///
/// Supplied once by the template selector when editing begins and never
/// mutated for the lifetime of the editing session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    /// URL of the un-captioned image. Shown until the first render lands.
    pub source_url: String,
    pub box_count: usize,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl Template {
    pub fn new(
        id: impl Into<TemplateId>,
        name: impl Into<String>,
        source_url: impl Into<String>,
        box_count: usize,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            source_url: source_url.into(),
            box_count,
            width: None,
            height: None,
        }
    }

    /// Case-insensitive substring match on the template name.
    pub fn matches(&self, query: &str) -> bool {
        self.name.to_lowercase().contains(&query.to_lowercase())
    }
}

/// Filters a catalog listing by name, keeping catalog order.
pub fn filter_templates<'a>(templates: &'a [Template], query: &str) -> Vec<&'a Template> {
    templates.iter().filter(|t| t.matches(query)).collect()
}
