pub mod template;

pub use template::{Template, TemplateId, filter_templates};
