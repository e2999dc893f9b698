pub mod render_service;
pub mod template_catalog;
pub mod text_generator;

pub use render_service::RenderService;
pub use template_catalog::TemplateCatalog;
pub use text_generator::TextGenerator;
