use handlebars::Handlebars;
use serde::Serialize;

/// Default caption prompt.
pub const DEFAULT_CAPTION_PROMPT: &str = "Generate a funny meme caption in {{language}} with exactly {{box_count}} lines for this template: {{template_name}}. Each line should be witty. Return only the lines.";

const CAPTION_PROMPT: &str = "caption_prompt";

/// Variables available to the caption prompt template.
#[derive(Clone, Debug, Serialize)]
pub struct CaptionPromptVars<'a> {
    pub template_name: &'a str,
    pub box_count: usize,
    pub language: &'a str,
}

/// Handlebars engine holding the pre-compiled caption prompt.
pub struct PromptEngine {
    hbs: Handlebars<'static>,
}

impl Default for PromptEngine {
    fn default() -> Self {
        // The built-in template is a compile-time constant known to parse.
        Self::new(DEFAULT_CAPTION_PROMPT).unwrap_or_else(|_| Self {
            hbs: Handlebars::new(),
        })
    }
}

impl PromptEngine {
    pub fn new(caption_template: &str) -> Result<Self, handlebars::TemplateError> {
        let mut hbs = Handlebars::new();
        hbs.set_strict_mode(false);
        // Prompts are plain text; HTML escaping would mangle quotes in names.
        hbs.register_escape_fn(handlebars::no_escape);
        hbs.register_template_string(CAPTION_PROMPT, caption_template)?;
        Ok(Self { hbs })
    }

    pub fn render_caption_prompt(
        &self,
        vars: &CaptionPromptVars<'_>,
    ) -> Result<String, handlebars::RenderError> {
        self.hbs.render(CAPTION_PROMPT, vars)
    }
}
