use crate::config::ImgflipConfig;
use crate::domain::{Template, TemplateId};
use crate::error::RenderError;
use crate::traits::{RenderService, TemplateCatalog};
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

/// Imgflip rejects empty box values, so blanks go out as a single space.
pub const EMPTY_CAPTION_SHIM: &str = " ";

/// Client for the Imgflip `caption_image` and `get_memes` endpoints.
#[derive(Clone)]
pub struct ImgflipClient {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CaptionData {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MemesData {
    memes: Vec<MemeEntry>,
}

#[derive(Debug, Deserialize)]
struct MemeEntry {
    id: String,
    name: String,
    url: String,
    width: Option<u32>,
    height: Option<u32>,
    box_count: usize,
}

impl From<MemeEntry> for Template {
    fn from(entry: MemeEntry) -> Self {
        Template {
            id: TemplateId(entry.id),
            name: entry.name,
            source_url: entry.url,
            box_count: entry.box_count,
            width: entry.width,
            height: entry.height,
        }
    }
}

impl ImgflipClient {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Builds a client from config. Rendering needs an account; listing does not.
    pub fn from_config(client: reqwest::Client, config: &ImgflipConfig) -> anyhow::Result<Self> {
        let username = config
            .username
            .clone()
            .context("IMGFLIP_USERNAME is not set")?;
        let password = config
            .password
            .clone()
            .context("IMGFLIP_PASSWORD is not set")?;
        Ok(Self::new(client, &config.base_url, username, password))
    }

    /// Form fields for a caption request, blanks shimmed.
    pub fn caption_form(
        &self,
        template_id: &TemplateId,
        captions: &[String],
    ) -> Vec<(String, String)> {
        let mut form = Vec::with_capacity(captions.len() + 3);
        form.push(("template_id".to_string(), template_id.0.clone()));
        form.push(("username".to_string(), self.username.clone()));
        form.push(("password".to_string(), self.password.clone()));
        for (i, text) in captions.iter().enumerate() {
            let value = if text.is_empty() {
                EMPTY_CAPTION_SHIM.to_string()
            } else {
                text.clone()
            };
            form.push((format!("boxes[{}][text]", i), value));
        }
        form
    }
}

#[async_trait]
impl RenderService for ImgflipClient {
    #[tracing::instrument(skip(self, captions), fields(boxes = captions.len()))]
    async fn render(
        &self,
        template_id: &TemplateId,
        captions: &[String],
    ) -> Result<String, RenderError> {
        let url = format!("{}/caption_image", self.base_url);
        tracing::debug!(url = %url, "Sending caption request");

        let response = self
            .client
            .post(&url)
            .form(&self.caption_form(template_id, captions))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(RenderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: Envelope<CaptionData> = serde_json::from_str(&body)
            .map_err(|e| RenderError::Malformed(format!("invalid JSON: {}", e)))?;

        if !envelope.success {
            return Err(RenderError::Rejected {
                message: envelope
                    .error_message
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        envelope
            .data
            .and_then(|d| d.url)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                RenderError::Malformed("success envelope without image url".to_string())
            })
    }
}

#[async_trait]
impl TemplateCatalog for ImgflipClient {
    async fn list_templates(&self) -> anyhow::Result<Vec<Template>> {
        list_templates(&self.client, &self.base_url).await
    }
}

/// Catalog access that needs no Imgflip account.
#[derive(Clone)]
pub struct ImgflipCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl ImgflipCatalog {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TemplateCatalog for ImgflipCatalog {
    async fn list_templates(&self) -> anyhow::Result<Vec<Template>> {
        list_templates(&self.client, &self.base_url).await
    }
}

#[tracing::instrument(skip(client))]
async fn list_templates(
    client: &reqwest::Client,
    base_url: &str,
) -> anyhow::Result<Vec<Template>> {
    let url = format!("{}/get_memes", base_url);
    let response = client
        .get(&url)
        .send()
        .await
        .context("Failed to reach template catalog")?
        .error_for_status()
        .context("Template catalog returned an error status")?;

    let envelope: Envelope<MemesData> = response
        .json()
        .await
        .context("Invalid template catalog response")?;

    if !envelope.success {
        anyhow::bail!(
            "Template catalog request failed: {}",
            envelope.error_message.unwrap_or_default()
        );
    }

    let templates: Vec<Template> = envelope
        .data
        .map(|d| d.memes.into_iter().map(Template::from).collect())
        .unwrap_or_default();
    tracing::info!(count = templates.len(), "Loaded templates");
    Ok(templates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caption_form_shims_empty_slots() {
        let client =
            ImgflipClient::new(reqwest::Client::new(), "https://api.imgflip.com/", "u", "p");
        let form = client.caption_form(
            &TemplateId::from("61579"),
            &["top".to_string(), String::new()],
        );

        assert_eq!(client.base_url, "https://api.imgflip.com");
        assert_eq!(
            form,
            vec![
                ("template_id".to_string(), "61579".to_string()),
                ("username".to_string(), "u".to_string()),
                ("password".to_string(), "p".to_string()),
                ("boxes[0][text]".to_string(), "top".to_string()),
                ("boxes[1][text]".to_string(), " ".to_string()),
            ]
        );
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let config = ImgflipConfig::default();
        assert!(ImgflipClient::from_config(reqwest::Client::new(), &config).is_err());
    }
}
