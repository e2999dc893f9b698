use crate::config::GeminiConfig;
use crate::error::GenerationError;
use crate::traits::TextGenerator;
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

/// Client for Gemini's `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    pub fn from_config(client: reqwest::Client, config: &GeminiConfig) -> anyhow::Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .context("GEMINI_API_KEY is not set")?;
        Ok(Self::new(client, &config.base_url, &config.model, api_key))
    }

    fn endpoint(&self) -> Result<Url, GenerationError> {
        let mut url = Url::parse(&format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        ))
        .map_err(|e| GenerationError::Malformed(format!("invalid endpoint: {}", e)))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    #[tracing::instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = json!({
            "contents": [
                { "parts": [ { "text": prompt } ] }
            ]
        });

        let response = self
            .client
            .post(self.endpoint()?)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(format!("invalid JSON: {}", e)))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| {
                GenerationError::Malformed("response has no candidate text".to_string())
            })
    }
}
