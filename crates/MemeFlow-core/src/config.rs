//! # Configuration
//!
//! Runtime settings for the editor and its two remote services. Values come
//! from the environment (optionally seeded by a `.env` file) and fall back to
//! the defaults below.

use crate::resources::templates::DEFAULT_CAPTION_PROMPT;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Top-level editor configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Quiet period before caption edits are rendered. Default: 500ms.
    pub debounce_ms: u64,
    /// Capacity of the event broadcast channel. Default: 256.
    pub event_capacity: usize,
    /// Capacity of the command queue. Default: 64.
    pub command_capacity: usize,
    #[serde(default)]
    pub imgflip: ImgflipConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            event_capacity: 256,
            command_capacity: 64,
            imgflip: ImgflipConfig::default(),
            gemini: GeminiConfig::default(),
        }
    }
}

/// Rendering service (Imgflip) settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImgflipConfig {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for ImgflipConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.imgflip.com".to_string(),
            username: None,
            password: None,
        }
    }
}

/// Text generation service (Gemini) settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Language the captions are requested in.
    pub caption_language: String,
    /// Handlebars prompt with `template_name`, `box_count` and `language`.
    pub prompt_template: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key: None,
            caption_language: "hinglish".to_string(),
            prompt_template: DEFAULT_CAPTION_PROMPT.to_string(),
        }
    }
}

impl EditorConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Result<Self> {
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("MEMEFLOW_DEBOUNCE_MS") {
            config.debounce_ms = parse_var("MEMEFLOW_DEBOUNCE_MS", &v)?;
        }
        if let Some(v) = get("MEMEFLOW_EVENT_CAPACITY") {
            config.event_capacity = parse_var("MEMEFLOW_EVENT_CAPACITY", &v)?;
        }
        if let Some(v) = get("MEMEFLOW_COMMAND_CAPACITY") {
            config.command_capacity = parse_var("MEMEFLOW_COMMAND_CAPACITY", &v)?;
        }
        if config.event_capacity == 0 || config.command_capacity == 0 {
            anyhow::bail!("channel capacities must be greater than zero");
        }

        if let Some(v) = get("IMGFLIP_API_URL") {
            config.imgflip.base_url = v;
        }
        config.imgflip.username = get("IMGFLIP_USERNAME");
        config.imgflip.password = get("IMGFLIP_PASSWORD");

        if let Some(v) = get("GEMINI_API_URL") {
            config.gemini.base_url = v;
        }
        if let Some(v) = get("GEMINI_MODEL") {
            config.gemini.model = v;
        }
        config.gemini.api_key = get("GEMINI_API_KEY");
        if let Some(v) = get("MEMEFLOW_CAPTION_LANGUAGE") {
            config.gemini.caption_language = v;
        }
        if let Some(v) = get("MEMEFLOW_PROMPT_TEMPLATE") {
            config.gemini.prompt_template = v;
        }

        Ok(config)
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse::<T>()
        .with_context(|| format!("Invalid value for {}: '{}'", key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = EditorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(500));
        assert_eq!(config.imgflip.base_url, "https://api.imgflip.com");
        assert!(config.imgflip.username.is_none());
        assert_eq!(config.gemini.model, "gemini-1.5-flash");
        assert_eq!(config.gemini.caption_language, "hinglish");
    }

    #[test]
    fn test_overrides() {
        let config = EditorConfig::from_lookup(lookup(&[
            ("MEMEFLOW_DEBOUNCE_MS", "250"),
            ("IMGFLIP_USERNAME", "memer"),
            ("IMGFLIP_PASSWORD", "hunter2"),
            ("GEMINI_API_KEY", "key-123"),
            ("MEMEFLOW_CAPTION_LANGUAGE", "English"),
            // Blank values count as unset.
            ("GEMINI_MODEL", "  "),
        ]))
        .unwrap();

        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.imgflip.username.as_deref(), Some("memer"));
        assert_eq!(config.imgflip.password.as_deref(), Some("hunter2"));
        assert_eq!(config.gemini.api_key.as_deref(), Some("key-123"));
        assert_eq!(config.gemini.caption_language, "English");
        assert_eq!(config.gemini.model, "gemini-1.5-flash");
    }

    #[test]
    fn test_invalid_number_is_reported() {
        let err = EditorConfig::from_lookup(lookup(&[("MEMEFLOW_DEBOUNCE_MS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("MEMEFLOW_DEBOUNCE_MS"));

        assert!(EditorConfig::from_lookup(lookup(&[("MEMEFLOW_EVENT_CAPACITY", "0")])).is_err());
    }
}
