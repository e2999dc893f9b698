use crate::error::{GenerationError, RenderError};
use crate::systems::scheduler::RenderRequest;
use async_channel::{Receiver, Sender};
use uuid::Uuid;

pub mod templates;

pub use templates::PromptEngine;

/// Shared HTTP client for every outbound adapter.
///
/// No request timeout is set: a hung render is simply superseded and filtered
/// once a newer response lands.
#[derive(Clone)]
pub struct GlobalHttpClient {
    pub client: reqwest::Client,
}

impl Default for GlobalHttpClient {
    fn default() -> Self {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });
        Self { client }
    }
}

/// A finished render call, reported back to the editor loop.
#[derive(Debug)]
pub struct RenderCompletion {
    pub request: RenderRequest,
    pub outcome: Result<String, RenderError>,
}

/// A finished generation call, tagged with the session that asked for it.
#[derive(Debug)]
pub struct GenerationCompletion {
    pub session_id: Uuid,
    pub outcome: Result<Vec<String>, GenerationError>,
}

#[derive(Clone)]
pub struct RenderResultChannel {
    pub tx: Sender<RenderCompletion>,
    pub rx: Receiver<RenderCompletion>,
}

impl Default for RenderResultChannel {
    fn default() -> Self {
        let (tx, rx) = async_channel::unbounded();
        Self { tx, rx }
    }
}

#[derive(Clone)]
pub struct GenerationResultChannel {
    pub tx: Sender<GenerationCompletion>,
    pub rx: Receiver<GenerationCompletion>,
}

impl Default for GenerationResultChannel {
    fn default() -> Self {
        let (tx, rx) = async_channel::unbounded();
        Self { tx, rx }
    }
}
