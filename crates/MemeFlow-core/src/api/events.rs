use crate::domain::TemplateId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Observable events of the editing pipeline.
///
/// These are broadcast via the `EditorEventBus` and consumed by the preview
/// surface. Stale render responses never produce an event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EditorEvent {
    /// A template was chosen and a fresh caption set created.
    SessionStarted {
        session_id: Uuid,
        template_id: TemplateId,
        box_count: usize,
        /// Bare template image, shown until the first render lands.
        preview_url: String,
    },
    /// The caption set changed (edit or generated replacement).
    CaptionsChanged {
        session_id: Uuid,
        captions: Vec<String>,
        revision: u64,
    },
    /// A render request left the scheduler.
    RenderDispatched { session_id: Uuid, request_id: u64 },
    /// A render was accepted as the new preview.
    PreviewUpdated {
        session_id: Uuid,
        request_id: u64,
        url: String,
        /// Unix timestamp in milliseconds
        timestamp: i64,
    },
    /// A current render failed. The previous preview stays up.
    RenderFailed {
        session_id: Uuid,
        request_id: u64,
        /// Human-readable error message
        error: String,
        timestamp: i64,
    },
    GenerationStarted { session_id: Uuid },
    /// Generated captions were merged into the caption set.
    GenerationCompleted { session_id: Uuid },
    /// Generation failed; the caption set is untouched.
    GenerationFailed {
        session_id: Uuid,
        error: String,
        timestamp: i64,
    },
    SessionClosed { session_id: Uuid },
}

impl EditorEvent {
    pub fn session_id(&self) -> Uuid {
        match self {
            EditorEvent::SessionStarted { session_id, .. }
            | EditorEvent::CaptionsChanged { session_id, .. }
            | EditorEvent::RenderDispatched { session_id, .. }
            | EditorEvent::PreviewUpdated { session_id, .. }
            | EditorEvent::RenderFailed { session_id, .. }
            | EditorEvent::GenerationStarted { session_id }
            | EditorEvent::GenerationCompleted { session_id }
            | EditorEvent::GenerationFailed { session_id, .. }
            | EditorEvent::SessionClosed { session_id } => *session_id,
        }
    }

    /// Errors the user should see as a transient notification.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            EditorEvent::RenderFailed { .. } | EditorEvent::GenerationFailed { .. }
        )
    }
}

/// Broadcast sender wrapper for editor events.
///
/// Sending never fails the pipeline: with no subscribers the event is dropped.
#[derive(Clone)]
pub struct EditorEventBus(pub broadcast::Sender<EditorEvent>);

impl EditorEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self(tx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.0.subscribe()
    }

    pub fn emit(&self, event: EditorEvent) {
        let _ = self.0.send(event);
    }
}
