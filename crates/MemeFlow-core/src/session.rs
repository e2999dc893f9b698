//! # Editing Session
//!
//! One `EditorSession` exists per chosen template. It owns the caption store,
//! the render scheduler and the published preview, and is dropped as a whole
//! when the user leaves the editor or picks another template. Request ids are
//! therefore per session, and responses tagged with an older session id are
//! stale by construction.

use crate::domain::Template;
use crate::error::{CaptionError, EditorError, RenderError};
use crate::store::{CaptionChange, CaptionStore};
use crate::systems::scheduler::{PreviewState, RenderRequest, RenderScheduler, Resolution};
use serde::{Deserialize, Serialize};
use tokio::time::{Duration, Instant};
use uuid::Uuid;

/// Read-only view of a session for the preview surface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub template: Template,
    pub captions: Vec<String>,
    pub revision: u64,
    pub preview: PreviewState,
    pub render_pending: bool,
    pub renders_in_flight: usize,
    pub generating: bool,
}

pub struct EditorSession {
    id: Uuid,
    template: Template,
    captions: CaptionStore,
    scheduler: RenderScheduler,
    generating: bool,
}

impl EditorSession {
    /// Opens a session with empty captions and arms the first render.
    pub fn start(template: Template, debounce: Duration, now: Instant) -> Self {
        let id = Uuid::new_v4();
        let mut scheduler =
            RenderScheduler::new(id, template.id.clone(), &template.source_url, debounce);
        scheduler.arm(now);

        Self {
            id,
            captions: CaptionStore::new(template.box_count),
            template,
            scheduler,
            generating: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn captions(&self) -> &[String] {
        self.captions.captions()
    }

    pub fn revision(&self) -> u64 {
        self.captions.revision()
    }

    pub fn preview(&self) -> &PreviewState {
        self.scheduler.preview()
    }

    pub fn render_deadline(&self) -> Option<Instant> {
        self.scheduler.deadline()
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn set_caption(
        &mut self,
        index: usize,
        text: impl Into<String>,
        now: Instant,
    ) -> Result<CaptionChange, CaptionError> {
        let change = self.captions.set_slot(index, text)?;
        self.scheduler.on_caption_change(&change, now);
        Ok(change)
    }

    /// Bulk replacement: one change notification, one render.
    pub fn replace_captions<I, S>(&mut self, values: I, now: Instant) -> CaptionChange
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let change = self.captions.replace_all(values);
        self.scheduler.on_caption_change(&change, now);
        change
    }

    /// Takes a render request if the debounce timer has elapsed.
    pub fn poll_render(&mut self, now: Instant) -> Option<RenderRequest> {
        self.scheduler.poll(now, self.captions.captions())
    }

    pub fn resolve_render(
        &mut self,
        request: &RenderRequest,
        outcome: Result<String, RenderError>,
    ) -> Resolution {
        self.scheduler.resolve(request, outcome)
    }

    /// Marks a generation as outstanding. Only one may run at a time.
    pub fn begin_generation(&mut self) -> Result<(), EditorError> {
        if self.generating {
            return Err(EditorError::GenerationInProgress);
        }
        self.generating = true;
        Ok(())
    }

    pub fn finish_generation(&mut self) {
        self.generating = false;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            template: self.template.clone(),
            captions: self.captions.snapshot(),
            revision: self.captions.revision(),
            preview: self.scheduler.preview().clone(),
            render_pending: self.scheduler.is_pending(),
            renders_in_flight: self.scheduler.in_flight(),
            generating: self.generating,
        }
    }
}
