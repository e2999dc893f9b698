use crate::domain::TemplateId;
use crate::error::RenderError;
use crate::store::CaptionChange;
use serde::{Deserialize, Serialize};
use tokio::time::{Duration, Instant};
use uuid::Uuid;

/// Immutable snapshot of the captions taken when the debounce timer fires.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Strictly increasing within a session, starting at 0.
    pub request_id: u64,
    pub session_id: Uuid,
    pub template_id: TemplateId,
    pub captions: Vec<String>,
}

/// The render currently published to the preview surface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewState {
    pub url: String,
    /// `None` until the first render of the session is accepted.
    pub source_request_id: Option<u64>,
}

/// What the scheduler did with a render response.
#[derive(Debug)]
pub enum Resolution {
    /// The response became the published preview.
    Applied(PreviewState),
    /// The response was current but carried an error. The preview is unchanged.
    Failed(RenderError),
    /// Superseded by a newer response or belongs to another session.
    Stale,
}

/// Debounces caption changes into render requests and guards the preview
/// against out-of-order responses.
///
/// Pure state machine: the caller supplies the clock and performs the network
/// calls, which keeps the race handling testable without a transport.
#[derive(Debug)]
pub struct RenderScheduler {
    session_id: Uuid,
    template_id: TemplateId,
    quantum: Duration,
    deadline: Option<Instant>,
    next_request_id: u64,
    highest_seen: Option<u64>,
    in_flight: usize,
    preview: PreviewState,
}

impl RenderScheduler {
    pub fn new(
        session_id: Uuid,
        template_id: TemplateId,
        initial_url: impl Into<String>,
        quantum: Duration,
    ) -> Self {
        Self {
            session_id,
            template_id,
            quantum,
            deadline: None,
            next_request_id: 0,
            highest_seen: None,
            in_flight: 0,
            preview: PreviewState {
                url: initial_url.into(),
                source_request_id: None,
            },
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn preview(&self) -> &PreviewState {
        &self.preview
    }

    /// Instant at which the pending render fires, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Dispatched requests that have not reported back yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// (Re)arms the debounce timer, replacing any pending one.
    pub fn arm(&mut self, now: Instant) {
        let deadline = now + self.quantum;
        tracing::trace!(session_id = %self.session_id, ?deadline, "Debounce timer armed");
        self.deadline = Some(deadline);
    }

    pub fn on_caption_change(&mut self, change: &CaptionChange, now: Instant) {
        tracing::trace!(
            session_id = %self.session_id,
            revision = change.revision(),
            "Caption change observed"
        );
        self.arm(now);
    }

    /// Fires the pending timer if it has elapsed at `now`.
    pub fn poll(&mut self, now: Instant, captions: &[String]) -> Option<RenderRequest> {
        match self.deadline {
            Some(deadline) if deadline <= now => Some(self.fire(captions)),
            _ => None,
        }
    }

    /// Disarms the timer and allocates the next request for `captions`.
    pub fn fire(&mut self, captions: &[String]) -> RenderRequest {
        self.deadline = None;
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.in_flight += 1;

        RenderRequest {
            request_id,
            session_id: self.session_id,
            template_id: self.template_id.clone(),
            captions: captions.to_vec(),
        }
    }

    /// Reconciles a response with the published preview.
    ///
    /// A response is stale when its id is below the highest id seen so far,
    /// failures included, so a slow success for an old request can never
    /// overwrite a newer outcome.
    pub fn resolve(
        &mut self,
        request: &RenderRequest,
        outcome: Result<String, RenderError>,
    ) -> Resolution {
        if request.session_id != self.session_id || request.template_id != self.template_id {
            return Resolution::Stale;
        }
        self.in_flight = self.in_flight.saturating_sub(1);

        if self
            .highest_seen
            .is_some_and(|seen| request.request_id < seen)
        {
            return Resolution::Stale;
        }
        self.highest_seen = Some(request.request_id);

        match outcome {
            Ok(url) => {
                self.preview = PreviewState {
                    url,
                    source_request_id: Some(request.request_id),
                };
                Resolution::Applied(self.preview.clone())
            }
            Err(e) => Resolution::Failed(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> RenderScheduler {
        RenderScheduler::new(
            Uuid::new_v4(),
            TemplateId::from("61579"),
            "https://i.imgflip.com/1bij.jpg",
            Duration::from_millis(500),
        )
    }

    #[test]
    fn test_rearm_pushes_deadline() {
        let mut sched = scheduler();
        let t0 = Instant::now();
        let captions = vec!["a".to_string()];

        sched.arm(t0);
        sched.arm(t0 + Duration::from_millis(300));

        // First deadline has passed, but the timer was re-armed.
        assert!(sched.poll(t0 + Duration::from_millis(500), &captions).is_none());
        let req = sched
            .poll(t0 + Duration::from_millis(800), &captions)
            .expect("timer should fire");
        assert_eq!(req.request_id, 0);
        assert!(!sched.is_pending());
        assert_eq!(sched.in_flight(), 1);
    }

    #[test]
    fn test_foreign_session_is_stale() {
        let mut sched = scheduler();
        let mut req = sched.fire(&[]);
        req.session_id = Uuid::new_v4();

        let res = sched.resolve(&req, Ok("https://i.imgflip.com/x.jpg".into()));
        assert!(matches!(res, Resolution::Stale));
        assert_eq!(sched.preview().source_request_id, None);
        // Our own request is still outstanding.
        assert_eq!(sched.in_flight(), 1);
    }
}
