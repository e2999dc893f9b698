use async_trait::async_trait;
use memeflow_core::api::events::EditorEvent;
use memeflow_core::config::EditorConfig;
use memeflow_core::domain::{Template, TemplateId};
use memeflow_core::error::{EditorError, GenerationError, RenderError};
use memeflow_core::traits::{RenderService, TextGenerator};
use memeflow_core::{EditorBuilder, EditorHandle};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::time::{Duration, sleep};

/// Renderer whose latency is chosen by the first caption.
#[derive(Default)]
struct StubRenderer {
    calls: Mutex<Vec<(TemplateId, Vec<String>)>>,
}

impl StubRenderer {
    fn calls(&self) -> Vec<(TemplateId, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RenderService for StubRenderer {
    async fn render(
        &self,
        template_id: &TemplateId,
        captions: &[String],
    ) -> Result<String, RenderError> {
        self.calls
            .lock()
            .unwrap()
            .push((template_id.clone(), captions.to_vec()));

        let first = captions.first().map(String::as_str).unwrap_or_default();
        let delay = if first.starts_with("slow") { 2000 } else { 10 };
        sleep(Duration::from_millis(delay)).await;

        if first == "boom" {
            return Err(RenderError::Rejected {
                message: "No texts specified".into(),
            });
        }
        Ok(format!(
            "https://i.imgflip.com/{}/{}.jpg",
            template_id,
            captions.join("|")
        ))
    }
}

struct StubTextGenerator {
    reply: Option<String>,
    delay: Duration,
    prompts: Mutex<Vec<String>>,
}

impl StubTextGenerator {
    fn answering(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            delay: Duration::from_millis(50),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            reply: None,
            delay: Duration::from_millis(50),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TextGenerator for StubTextGenerator {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        sleep(self.delay).await;
        self.reply.clone().ok_or(GenerationError::Status {
            status: 503,
            body: "model overloaded".into(),
        })
    }
}

fn drake() -> Template {
    Template::new(
        "181913649",
        "Drake Hotline Bling",
        "https://i.imgflip.com/30b1gx.jpg",
        2,
    )
}

fn distracted() -> Template {
    Template::new(
        "112126428",
        "Distracted Boyfriend",
        "https://i.imgflip.com/1ur9b0.jpg",
        3,
    )
}

fn start(
    renderer: Arc<StubRenderer>,
    generator: Arc<StubTextGenerator>,
) -> (EditorHandle, broadcast::Receiver<EditorEvent>) {
    let (handle, _task) = EditorBuilder::new()
        .with_config(EditorConfig::default())
        .with_renderer(renderer)
        .with_text_generator(generator)
        .build()
        .expect("editor should build with injected services");
    let events = handle.subscribe();
    (handle, events)
}

fn drain(rx: &mut broadcast::Receiver<EditorEvent>) -> Vec<EditorEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

fn previews(events: &[EditorEvent]) -> Vec<(u64, String)> {
    events
        .iter()
        .filter_map(|e| match e {
            EditorEvent::PreviewUpdated {
                request_id, url, ..
            } => Some((*request_id, url.clone())),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_initial_render_replaces_bare_template() {
    let renderer = Arc::new(StubRenderer::default());
    let (editor, mut events) = start(
        renderer.clone(),
        Arc::new(StubTextGenerator::answering("")),
    );

    let session_id = editor.select_template(drake()).await.unwrap();
    let snap = editor.snapshot().await.unwrap().unwrap();
    assert_eq!(snap.session_id, session_id);
    assert_eq!(snap.captions, vec!["", ""]);
    assert_eq!(snap.preview.url, "https://i.imgflip.com/30b1gx.jpg");
    assert!(snap.render_pending);

    sleep(Duration::from_millis(600)).await;

    let events = drain(&mut events);
    assert!(matches!(
        events.first(),
        Some(EditorEvent::SessionStarted { box_count: 2, .. })
    ));
    assert_eq!(
        previews(&events),
        vec![(0, "https://i.imgflip.com/181913649/|.jpg".to_string())]
    );
    assert_eq!(
        renderer.calls(),
        vec![(TemplateId::from("181913649"), vec![String::new(), String::new()])]
    );
}

#[tokio::test(start_paused = true)]
async fn test_edit_burst_renders_once() {
    let renderer = Arc::new(StubRenderer::default());
    let (editor, mut events) = start(
        renderer.clone(),
        Arc::new(StubTextGenerator::answering("")),
    );

    editor.select_template(drake()).await.unwrap();
    editor.set_caption(0, "a").await.unwrap();
    sleep(Duration::from_millis(100)).await;
    editor.set_caption(0, "ab").await.unwrap();
    sleep(Duration::from_millis(100)).await;
    editor.set_caption(1, "x").await.unwrap();

    sleep(Duration::from_millis(2000)).await;

    let calls = renderer.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, vec!["ab", "x"]);

    let snap = editor.snapshot().await.unwrap().unwrap();
    assert_eq!(snap.preview.source_request_id, Some(0));
    assert_eq!(snap.preview.url, "https://i.imgflip.com/181913649/ab|x.jpg");
    assert!(!snap.render_pending);
    assert_eq!(snap.renders_in_flight, 0);

    let revisions: Vec<u64> = drain(&mut events)
        .iter()
        .filter_map(|e| match e {
            EditorEvent::CaptionsChanged { revision, .. } => Some(*revision),
            _ => None,
        })
        .collect();
    assert_eq!(revisions, vec![1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn test_slow_stale_response_is_discarded() {
    let renderer = Arc::new(StubRenderer::default());
    let (editor, mut events) = start(
        renderer.clone(),
        Arc::new(StubTextGenerator::answering("")),
    );

    editor.select_template(drake()).await.unwrap();
    editor.set_caption(0, "slow").await.unwrap();
    // Request 0 (slow) goes out at 500ms and lands at 2500ms.
    sleep(Duration::from_millis(600)).await;
    editor.set_caption(0, "fast").await.unwrap();
    // Request 1 goes out at 1100ms and lands at 1110ms.
    sleep(Duration::from_millis(3000)).await;

    assert_eq!(renderer.calls().len(), 2);
    let events = drain(&mut events);
    assert_eq!(
        previews(&events),
        vec![(1, "https://i.imgflip.com/181913649/fast|.jpg".to_string())]
    );

    let snap = editor.snapshot().await.unwrap().unwrap();
    assert_eq!(snap.preview.source_request_id, Some(1));
    assert_eq!(snap.renders_in_flight, 0);
}

#[tokio::test(start_paused = true)]
async fn test_render_failure_keeps_previous_preview() {
    let renderer = Arc::new(StubRenderer::default());
    let (editor, mut events) = start(
        renderer.clone(),
        Arc::new(StubTextGenerator::answering("")),
    );

    editor.select_template(drake()).await.unwrap();
    editor.set_caption(0, "ok").await.unwrap();
    sleep(Duration::from_millis(600)).await;
    editor.set_caption(0, "boom").await.unwrap();
    sleep(Duration::from_millis(600)).await;

    let events = drain(&mut events);
    let failures: Vec<&EditorEvent> = events.iter().filter(|e| e.is_error()).collect();
    assert_eq!(failures.len(), 1);
    assert!(matches!(
        failures[0],
        EditorEvent::RenderFailed { request_id: 1, .. }
    ));

    let snap = editor.snapshot().await.unwrap().unwrap();
    assert_eq!(snap.captions, vec!["boom", ""]);
    assert_eq!(snap.preview.source_request_id, Some(0));
    assert_eq!(snap.preview.url, "https://i.imgflip.com/181913649/ok|.jpg");
}

#[tokio::test(start_paused = true)]
async fn test_out_of_range_edit_is_rejected() {
    let renderer = Arc::new(StubRenderer::default());
    let (editor, _events) = start(renderer, Arc::new(StubTextGenerator::answering("")));

    assert_eq!(
        editor.set_caption(0, "early").await,
        Err(EditorError::NoSession)
    );

    editor.select_template(drake()).await.unwrap();
    let err = editor.set_caption(2, "third").await.unwrap_err();
    assert!(matches!(
        err,
        EditorError::Caption(memeflow_core::error::CaptionError::IndexOutOfRange {
            index: 2,
            box_count: 2
        })
    ));

    let snap = editor.snapshot().await.unwrap().unwrap();
    assert_eq!(snap.revision, 0);
}

#[tokio::test(start_paused = true)]
async fn test_generation_replaces_captions_with_one_render() {
    let renderer = Arc::new(StubRenderer::default());
    let generator = Arc::new(StubTextGenerator::answering(
        "  Hotline bling? Nahi yaar\n\nCaption generator? Haan bhai  \nextra line",
    ));
    let (editor, mut events) = start(renderer.clone(), generator.clone());

    editor.select_template(drake()).await.unwrap();
    sleep(Duration::from_millis(600)).await;
    assert_eq!(renderer.calls().len(), 1);

    editor.generate_captions().await.unwrap();
    assert_eq!(
        editor.generate_captions().await,
        Err(EditorError::GenerationInProgress)
    );
    assert!(editor.snapshot().await.unwrap().unwrap().generating);

    sleep(Duration::from_millis(1000)).await;

    let snap = editor.snapshot().await.unwrap().unwrap();
    assert!(!snap.generating);
    assert_eq!(
        snap.captions,
        vec!["Hotline bling? Nahi yaar", "Caption generator? Haan bhai"]
    );

    let calls = renderer.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].1, snap.captions);

    let prompts = generator.prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("exactly 2 lines"));
    assert!(prompts[0].contains("Drake Hotline Bling"));

    let events = drain(&mut events);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, EditorEvent::GenerationCompleted { .. }))
    );
}

#[tokio::test(start_paused = true)]
async fn test_generation_failure_leaves_captions_alone() {
    let renderer = Arc::new(StubRenderer::default());
    let (editor, mut events) = start(renderer.clone(), Arc::new(StubTextGenerator::failing()));

    editor.select_template(drake()).await.unwrap();
    editor.set_caption(0, "mine").await.unwrap();
    sleep(Duration::from_millis(600)).await;

    editor.generate_captions().await.unwrap();
    sleep(Duration::from_millis(1000)).await;

    let snap = editor.snapshot().await.unwrap().unwrap();
    assert_eq!(snap.captions, vec!["mine", ""]);
    assert!(!snap.generating);
    assert_eq!(renderer.calls().len(), 1);

    let events = drain(&mut events);
    assert!(events.iter().any(|e| matches!(
        e,
        EditorEvent::GenerationFailed { error, .. } if error.contains("503")
    )));

    // A failed generation does not block the next one.
    assert!(editor.generate_captions().await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_template_switch_discards_previous_session_responses() {
    let renderer = Arc::new(StubRenderer::default());
    let (editor, mut events) = start(
        renderer.clone(),
        Arc::new(StubTextGenerator::answering("")),
    );

    let first = editor.select_template(drake()).await.unwrap();
    editor.set_caption(0, "slow drake").await.unwrap();
    sleep(Duration::from_millis(600)).await;

    // Drake render is still in flight when the user switches.
    let second = editor.select_template(distracted()).await.unwrap();
    assert_ne!(first, second);
    sleep(Duration::from_millis(3000)).await;

    let events = drain(&mut events);
    assert!(events.iter().any(|e| matches!(
        e,
        EditorEvent::SessionClosed { session_id } if *session_id == first
    )));
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, EditorEvent::PreviewUpdated { .. } if e.session_id() == first))
    );

    let snap = editor.snapshot().await.unwrap().unwrap();
    assert_eq!(snap.session_id, second);
    assert_eq!(snap.captions, vec!["", "", ""]);
    assert_eq!(snap.preview.source_request_id, Some(0));
    assert_eq!(snap.preview.url, "https://i.imgflip.com/112126428/||.jpg");
}

#[tokio::test(start_paused = true)]
async fn test_template_without_boxes_still_renders() {
    let renderer = Arc::new(StubRenderer::default());
    let (editor, _events) = start(
        renderer.clone(),
        Arc::new(StubTextGenerator::answering("")),
    );

    let blank = Template::new("1", "Blank", "https://i.imgflip.com/blank.jpg", 0);
    editor.select_template(blank).await.unwrap();
    assert!(editor.set_caption(0, "nowhere").await.is_err());
    sleep(Duration::from_millis(600)).await;

    assert_eq!(renderer.calls(), vec![(TemplateId::from("1"), vec![])]);
    let snap = editor.snapshot().await.unwrap().unwrap();
    assert!(snap.captions.is_empty());
    assert_eq!(snap.preview.source_request_id, Some(0));
}

#[tokio::test(start_paused = true)]
async fn test_close_session_discards_in_flight_work() {
    let renderer = Arc::new(StubRenderer::default());
    let (editor, mut events) = start(
        renderer.clone(),
        Arc::new(StubTextGenerator::answering("")),
    );

    editor.select_template(drake()).await.unwrap();
    editor.set_caption(0, "slow exit").await.unwrap();
    sleep(Duration::from_millis(600)).await;
    editor.close_session().await.unwrap();
    sleep(Duration::from_millis(3000)).await;

    assert!(editor.snapshot().await.unwrap().is_none());
    assert_eq!(
        editor.generate_captions().await,
        Err(EditorError::NoSession)
    );
    assert!(previews(&drain(&mut events)).is_empty());
}

#[tokio::test]
async fn test_build_without_credentials_fails() {
    let result = EditorBuilder::new()
        .with_config(EditorConfig::default())
        .build();
    assert!(result.is_err());
}
