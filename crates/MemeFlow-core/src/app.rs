use crate::api::events::{EditorEvent, EditorEventBus};
use crate::config::EditorConfig;
use crate::domain::Template;
use crate::error::EditorError;
use crate::integrations::{GeminiClient, ImgflipClient};
use crate::resources::{
    GenerationCompletion, GenerationResultChannel, GlobalHttpClient, PromptEngine,
    RenderCompletion, RenderResultChannel,
};
use crate::session::{EditorSession, SessionSnapshot};
use crate::systems::generation::CaptionGenerator;
use crate::systems::scheduler::Resolution;
use crate::traits::{RenderService, TextGenerator};
use anyhow::Context;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use uuid::Uuid;

/// Commands processed by the editor loop, strictly in arrival order.
pub enum EditorCommand {
    SelectTemplate {
        template: Template,
        reply: oneshot::Sender<Uuid>,
    },
    SetCaption {
        index: usize,
        text: String,
        reply: oneshot::Sender<Result<(), EditorError>>,
    },
    GenerateCaptions {
        reply: oneshot::Sender<Result<(), EditorError>>,
    },
    Snapshot {
        reply: oneshot::Sender<Option<SessionSnapshot>>,
    },
    CloseSession {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable front door to a running editor.
///
/// Every call returns as soon as the loop has applied it; network work
/// happens in the background and is reported through [`EditorEvent`]s.
#[derive(Clone)]
pub struct EditorHandle {
    commands: mpsc::Sender<EditorCommand>,
    events: EditorEventBus,
}

impl EditorHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.events.subscribe()
    }

    /// Starts editing `template`, discarding any current session.
    pub async fn select_template(&self, template: Template) -> Result<Uuid, EditorError> {
        self.request(|reply| EditorCommand::SelectTemplate { template, reply })
            .await
    }

    pub async fn set_caption(
        &self,
        index: usize,
        text: impl Into<String>,
    ) -> Result<(), EditorError> {
        let text = text.into();
        self.request(|reply| EditorCommand::SetCaption { index, text, reply })
            .await?
    }

    /// Starts an AI caption generation for the current template.
    pub async fn generate_captions(&self) -> Result<(), EditorError> {
        self.request(|reply| EditorCommand::GenerateCaptions { reply })
            .await?
    }

    pub async fn snapshot(&self) -> Result<Option<SessionSnapshot>, EditorError> {
        self.request(|reply| EditorCommand::Snapshot { reply }).await
    }

    pub async fn close_session(&self) -> Result<(), EditorError> {
        self.request(|reply| EditorCommand::CloseSession { reply })
            .await
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> EditorCommand,
    ) -> Result<T, EditorError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| EditorError::Closed)?;
        rx.await.map_err(|_| EditorError::Closed)
    }
}

/// Wires an editor from config, with optional service overrides.
pub struct EditorBuilder {
    config: EditorConfig,
    http: Option<GlobalHttpClient>,
    renderer: Option<Arc<dyn RenderService>>,
    text_generator: Option<Arc<dyn TextGenerator>>,
}

impl Default for EditorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorBuilder {
    pub fn new() -> Self {
        Self {
            config: EditorConfig::default(),
            http: None,
            renderer: None,
            text_generator: None,
        }
    }

    pub fn with_config(mut self, config: EditorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_http_client(mut self, http: GlobalHttpClient) -> Self {
        self.http = Some(http);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn RenderService>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_text_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.text_generator = Some(generator);
        self
    }

    /// Spawns the editor loop on the current tokio runtime.
    ///
    /// Services not supplied explicitly are built from config, so credentials
    /// must be present in that case.
    pub fn build(self) -> anyhow::Result<(EditorHandle, JoinHandle<()>)> {
        let config = self.config;
        let http = self.http.unwrap_or_default();

        let renderer: Arc<dyn RenderService> = match self.renderer {
            Some(r) => r,
            None => Arc::new(
                ImgflipClient::from_config(http.client.clone(), &config.imgflip)
                    .context("Cannot build rendering client")?,
            ),
        };
        let backend: Arc<dyn TextGenerator> = match self.text_generator {
            Some(g) => g,
            None => Arc::new(
                GeminiClient::from_config(http.client.clone(), &config.gemini)
                    .context("Cannot build text generation client")?,
            ),
        };
        let prompts = PromptEngine::new(&config.gemini.prompt_template)
            .context("Invalid caption prompt template")?;
        let generator = Arc::new(CaptionGenerator::new(
            backend,
            prompts,
            config.gemini.caption_language.clone(),
        ));

        let (command_tx, command_rx) = mpsc::channel(config.command_capacity);
        let events = EditorEventBus::new(config.event_capacity);

        let runtime = EditorRuntime {
            commands: command_rx,
            events: events.clone(),
            renderer,
            generator,
            renders: RenderResultChannel::default(),
            generations: GenerationResultChannel::default(),
            debounce: config.debounce(),
            session: None,
        };
        let task = tokio::spawn(runtime.run());

        Ok((
            EditorHandle {
                commands: command_tx,
                events,
            },
            task,
        ))
    }
}

/// The single owner of session state.
struct EditorRuntime {
    commands: mpsc::Receiver<EditorCommand>,
    events: EditorEventBus,
    renderer: Arc<dyn RenderService>,
    generator: Arc<CaptionGenerator>,
    renders: RenderResultChannel,
    generations: GenerationResultChannel,
    debounce: Duration,
    session: Option<EditorSession>,
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl EditorRuntime {
    async fn run(mut self) {
        tracing::info!(debounce_ms = self.debounce.as_millis() as u64, "Editor started");

        loop {
            let deadline = self.session.as_ref().and_then(|s| s.render_deadline());

            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                _ = wait_until(deadline) => self.dispatch_render(),
                Ok(done) = self.renders.rx.recv() => self.on_render_complete(done),
                Ok(done) = self.generations.rx.recv() => self.on_generation_complete(done),
            }
        }

        if let Some(session) = self.session.take() {
            self.emit_closed(&session);
        }
        tracing::info!("Editor stopped");
    }

    fn handle_command(&mut self, cmd: EditorCommand) {
        match cmd {
            EditorCommand::SelectTemplate { template, reply } => {
                let id = self.open_session(template);
                let _ = reply.send(id);
            }
            EditorCommand::SetCaption { index, text, reply } => {
                let _ = reply.send(self.set_caption(index, text));
            }
            EditorCommand::GenerateCaptions { reply } => {
                let _ = reply.send(self.start_generation());
            }
            EditorCommand::Snapshot { reply } => {
                let _ = reply.send(self.session.as_ref().map(EditorSession::snapshot));
            }
            EditorCommand::CloseSession { reply } => {
                if let Some(session) = self.session.take() {
                    self.emit_closed(&session);
                }
                let _ = reply.send(());
            }
        }
    }

    fn open_session(&mut self, template: Template) -> Uuid {
        if let Some(old) = self.session.take() {
            self.emit_closed(&old);
        }

        let session = EditorSession::start(template, self.debounce, Instant::now());
        let id = session.id();
        let template = session.template();
        tracing::info!(
            session_id = %id,
            template_id = %template.id,
            box_count = template.box_count,
            "Editing session started"
        );
        self.events.emit(EditorEvent::SessionStarted {
            session_id: id,
            template_id: template.id.clone(),
            box_count: template.box_count,
            preview_url: session.preview().url.clone(),
        });
        self.session = Some(session);
        id
    }

    fn emit_closed(&self, session: &EditorSession) {
        tracing::info!(session_id = %session.id(), "Editing session closed");
        self.events.emit(EditorEvent::SessionClosed {
            session_id: session.id(),
        });
    }

    fn set_caption(&mut self, index: usize, text: String) -> Result<(), EditorError> {
        let session = self.session.as_mut().ok_or(EditorError::NoSession)?;
        match session.set_caption(index, text, Instant::now()) {
            Ok(change) => {
                self.events.emit(EditorEvent::CaptionsChanged {
                    session_id: session.id(),
                    captions: session.captions().to_vec(),
                    revision: change.revision(),
                });
                Ok(())
            }
            Err(e) => {
                tracing::error!(session_id = %session.id(), error = %e, "Rejected caption edit");
                Err(e.into())
            }
        }
    }

    fn start_generation(&mut self) -> Result<(), EditorError> {
        let session = self.session.as_mut().ok_or(EditorError::NoSession)?;
        session.begin_generation()?;

        let session_id = session.id();
        let name = session.template().name.clone();
        let box_count = session.template().box_count;
        self.events.emit(EditorEvent::GenerationStarted { session_id });

        let generator = self.generator.clone();
        let tx = self.generations.tx.clone();
        tokio::spawn(async move {
            let outcome = generator.generate(&name, box_count).await;
            if tx
                .send(GenerationCompletion {
                    session_id,
                    outcome,
                })
                .await
                .is_err()
            {
                tracing::error!(session_id = %session_id, "Generation result channel closed");
            }
        });
        Ok(())
    }

    fn dispatch_render(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(request) = session.poll_render(Instant::now()) else {
            return;
        };

        tracing::debug!(
            session_id = %request.session_id,
            request_id = request.request_id,
            "Dispatching render"
        );
        self.events.emit(EditorEvent::RenderDispatched {
            session_id: request.session_id,
            request_id: request.request_id,
        });

        let renderer = self.renderer.clone();
        let tx = self.renders.tx.clone();
        tokio::spawn(async move {
            let outcome = renderer
                .render(&request.template_id, &request.captions)
                .await;
            if tx.send(RenderCompletion { request, outcome }).await.is_err() {
                tracing::error!("Render result channel closed");
            }
        });
    }

    fn on_render_complete(&mut self, done: RenderCompletion) {
        let RenderCompletion { request, outcome } = done;
        let Some(session) = self.session.as_mut() else {
            tracing::debug!(request_id = request.request_id, "Render finished after session end");
            return;
        };

        match session.resolve_render(&request, outcome) {
            Resolution::Applied(preview) => {
                tracing::info!(
                    session_id = %request.session_id,
                    request_id = request.request_id,
                    url = %preview.url,
                    "Preview updated"
                );
                self.events.emit(EditorEvent::PreviewUpdated {
                    session_id: request.session_id,
                    request_id: request.request_id,
                    url: preview.url,
                    timestamp: chrono::Utc::now().timestamp_millis(),
                });
            }
            Resolution::Failed(e) => {
                tracing::warn!(
                    session_id = %request.session_id,
                    request_id = request.request_id,
                    error = %e,
                    "Render failed"
                );
                self.events.emit(EditorEvent::RenderFailed {
                    session_id: request.session_id,
                    request_id: request.request_id,
                    error: e.to_string(),
                    timestamp: chrono::Utc::now().timestamp_millis(),
                });
            }
            Resolution::Stale => {
                tracing::debug!(
                    session_id = %request.session_id,
                    request_id = request.request_id,
                    "Discarded stale render"
                );
            }
        }
    }

    fn on_generation_complete(&mut self, done: GenerationCompletion) {
        let session = match self.session.as_mut() {
            Some(s) if s.id() == done.session_id => s,
            _ => {
                tracing::debug!(session_id = %done.session_id, "Generation finished after session end");
                return;
            }
        };
        session.finish_generation();

        match done.outcome {
            Ok(lines) => {
                let change = session.replace_captions(lines, Instant::now());
                tracing::info!(session_id = %done.session_id, "Generated captions applied");
                self.events.emit(EditorEvent::CaptionsChanged {
                    session_id: done.session_id,
                    captions: session.captions().to_vec(),
                    revision: change.revision(),
                });
                self.events.emit(EditorEvent::GenerationCompleted {
                    session_id: done.session_id,
                });
            }
            Err(e) => {
                tracing::warn!(session_id = %done.session_id, error = %e, "Caption generation failed");
                self.events.emit(EditorEvent::GenerationFailed {
                    session_id: done.session_id,
                    error: e.to_string(),
                    timestamp: chrono::Utc::now().timestamp_millis(),
                });
            }
        }
    }
}
