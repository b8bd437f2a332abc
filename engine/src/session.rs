//! Per-editor review session: the annotate, review and clear commands.

use futures_util::future::{AbortHandle, Abortable};
use tokio::sync::mpsc;

use rext_core::{
    AnnotationParser, DecorationHost, DecorationManager, DecorationOptions, Document,
    DocumentError, ErrorCollector, Panel, PanelHost, REPORT_TITLE, render_html,
    visible_code_with_line_numbers,
};
use rext_providers::{ChatMessage, ChatModel};
use rext_types::{ErrorRecord, StreamEvent, ViewColumn, Viewport};

use crate::pass::{Pass, PassRegistry};
use crate::prompts;

const STREAM_EVENT_CHANNEL_CAPACITY: usize = 256;

/// The editor a session works on.
pub trait EditorHost: Document + DecorationHost {
    /// Lines currently shown to the user.
    fn visible_range(&self) -> Viewport;
}

/// Result of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// No chat model is configured; nothing was done.
    NoModel,
    /// Annotate pass ran to the end of the stream.
    Completed {
        applied: usize,
        skipped: usize,
        /// Transport error that ended the stream early.
        failure: Option<String>,
    },
    /// Review pass finished and the report panel was shown.
    Reviewed {
        errors: Vec<ErrorRecord>,
        failure: Option<String>,
    },
    /// The pass was cancelled before its stream ended.
    Cancelled,
    Cleared { disposed: usize },
}

/// One editor, its live decorations, and the pass currently running on it.
pub struct ReviewSession<E: EditorHost> {
    editor: E,
    decorations: DecorationManager<E::Handle>,
    passes: PassRegistry,
    model: Option<ChatModel>,
}

impl<E: EditorHost> ReviewSession<E> {
    pub fn new(editor: E, model: Option<ChatModel>, options: DecorationOptions) -> Self {
        Self {
            editor,
            decorations: DecorationManager::new(options),
            passes: PassRegistry::new(),
            model,
        }
    }

    /// Session using the configured model and annotation appearance.
    pub fn from_config(editor: E, config: &rext_config::RextConfig) -> Self {
        let annotations = config.annotations();
        let options = DecorationOptions {
            preview_chars: annotations.preview_chars,
            color: annotations.color,
        };
        let model = rext_providers::select_chat_model(config).map(ChatModel::OpenAI);
        Self::new(editor, model, options)
    }

    pub fn editor(&self) -> &E {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut E {
        &mut self.editor
    }

    pub fn decorations(&self) -> &DecorationManager<E::Handle> {
        &self.decorations
    }

    /// Shared handle for cancelling the running pass from another task.
    pub fn passes(&self) -> PassRegistry {
        self.passes.clone()
    }

    pub fn model(&self) -> Option<&ChatModel> {
        self.model.as_ref()
    }

    /// Annotate the visible lines with the model's suggestions.
    ///
    /// Clears the previous pass first. Annotations are applied as soon as each
    /// record is complete; records naming a missing line are skipped.
    pub async fn annotate_visible_code(&mut self) -> CommandOutcome {
        let Some(model) = self.model.clone() else {
            tracing::debug!("No chat model available; annotate skipped");
            return CommandOutcome::NoModel;
        };

        let (pass, registration) = self.passes.begin();
        tracing::info!(pass = %pass.id(), model = model.name(), "Annotate pass started");
        self.clear_decorations();

        let code = match self.visible_code() {
            Ok(code) => code,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot read visible code");
                self.passes.finish(&pass);
                return CommandOutcome::Completed {
                    applied: 0,
                    skipped: 0,
                    failure: Some(e.to_string()),
                };
            }
        };

        let (rx, transport) = spawn_transport(model, prompts::ANNOTATION_PROMPT, code);
        let outcome = Abortable::new(self.consume_annotations(&pass, rx), registration).await;
        transport.abort();
        self.passes.finish(&pass);
        outcome.unwrap_or(CommandOutcome::Cancelled)
    }

    /// Annotate from an already open event stream instead of the chat model.
    pub async fn annotate_stream(&mut self, rx: mpsc::Receiver<StreamEvent>) -> CommandOutcome {
        let (pass, registration) = self.passes.begin();
        tracing::info!(pass = %pass.id(), "Annotate pass started");
        self.clear_decorations();

        let outcome = Abortable::new(self.consume_annotations(&pass, rx), registration).await;
        self.passes.finish(&pass);
        outcome.unwrap_or(CommandOutcome::Cancelled)
    }

    /// Ask the model for errors in the visible lines and show them in a panel.
    ///
    /// The panel is only created once the whole response has been collected.
    pub async fn show_code_review<P: PanelHost>(&mut self, panels: &mut P) -> CommandOutcome {
        let Some(model) = self.model.clone() else {
            tracing::debug!("No chat model available; review skipped");
            return CommandOutcome::NoModel;
        };

        let (pass, registration) = self.passes.begin();
        tracing::info!(pass = %pass.id(), model = model.name(), "Review pass started");
        self.clear_decorations();

        let code = match self.visible_code() {
            Ok(code) => code,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot read visible code");
                self.passes.finish(&pass);
                return show_report(panels, Vec::new(), Some(e.to_string()));
            }
        };

        let (rx, transport) = spawn_transport(model, prompts::ERROR_PROMPT, code);
        let collected = Abortable::new(collect_errors(&pass, rx), registration).await;
        transport.abort();
        self.passes.finish(&pass);

        match collected {
            Ok(Some((errors, failure))) => show_report(panels, errors, failure),
            Ok(None) | Err(_) => CommandOutcome::Cancelled,
        }
    }

    /// Review from an already open event stream instead of the chat model.
    pub async fn review_stream<P: PanelHost>(
        &mut self,
        rx: mpsc::Receiver<StreamEvent>,
        panels: &mut P,
    ) -> CommandOutcome {
        let (pass, registration) = self.passes.begin();
        tracing::info!(pass = %pass.id(), "Review pass started");
        self.clear_decorations();

        let collected = Abortable::new(collect_errors(&pass, rx), registration).await;
        self.passes.finish(&pass);

        match collected {
            Ok(Some((errors, failure))) => show_report(panels, errors, failure),
            Ok(None) | Err(_) => CommandOutcome::Cancelled,
        }
    }

    /// Remove every annotation of this editor.
    pub fn clear_annotations(&mut self) -> CommandOutcome {
        CommandOutcome::Cleared {
            disposed: self.clear_decorations(),
        }
    }

    /// Clear the editor and hand it back.
    pub fn close(self) -> E {
        let Self {
            mut editor,
            mut decorations,
            passes,
            ..
        } = self;
        passes.cancel();
        decorations.clear_all(&mut editor);
        editor
    }

    fn clear_decorations(&mut self) -> usize {
        self.decorations.clear_all(&mut self.editor)
    }

    fn visible_code(&self) -> Result<String, DocumentError> {
        let range = self.editor.visible_range();
        let line_count = self.editor.line_count();
        let viewport = Viewport::new(range.start().min(line_count), range.end().min(line_count));
        visible_code_with_line_numbers(&self.editor, viewport)
    }

    async fn consume_annotations(
        &mut self,
        pass: &Pass,
        mut rx: mpsc::Receiver<StreamEvent>,
    ) -> CommandOutcome {
        let mut parser = AnnotationParser::new();
        let mut applied = 0;
        let mut skipped = 0;
        let mut failure = None;

        while let Some(event) = rx.recv().await {
            match event {
                StreamEvent::TextDelta(text) => {
                    for annotation in parser.push(&text) {
                        if pass.is_cancelled() {
                            return CommandOutcome::Cancelled;
                        }
                        match self
                            .decorations
                            .apply_annotation(&mut self.editor, &annotation)
                        {
                            Ok(_) => applied += 1,
                            Err(e) => {
                                tracing::warn!(error = %e, "Skipping annotation");
                                skipped += 1;
                            }
                        }
                    }
                }
                StreamEvent::Done => break,
                StreamEvent::Error(message) => {
                    tracing::warn!(%message, "Annotation stream failed");
                    failure = Some(message);
                    break;
                }
            }
        }

        if pass.is_cancelled() {
            return CommandOutcome::Cancelled;
        }

        let stats = parser.finish();
        tracing::info!(
            pass = %pass.id(),
            applied,
            skipped,
            rejected = stats.rejected,
            skipped_bytes = stats.skipped_bytes,
            "Annotate pass finished"
        );
        CommandOutcome::Completed {
            applied,
            skipped,
            failure,
        }
    }
}

/// `None` when the pass was cancelled.
async fn collect_errors(
    pass: &Pass,
    mut rx: mpsc::Receiver<StreamEvent>,
) -> Option<(Vec<ErrorRecord>, Option<String>)> {
    let mut collector = ErrorCollector::new();
    let mut failure = None;

    while let Some(event) = rx.recv().await {
        if pass.is_cancelled() {
            return None;
        }
        match event {
            StreamEvent::TextDelta(text) => {
                collector.push(&text);
            }
            StreamEvent::Done => break,
            StreamEvent::Error(message) => {
                tracing::warn!(%message, "Review stream failed");
                failure = Some(message);
                break;
            }
        }
    }

    if pass.is_cancelled() {
        return None;
    }
    let errors = collector.finish();
    tracing::info!(pass = %pass.id(), errors = errors.len(), "Review pass finished");
    Some((errors, failure))
}

fn show_report<P: PanelHost>(
    panels: &mut P,
    errors: Vec<ErrorRecord>,
    failure: Option<String>,
) -> CommandOutcome {
    let mut panel = panels.create_panel(REPORT_TITLE, ViewColumn::Beside);
    panel.set_html(render_html(&errors));
    CommandOutcome::Reviewed { errors, failure }
}

/// Send the prompt and excerpt on a background task.
fn spawn_transport(
    model: ChatModel,
    prompt: &'static str,
    code: String,
) -> (mpsc::Receiver<StreamEvent>, AbortHandle) {
    let (tx, rx) = mpsc::channel(STREAM_EVENT_CHANNEL_CAPACITY);
    let (abort_handle, abort_registration) = AbortHandle::new_pair();
    let messages = vec![ChatMessage::user(prompt), ChatMessage::user(code)];

    let task = async move {
        let result = rext_providers::send_message(&model, &messages, tx.clone()).await;
        if let Err(e) = result {
            tracing::warn!("Chat request failed: {e}");
            let _ = tx.send(StreamEvent::Error(e.to_string())).await;
        }
    };

    tokio::spawn(async move {
        let _ = Abortable::new(task, abort_registration).await;
    });

    (rx, abort_handle)
}
