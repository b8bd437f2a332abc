//! Shared test utilities and fixtures
//!
//! Mock Responses API servers and an in-memory editor for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;

use rext_core::{DecorationHost, Document, DocumentError, Panel, PanelHost, TextDocument};
use rext_engine::EditorHost;
use rext_providers::{ApiConfig, ApiKey};
use rext_types::{DecorationPlacement, DecorationStyle, StreamEvent, ViewColumn, Viewport};
use tokio::sync::mpsc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_API_KEY: &str = "sk-test";

/// Start a mock server that simulates the OpenAI API
pub async fn start_openai_mock() -> MockServer {
    MockServer::start().await
}

/// Config pointing at the mock server's `/v1` prefix.
pub fn api_config(server: &MockServer) -> ApiConfig {
    ApiConfig::new(ApiKey::new(TEST_API_KEY).unwrap(), "gpt-4o")
        .unwrap()
        .with_base_url(&format!("{}/v1", server.uri()))
        .unwrap()
}

/// SSE body with one `response.output_text.delta` per chunk, then `response.completed`.
pub fn text_stream_body(chunks: &[&str]) -> String {
    let mut sse_body = String::new();

    for chunk in chunks {
        let data = serde_json::json!({
            "type": "response.output_text.delta",
            "item_id": "msg_test",
            "delta": chunk
        });
        sse_body.push_str(&format!("data: {data}\n\n"));
    }

    let done_event = serde_json::json!({
        "type": "response.completed",
        "response": {"id": "resp_test", "usage": {"input_tokens": 10, "output_tokens": 20}}
    });
    sse_body.push_str(&format!("data: {done_event}\n\n"));
    sse_body
}

/// Mount a streaming SSE response for Responses API
pub async fn mount_streaming_response(server: &MockServer, chunks: &[&str]) {
    mount_sse_body(server, text_stream_body(chunks)).await;
}

/// Mount a raw SSE body
pub async fn mount_sse_body(server: &MockServer, body: String) {
    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .and(header("authorization", format!("Bearer {TEST_API_KEY}").as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/event-stream"),
        )
        .mount(server)
        .await;
}

/// Mount an HTTP error response
pub async fn mount_error(server: &MockServer, status: u16, body: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

/// Drain a transport channel until it closes.
pub async fn collect_events(mut rx: mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

/// Concatenated text of all deltas.
pub fn joined_text(events: &[StreamEvent]) -> String {
    events
        .iter()
        .filter_map(|event| match event {
            StreamEvent::TextDelta(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

/// In-memory editor recording decorations by handle.
#[derive(Default)]
pub struct TestEditor {
    pub document: TextDocument,
    pub visible: Option<Viewport>,
    pub next: u32,
    pub styles: BTreeMap<u32, DecorationStyle>,
    pub placements: BTreeMap<u32, Vec<DecorationPlacement>>,
    pub disposed: Vec<u32>,
}

impl TestEditor {
    pub fn with_lines(lines: &[&str]) -> Self {
        Self {
            document: lines.iter().copied().collect(),
            ..Self::default()
        }
    }
}

impl Document for TestEditor {
    fn line_count(&self) -> usize {
        self.document.line_count()
    }

    fn line_at(&self, index: usize) -> Result<&str, DocumentError> {
        self.document.line_at(index)
    }
}

impl DecorationHost for TestEditor {
    type Handle = u32;

    fn create_decoration(&mut self, style: DecorationStyle) -> u32 {
        self.next += 1;
        self.styles.insert(self.next, style);
        self.next
    }

    fn set_decorations(&mut self, handle: &u32, placements: Vec<DecorationPlacement>) {
        self.placements.insert(*handle, placements);
    }

    fn dispose_decoration(&mut self, handle: u32) {
        self.styles.remove(&handle);
        self.placements.remove(&handle);
        self.disposed.push(handle);
    }
}

impl EditorHost for TestEditor {
    fn visible_range(&self) -> Viewport {
        self.visible
            .unwrap_or_else(|| Viewport::whole(self.document.line_count()))
    }
}

/// Panel host keeping every page it was given.
#[derive(Default)]
pub struct TestPanels {
    pub opened: Vec<(String, ViewColumn)>,
    pub pages: std::rc::Rc<std::cell::RefCell<Vec<String>>>,
}

pub struct TestPanel {
    pages: std::rc::Rc<std::cell::RefCell<Vec<String>>>,
}

impl Panel for TestPanel {
    fn set_html(&mut self, html: String) {
        self.pages.borrow_mut().push(html);
    }
}

impl PanelHost for TestPanels {
    type Panel = TestPanel;

    fn create_panel(&mut self, title: &str, column: ViewColumn) -> TestPanel {
        self.opened.push((title.to_string(), column));
        TestPanel {
            pages: std::rc::Rc::clone(&self.pages),
        }
    }
}
