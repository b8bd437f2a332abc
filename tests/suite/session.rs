//! End-to-end passes: mock Responses API -> session -> editor decorations.

use pretty_assertions::assert_eq;
use rext_core::DecorationOptions;
use rext_engine::{ChatModel, CommandOutcome, ReviewSession};
use rext_types::{ErrorRecord, Position, ViewColumn, Viewport};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{
    TestEditor, TestPanels, api_config, mount_error, mount_streaming_response, start_openai_mock,
    text_stream_body,
};

const SAMPLE: [&str; 3] = ["def f():", "    x=1", "    return x"];

fn session_for(server: &wiremock::MockServer) -> ReviewSession<TestEditor> {
    ReviewSession::new(
        TestEditor::with_lines(&SAMPLE),
        Some(ChatModel::OpenAI(api_config(server))),
        DecorationOptions::default(),
    )
}

#[tokio::test]
async fn annotate_applies_record_split_across_deltas() {
    let server = start_openai_mock().await;
    mount_streaming_response(
        &server,
        &[
            "Sure! ",
            "{ \"line\": 2, \"sugg",
            "estion\": \"Avoid unnamed variable x\" }",
        ],
    )
    .await;

    let mut session = session_for(&server);
    let outcome = session.annotate_visible_code().await;

    assert_eq!(
        outcome,
        CommandOutcome::Completed {
            applied: 1,
            skipped: 0,
            failure: None
        }
    );
    let editor = session.editor();
    let placement = &editor.placements[&1][0];
    assert_eq!(placement.range.start, Position::new(1, 7));
    assert_eq!(placement.hover_text, "Avoid unnamed variable x");
    assert_eq!(editor.styles[&1].after_text, " Avoid unnamed variable x...");
    session.close();
}

#[tokio::test]
async fn annotate_sends_visible_excerpt() {
    let server = start_openai_mock().await;
    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .and(body_string_contains("2:     x=1 \\n3:     return x \\n"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(text_stream_body(&[]))
                .insert_header("content-type", "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut editor = TestEditor::with_lines(&SAMPLE);
    editor.visible = Some(Viewport::new(1, 3));
    let mut session = ReviewSession::new(
        editor,
        Some(ChatModel::OpenAI(api_config(&server))),
        DecorationOptions::default(),
    );

    let outcome = session.annotate_visible_code().await;
    assert_eq!(
        outcome,
        CommandOutcome::Completed {
            applied: 0,
            skipped: 0,
            failure: None
        }
    );
}

#[tokio::test]
async fn api_error_ends_pass_with_failure() {
    let server = start_openai_mock().await;
    mount_error(&server, 500, "upstream down").await;

    let mut session = session_for(&server);
    match session.annotate_visible_code().await {
        CommandOutcome::Completed {
            applied: 0,
            failure: Some(failure),
            ..
        } => assert!(failure.contains("500"), "{failure}"),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(session.decorations().is_empty());
}

#[tokio::test]
async fn review_collects_deduplicated_errors_into_panel() {
    let server = start_openai_mock().await;
    mount_streaming_response(
        &server,
        &[
            "{ \"line\": 3, \"column\": 10, \"message\": \"NameError: x ; NameError: x\" }\n{ \"li",
            "ne\": 3, \"column\": 10, \"message\": \"NameError: x ; NameError: x\" }\n",
            "{ \"line\": 2, \"column\": 5, \"message\": \"<bad> & worse\" }",
        ],
    )
    .await;

    let mut session = session_for(&server);
    let mut panels = TestPanels::default();
    let outcome = session.show_code_review(&mut panels).await;

    assert_eq!(
        outcome,
        CommandOutcome::Reviewed {
            errors: vec![
                ErrorRecord::new(3, 10, "NameError: x ; NameError: x").unwrap(),
                ErrorRecord::new(2, 5, "<bad> & worse").unwrap(),
            ],
            failure: None
        }
    );
    assert_eq!(
        panels.opened,
        vec![("Code Review".to_string(), ViewColumn::Beside)]
    );
    let pages = panels.pages.borrow();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].matches("<tr><td>").count(), 2);
    assert!(pages[0].contains("&lt;bad&gt; &amp; worse"));
}

#[tokio::test]
async fn annotate_then_review_then_clear() {
    let server = start_openai_mock().await;
    mount_streaming_response(&server, &["{\"line\": 1, \"suggestion\": \"a\"}"]).await;

    let mut session = session_for(&server);
    session.annotate_visible_code().await;
    assert_eq!(session.decorations().live_count(), 1);

    let mut panels = TestPanels::default();
    session.show_code_review(&mut panels).await;
    assert!(session.decorations().is_empty());

    assert_eq!(
        session.clear_annotations(),
        CommandOutcome::Cleared { disposed: 0 }
    );
    assert_eq!(session.editor().disposed, vec![1]);
}
