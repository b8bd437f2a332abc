//! Config file -> model selection -> session wiring.

use rext_config::RextConfig;
use rext_engine::{ChatModel, CommandOutcome, ReviewSession};
use rext_providers::select_chat_model;

use crate::common::{TestEditor, mount_streaming_response, start_openai_mock};

fn write_config(dir: &tempfile::TempDir, body: &str) -> RextConfig {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, body).unwrap();
    RextConfig::load_from(&path).unwrap().unwrap()
}

#[test]
fn config_selects_model_and_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        &dir,
        r#"
        [model]
        name = "gpt-4.1"
        base_url = "http://127.0.0.1:9/v1"

        [api_keys]
        openai = "sk-config"
        "#,
    );

    let api = select_chat_model(&config).unwrap();
    assert_eq!(api.model(), "gpt-4.1");
    assert_eq!(api.api_key(), "sk-config");
    assert_eq!(api.responses_url(), "http://127.0.0.1:9/v1/responses");
}

#[tokio::test]
async fn session_from_config_uses_annotation_settings() {
    let server = start_openai_mock().await;
    mount_streaming_response(
        &server,
        &["{\"line\": 1, \"suggestion\": \"Prefer descriptive names\"}"],
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        &dir,
        &format!(
            r#"
            [model]
            base_url = "{}/v1"

            [api_keys]
            openai = "sk-test"

            [annotations]
            preview_chars = 7
            color = "darkgrey"
            "#,
            server.uri()
        ),
    );

    let mut session = ReviewSession::from_config(TestEditor::with_lines(&["x = 1"]), &config);
    assert!(matches!(session.model(), Some(ChatModel::OpenAI(_))));

    let outcome = session.annotate_visible_code().await;
    assert!(matches!(outcome, CommandOutcome::Completed { applied: 1, .. }));
    let style = &session.editor().styles[&1];
    assert_eq!(style.after_text, " Prefer ...");
    assert_eq!(style.color, "darkgrey");
    session.close();
}

#[test]
fn invalid_config_reports_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[annotations]\npreview_chars = \"many\"\n").unwrap();
    let err = RextConfig::load_from(&path).unwrap_err();
    assert_eq!(err.path(), &path);
}
