//! Integration tests for the Responses SSE transport against a mock server.

use pretty_assertions::assert_eq;
use rext_providers::{ApiConfig, ApiKey, ChatMessage, ChatModel, send_message};
use rext_types::StreamEvent;
use tokio::sync::mpsc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{
    TEST_API_KEY, api_config, collect_events, joined_text, mount_error, mount_sse_body,
    mount_streaming_response, start_openai_mock,
};

async fn stream(model: &ChatModel) -> Vec<StreamEvent> {
    let (tx, rx) = mpsc::channel(64);
    let messages = [ChatMessage::user("prompt"), ChatMessage::user("1: x ")];
    send_message(model, &messages, tx).await.unwrap();
    collect_events(rx).await
}

#[tokio::test]
async fn text_deltas_arrive_in_order_then_done() {
    let server = start_openai_mock().await;
    mount_streaming_response(&server, &["{\"line\": 1, ", "\"suggestion\": \"a\"}"]).await;

    let events = stream(&ChatModel::OpenAI(api_config(&server))).await;

    assert_eq!(
        events,
        vec![
            StreamEvent::TextDelta("{\"line\": 1, ".to_string()),
            StreamEvent::TextDelta("\"suggestion\": \"a\"}".to_string()),
            StreamEvent::Done,
        ]
    );
}

#[tokio::test]
async fn request_carries_model_stream_flag_and_user_messages() {
    let server = start_openai_mock().await;
    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-4o",
            "stream": true,
            "input": [
                {"role": "user", "content": "prompt"},
                {"role": "user", "content": "1: x "}
            ]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("data: [DONE]\n\n")
                .insert_header("content-type", "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let events = stream(&ChatModel::OpenAI(api_config(&server))).await;
    assert_eq!(events, vec![StreamEvent::Done]);
}

#[tokio::test]
async fn crlf_delimited_events_are_parsed() {
    let server = start_openai_mock().await;
    let body = "data: {\"type\":\"response.output_text.delta\",\"delta\":\"hi\"}\r\n\r\n\
                event: ping\r\n\r\n\
                data: {\"type\":\"response.completed\"}\r\n\r\n";
    mount_sse_body(&server, body.to_string()).await;

    let events = stream(&ChatModel::OpenAI(api_config(&server))).await;
    assert_eq!(
        events,
        vec![StreamEvent::TextDelta("hi".to_string()), StreamEvent::Done]
    );
}

#[tokio::test]
async fn http_error_is_reported_in_band() {
    let server = start_openai_mock().await;
    mount_error(&server, 401, "{\"error\":{\"message\":\"bad key\"}}").await;

    let events = stream(&ChatModel::OpenAI(api_config(&server))).await;
    assert_eq!(events.len(), 1);
    match &events[0] {
        StreamEvent::Error(message) => {
            assert!(message.contains("401"), "{message}");
            assert!(message.contains("bad key"), "{message}");
        }
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn premature_eof_is_an_error() {
    let server = start_openai_mock().await;
    mount_sse_body(
        &server,
        "data: {\"type\":\"response.output_text.delta\",\"delta\":\"part\"}\n\n".to_string(),
    )
    .await;

    let events = stream(&ChatModel::OpenAI(api_config(&server))).await;
    assert_eq!(joined_text(&events), "part");
    assert_eq!(
        events.last(),
        Some(&StreamEvent::Error(
            "Connection closed before stream completed".to_string()
        ))
    );
}

#[tokio::test]
async fn failed_response_reports_message() {
    let server = start_openai_mock().await;
    mount_sse_body(
        &server,
        "data: {\"type\":\"response.failed\",\"response\":{\"error\":{\"message\":\"overloaded\"}}}\n\n"
            .to_string(),
    )
    .await;

    let events = stream(&ChatModel::OpenAI(api_config(&server))).await;
    assert_eq!(events, vec![StreamEvent::Error("overloaded".to_string())]);
}

#[tokio::test]
async fn repeated_garbage_payloads_end_the_stream() {
    let server = start_openai_mock().await;
    mount_sse_body(
        &server,
        "data: not json\n\ndata: still not\n\ndata: nope\n\n".to_string(),
    )
    .await;

    let events = stream(&ChatModel::OpenAI(api_config(&server))).await;
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], StreamEvent::Error(msg) if msg.starts_with("Invalid stream payload")));
}

#[tokio::test]
async fn unreachable_server_is_reported_in_band() {
    // Reserve a free port, then release it so nothing is listening there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let config = ApiConfig::new(ApiKey::new(TEST_API_KEY).unwrap(), "gpt-4o")
        .unwrap()
        .with_base_url(&format!("http://{addr}/v1"))
        .unwrap();

    let events = stream(&ChatModel::OpenAI(config)).await;
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], StreamEvent::Error(msg) if msg.starts_with("Request failed")));
}
