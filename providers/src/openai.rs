use crate::{
    ApiConfig, ApiResponse, ChatMessage, Result, SseParseAction, SseParser, StreamEvent,
    handle_response, http_client_for, mpsc, process_sse_stream, send_event,
};
use serde_json::{Value, json};
use std::collections::HashSet;

// ========================================================================
// OpenAI SSE Parser
// ========================================================================

use crate::sse_types::openai as typed;

#[derive(Default)]
struct OpenAIParser {
    /// Track which item_ids have received text deltas (for fallback on .done)
    text_delta_seen: HashSet<String>,
}

impl SseParser for OpenAIParser {
    fn parse(&mut self, json: &Value) -> SseParseAction {
        // Deserialize into typed event - forward compatible via Unknown variant
        let event: typed::Event = match serde_json::from_value(json.clone()) {
            Ok(e) => e,
            Err(e) => {
                tracing::debug!("Failed to parse OpenAI SSE event: {e}");
                return SseParseAction::Continue;
            }
        };

        match event {
            typed::Event::OutputTextDelta { item_id, delta } => {
                if let Some(delta) = delta {
                    if let Some(item_id) = item_id {
                        self.text_delta_seen.insert(item_id);
                    }
                    return SseParseAction::Emit(vec![StreamEvent::TextDelta(delta)]);
                }
            }

            typed::Event::RefusalDelta { delta } => {
                if let Some(delta) = delta {
                    tracing::info!(refusal = %delta, "Model refused");
                }
            }

            typed::Event::OutputTextDone { item_id, text } => {
                // Only emit fallback if no deltas were seen for this item
                let saw_delta = item_id
                    .as_ref()
                    .is_some_and(|id| self.text_delta_seen.contains(id));
                if !saw_delta && let Some(text) = text {
                    return SseParseAction::Emit(vec![StreamEvent::TextDelta(text)]);
                }
            }

            typed::Event::Completed { response } => {
                if let Some(usage) = response.and_then(|r| r.usage) {
                    tracing::debug!(
                        input_tokens = usage.input_tokens,
                        output_tokens = usage.output_tokens,
                        "Response completed"
                    );
                }
                return SseParseAction::Done;
            }

            typed::Event::Incomplete { response } => {
                let reason = response
                    .and_then(|r| r.incomplete_details)
                    .and_then(|d| d.reason)
                    .unwrap_or_else(|| "Response incomplete".to_string());
                return SseParseAction::Error(reason);
            }

            typed::Event::Failed { response, error } => {
                let message = error
                    .and_then(|e| e.message)
                    .or_else(|| response.and_then(|r| r.error).and_then(|e| e.message))
                    .unwrap_or_else(|| "Response failed".to_string());
                return SseParseAction::Error(message);
            }

            typed::Event::Error { error } => {
                let message = error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| "Unknown error".to_string());
                return SseParseAction::Error(message);
            }

            typed::Event::Unknown => {}
        }

        SseParseAction::Continue
    }

    fn provider_name(&self) -> &'static str {
        "OpenAI"
    }
}

/// Request body for a streamed Responses call. Every message is a user turn.
fn build_request_body(config: &ApiConfig, messages: &[ChatMessage]) -> Value {
    let input: Vec<Value> = messages
        .iter()
        .map(|msg| json!({ "role": "user", "content": msg.content() }))
        .collect();

    json!({
        "model": config.model(),
        "input": input,
        "stream": true,
    })
}

pub async fn send_message(
    config: &ApiConfig,
    messages: &[ChatMessage],
    tx: mpsc::Sender<StreamEvent>,
) -> Result<()> {
    let client = match http_client_for(config.base_url()) {
        Ok(client) => client,
        Err(e) => {
            let _ = send_event(&tx, StreamEvent::Error(format!("HTTP client error: {e}"))).await;
            return Ok(());
        }
    };

    let body = build_request_body(config, messages);
    tracing::debug!(
        model = config.model(),
        messages = messages.len(),
        "Sending Responses request"
    );

    let outcome = client
        .post(config.responses_url())
        .header("Authorization", format!("Bearer {}", config.api_key()))
        .header("content-type", "application/json")
        .json(&body)
        .send()
        .await;

    let response = match handle_response(outcome, &tx).await {
        ApiResponse::Success(resp) => resp,
        ApiResponse::StreamTerminated => return Ok(()),
    };

    let mut parser = OpenAIParser::default();
    process_sse_stream(response, &mut parser, &tx, config.idle_timeout()).await
}
