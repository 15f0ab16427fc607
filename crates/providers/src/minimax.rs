//! MiniMax adapter.
//!
//! Speaks the Anthropic-compatible Messages API exposed at
//! `https://api.minimax.io/anthropic`: system prompt in a top-level
//! `system` field, typed content blocks (`thinking`, `text`, `tool_use`),
//! tool results as `tool_result` blocks inside user messages, and the
//! standard SSE event sequence for streaming.

use rto_domain::error::{Error, Result};
use rto_domain::stream::{BoxStream, StreamEvent, Usage};
use serde_json::Value;
use std::collections::HashMap;

use crate::sse;
use crate::traits::{ChatRequest, ChatResponse, ModelProvider};
use crate::util::from_reqwest;

const ANTHROPIC_VERSION: &str = "2023-06-01";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct MiniMaxProvider {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl MiniMaxProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(from_reqwest)?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    fn authed_post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
    }

    fn build_body(&self, req: &ChatRequest, stream: bool) -> Result<Value> {
        let model = req.model.clone().unwrap_or_else(|| self.model.clone());

        let mut body = serde_json::json!({
            "model": model,
            "max_tokens": req.max_tokens,
            "messages": serde_json::to_value(&req.messages)?,
        });

        if let Some(system) = &req.system {
            body["system"] = Value::String(system.clone());
        }
        if !req.tools.is_empty() {
            body["tools"] = serde_json::to_value(&req.tools)?;
        }
        if stream {
            body["stream"] = Value::Bool(true);
        }

        Ok(body)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response deserialization
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn parse_response(body: &Value) -> Result<ChatResponse> {
    let content = body
        .get("content")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let model = body
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    let stop_reason = body
        .get("stop_reason")
        .and_then(Value::as_str)
        .map(str::to_string);

    let usage = body.get("usage").and_then(parse_usage);

    Ok(ChatResponse {
        content,
        usage,
        model,
        stop_reason,
    })
}

fn parse_usage(v: &Value) -> Option<Usage> {
    Some(Usage {
        input_tokens: v.get("input_tokens")?.as_u64()?,
        output_tokens: v.get("output_tokens")?.as_u64()?,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Streaming
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Assembly state carried across SSE payloads: open tool-use blocks keyed by
/// content-block index, and usage accumulated from `message_start`.
struct StreamState {
    open_tool_calls: HashMap<u64, (String, String, String)>,
    usage: Option<Usage>,
    done_emitted: bool,
}

impl StreamState {
    fn new() -> Self {
        Self {
            open_tool_calls: HashMap::new(),
            usage: None,
            done_emitted: false,
        }
    }
}

/// Parse one SSE `data:` payload into zero or more stream events.
fn parse_sse(data: &str, state: &mut StreamState) -> Vec<Result<StreamEvent>> {
    let v: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => return vec![Err(Error::Json(e))],
    };

    let mut events = Vec::new();
    match v.get("type").and_then(Value::as_str).unwrap_or("") {
        "message_start" => {
            if let Some(msg) = v.get("message") {
                state.usage = msg.get("usage").and_then(parse_usage);
            }
        }

        "content_block_start" => {
            let idx = v.get("index").and_then(Value::as_u64).unwrap_or(0);
            if let Some(block) = v.get("content_block") {
                if block.get("type").and_then(Value::as_str) == Some("tool_use") {
                    let id = str_field(block, "id");
                    let name = str_field(block, "name");
                    events.push(Ok(StreamEvent::ToolCallStarted {
                        id: id.clone(),
                        name: name.clone(),
                    }));
                    state.open_tool_calls.insert(idx, (id, name, String::new()));
                }
            }
        }

        "content_block_delta" => {
            let idx = v.get("index").and_then(Value::as_u64).unwrap_or(0);
            if let Some(delta) = v.get("delta") {
                match delta.get("type").and_then(Value::as_str).unwrap_or("") {
                    "thinking_delta" => {
                        if let Some(text) = delta.get("thinking").and_then(Value::as_str) {
                            if !text.is_empty() {
                                events.push(Ok(StreamEvent::Thinking { text: text.into() }));
                            }
                        }
                    }
                    "text_delta" => {
                        if let Some(text) = delta.get("text").and_then(Value::as_str) {
                            if !text.is_empty() {
                                events.push(Ok(StreamEvent::Token { text: text.into() }));
                            }
                        }
                    }
                    "input_json_delta" => {
                        if let Some(partial) = delta.get("partial_json").and_then(Value::as_str) {
                            if let Some(tc) = state.open_tool_calls.get_mut(&idx) {
                                tc.2.push_str(partial);
                                events.push(Ok(StreamEvent::ToolCallDelta {
                                    id: tc.0.clone(),
                                    delta: partial.into(),
                                }));
                            }
                        }
                    }
                    // signature_delta and unknown delta kinds carry nothing
                    // the trace assembly needs.
                    _ => {}
                }
            }
        }

        "content_block_stop" => {
            let idx = v.get("index").and_then(Value::as_u64).unwrap_or(0);
            if let Some((id, name, args)) = state.open_tool_calls.remove(&idx) {
                let input: Value = if args.trim().is_empty() {
                    Value::Object(Default::default())
                } else {
                    serde_json::from_str(&args).unwrap_or_else(|e| {
                        tracing::warn!(tool = %name, error = %e,
                            "streamed tool input is not valid JSON, using empty object");
                        Value::Object(Default::default())
                    })
                };
                events.push(Ok(StreamEvent::ToolCallFinished { id, name, input }));
            }
        }

        "message_delta" => {
            if let Some(output) = v
                .get("usage")
                .and_then(|u| u.get("output_tokens"))
                .and_then(Value::as_u64)
            {
                let usage = state.usage.get_or_insert_with(Usage::default);
                usage.output_tokens = output;
            }
            if let Some(stop) = v
                .get("delta")
                .and_then(|d| d.get("stop_reason"))
                .and_then(Value::as_str)
            {
                state.done_emitted = true;
                events.push(Ok(StreamEvent::Done {
                    usage: state.usage.clone(),
                    stop_reason: Some(stop.to_string()),
                }));
            }
        }

        "message_stop" => {
            if !state.done_emitted {
                state.done_emitted = true;
                events.push(Ok(StreamEvent::Done {
                    usage: state.usage.clone(),
                    stop_reason: None,
                }));
            }
        }

        "error" => {
            let message = v
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            events.push(Ok(StreamEvent::Error { message }));
        }

        // ping and unknown event types.
        _ => {}
    }

    events
}

fn str_field(v: &Value, key: &str) -> String {
    v.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl ModelProvider for MiniMaxProvider {
    async fn complete(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let url = self.messages_url();
        let body = self.build_body(req, false)?;

        tracing::debug!(url = %url, model = %self.model, "messages request");

        let resp = self
            .authed_post(&url)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        let text = resp.text().await.map_err(from_reqwest)?;
        if !status.is_success() {
            return Err(Error::Provider(format!(
                "HTTP {} - {}",
                status.as_u16(),
                text
            )));
        }

        let json: Value = serde_json::from_str(&text)?;
        parse_response(&json)
    }

    async fn complete_stream(
        &self,
        req: &ChatRequest,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        let url = self.messages_url();
        let body = self.build_body(req, true)?;

        tracing::debug!(url = %url, model = %self.model, "messages stream request");

        let resp = self
            .authed_post(&url)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.map_err(from_reqwest)?;
            return Err(Error::Provider(format!(
                "HTTP {} - {}",
                status.as_u16(),
                text
            )));
        }

        let mut state = StreamState::new();
        Ok(sse::event_stream(resp, move |data| {
            parse_sse(data, &mut state)
        }))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use rto_domain::message::{Message, ToolDefinition};
    use serde_json::json;

    fn provider() -> MiniMaxProvider {
        MiniMaxProvider::new("https://api.minimax.io/anthropic/", "key", "MiniMax-M2.1", 60)
            .unwrap()
    }

    #[test]
    fn trailing_slash_is_trimmed_from_base_url() {
        let p = provider();
        assert_eq!(
            p.messages_url(),
            "https://api.minimax.io/anthropic/v1/messages"
        );
    }

    #[test]
    fn body_carries_system_and_tools() {
        let p = provider();
        let req = ChatRequest {
            system: Some("be brief".into()),
            messages: vec![Message::user("hi")],
            tools: vec![ToolDefinition::new(
                "get_weather",
                "Current weather",
                json!({"type": "object", "properties": {}}),
            )],
            max_tokens: 1024,
            model: None,
        };
        let body = p.build_body(&req, false).unwrap();
        assert_eq!(body["model"], "MiniMax-M2.1");
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["system"], "be brief");
        assert_eq!(body["tools"][0]["name"], "get_weather");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hi");
        assert!(body.get("stream").is_none());
    }

    #[test]
    fn body_omits_empty_sections_and_sets_stream_flag() {
        let p = provider();
        let req = ChatRequest {
            messages: vec![Message::user("q")],
            ..Default::default()
        };
        let body = p.build_body(&req, true).unwrap();
        assert!(body.get("system").is_none());
        assert!(body.get("tools").is_none());
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn model_override_takes_precedence() {
        let p = provider();
        let req = ChatRequest {
            model: Some("MiniMax-M2".into()),
            ..Default::default()
        };
        let body = p.build_body(&req, false).unwrap();
        assert_eq!(body["model"], "MiniMax-M2");
    }

    #[test]
    fn assistant_blocks_round_trip_through_body() {
        let p = provider();
        let blocks = vec![
            json!({"type": "thinking", "thinking": "step 1", "signature": "sig"}),
            json!({"type": "tool_use", "id": "t1", "name": "f", "input": {}}),
        ];
        let req = ChatRequest {
            messages: vec![
                Message::user("go"),
                Message::assistant_blocks(blocks.clone()),
            ],
            ..Default::default()
        };
        let body = p.build_body(&req, false).unwrap();
        assert_eq!(body["messages"][1]["content"], Value::Array(blocks));
    }

    #[test]
    fn response_parses_content_usage_and_stop_reason() {
        let body = json!({
            "model": "MiniMax-M2.1",
            "stop_reason": "tool_use",
            "content": [
                {"type": "thinking", "thinking": "mull it over"},
                {"type": "tool_use", "id": "t1", "name": "get_weather", "input": {"location": "SF"}}
            ],
            "usage": {"input_tokens": 12, "output_tokens": 34}
        });
        let resp = parse_response(&body).unwrap();
        assert_eq!(resp.content.len(), 2);
        assert_eq!(resp.stop_reason.as_deref(), Some("tool_use"));
        let usage = resp.usage.unwrap();
        assert_eq!(usage.input_tokens, 12);
        assert_eq!(usage.total(), 46);
    }

    #[test]
    fn response_without_content_is_empty_not_error() {
        let resp = parse_response(&json!({"model": "m"})).unwrap();
        assert!(resp.content.is_empty());
        assert!(resp.usage.is_none());
    }

    // ── SSE parsing ─────────────────────────────────────────────────

    fn run_events(state: &mut StreamState, payloads: &[Value]) -> Vec<StreamEvent> {
        payloads
            .iter()
            .flat_map(|p| parse_sse(&p.to_string(), state))
            .map(|r| r.unwrap())
            .collect()
    }

    #[test]
    fn sse_thinking_and_text_deltas() {
        let mut state = StreamState::new();
        let events = run_events(
            &mut state,
            &[
                json!({"type": "message_start", "message": {"usage": {"input_tokens": 5, "output_tokens": 0}}}),
                json!({"type": "content_block_delta", "index": 0,
                       "delta": {"type": "thinking_delta", "thinking": "hmm "}}),
                json!({"type": "content_block_delta", "index": 1,
                       "delta": {"type": "text_delta", "text": "four"}}),
                json!({"type": "message_delta", "delta": {"stop_reason": "end_turn"},
                       "usage": {"output_tokens": 9}}),
            ],
        );
        assert!(matches!(&events[0], StreamEvent::Thinking { text } if text == "hmm "));
        assert!(matches!(&events[1], StreamEvent::Token { text } if text == "four"));
        match &events[2] {
            StreamEvent::Done { usage, stop_reason } => {
                assert_eq!(stop_reason.as_deref(), Some("end_turn"));
                let usage = usage.as_ref().unwrap();
                assert_eq!(usage.input_tokens, 5);
                assert_eq!(usage.output_tokens, 9);
            }
            other => panic!("expected Done, got {other:?}"),
        }
    }

    #[test]
    fn sse_tool_call_assembly() {
        let mut state = StreamState::new();
        let events = run_events(
            &mut state,
            &[
                json!({"type": "content_block_start", "index": 1,
                       "content_block": {"type": "tool_use", "id": "t9", "name": "get_weather"}}),
                json!({"type": "content_block_delta", "index": 1,
                       "delta": {"type": "input_json_delta", "partial_json": "{\"location\":"}}),
                json!({"type": "content_block_delta", "index": 1,
                       "delta": {"type": "input_json_delta", "partial_json": "\"SF\"}"}}),
                json!({"type": "content_block_stop", "index": 1}),
            ],
        );
        assert!(matches!(&events[0], StreamEvent::ToolCallStarted { id, .. } if id == "t9"));
        match events.last().unwrap() {
            StreamEvent::ToolCallFinished { name, input, .. } => {
                assert_eq!(name, "get_weather");
                assert_eq!(input["location"], "SF");
            }
            other => panic!("expected ToolCallFinished, got {other:?}"),
        }
    }

    #[test]
    fn sse_malformed_tool_input_becomes_empty_object() {
        let mut state = StreamState::new();
        let events = run_events(
            &mut state,
            &[
                json!({"type": "content_block_start", "index": 0,
                       "content_block": {"type": "tool_use", "id": "t", "name": "f"}}),
                json!({"type": "content_block_delta", "index": 0,
                       "delta": {"type": "input_json_delta", "partial_json": "{not json"}}),
                json!({"type": "content_block_stop", "index": 0}),
            ],
        );
        match events.last().unwrap() {
            StreamEvent::ToolCallFinished { input, .. } => assert_eq!(input, &json!({})),
            other => panic!("expected ToolCallFinished, got {other:?}"),
        }
    }

    #[test]
    fn sse_message_stop_after_message_delta_emits_a_single_done() {
        let mut state = StreamState::new();
        let events = run_events(
            &mut state,
            &[
                json!({"type": "message_delta", "delta": {"stop_reason": "end_turn"},
                       "usage": {"output_tokens": 3}}),
                json!({"type": "message_stop"}),
            ],
        );
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], StreamEvent::Done { .. }));
    }

    #[test]
    fn sse_error_event_surfaces_message() {
        let mut state = StreamState::new();
        let events = run_events(
            &mut state,
            &[json!({"type": "error", "error": {"type": "overloaded_error", "message": "busy"}})],
        );
        assert!(matches!(&events[0], StreamEvent::Error { message } if message == "busy"));
    }

    #[test]
    fn sse_ping_and_signature_delta_are_ignored() {
        let mut state = StreamState::new();
        let events = run_events(
            &mut state,
            &[
                json!({"type": "ping"}),
                json!({"type": "content_block_delta", "index": 0,
                       "delta": {"type": "signature_delta", "signature": "abc"}}),
            ],
        );
        assert!(events.is_empty());
    }

    #[test]
    fn sse_invalid_json_payload_is_an_error() {
        let mut state = StreamState::new();
        let results = parse_sse("{broken", &mut state);
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }
}
