//! Scripted in-memory provider for engine tests: replies are served in
//! order, and every request is recorded for inspection.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use rto_domain::error::{Error, Result};
use rto_domain::stream::{BoxStream, StreamEvent, Usage};
use rto_providers::{ChatRequest, ChatResponse, ModelProvider};

pub struct ScriptedProvider {
    responses: Mutex<VecDeque<std::result::Result<ChatResponse, String>>>,
    streams: Mutex<VecDeque<Vec<StreamEvent>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<std::result::Result<ChatResponse, String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            streams: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_streams(streams: Vec<Vec<StreamEvent>>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            streams: Mutex::new(streams.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Everything the engine sent, in call order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn complete(&self, req: &ChatRequest) -> Result<ChatResponse> {
        self.requests.lock().unwrap().push(req.clone());
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(resp)) => Ok(resp),
            Some(Err(message)) => Err(Error::Provider(message)),
            None => Err(Error::Provider("response script exhausted".into())),
        }
    }

    async fn complete_stream(
        &self,
        req: &ChatRequest,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        self.requests.lock().unwrap().push(req.clone());
        match self.streams.lock().unwrap().pop_front() {
            Some(events) => Ok(Box::pin(futures_util::stream::iter(
                events.into_iter().map(Ok),
            ))),
            None => Err(Error::Provider("stream script exhausted".into())),
        }
    }

    fn model_id(&self) -> &str {
        "scripted-model"
    }
}

// ── Response builders ─────────────────────────────────────────────

pub fn usage(input: u64, output: u64) -> Usage {
    Usage {
        input_tokens: input,
        output_tokens: output,
    }
}

pub fn response(content: Vec<Value>) -> ChatResponse {
    ChatResponse {
        content,
        usage: Some(usage(10, 20)),
        model: "scripted-model".into(),
        stop_reason: None,
    }
}

/// A terminal turn: a thinking block followed by a text block.
pub fn text_response(thinking: &str, text: &str) -> ChatResponse {
    response(vec![
        json!({"type": "thinking", "thinking": thinking}),
        json!({"type": "text", "text": text}),
    ])
}

/// A tool-use turn: a signed thinking block followed by one tool_use block.
pub fn tool_response(thinking: &str, id: &str, name: &str, input: Value) -> ChatResponse {
    response(vec![
        json!({"type": "thinking", "thinking": thinking, "signature": "sig-abc"}),
        json!({"type": "tool_use", "id": id, "name": name, "input": input}),
    ])
}

/// A reply whose single text block is the given string (for the analyzer
/// and optimizer, which read text, not blocks).
pub fn plain_text(text: &str) -> ChatResponse {
    response(vec![json!({"type": "text", "text": text})])
}

/// An analyzer reply with the given overall score and no patterns.
pub fn analysis_response(overall: f64) -> ChatResponse {
    plain_text(&format!(
        "```json\n{{\"patterns\": [], \"scores\": {{\"overall\": {overall}}},\n \
         \"strengths\": [], \"weaknesses\": [], \"recommendations\": []}}\n```"
    ))
}

/// An optimizer reply proposing the given prompt.
pub fn optimization_response(prompt: &str) -> ChatResponse {
    plain_text(&format!(
        "```json\n{{\"optimized_prompt\": {}, \"diffs\": [], \"key_changes\": [\"rewrote\"],\n \
         \"predicted_improvement\": 10, \"confidence\": 0.8}}\n```",
        serde_json::to_string(prompt).unwrap()
    ))
}
