use rto_domain::error::Result;
use rto_domain::message::{Message, ToolDefinition, ToolUseBlock};
use rto_domain::stream::{BoxStream, StreamEvent, Usage};
use serde_json::Value;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / Response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A single model completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// System prompt, sent in the top-level `system` field.
    pub system: Option<String>,
    /// The conversation messages to send.
    pub messages: Vec<Message>,
    /// Tool definitions the model may invoke.
    pub tools: Vec<ToolDefinition>,
    /// Maximum tokens in the response.
    pub max_tokens: u32,
    /// Model identifier override. `None` uses the provider default.
    pub model: Option<String>,
}

impl Default for ChatRequest {
    fn default() -> Self {
        Self {
            system: None,
            messages: Vec::new(),
            tools: Vec::new(),
            max_tokens: 4096,
            model: None,
        }
    }
}

/// A model completion response.
///
/// `content` keeps the provider's content blocks verbatim, in emission
/// order. Re-sending them unmodified on the next request is what preserves
/// the interleaved-reasoning contract; the typed accessors below are views,
/// not transformations.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: Vec<Value>,
    pub usage: Option<Usage>,
    pub model: String,
    pub stop_reason: Option<String>,
}

impl ChatResponse {
    /// Reasoning blocks as `(content, signature)`, in emission order.
    pub fn thinking_blocks(&self) -> Vec<(String, Option<String>)> {
        self.content
            .iter()
            .filter(|b| block_type(b) == "thinking")
            .map(|b| {
                (
                    b.get("thinking")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    b.get("signature")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                )
            })
            .collect()
    }

    /// Plain text blocks, in emission order.
    pub fn text_blocks(&self) -> Vec<String> {
        self.content
            .iter()
            .filter(|b| block_type(b) == "text")
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    }

    /// Tool-use blocks, in emission order.
    pub fn tool_uses(&self) -> Vec<ToolUseBlock> {
        self.content
            .iter()
            .filter(|b| block_type(b) == "tool_use")
            .map(|b| ToolUseBlock {
                id: b
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                name: b
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                input: b
                    .get("input")
                    .cloned()
                    .unwrap_or(Value::Object(Default::default())),
            })
            .collect()
    }
}

fn block_type(block: &Value) -> &str {
    block.get("type").and_then(Value::as_str).unwrap_or("")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Provider trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A model endpoint the engine can call. Implementations are reentrant and
/// shared across capture, analysis, and optimization.
#[async_trait::async_trait]
pub trait ModelProvider: Send + Sync {
    /// Send a completion request and wait for the full response.
    async fn complete(&self, req: &ChatRequest) -> Result<ChatResponse>;

    /// Send a completion request and return a stream of events.
    async fn complete_stream(
        &self,
        req: &ChatRequest,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>>;

    /// Default model identifier for this provider instance.
    fn model_id(&self) -> &str;
}
