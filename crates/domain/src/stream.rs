use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;

/// A boxed async stream, used for streaming provider responses.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

/// Events emitted while streaming a model response.
///
/// Streaming exists for live display only; the authoritative trace is
/// assembled from the complete event sequence once the stream closes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A chunk of reasoning content.
    Thinking { text: String },

    /// A chunk of response text.
    Token { text: String },

    /// A tool-use block has opened.
    ToolCallStarted { id: String, name: String },

    /// Incremental tool-use input JSON.
    ToolCallDelta { id: String, delta: String },

    /// A tool-use block is complete with parsed input.
    ToolCallFinished { id: String, name: String, input: Value },

    /// The response is finished.
    Done {
        usage: Option<Usage>,
        stop_reason: Option<String>,
    },

    /// The provider reported an error mid-stream.
    Error { message: String },
}

/// Token usage reported by the provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Usage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}
