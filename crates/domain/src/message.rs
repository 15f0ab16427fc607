use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool definition exposed to the model (Anthropic Messages wire shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's input.
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Message role. The system prompt travels in a separate top-level request
/// field, and tool results ride inside user messages, so only two roles
/// exist on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in the conversation history sent to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

/// Message content: plain text, or the provider's raw content-block list.
///
/// Assistant turns are always carried as raw blocks. The provider must see
/// its own prior reasoning blocks byte-for-byte when the turn continues, so
/// the content list is treated as opaque and re-sent verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<Value>),
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Assistant message carrying the provider's content blocks unmodified.
    pub fn assistant_blocks(blocks: Vec<Value>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Blocks(blocks),
        }
    }

    /// User message carrying `tool_result` blocks keyed by tool-use id.
    pub fn tool_results(results: &[(String, String)]) -> Self {
        let blocks = results
            .iter()
            .map(|(tool_use_id, content)| {
                serde_json::json!({
                    "type": "tool_result",
                    "tool_use_id": tool_use_id,
                    "content": content,
                })
            })
            .collect();
        Self {
            role: Role::User,
            content: MessageContent::Blocks(blocks),
        }
    }
}

/// A `tool_use` block extracted from assistant content.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolUseBlock {
    pub id: String,
    pub name: String,
    pub input: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_serializes_as_plain_string() {
        let msg = Message::user("hello");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hello");
    }

    #[test]
    fn assistant_blocks_round_trip_verbatim() {
        let blocks = vec![
            serde_json::json!({"type": "thinking", "thinking": "hmm", "signature": "sig1"}),
            serde_json::json!({"type": "tool_use", "id": "t1", "name": "search", "input": {"q": "x"}}),
        ];
        let msg = Message::assistant_blocks(blocks.clone());
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["content"], Value::Array(blocks));
    }

    #[test]
    fn tool_results_shape() {
        let msg = Message::tool_results(&[("call_1".into(), "42".into())]);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"][0]["type"], "tool_result");
        assert_eq!(json["content"][0]["tool_use_id"], "call_1");
        assert_eq!(json["content"][0]["content"], "42");
    }
}
