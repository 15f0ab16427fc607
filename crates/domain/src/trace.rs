use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One reasoning emission by the model during a turn.
///
/// Immutable after creation except for `following_action`, which capture
/// backfills once the next action (tool use, text, or end of turn) is known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinkingBlock {
    pub content: String,
    /// 0-based turn index.
    pub turn_index: usize,
    pub timestamp: DateTime<Utc>,
    /// Opaque provider signature attached to the reasoning block, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Name of the tool call whose result this block reacts to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preceding_tool_call: Option<String>,
    /// Truncated result of that tool call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preceding_tool_result: Option<String>,
    /// `tool_use:<name>`, `text`, or `end_turn`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub following_action: Option<String>,
}

impl ThinkingBlock {
    pub fn new(content: impl Into<String>, turn_index: usize) -> Self {
        Self {
            content: content.into(),
            turn_index,
            timestamp: Utc::now(),
            signature: None,
            preceding_tool_call: None,
            preceding_tool_result: None,
            following_action: None,
        }
    }

    pub fn with_signature(mut self, signature: Option<String>) -> Self {
        self.signature = signature;
        self
    }
}

/// A tool invocation requested by the agent, together with its outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned tool-use id.
    pub id: String,
    pub name: String,
    pub input: Value,
    /// 0-based turn index.
    pub turn_index: usize,
    /// The result string shown to the model (also set on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Complete reasoning trace for one agent run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningTrace {
    pub session_id: String,
    pub task: String,
    pub system_prompt: String,
    pub model: String,
    pub thinking_blocks: Vec<ThinkingBlock>,
    pub tool_calls: Vec<ToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_response: Option<String>,
    pub total_turns: usize,
    pub total_tokens: u64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ReasoningTrace {
    pub fn new(
        task: impl Into<String>,
        system_prompt: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            task: task.into(),
            system_prompt: system_prompt.into(),
            model: model.into(),
            thinking_blocks: Vec::new(),
            tool_calls: Vec::new(),
            final_response: None,
            total_turns: 0,
            total_tokens: 0,
            success: false,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// First thinking block at a specific turn, if any.
    pub fn thinking_at_turn(&self, turn: usize) -> Option<&ThinkingBlock> {
        self.thinking_blocks.iter().find(|b| b.turn_index == turn)
    }

    /// All tool calls made at a specific turn.
    pub fn tool_calls_at_turn(&self, turn: usize) -> Vec<&ToolCall> {
        self.tool_calls
            .iter()
            .filter(|tc| tc.turn_index == turn)
            .collect()
    }

    /// Number of tool calls that failed.
    pub fn failed_tool_calls(&self) -> usize {
        self.tool_calls.iter().filter(|tc| !tc.success).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trace() -> ReasoningTrace {
        let mut trace = ReasoningTrace::new("task", "prompt", "test-model");
        trace.thinking_blocks.push(ThinkingBlock::new("first", 0));
        trace.thinking_blocks.push(ThinkingBlock::new("second", 1));
        trace.tool_calls.push(ToolCall {
            id: "c1".into(),
            name: "search".into(),
            input: serde_json::json!({}),
            turn_index: 0,
            result: Some("ok".into()),
            success: true,
            error: None,
        });
        trace.tool_calls.push(ToolCall {
            id: "c2".into(),
            name: "search".into(),
            input: serde_json::json!({}),
            turn_index: 1,
            result: Some("Error: boom".into()),
            success: false,
            error: Some("boom".into()),
        });
        trace
    }

    #[test]
    fn thinking_at_turn_finds_first_match() {
        let trace = sample_trace();
        assert_eq!(trace.thinking_at_turn(0).unwrap().content, "first");
        assert_eq!(trace.thinking_at_turn(1).unwrap().content, "second");
        assert!(trace.thinking_at_turn(2).is_none());
    }

    #[test]
    fn tool_calls_at_turn_filters() {
        let trace = sample_trace();
        assert_eq!(trace.tool_calls_at_turn(0).len(), 1);
        assert_eq!(trace.tool_calls_at_turn(1).len(), 1);
        assert!(trace.tool_calls_at_turn(5).is_empty());
    }

    #[test]
    fn failed_tool_calls_counts_only_failures() {
        let trace = sample_trace();
        assert_eq!(trace.failed_tool_calls(), 1);
    }

    #[test]
    fn new_trace_has_unique_session_id() {
        let a = ReasoningTrace::new("t", "p", "m");
        let b = ReasoningTrace::new("t", "p", "m");
        assert_ne!(a.session_id, b.session_id);
        assert!(!a.success);
        assert!(a.error.is_none());
    }
}
