//! Trace capture: drives a multi-turn agent conversation and records every
//! reasoning block and tool call along the way.
//!
//! The one rule that must never be broken here: when a turn continues after
//! tool use, the assistant content goes back to the provider **verbatim**,
//! reasoning blocks included. Stripping them breaks the provider's
//! interleaved-reasoning contract.

use std::sync::Arc;

use futures_util::StreamExt;
use serde_json::Value;

use rto_domain::message::{Message, ToolDefinition, ToolUseBlock};
use rto_domain::stream::StreamEvent;
use rto_domain::trace::{ReasoningTrace, ThinkingBlock, ToolCall};
use rto_providers::{ChatRequest, ChatResponse, ModelProvider};

/// Synchronous tool executor: `(tool_name, input) -> result text`.
///
/// An `Err` is captured on the trace and surfaced to the model as
/// `Error: <msg>`; it never aborts the run.
pub type ToolExecutor = dyn Fn(&str, &Value) -> std::result::Result<String, String> + Send + Sync;

/// Display callbacks for the streaming capture variant.
#[derive(Default)]
pub struct StreamCallbacks<'a> {
    pub on_thinking: Option<Box<dyn Fn(&str) + Send + 'a>>,
    pub on_text: Option<Box<dyn Fn(&str) + Send + 'a>>,
    pub on_tool_call: Option<Box<dyn Fn(&str, &Value) + Send + 'a>>,
    pub on_error: Option<Box<dyn Fn(&str) + Send + 'a>>,
}

/// Captures reasoning traces from interleaved-thinking agent runs.
pub struct TraceCapture {
    provider: Arc<dyn ModelProvider>,
}

impl TraceCapture {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self { provider }
    }

    /// Execute a task and capture the full reasoning trace.
    ///
    /// Runs up to `max_turns` assistant turns. Errors from the provider are
    /// recorded on the trace, not returned; capture never retries on its
    /// own; retries are the loop controller's decision.
    pub async fn run(
        &self,
        task: &str,
        system_prompt: &str,
        tools: &[ToolDefinition],
        executor: Option<&ToolExecutor>,
        max_turns: usize,
        max_tokens: u32,
    ) -> ReasoningTrace {
        let mut trace = ReasoningTrace::new(task, system_prompt, self.provider.model_id());
        let mut messages = vec![Message::user(task)];
        let mut turn = 0;

        while turn < max_turns {
            let req = ChatRequest {
                system: Some(system_prompt.to_string()),
                messages: messages.clone(),
                tools: tools.to_vec(),
                max_tokens,
                model: None,
            };

            let resp = match self.provider.complete(&req).await {
                Ok(resp) => resp,
                Err(e) => {
                    tracing::warn!(error = %e, turn, "model call failed during capture");
                    trace.error = Some(e.to_string());
                    trace.success = false;
                    break;
                }
            };

            self.record_thinking(&mut trace, &resp, turn);
            if let Some(usage) = &resp.usage {
                trace.total_tokens += usage.total();
            }

            let tool_uses = resp.tool_uses();
            if tool_uses.is_empty() {
                trace.final_response = resp.text_blocks().into_iter().next();
                trace.success = true;
                backlink_terminal(&mut trace, turn);
                break;
            }

            // Echo the assistant content unmodified, reasoning blocks and all.
            messages.push(Message::assistant_blocks(resp.content.clone()));

            let mut results = Vec::with_capacity(tool_uses.len());
            for tool_use in &tool_uses {
                let result = execute_tool(&mut trace, tool_use, executor, turn);
                results.push((tool_use.id.clone(), result));
            }
            messages.push(Message::tool_results(&results));

            turn += 1;
            trace.total_turns = turn;
        }

        if turn >= max_turns && !trace.success && trace.error.is_none() {
            trace.error = Some(format!(
                "reached maximum turns ({max_turns}) without completion"
            ));
        }

        trace.completed_at = Some(chrono::Utc::now());
        trace
    }

    /// Streaming capture: same protocol, but reasoning and text chunks are
    /// forwarded to the callbacks as they arrive.
    ///
    /// The trace is assembled from the completed event sequence of each
    /// turn. Because assistant content is reconstructed rather than echoed
    /// byte-for-byte, multi-turn tool flows are less reliable here; prefer
    /// [`TraceCapture::run`] when correctness matters more than display.
    pub async fn run_streaming(
        &self,
        task: &str,
        system_prompt: &str,
        tools: &[ToolDefinition],
        executor: Option<&ToolExecutor>,
        max_turns: usize,
        max_tokens: u32,
        callbacks: &StreamCallbacks<'_>,
    ) -> ReasoningTrace {
        let mut trace = ReasoningTrace::new(task, system_prompt, self.provider.model_id());
        let mut messages = vec![Message::user(task)];
        let mut turn = 0;

        'turns: while turn < max_turns {
            let req = ChatRequest {
                system: Some(system_prompt.to_string()),
                messages: messages.clone(),
                tools: tools.to_vec(),
                max_tokens,
                model: None,
            };

            let mut stream = match self.provider.complete_stream(&req).await {
                Ok(stream) => stream,
                Err(e) => {
                    record_stream_failure(&mut trace, &e.to_string(), callbacks);
                    break;
                }
            };

            let mut thinking_buf = String::new();
            let mut text_buf = String::new();
            let mut tool_uses: Vec<ToolUseBlock> = Vec::new();

            while let Some(event) = stream.next().await {
                match event {
                    Ok(StreamEvent::Thinking { text }) => {
                        if let Some(cb) = &callbacks.on_thinking {
                            cb(&text);
                        }
                        thinking_buf.push_str(&text);
                    }
                    Ok(StreamEvent::Token { text }) => {
                        if let Some(cb) = &callbacks.on_text {
                            cb(&text);
                        }
                        text_buf.push_str(&text);
                    }
                    Ok(StreamEvent::ToolCallFinished { id, name, input }) => {
                        if let Some(cb) = &callbacks.on_tool_call {
                            cb(&name, &input);
                        }
                        tool_uses.push(ToolUseBlock { id, name, input });
                    }
                    Ok(StreamEvent::Done { usage, .. }) => {
                        if let Some(usage) = usage {
                            trace.total_tokens += usage.total();
                        }
                    }
                    Ok(StreamEvent::Error { message }) => {
                        record_stream_failure(&mut trace, &message, callbacks);
                        break 'turns;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        record_stream_failure(&mut trace, &e.to_string(), callbacks);
                        break 'turns;
                    }
                }
            }

            if !thinking_buf.is_empty() {
                let mut block = ThinkingBlock::new(thinking_buf.clone(), turn);
                if turn > 0 {
                    if let Some(tc) = trace.tool_calls.last() {
                        block.preceding_tool_call = Some(tc.name.clone());
                        block.preceding_tool_result =
                            tc.result.as_deref().map(|r| truncate(r, 200));
                    }
                }
                trace.thinking_blocks.push(block);
            }

            if tool_uses.is_empty() {
                trace.final_response = (!text_buf.is_empty()).then_some(text_buf);
                trace.success = true;
                backlink_terminal(&mut trace, turn);
                break;
            }

            // Reconstruct the assistant content in block order for history.
            let mut blocks = Vec::new();
            if !thinking_buf.is_empty() {
                blocks.push(serde_json::json!({"type": "thinking", "thinking": thinking_buf}));
            }
            if !text_buf.is_empty() {
                blocks.push(serde_json::json!({"type": "text", "text": text_buf}));
            }
            for tu in &tool_uses {
                blocks.push(serde_json::json!({
                    "type": "tool_use", "id": tu.id, "name": tu.name, "input": tu.input,
                }));
            }
            messages.push(Message::assistant_blocks(blocks));

            let mut results = Vec::with_capacity(tool_uses.len());
            for tool_use in &tool_uses {
                let result = execute_tool(&mut trace, tool_use, executor, turn);
                results.push((tool_use.id.clone(), result));
            }
            messages.push(Message::tool_results(&results));

            turn += 1;
            trace.total_turns = turn;
        }

        if turn >= max_turns && !trace.success && trace.error.is_none() {
            trace.error = Some(format!(
                "reached maximum turns ({max_turns}) without completion"
            ));
        }

        trace.completed_at = Some(chrono::Utc::now());
        trace
    }

    /// Record the response's reasoning blocks, tagging the first block of a
    /// follow-up turn with the tool call it reacts to.
    fn record_thinking(&self, trace: &mut ReasoningTrace, resp: &ChatResponse, turn: usize) {
        let prior = trace
            .tool_calls
            .last()
            .map(|tc| (tc.name.clone(), tc.result.clone()));
        let mut first_of_turn = trace.thinking_at_turn(turn).is_none();

        for (content, signature) in resp.thinking_blocks() {
            let mut block = ThinkingBlock::new(content, turn).with_signature(signature);
            if first_of_turn && turn > 0 {
                if let Some((name, result)) = &prior {
                    block.preceding_tool_call = Some(name.clone());
                    block.preceding_tool_result = result.as_deref().map(|r| truncate(r, 200));
                }
            }
            first_of_turn = false;
            trace.thinking_blocks.push(block);
        }
    }
}

/// Invoke the executor for one tool use, record the outcome on the trace,
/// and back-link the latest same-turn thinking block. Returns the result
/// string shown to the model.
fn execute_tool(
    trace: &mut ReasoningTrace,
    tool_use: &ToolUseBlock,
    executor: Option<&ToolExecutor>,
    turn: usize,
) -> String {
    let outcome = match executor {
        Some(exec) => exec(&tool_use.name, &tool_use.input),
        None => Ok(format!("[mock result for {}]", tool_use.name)),
    };

    let (result, success, error) = match outcome {
        Ok(result) => (result, true, None),
        Err(e) => {
            tracing::warn!(tool = %tool_use.name, error = %e, "tool executor failed");
            (format!("Error: {e}"), false, Some(e))
        }
    };

    trace.tool_calls.push(ToolCall {
        id: tool_use.id.clone(),
        name: tool_use.name.clone(),
        input: tool_use.input.clone(),
        turn_index: turn,
        result: Some(result.clone()),
        success,
        error,
    });

    if let Some(last) = trace.thinking_blocks.last_mut() {
        if last.turn_index == turn {
            last.following_action = Some(format!("tool_use:{}", tool_use.name));
        }
    }

    result
}

/// Back-link the final thinking block of the terminal turn.
fn backlink_terminal(trace: &mut ReasoningTrace, turn: usize) {
    let action = if trace.final_response.is_some() {
        "text"
    } else {
        "end_turn"
    };
    if let Some(last) = trace.thinking_blocks.last_mut() {
        if last.turn_index == turn && last.following_action.is_none() {
            last.following_action = Some(action.to_string());
        }
    }
}

fn record_stream_failure(trace: &mut ReasoningTrace, message: &str, cb: &StreamCallbacks<'_>) {
    tracing::warn!(error = %message, "streaming capture failed");
    trace.error = Some(message.to_string());
    trace.success = false;
    if let Some(on_error) = &cb.on_error {
        on_error(message);
    }
}

pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}
