//! Trace analysis: submits a formatted trace to the model and parses the
//! structured report back out, surviving malformed replies.
//!
//! The hardest invariant lives here: **no parse failure may produce a zero
//! overall score**. A literal 0 would read as a catastrophic regression to
//! the loop controller, so the fallback floor is 50.

use std::sync::Arc;

use serde_json::Value;

use rto_domain::analysis::{AnalysisResult, Pattern};
use rto_domain::error::Result;
use rto_domain::trace::ReasoningTrace;
use rto_providers::{ChatRequest, ModelProvider};

use crate::capture::truncate;
use crate::extract;

const ANALYZER_SYSTEM_PROMPT: &str = r#"You are an expert AI agent debugger specializing in analyzing reasoning traces.

Your task is to analyze an agent's interleaved thinking trace and identify:
1. **Patterns of failure** - detect specific failure modes with evidence
2. **Quality scores** - rate the agent's reasoning on multiple dimensions
3. **Actionable recommendations** - specific improvements for prompts/instructions

## Pattern Definitions

Detect these patterns with specific evidence from thinking blocks:

- **context_degradation**: Agent loses or forgets information from earlier in the conversation
  - Look for: Repeated questions, contradicting earlier statements, missing key details
- **tool_confusion**: Agent misunderstands what a tool does or how to use it
  - Look for: Wrong tool selection, incorrect parameters, misinterpreting results
- **instruction_drift**: Agent gradually deviates from original instructions/persona
  - Look for: Changing behavior, ignoring constraints, different tone over time
- **hallucination**: Agent generates information not supported by context or tools
  - Look for: Made-up facts, fabricated tool results, unsourced claims
- **incomplete_reasoning**: Agent reaches conclusions without thorough analysis
  - Look for: Skipped steps, missing validation, superficial exploration
- **tool_misuse**: Agent uses tools incorrectly or inefficiently
  - Look for: Redundant calls, wrong parameters, unused results
- **goal_abandonment**: Agent stops pursuing the original objective
  - Look for: Topic drift, giving up, switching goals without reason
- **circular_reasoning**: Agent repeats similar actions without progress
  - Look for: Same queries repeated, looping behavior, no new information
- **premature_conclusion**: Agent concludes before completing the task
  - Look for: Early stops, incomplete answers, skipped requirements
- **missing_validation**: Agent doesn't verify results or assumptions
  - Look for: No cross-checking, accepting first result, no error handling

## Analysis Focus

You have access to the FULL reasoning trace including all thinking blocks between tool calls.
This gives you unique insight into HOW the agent reasons, not just what it outputs.

For each thinking block, examine:
- What is the agent's current understanding?
- How does it interpret tool results?
- What alternatives does it consider?
- Does it maintain awareness of the original goal?

Provide your analysis in the specified JSON format with concrete evidence."#;

/// Analyzes reasoning traces to detect failure patterns and score quality.
pub struct TraceAnalyzer {
    provider: Arc<dyn ModelProvider>,
}

impl TraceAnalyzer {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self { provider }
    }

    /// Analyze a trace and return patterns, scores, and recommendations.
    pub async fn analyze(&self, trace: &ReasoningTrace, max_tokens: u32) -> Result<AnalysisResult> {
        let prompt = build_analysis_prompt(trace);

        let req = ChatRequest {
            system: Some(ANALYZER_SYSTEM_PROMPT.to_string()),
            messages: vec![rto_domain::message::Message::user(prompt)],
            tools: Vec::new(),
            max_tokens,
            model: None,
        };
        let resp = self.provider.complete(&req).await?;

        let analyzer_thinking = resp
            .thinking_blocks()
            .into_iter()
            .last()
            .map(|(content, _)| content)
            .unwrap_or_default();
        let analysis_text = resp.text_blocks().into_iter().last().unwrap_or_default();

        let mut result = parse_analysis(&analysis_text, &trace.session_id);
        result.analyzer_thinking = analyzer_thinking;
        result.analyzer_model = self.provider.model_id().to_string();
        Ok(result)
    }

    /// Analyze several traces in sequence.
    pub async fn analyze_batch(
        &self,
        traces: &[ReasoningTrace],
        max_tokens: u32,
    ) -> Result<Vec<AnalysisResult>> {
        let mut results = Vec::with_capacity(traces.len());
        for trace in traces {
            results.push(self.analyze(trace, max_tokens).await?);
        }
        Ok(results)
    }

    /// Cheap single-number rating without pattern detail.
    ///
    /// Sends only thinking excerpts (up to 2,000 chars) plus the task,
    /// success flag, and turn count; returns 50.0 when the reply is not a
    /// bare number.
    pub async fn quick_score(&self, trace: &ReasoningTrace) -> Result<f64> {
        let prompt = format!(
            "Rate this agent's performance from 0-100 based on its reasoning trace.\n\n\
             Task: {}\nSuccess: {}\nTurns: {}\n\n\
             Thinking excerpts:\n{}\n\n\
             Respond with ONLY a number from 0-100.",
            trace.task,
            trace.success,
            trace.total_turns,
            thinking_excerpts(trace, 2000),
        );

        let req = ChatRequest {
            system: None,
            messages: vec![rto_domain::message::Message::user(prompt)],
            tools: Vec::new(),
            max_tokens: 100,
            model: None,
        };
        let resp = self.provider.complete(&req).await?;

        for text in resp.text_blocks() {
            if let Ok(score) = text.trim().parse::<f64>() {
                return Ok(score.clamp(0.0, 100.0));
            }
        }
        Ok(50.0)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Prompt construction
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn build_analysis_prompt(trace: &ReasoningTrace) -> String {
    format!(
        r#"Analyze the following agent reasoning trace:

## Task
{task}

## System Prompt Given to Agent
{system_prompt}

## Reasoning Trace
{trace_text}

## Tool Calls Made
{tool_calls}

## Final Outcome
Success: {success}
Final Response: {final_response}
Error (if any): {error}

---

Provide your analysis as JSON with this exact structure:
```json
{{
    "patterns": [
        {{
            "type": "<one of: context_degradation, tool_confusion, instruction_drift, hallucination, incomplete_reasoning, tool_misuse, goal_abandonment, circular_reasoning, premature_conclusion, missing_validation>",
            "severity": "<one of: low, medium, high, critical>",
            "description": "<what the pattern is>",
            "evidence": ["<excerpt from thinking>", "<another excerpt>"],
            "turn_indices": [0, 2],
            "suggestion": "<how to fix this>",
            "confidence": 0.85
        }}
    ],
    "scores": {{
        "reasoning_clarity": 75,
        "goal_adherence": 80,
        "tool_usage_quality": 60,
        "error_recovery": 50,
        "overall": 66
    }},
    "strengths": ["<strength 1>", "<strength 2>"],
    "weaknesses": ["<weakness 1>", "<weakness 2>"],
    "recommendations": [
        "<specific actionable recommendation>",
        "<another recommendation>"
    ]
}}
```

Think carefully about each aspect before providing your analysis."#,
        task = trace.task,
        system_prompt = trace.system_prompt,
        trace_text = format_thinking(trace),
        tool_calls = format_tool_calls(trace),
        success = trace.success,
        final_response = trace.final_response.as_deref().unwrap_or("None"),
        error = trace.error.as_deref().unwrap_or("None"),
    )
}

fn format_thinking(trace: &ReasoningTrace) -> String {
    let mut parts = Vec::new();
    for block in &trace.thinking_blocks {
        parts.push(format!("[Turn {}] Thinking:", block.turn_index));
        parts.push(block.content.clone());
        parts.push(String::new());
    }
    parts.join("\n")
}

fn format_tool_calls(trace: &ReasoningTrace) -> String {
    if trace.tool_calls.is_empty() {
        return "No tool calls made.".to_string();
    }
    trace
        .tool_calls
        .iter()
        .map(|tc| {
            let status = if tc.success {
                "Success".to_string()
            } else {
                format!("Failed: {}", tc.error.as_deref().unwrap_or("unknown"))
            };
            let result = tc
                .result
                .as_deref()
                .map(|r| truncate(r, 200))
                .unwrap_or_else(|| "None".into());
            format!("- {}({}) -> {}\n  Result: {}...", tc.name, tc.input, status, result)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn thinking_excerpts(trace: &ReasoningTrace, max_chars: usize) -> String {
    let mut excerpts = Vec::new();
    let mut remaining = max_chars as isize;
    for block in &trace.thinking_blocks {
        if remaining <= 0 {
            break;
        }
        let excerpt = truncate(&block.content, remaining as usize);
        remaining -= excerpt.chars().count() as isize + 20;
        excerpts.push(format!("[Turn {}]: {}", block.turn_index, excerpt));
    }
    excerpts.join("\n\n")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response parsing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parse the analyzer's reply. Falls back to regex score probes when the
/// JSON is unusable; the overall score floors at 50 on failure.
fn parse_analysis(text: &str, trace_id: &str) -> AnalysisResult {
    let candidate = extract::json_candidate(text);

    let mut result = match serde_json::from_str::<Value>(candidate) {
        Ok(data) => analysis_from_json(&data, trace_id),
        Err(e) => {
            tracing::warn!(error = %e, "analysis JSON unusable, falling back to probes");
            fallback_analysis(text, trace_id, &e.to_string())
        }
    };

    // A zero score with no patterns is almost always a silent parse problem,
    // not a genuine verdict. Salvage what the text offers.
    if result.overall_score == 0.0 && result.patterns.is_empty() {
        result
            .weaknesses
            .push("analysis may have failed: score is 0 with no patterns detected".to_string());
        if let Some(score) = extract::score_probe(text) {
            if score > 0.0 {
                result.overall_score = score;
                result
                    .recommendations
                    .push(format!("score {score} recovered via fallback extraction"));
            }
        }
    }

    result
}

fn analysis_from_json(data: &Value, trace_id: &str) -> AnalysisResult {
    let mut result = AnalysisResult::new(trace_id);

    if let Some(patterns) = data.get("patterns").and_then(Value::as_array) {
        for raw in patterns {
            match serde_json::from_value::<Pattern>(raw.clone()) {
                Ok(pattern) => result.patterns.push(pattern),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping malformed pattern entry");
                }
            }
        }
    }

    let scores = data.get("scores").cloned().unwrap_or(Value::Null);
    let score = |key: &str| {
        scores
            .get(key)
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
            .clamp(0.0, 100.0)
    };
    result.reasoning_clarity = score("reasoning_clarity");
    result.goal_adherence = score("goal_adherence");
    result.tool_usage_quality = score("tool_usage_quality");
    result.error_recovery = score("error_recovery");
    result.overall_score = score("overall");

    result.strengths = string_list(data.get("strengths"));
    result.weaknesses = string_list(data.get("weaknesses"));
    result.recommendations = string_list(data.get("recommendations"));

    result
}

fn fallback_analysis(text: &str, trace_id: &str, error: &str) -> AnalysisResult {
    let mut result = AnalysisResult::new(trace_id);
    result.overall_score = match extract::score_probe(text) {
        Some(score) if score > 0.0 => score,
        _ => 50.0,
    };
    result.weaknesses = vec!["JSON parsing failed: analysis may be incomplete".to_string()];
    result.recommendations = vec![
        format!("analysis parsing failed ({error}); used fallback extraction"),
        "consider re-running analysis if results seem inconsistent".to_string(),
    ];
    result
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
