//! Prompt optimization: turns an analysis report into an improved system
//! prompt, with a fallback extraction cascade for replies that are not the
//! requested JSON.
//!
//! Whatever the model returns, the result always carries a usable prompt,
//! at worst the original, unchanged.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;

use rto_domain::analysis::{AnalysisResult, PatternKind};
use rto_domain::error::Result;
use rto_domain::message::{Message, ToolDefinition};
use rto_domain::optimize::{OptimizationResult, PromptDiff};
use rto_domain::trace::ReasoningTrace;
use rto_providers::{ChatRequest, ModelProvider};

use crate::capture::truncate;
use crate::extract;

const OPTIMIZER_SYSTEM_PROMPT: &str = r#"You are an expert prompt engineer specializing in AI agent optimization.

Your task is to improve agent prompts based on reasoning trace analysis.
You have access to:
1. The original prompt that was used
2. Analysis of how the agent reasoned (its thinking trace)
3. Detected patterns and issues
4. Specific recommendations

Your goal is to create an IMPROVED prompt that:
- Addresses identified weaknesses
- Maintains existing strengths
- Prevents detected failure patterns
- Improves clarity and specificity

When optimizing, consider:
- Adding explicit guardrails for common failure modes
- Clarifying ambiguous instructions
- Adding examples for complex behaviors
- Restructuring for better context positioning
- Adding validation steps where missing

Provide the optimized prompt with clear explanations of changes."#;

/// Generates improved prompts from trace analysis.
pub struct PromptOptimizer {
    provider: Arc<dyn ModelProvider>,
}

impl PromptOptimizer {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self { provider }
    }

    /// Produce an optimized prompt for one analysis.
    pub async fn optimize(
        &self,
        original_prompt: &str,
        analysis: &AnalysisResult,
        trace: Option<&ReasoningTrace>,
        max_tokens: u32,
    ) -> Result<OptimizationResult> {
        let prompt = build_optimization_prompt(original_prompt, analysis, trace);

        let req = ChatRequest {
            system: Some(OPTIMIZER_SYSTEM_PROMPT.to_string()),
            messages: vec![Message::user(prompt)],
            tools: Vec::new(),
            max_tokens,
            model: None,
        };
        let resp = self.provider.complete(&req).await?;

        let optimizer_thinking = resp
            .thinking_blocks()
            .into_iter()
            .last()
            .map(|(content, _)| content)
            .unwrap_or_default();
        let optimization_text = resp.text_blocks().into_iter().last().unwrap_or_default();

        let mut result = parse_optimization(&optimization_text, original_prompt);
        result.optimizer_thinking = optimizer_thinking;
        Ok(result)
    }

    /// Optimize once against patterns aggregated across several runs.
    pub async fn optimize_iterative(
        &self,
        original_prompt: &str,
        analyses: &[AnalysisResult],
        traces: &[ReasoningTrace],
        max_tokens: u32,
    ) -> Result<OptimizationResult> {
        let mut aggregated = AnalysisResult::new("aggregated");
        let mut seen_weaknesses = HashSet::new();
        let mut seen_recommendations = HashSet::new();
        let mut score_sum = 0.0;

        for analysis in analyses {
            aggregated.patterns.extend(analysis.patterns.iter().cloned());
            for w in &analysis.weaknesses {
                if seen_weaknesses.insert(w.clone()) {
                    aggregated.weaknesses.push(w.clone());
                }
            }
            for r in &analysis.recommendations {
                if seen_recommendations.insert(r.clone()) {
                    aggregated.recommendations.push(r.clone());
                }
            }
            score_sum += analysis.overall_score;
        }
        aggregated.overall_score = score_sum / analyses.len().max(1) as f64;

        self.optimize(original_prompt, &aggregated, traces.first(), max_tokens)
            .await
    }

    /// Suggest improved tool descriptions for tools the agent misunderstood.
    ///
    /// Returns an empty map when the analysis found no tool-related patterns
    /// or the reply could not be parsed.
    pub async fn suggest_tool_improvements(
        &self,
        tools: &[ToolDefinition],
        analysis: &AnalysisResult,
        _trace: &ReasoningTrace,
    ) -> Result<HashMap<String, String>> {
        let tool_issues: Vec<_> = analysis
            .patterns
            .iter()
            .filter(|p| matches!(p.kind, PatternKind::ToolConfusion | PatternKind::ToolMisuse))
            .collect();
        if tool_issues.is_empty() {
            return Ok(HashMap::new());
        }

        let issues_text = tool_issues
            .iter()
            .map(|p| format!("- {}: {}", p.kind, p.description))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "Based on these tool usage issues:\n\n{issues_text}\n\n\
             And the original tool definitions:\n{}\n\n\
             Suggest improved tool descriptions. Respond as JSON:\n\
             ```json\n{{\n    \"tool_name\": \"improved description that addresses the confusion\"\n}}\n```",
            serde_json::to_string_pretty(tools)?,
        );

        let req = ChatRequest {
            system: None,
            messages: vec![Message::user(prompt)],
            tools: Vec::new(),
            max_tokens: 2048,
            model: None,
        };
        let resp = self.provider.complete(&req).await?;

        for text in resp.text_blocks() {
            let candidate = extract::json_candidate(&text);
            if let Ok(map) = serde_json::from_str::<HashMap<String, String>>(candidate) {
                return Ok(map);
            }
        }
        Ok(HashMap::new())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Prompt construction
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn build_optimization_prompt(
    original_prompt: &str,
    analysis: &AnalysisResult,
    trace: Option<&ReasoningTrace>,
) -> String {
    let weaknesses = bulleted(&analysis.weaknesses, "None identified");
    let recommendations = bulleted(&analysis.recommendations, "None provided");
    let analyzer_thinking = if analysis.analyzer_thinking.is_empty() {
        "Not available".to_string()
    } else {
        truncate(&analysis.analyzer_thinking, 2000)
    };

    format!(
        r#"Optimize the following agent prompt based on trace analysis:

## Original Task
{task}

## Original System Prompt
```
{original_prompt}
```

## Analysis Results

### Overall Score: {overall}/100

### Detected Patterns
{patterns}

### Weaknesses
{weaknesses}

### Recommendations
{recommendations}

### Analyzer's Reasoning
{analyzer_thinking}

---

Provide your optimization as JSON:
```json
{{
    "optimized_prompt": "<the full improved prompt>",
    "diffs": [
        {{
            "section": "<which part changed, e.g., 'instructions', 'guardrails', 'examples'>",
            "original": "<original text or 'N/A' if new>",
            "optimized": "<new/changed text>",
            "reason": "<why this change helps>"
        }}
    ],
    "key_changes": [
        "<summary of major change 1>",
        "<summary of major change 2>"
    ],
    "predicted_improvement": 15,
    "confidence": 0.75
}}
```

Think carefully about what changes will have the biggest impact on agent performance."#,
        task = trace.map(|t| t.task.as_str()).unwrap_or("Unknown task"),
        overall = analysis.overall_score,
        patterns = format_patterns(analysis),
    )
}

fn format_patterns(analysis: &AnalysisResult) -> String {
    if analysis.patterns.is_empty() {
        return "No significant patterns detected.".to_string();
    }
    analysis
        .patterns
        .iter()
        .map(|p| {
            let evidence = p
                .evidence
                .iter()
                .take(2)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "[{}] {}\n  Description: {}\n  Evidence: {}\n  Suggestion: {}",
                p.severity.as_str().to_uppercase(),
                p.kind,
                p.description,
                evidence,
                p.suggestion,
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn bulleted(items: &[String], fallback: &str) -> String {
    if items.is_empty() {
        return fallback.to_string();
    }
    items
        .iter()
        .map(|i| format!("- {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response parsing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parse the optimizer's reply, cascading through fallback extraction when
/// the JSON is unusable. Never returns an empty prompt.
fn parse_optimization(text: &str, original_prompt: &str) -> OptimizationResult {
    let mut result = OptimizationResult::unchanged(original_prompt);
    let candidate = extract::json_candidate(text);

    match serde_json::from_str::<Value>(candidate) {
        Ok(data) => {
            result.optimized_prompt = data
                .get("optimized_prompt")
                .and_then(Value::as_str)
                .unwrap_or(original_prompt)
                .to_string();
            result.predicted_improvement = data
                .get("predicted_improvement")
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            result.confidence = data.get("confidence").and_then(Value::as_f64).unwrap_or(0.5);
            result.key_changes = data
                .get("key_changes")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            if let Some(diffs) = data.get("diffs").and_then(Value::as_array) {
                for raw in diffs {
                    match serde_json::from_value::<PromptDiff>(raw.clone()) {
                        Ok(diff) => result.diffs.push(diff),
                        Err(e) => tracing::debug!(error = %e, "skipping malformed diff entry"),
                    }
                }
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "optimization JSON unusable, trying fallback extraction");
            match extract::prompt_fallback(text) {
                Some(extracted) if extracted != original_prompt => {
                    result.optimized_prompt = extracted;
                    result.confidence = 0.3;
                    result
                        .key_changes
                        .push(format!("JSON parsing failed ({e}); extracted prompt via fallback"));
                }
                _ => {
                    result
                        .key_changes
                        .push(format!("optimization parsing failed ({e}); using original prompt"));
                }
            }
        }
    }

    if result.optimized_prompt.trim().is_empty() {
        result.optimized_prompt = original_prompt.to_string();
        result
            .key_changes
            .push("optimizer returned an empty prompt; keeping original".to_string());
    }

    result
}
