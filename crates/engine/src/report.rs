//! Human-readable renderings of traces, analyses, and optimizations.
//!
//! These are the texts written into the per-iteration artifact files and
//! printed by the CLI.

use std::fmt::Write;

use rto_domain::analysis::AnalysisResult;
use rto_domain::optimize::OptimizationResult;
use rto_domain::trace::ReasoningTrace;

use crate::capture::truncate;

const RULE: &str = "============================================================";
const DASHES: &str = "----------------------------------------";

/// Render a reasoning trace for display.
pub fn render_trace(trace: &ReasoningTrace) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Session: {}", trace.session_id);
    let _ = writeln!(out, "Task: {}", trace.task);
    let _ = writeln!(out, "Model: {}", trace.model);
    let _ = writeln!(
        out,
        "Status: {}",
        if trace.success { "Success" } else { "Failed" }
    );
    let _ = writeln!(out, "Turns: {}", trace.total_turns);
    let _ = writeln!(out, "Tokens: {}", trace.total_tokens);
    let _ = writeln!(out, "\n{RULE}\nREASONING TRACE\n{RULE}");

    for block in &trace.thinking_blocks {
        let _ = writeln!(out, "\n[Turn {}] Thinking:", block.turn_index);
        let _ = writeln!(out, "{DASHES}");
        if block.content.chars().count() > 500 {
            let _ = writeln!(out, "{}...", truncate(&block.content, 500));
        } else {
            let _ = writeln!(out, "{}", block.content);
        }

        for tc in trace.tool_calls_at_turn(block.turn_index) {
            let _ = writeln!(out, "\n  Tool: {}({})", tc.name, tc.input);
            match tc.result.as_deref() {
                Some(result) if result.chars().count() > 100 => {
                    let _ = writeln!(out, "  Result: {}...", truncate(result, 100));
                }
                Some(result) => {
                    let _ = writeln!(out, "  Result: {result}");
                }
                None => {
                    let _ = writeln!(out, "  Result: None");
                }
            }
        }
    }

    if let Some(final_response) = &trace.final_response {
        let _ = writeln!(out, "\n{RULE}\nFINAL RESPONSE\n{RULE}");
        let _ = writeln!(out, "{final_response}");
    }

    if let Some(error) = &trace.error {
        let _ = writeln!(out, "\n{RULE}\nERROR\n{RULE}");
        let _ = writeln!(out, "{error}");
    }

    out
}

/// Render an analysis result as a report.
pub fn render_analysis(analysis: &AnalysisResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}\nREASONING TRACE ANALYSIS REPORT\n{RULE}\n");
    let _ = writeln!(out, "Overall Score: {}/100\n", analysis.overall_score);
    let _ = writeln!(out, "Scores:");
    let _ = writeln!(out, "  - Reasoning Clarity: {}/100", analysis.reasoning_clarity);
    let _ = writeln!(out, "  - Goal Adherence: {}/100", analysis.goal_adherence);
    let _ = writeln!(
        out,
        "  - Tool Usage Quality: {}/100",
        analysis.tool_usage_quality
    );
    let _ = writeln!(out, "  - Error Recovery: {}/100", analysis.error_recovery);

    if !analysis.patterns.is_empty() {
        let _ = writeln!(out, "\nDetected Patterns:");
        for p in &analysis.patterns {
            let _ = writeln!(out, "\n  [{}] {}", p.severity.as_str().to_uppercase(), p.kind);
            let _ = writeln!(out, "    {}", p.description);
            let _ = writeln!(out, "    Suggestion: {}", p.suggestion);
        }
    }

    if !analysis.strengths.is_empty() {
        let _ = writeln!(out, "\nStrengths:");
        for s in &analysis.strengths {
            let _ = writeln!(out, "  + {s}");
        }
    }

    if !analysis.weaknesses.is_empty() {
        let _ = writeln!(out, "\nWeaknesses:");
        for w in &analysis.weaknesses {
            let _ = writeln!(out, "  - {w}");
        }
    }

    if !analysis.recommendations.is_empty() {
        let _ = writeln!(out, "\nRecommendations:");
        for (i, r) in analysis.recommendations.iter().enumerate() {
            let _ = writeln!(out, "  {}. {r}", i + 1);
        }
    }

    out
}

/// Render an optimization result as a report.
pub fn render_optimization(result: &OptimizationResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}\nPROMPT OPTIMIZATION REPORT\n{RULE}\n");
    let _ = writeln!(
        out,
        "Predicted Improvement: {}%",
        result.predicted_improvement
    );
    let _ = writeln!(out, "Confidence: {:.0}%\n", result.confidence * 100.0);

    if !result.key_changes.is_empty() {
        let _ = writeln!(out, "Key Changes:");
        for change in &result.key_changes {
            let _ = writeln!(out, "  - {change}");
        }
        let _ = writeln!(out);
    }

    if !result.diffs.is_empty() {
        let _ = writeln!(out, "Detailed Changes:");
        for diff in &result.diffs {
            let _ = writeln!(out, "\n  [{}]", diff.section);
            if !diff.original.is_empty() && diff.original != "N/A" {
                let _ = writeln!(out, "    Before: {}...", truncate(&diff.original, 100));
            }
            let _ = writeln!(out, "    After: {}...", truncate(&diff.optimized, 100));
            let _ = writeln!(out, "    Reason: {}", diff.reason);
        }
    }

    let _ = writeln!(out, "\n{RULE}\nOPTIMIZED PROMPT\n{RULE}");
    let _ = writeln!(out, "{}", result.optimized_prompt);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rto_domain::analysis::{Pattern, PatternKind, Severity};
    use rto_domain::optimize::PromptDiff;
    use rto_domain::trace::{ThinkingBlock, ToolCall};

    #[test]
    fn trace_rendering_includes_turns_tools_and_outcome() {
        let mut trace = ReasoningTrace::new("compare weather", "be helpful", "m");
        trace.thinking_blocks.push(ThinkingBlock::new("check SF first", 0));
        trace.tool_calls.push(ToolCall {
            id: "c1".into(),
            name: "get_weather".into(),
            input: serde_json::json!({"location": "San Francisco, CA"}),
            turn_index: 0,
            result: Some("{\"temperature\": \"18C\"}".into()),
            success: true,
            error: None,
        });
        trace.final_response = Some("SF is 18C and foggy.".into());
        trace.success = true;
        trace.total_turns = 1;

        let text = render_trace(&trace);
        assert!(text.contains("Status: Success"));
        assert!(text.contains("[Turn 0] Thinking:"));
        assert!(text.contains("Tool: get_weather"));
        assert!(text.contains("FINAL RESPONSE"));
        assert!(text.contains("SF is 18C and foggy."));
    }

    #[test]
    fn failed_trace_rendering_shows_error() {
        let mut trace = ReasoningTrace::new("t", "p", "m");
        trace.error = Some("reached maximum turns (3) without completion".into());
        let text = render_trace(&trace);
        assert!(text.contains("Status: Failed"));
        assert!(text.contains("ERROR"));
        assert!(text.contains("maximum turns"));
    }

    #[test]
    fn long_thinking_is_truncated_with_ellipsis() {
        let mut trace = ReasoningTrace::new("t", "p", "m");
        trace
            .thinking_blocks
            .push(ThinkingBlock::new("z".repeat(800), 0));
        let text = render_trace(&trace);
        assert!(text.contains(&format!("{}...", "z".repeat(500))));
        assert!(!text.contains(&"z".repeat(501)));
    }

    #[test]
    fn analysis_rendering_lists_sections() {
        let mut analysis = AnalysisResult::new("t");
        analysis.overall_score = 64.0;
        analysis.patterns.push(Pattern {
            kind: PatternKind::MissingValidation,
            severity: Severity::High,
            description: "accepted the first result".into(),
            evidence: vec![],
            turn_indices: vec![],
            suggestion: "cross-check".into(),
            confidence: 0.8,
        });
        analysis.strengths.push("stayed on task".into());
        analysis.weaknesses.push("no verification".into());
        analysis.recommendations.push("add a validation step".into());

        let text = render_analysis(&analysis);
        assert!(text.contains("Overall Score: 64/100"));
        assert!(text.contains("[HIGH] missing_validation"));
        assert!(text.contains("  + stayed on task"));
        assert!(text.contains("  - no verification"));
        assert!(text.contains("  1. add a validation step"));
    }

    #[test]
    fn optimization_rendering_skips_na_before() {
        let mut result = OptimizationResult::unchanged("orig");
        result.optimized_prompt = "better".into();
        result.confidence = 0.75;
        result.diffs.push(PromptDiff {
            section: "guardrails".into(),
            original: "N/A".into(),
            optimized: "verify outputs".into(),
            reason: "missing validation".into(),
        });
        let text = render_optimization(&result);
        assert!(text.contains("Confidence: 75%"));
        assert!(!text.contains("Before:"));
        assert!(text.contains("After: verify outputs..."));
        assert!(text.contains("OPTIMIZED PROMPT\n"));
        assert!(text.contains("better"));
    }
}
