//! Loop controller policy scenarios against a scripted provider.
//!
//! Each loop iteration consumes responses in a fixed order: one capture
//! call (text-only tasks finish in a single turn), one analysis call, and
//! one optimization call when the loop decides to continue.

mod common;

use std::path::PathBuf;
use std::sync::Arc;

use common::*;
use rto_domain::config::LoopConfig;
use rto_engine::OptimizationLoop;
use rto_providers::ChatResponse;

const INITIAL_PROMPT: &str = "You are a helpful assistant.";

fn quiet_config() -> LoopConfig {
    LoopConfig {
        save_artifacts: false,
        verbose: false,
        ..LoopConfig::default()
    }
}

fn looper(responses: Vec<Result<ChatResponse, String>>, config: LoopConfig) -> OptimizationLoop {
    OptimizationLoop::new(Arc::new(ScriptedProvider::new(responses)), config)
}

// Composite for a successful text-only run with default weights:
// 0.4 * 100 + 0.4 * overall. The overalls below are chosen to produce the
// composites each scenario needs.

// ── Best-prompt selection ───────────────────────────────────────────

#[tokio::test]
async fn best_prompt_wins_over_later_regressions() {
    // Composites per iteration: 40, 70, 65, 55, 50.
    let responses = vec![
        Ok(text_response("t", "a")),
        Ok(analysis_response(0.0)),
        Ok(optimization_response("prompt v1")),
        Ok(text_response("t", "a")),
        Ok(analysis_response(75.0)),
        Ok(optimization_response("prompt v2")),
        Ok(text_response("t", "a")),
        Ok(analysis_response(62.5)),
        Ok(optimization_response("prompt v3")),
        Ok(text_response("t", "a")),
        Ok(analysis_response(37.5)),
        Ok(optimization_response("prompt v4")),
        Ok(text_response("t", "a")),
        Ok(analysis_response(25.0)),
        // Iteration 5 stops on consecutive regressions: no optimizer call.
    ];
    let result = looper(responses, quiet_config())
        .run("task", INITIAL_PROMPT, &[], None, None)
        .await
        .unwrap();

    assert_eq!(result.total_iterations, 5);
    assert_eq!(result.iterations.len(), result.total_iterations);
    assert!(result.converged);
    assert_eq!(result.initial_score, 40.0);
    assert_eq!(result.final_score, 70.0);
    // The prompt adopted at iteration 2 (its optimization output) wins.
    assert_eq!(result.final_prompt, "prompt v2");
    // improvement% = (70 - 40) / 40 * 100, exactly.
    assert_eq!(result.improvement_percentage, 75.0);
    // The last iteration stopped before optimizing.
    assert!(result.iterations[4].optimization.is_none());
}

// ── Convergence ─────────────────────────────────────────────────────

#[tokio::test]
async fn small_non_negative_improvement_converges() {
    // Composites: 40 then 41; improvement 1 < threshold 3 and non-negative.
    let responses = vec![
        Ok(text_response("t", "a")),
        Ok(analysis_response(0.0)),
        Ok(optimization_response("prompt v1")),
        Ok(text_response("t", "a")),
        Ok(analysis_response(2.5)),
    ];
    let result = looper(responses, quiet_config())
        .run("task", INITIAL_PROMPT, &[], None, None)
        .await
        .unwrap();

    assert!(result.converged);
    assert_eq!(result.total_iterations, 2);
    assert!(result.iterations[1].optimization.is_none());
}

#[tokio::test]
async fn min_score_threshold_stops_before_optimizing() {
    // Composite 0.4*100 + 0.4*100 = 80 >= 75: stop at iteration 1.
    let responses = vec![
        Ok(text_response("t", "a")),
        Ok(analysis_response(100.0)),
    ];
    let result = looper(responses, quiet_config())
        .run("task", INITIAL_PROMPT, &[], None, None)
        .await
        .unwrap();

    assert!(result.converged);
    assert_eq!(result.total_iterations, 1);
    assert!(result.iterations[0].optimization.is_none());
    assert_eq!(result.initial_score, 80.0);
    assert_eq!(result.final_score, 80.0);
    assert_eq!(result.improvement_percentage, 0.0);
    assert_eq!(result.final_prompt, INITIAL_PROMPT);
}

#[tokio::test]
async fn single_iteration_ceiling_records_exactly_one_iteration() {
    let responses = vec![
        Ok(text_response("t", "a")),
        Ok(analysis_response(50.0)), // composite 60, below min score
    ];
    let config = LoopConfig {
        max_iterations: 1,
        ..quiet_config()
    };
    let result = looper(responses, config)
        .run("task", INITIAL_PROMPT, &[], None, None)
        .await
        .unwrap();

    assert!(result.converged);
    assert_eq!(result.total_iterations, 1);
    assert!(result.iterations[0].optimization.is_none());
    assert_eq!(result.initial_score, result.final_score);
}

// ── Growth cap ──────────────────────────────────────────────────────

#[tokio::test]
async fn oversized_optimized_prompt_is_discarded() {
    let short_initial = "Short.";
    let bloated = "x".repeat(short_initial.len() * 6);
    let responses = vec![
        Ok(text_response("t", "a")),
        Ok(analysis_response(0.0)),
        Ok(optimization_response(&bloated)),
        Ok(text_response("t", "a")),
        Ok(analysis_response(2.5)), // converges
    ];
    let provider = Arc::new(ScriptedProvider::new(responses));
    let result = OptimizationLoop::new(provider.clone(), quiet_config())
        .run("task", short_initial, &[], None, None)
        .await
        .unwrap();

    // The bloated prompt never became the current prompt: the second
    // capture ran with the initial prompt again.
    let requests = provider.requests();
    assert_eq!(requests[3].system.as_deref(), Some(short_initial));
    assert_eq!(result.final_prompt, short_initial);
    // The oversized optimization is still recorded on the iteration.
    assert_eq!(
        result.iterations[0]
            .optimization
            .as_ref()
            .unwrap()
            .optimized_prompt,
        bloated
    );
}

// ── Optimizer parse failure ─────────────────────────────────────────

#[tokio::test]
async fn optimizer_prose_keeps_initial_prompt_end_to_end() {
    let responses = vec![
        Ok(text_response("t", "a")),
        Ok(analysis_response(0.0)),
        Ok(plain_text("I would just keep the prompt, it reads fine to me.")),
        Ok(text_response("t", "a")),
        Ok(analysis_response(2.5)),
    ];
    let result = looper(responses, quiet_config())
        .run("task", INITIAL_PROMPT, &[], None, None)
        .await
        .unwrap();

    assert_eq!(result.final_prompt, INITIAL_PROMPT);
    let optimization = result.iterations[0].optimization.as_ref().unwrap();
    assert_eq!(optimization.optimized_prompt, INITIAL_PROMPT);
    assert!(optimization
        .key_changes
        .iter()
        .any(|c| c.contains("using original prompt")));
}

// ── Cancellation ────────────────────────────────────────────────────

#[tokio::test]
async fn cancellation_stops_before_the_next_iteration() {
    let responses = vec![
        Ok(text_response("t", "a")),
        Ok(analysis_response(0.0)),
        Ok(optimization_response("prompt v1")),
        // Nothing further should be consumed after cancellation.
    ];
    let provider = Arc::new(ScriptedProvider::new(responses));
    let runner = OptimizationLoop::new(provider.clone(), quiet_config());
    let token = runner.cancel_token();

    let cancel_after_first = move |_: &rto_domain::iteration::LoopIteration| token.cancel();
    let result = runner
        .run("task", INITIAL_PROMPT, &[], None, Some(&cancel_after_first))
        .await
        .unwrap();

    assert_eq!(result.total_iterations, 1);
    assert!(!result.converged);
    // capture + analyze + optimize and nothing more.
    assert_eq!(provider.requests().len(), 3);
}

// ── Capture failure inside the loop ─────────────────────────────────

#[tokio::test]
async fn failed_capture_iteration_is_scored_not_fatal() {
    // Iteration 1: provider error during capture; analysis still runs on
    // the failed trace. Composite: 0.4*0 + 0.4*50 = 20.
    let responses = vec![
        Err("HTTP 500 - boom".to_string()),
        Ok(analysis_response(50.0)),
        Ok(optimization_response("prompt v1")),
        Ok(text_response("t", "a")),
        Ok(analysis_response(55.0)), // composite 62; improvement 42 >= 3
        Ok(optimization_response("prompt v2")),
        Ok(text_response("t", "a")),
        Ok(analysis_response(57.5)), // composite 63; improvement 1 -> converge
    ];
    let result = looper(responses, quiet_config())
        .run("task", INITIAL_PROMPT, &[], None, None)
        .await
        .unwrap();

    assert!(!result.iterations[0].task_completed);
    assert!(result.iterations[0].trace.error.as_deref().unwrap().contains("boom"));
    assert_eq!(result.initial_score, 20.0);
    assert!(result.converged);
    assert_eq!(result.total_iterations, 3);
    // Best prompt: iteration 2 (composite 62) contributed its optimization.
    assert_eq!(result.final_prompt, "prompt v2");
    assert_eq!(result.final_score, 63.0);
}

// ── Artifacts ───────────────────────────────────────────────────────

#[tokio::test]
async fn artifacts_are_written_per_iteration_and_finalized() {
    let tmp = tempfile::tempdir().unwrap();
    let responses = vec![
        Ok(text_response("t", "a")),
        Ok(analysis_response(0.0)),
        Ok(optimization_response("prompt v1")),
        Ok(text_response("t", "a")),
        Ok(analysis_response(2.5)),
    ];
    let config = LoopConfig {
        save_artifacts: true,
        artifacts_dir: PathBuf::from(tmp.path()),
        verbose: false,
        ..LoopConfig::default()
    };
    let result = looper(responses, config)
        .run("task", INITIAL_PROMPT, &[], None, None)
        .await
        .unwrap();

    assert!(tmp.path().join("iteration_1/trace.txt").exists());
    assert!(tmp.path().join("iteration_1/analysis.txt").exists());
    assert!(tmp.path().join("iteration_1/optimization.txt").exists());
    assert!(tmp.path().join("iteration_1/optimized_prompt.txt").exists());
    // Iteration 2 stopped before optimizing.
    assert!(tmp.path().join("iteration_2/trace.txt").exists());
    assert!(!tmp.path().join("iteration_2/optimization.txt").exists());
    assert!(tmp.path().join("final_prompt.txt").exists());

    let summary = rto_engine::load_summary(tmp.path()).unwrap();
    assert_eq!(summary.task, "task");
    assert_eq!(summary.total_iterations, result.total_iterations);
    assert_eq!(summary.converged, result.converged);
    assert_eq!(summary.initial_score, result.initial_score);
    assert_eq!(summary.final_score, result.final_score);
    assert_eq!(summary.improvement_percentage, result.improvement_percentage);
}

// ── run_single ──────────────────────────────────────────────────────

#[tokio::test]
async fn run_single_captures_and_analyzes_without_optimizing() {
    let responses = vec![
        Ok(text_response("t", "a")),
        Ok(analysis_response(66.0)),
    ];
    let provider = Arc::new(ScriptedProvider::new(responses));
    let runner = OptimizationLoop::new(provider.clone(), quiet_config());

    let (trace, analysis) = runner
        .run_single("task", INITIAL_PROMPT, &[], None)
        .await
        .unwrap();

    assert!(trace.success);
    assert_eq!(analysis.overall_score, 66.0);
    assert_eq!(analysis.trace_id, trace.session_id);
    assert_eq!(provider.requests().len(), 2);
}
