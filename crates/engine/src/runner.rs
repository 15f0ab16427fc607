//! The loop controller: capture → analyze → optimize until the score
//! converges, regresses, or hits the ceiling.
//!
//! All policy comparisons run on the composite score: a weighted blend of
//! boolean task success, the analyzer's overall opinion, and an objective
//! tool-failure penalty. The analyzer can be overconfident about failed
//! runs; the blend keeps one bad signal from steering the loop alone.

use std::sync::Arc;

use rto_domain::analysis::AnalysisResult;
use rto_domain::config::LoopConfig;
use rto_domain::error::Result;
use rto_domain::iteration::{LoopIteration, LoopResult};
use rto_domain::message::ToolDefinition;
use rto_domain::trace::ReasoningTrace;
use rto_providers::ModelProvider;

use crate::analyzer::TraceAnalyzer;
use crate::artifacts;
use crate::cancel::CancelToken;
use crate::capture::{ToolExecutor, TraceCapture};
use crate::optimizer::PromptOptimizer;

/// Turns per capture run.
const CAPTURE_MAX_TURNS: usize = 10;
/// Token caps per component call.
const CAPTURE_MAX_TOKENS: u32 = 4096;
const ANALYSIS_MAX_TOKENS: u32 = 8192;
const OPTIMIZATION_MAX_TOKENS: u32 = 8192;

/// Orchestrates the full optimization cycle.
pub struct OptimizationLoop {
    config: LoopConfig,
    capture: TraceCapture,
    analyzer: TraceAnalyzer,
    optimizer: PromptOptimizer,
    cancel: CancelToken,
}

impl OptimizationLoop {
    pub fn new(provider: Arc<dyn ModelProvider>, config: LoopConfig) -> Self {
        Self {
            config,
            capture: TraceCapture::new(provider.clone()),
            analyzer: TraceAnalyzer::new(provider.clone()),
            optimizer: PromptOptimizer::new(provider),
            cancel: CancelToken::new(),
        }
    }

    /// Token that callers can raise to stop the loop before its next
    /// iteration. The accumulated result is returned with `converged =
    /// false`.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run the full optimization loop.
    pub async fn run(
        &self,
        task: &str,
        initial_prompt: &str,
        tools: &[ToolDefinition],
        executor: Option<&ToolExecutor>,
        on_iteration: Option<&(dyn Fn(&LoopIteration) + Send + Sync)>,
    ) -> Result<LoopResult> {
        if self.config.save_artifacts {
            std::fs::create_dir_all(&self.config.artifacts_dir)?;
        }

        let mut result = LoopResult::new(task, initial_prompt);
        let mut current_prompt = initial_prompt.to_string();

        let mut best_score = 0.0_f64;
        let mut best_prompt = initial_prompt.to_string();
        let mut best_iteration = 0_usize;
        let mut consecutive_regressions = 0_usize;
        let mut prev_composite = 0.0_f64;
        let mut last_composite = 0.0_f64;

        if self.config.verbose {
            tracing::info!(
                task,
                max_iterations = self.config.max_iterations,
                convergence_threshold = self.config.convergence_threshold,
                "starting optimization loop"
            );
        }

        for i in 0..self.config.max_iterations {
            if self.cancel.is_cancelled() {
                tracing::info!(next_iteration = i + 1, "cancelled, stopping loop");
                break;
            }

            // Step 1: capture.
            if self.config.verbose {
                tracing::info!(iteration = i + 1, "capturing trace");
            }
            let trace = self
                .capture
                .run(
                    task,
                    &current_prompt,
                    tools,
                    executor,
                    CAPTURE_MAX_TURNS,
                    CAPTURE_MAX_TOKENS,
                )
                .await;

            // Step 2: analyze.
            if self.config.verbose {
                tracing::info!(iteration = i + 1, "analyzing trace");
            }
            let analysis = self.analyzer.analyze(&trace, ANALYSIS_MAX_TOKENS).await?;

            let composite = composite_score(&self.config, &trace, &analysis);
            if i == 0 {
                result.initial_score = composite;
                best_score = composite;
                best_prompt = current_prompt.clone();
            }

            // Step 3: decide whether to continue.
            let (should_continue, stop_reason) = check_convergence(
                &self.config,
                i,
                composite,
                prev_composite,
                best_score,
                consecutive_regressions,
            );

            // Step 4: optimize when continuing, honoring the growth cap.
            let mut optimization = None;
            if should_continue {
                if self.config.verbose {
                    tracing::info!(iteration = i + 1, "optimizing prompt");
                }
                let opt = self
                    .optimizer
                    .optimize(&current_prompt, &analysis, Some(&trace), OPTIMIZATION_MAX_TOKENS)
                    .await?;

                let cap = initial_prompt.len() as f64 * self.config.max_prompt_growth;
                if opt.optimized_prompt.len() as f64 > cap {
                    tracing::warn!(
                        chars = opt.optimized_prompt.len(),
                        cap = cap as usize,
                        "optimized prompt exceeds the growth cap, keeping current prompt"
                    );
                } else {
                    current_prompt = opt.optimized_prompt.clone();
                }
                optimization = Some(opt);
            }

            // Step 5: update best tracking after optimization, so a
            // high-scoring iteration contributes the improvement it
            // produced, not the prompt it consumed.
            if composite > best_score {
                best_score = composite;
                best_prompt = match &optimization {
                    Some(opt) if opt.optimized_prompt != initial_prompt => {
                        opt.optimized_prompt.clone()
                    }
                    _ => current_prompt.clone(),
                };
                best_iteration = i + 1;
                consecutive_regressions = 0;
            } else if composite < best_score - self.config.regression_threshold {
                consecutive_regressions += 1;
                if self.config.verbose {
                    tracing::warn!(
                        best = best_score,
                        current = composite,
                        consecutive_regressions,
                        "score regressed"
                    );
                }
            }

            // Step 6: record the iteration.
            let iteration = LoopIteration {
                iteration: i + 1,
                task_completed: trace.success,
                error_count: trace.failed_tool_calls(),
                token_usage: trace.total_tokens,
                trace,
                analysis,
                optimization,
            };
            if let Some(callback) = on_iteration {
                callback(&iteration);
            }
            if self.config.verbose {
                log_iteration(&iteration, composite);
            }
            if self.config.save_artifacts {
                if let Err(e) = artifacts::save_iteration(&self.config.artifacts_dir, &iteration) {
                    tracing::warn!(error = %e, "failed to save iteration artifacts");
                }
            }
            result.iterations.push(iteration);

            prev_composite = composite;
            last_composite = composite;

            if !should_continue {
                if self.config.verbose {
                    tracing::info!(reason = %stop_reason, "stopping loop");
                }
                result.converged = true;
                break;
            }
        }

        // Finalization: promote the best prompt when configured and it
        // actually beats the last iteration.
        if self.config.use_best_prompt && best_score > last_composite {
            result.final_prompt = best_prompt;
            result.final_score = best_score;
            if self.config.verbose {
                tracing::info!(
                    iteration = best_iteration,
                    score = best_score,
                    "using best prompt"
                );
            }
        } else {
            result.final_prompt = current_prompt;
            result.final_score = last_composite;
        }

        result.total_iterations = result.iterations.len();
        result.improvement_percentage =
            (result.final_score - result.initial_score) / result.initial_score.max(1.0) * 100.0;

        if result.final_prompt == initial_prompt {
            tracing::warn!(
                "final prompt unchanged from initial; optimization may have failed to parse model responses"
            );
            let any_optimized = result.iterations.iter().any(|it| {
                it.optimization
                    .as_ref()
                    .is_some_and(|o| o.optimized_prompt != initial_prompt)
            });
            if !any_optimized {
                tracing::warn!(
                    "no successful prompt optimizations were extracted; check artifacts for raw optimizer responses"
                );
            }
        }

        if self.config.verbose {
            tracing::info!(
                iterations = result.total_iterations,
                converged = result.converged,
                initial_score = result.initial_score,
                final_score = result.final_score,
                improvement_percentage = result.improvement_percentage,
                "optimization complete"
            );
        }

        if self.config.save_artifacts {
            if let Err(e) = artifacts::save_final(&self.config.artifacts_dir, &result) {
                tracing::warn!(error = %e, "failed to save final artifacts");
            }
        }

        Ok(result)
    }

    /// One capture + analyze cycle with no optimization, for ad-hoc
    /// debugging.
    pub async fn run_single(
        &self,
        task: &str,
        prompt: &str,
        tools: &[ToolDefinition],
        executor: Option<&ToolExecutor>,
    ) -> Result<(ReasoningTrace, AnalysisResult)> {
        let trace = self
            .capture
            .run(
                task,
                prompt,
                tools,
                executor,
                CAPTURE_MAX_TURNS,
                CAPTURE_MAX_TOKENS,
            )
            .await;
        let analysis = self.analyzer.analyze(&trace, ANALYSIS_MAX_TOKENS).await?;
        Ok((trace, analysis))
    }
}

/// One-shot helper: run a quiet loop and return just the final prompt.
pub async fn quick_optimize(
    provider: Arc<dyn ModelProvider>,
    task: &str,
    initial_prompt: &str,
    tools: &[ToolDefinition],
    executor: Option<&ToolExecutor>,
    max_iterations: usize,
) -> Result<String> {
    let config = LoopConfig {
        max_iterations,
        verbose: false,
        save_artifacts: false,
        ..LoopConfig::default()
    };
    let result = OptimizationLoop::new(provider, config)
        .run(task, initial_prompt, tools, executor, None)
        .await?;
    Ok(result.final_prompt)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Policy functions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Weighted blend of success, analyzer opinion, and tool-failure penalty,
/// clamped to [0, 100].
fn composite_score(config: &LoopConfig, trace: &ReasoningTrace, analysis: &AnalysisResult) -> f64 {
    let success = if trace.success { 100.0 } else { 0.0 };
    let penalty = trace.failed_tool_calls() as f64 * 10.0;
    (success * config.success_weight + analysis.overall_score * config.score_weight
        - penalty * config.error_weight)
        .clamp(0.0, 100.0)
}

/// Decide whether the loop should continue. Returns `(continue, reason)`
/// where the reason describes the stop.
fn check_convergence(
    config: &LoopConfig,
    iteration: usize,
    score: f64,
    prev_score: f64,
    best_score: f64,
    consecutive_regressions: usize,
) -> (bool, String) {
    if score >= config.min_score_threshold {
        return (
            false,
            format!(
                "score {score:.1} >= threshold {:.1}",
                config.min_score_threshold
            ),
        );
    }

    if consecutive_regressions >= 2 {
        return (
            false,
            format!("consecutive regressions detected (best was {best_score:.1})"),
        );
    }

    if iteration > 0 {
        let improvement = score - prev_score;
        if improvement.abs() < config.convergence_threshold && score >= prev_score {
            return (
                false,
                format!("converged (improvement {improvement:.1} below threshold)"),
            );
        }
    }

    if iteration >= config.max_iterations - 1 {
        return (
            false,
            format!("reached max iterations ({})", config.max_iterations),
        );
    }

    (true, String::new())
}

fn log_iteration(iteration: &LoopIteration, composite: f64) {
    tracing::info!(
        iteration = iteration.iteration,
        task_completed = iteration.task_completed,
        overall_score = iteration.analysis.overall_score,
        composite,
        patterns = iteration.analysis.patterns.len(),
        tool_errors = iteration.error_count,
        tokens = iteration.token_usage,
        predicted_improvement = iteration
            .optimization
            .as_ref()
            .map(|o| o.predicted_improvement),
        "iteration summary"
    );
}
