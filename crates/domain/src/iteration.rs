use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::analysis::AnalysisResult;
use crate::optimize::OptimizationResult;
use crate::trace::ReasoningTrace;

/// One full capture → analyze → (optimize) cycle of the loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopIteration {
    /// 1-based iteration number.
    pub iteration: usize,
    pub trace: ReasoningTrace,
    pub analysis: AnalysisResult,
    /// Absent when the loop decided to stop before optimizing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimization: Option<OptimizationResult>,

    pub task_completed: bool,
    /// Failed tool calls in this iteration's trace.
    pub error_count: usize,
    pub token_usage: u64,
}

/// Result of running the full optimization loop. Owned and mutated only by
/// the loop controller; everything else treats it as a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopResult {
    pub task: String,
    pub iterations: Vec<LoopIteration>,

    pub final_prompt: String,
    pub converged: bool,
    pub total_iterations: usize,

    pub initial_score: f64,
    pub final_score: f64,
    pub improvement_percentage: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_skill_path: Option<PathBuf>,
}

impl LoopResult {
    pub fn new(task: impl Into<String>, final_prompt: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            iterations: Vec::new(),
            final_prompt: final_prompt.into(),
            converged: false,
            total_iterations: 0,
            initial_score: 0.0,
            final_score: 0.0,
            improvement_percentage: 0.0,
            generated_skill_path: None,
        }
    }
}
