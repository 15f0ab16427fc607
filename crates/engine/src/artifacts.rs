//! Flat per-iteration artifacts written under the configured directory.
//!
//! Layout:
//! ```text
//! iteration_<n>/trace.txt
//! iteration_<n>/analysis.txt
//! iteration_<n>/optimization.txt        (if optimized)
//! iteration_<n>/optimized_prompt.txt    (if optimized)
//! final_prompt.txt
//! summary.json
//! ```
//! Writes are sequential; concurrent loops sharing a directory are not
//! supported.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use rto_domain::error::{Error, Result};
use rto_domain::iteration::{LoopIteration, LoopResult};

use crate::report;

/// The summary persisted as `summary.json` after a loop run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub task: String,
    pub total_iterations: usize,
    pub converged: bool,
    pub initial_score: f64,
    pub final_score: f64,
    pub improvement_percentage: f64,
    pub timestamp: String,
}

impl RunSummary {
    pub fn from_result(result: &LoopResult) -> Self {
        Self {
            task: result.task.clone(),
            total_iterations: result.total_iterations,
            converged: result.converged,
            initial_score: result.initial_score,
            final_score: result.final_score,
            improvement_percentage: result.improvement_percentage,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Write one iteration's artifacts into `<dir>/iteration_<n>/`.
pub fn save_iteration(dir: &Path, iteration: &LoopIteration) -> Result<()> {
    let base = dir.join(format!("iteration_{}", iteration.iteration));
    fs::create_dir_all(&base)?;

    fs::write(base.join("trace.txt"), report::render_trace(&iteration.trace))?;
    fs::write(
        base.join("analysis.txt"),
        report::render_analysis(&iteration.analysis),
    )?;

    if let Some(optimization) = &iteration.optimization {
        fs::write(
            base.join("optimization.txt"),
            report::render_optimization(optimization),
        )?;
        fs::write(
            base.join("optimized_prompt.txt"),
            &optimization.optimized_prompt,
        )?;
    }

    Ok(())
}

/// Write the final prompt and summary into `dir`.
pub fn save_final(dir: &Path, result: &LoopResult) -> Result<()> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join("final_prompt.txt"), &result.final_prompt)?;

    let summary = RunSummary::from_result(result);
    fs::write(
        dir.join("summary.json"),
        serde_json::to_string_pretty(&summary)?,
    )?;
    Ok(())
}

/// Load a prior run's `summary.json` from `dir`.
pub fn load_summary(dir: &Path) -> Result<RunSummary> {
    let path = dir.join("summary.json");
    if !path.exists() {
        return Err(Error::Other(format!(
            "no optimization summary found at {}",
            path.display()
        )));
    }
    let raw = fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Load a prior run's `final_prompt.txt`, if present.
pub fn load_final_prompt(dir: &Path) -> Option<String> {
    fs::read_to_string(dir.join("final_prompt.txt")).ok()
}
