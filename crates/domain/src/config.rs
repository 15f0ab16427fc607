use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub run: LoopConfig,
    #[serde(default)]
    pub skills: SkillsConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Model client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Anthropic-compatible Messages endpoint base URL.
    #[serde(default = "d_base_url")]
    pub base_url: String,
    #[serde(default = "d_model")]
    pub model: String,
    /// Environment variable consulted when no API key is passed explicitly.
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "d_timeout")]
    pub timeout_secs: u64,
    /// Max tokens per model response.
    #[serde(default = "d_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: d_base_url(),
            model: d_model(),
            api_key_env: d_api_key_env(),
            timeout_secs: d_timeout(),
            max_tokens: d_max_tokens(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Optimization loop
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Absolute ceiling on capture→analyze→optimize cycles.
    #[serde(default = "d_max_iterations")]
    pub max_iterations: usize,
    /// Stop when the non-negative improvement falls below this.
    #[serde(default = "d_convergence")]
    pub convergence_threshold: f64,
    /// Stop as soon as the composite score meets or exceeds this.
    #[serde(default = "d_min_score")]
    pub min_score_threshold: f64,
    /// A drop this large from the best score counts as a regression.
    #[serde(default = "d_regression")]
    pub regression_threshold: f64,

    // Composite score weights.
    #[serde(default = "d_success_weight")]
    pub success_weight: f64,
    #[serde(default = "d_score_weight")]
    pub score_weight: f64,
    #[serde(default = "d_error_weight")]
    pub error_weight: f64,

    /// Return the best-scoring prompt rather than the last one.
    #[serde(default = "d_true")]
    pub use_best_prompt: bool,
    /// Reject an optimized prompt longer than the initial prompt times this.
    #[serde(default = "d_max_growth")]
    pub max_prompt_growth: f64,

    #[serde(default = "d_true")]
    pub save_artifacts: bool,
    #[serde(default = "d_artifacts_dir")]
    pub artifacts_dir: PathBuf,
    #[serde(default = "d_true")]
    pub verbose: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: d_max_iterations(),
            convergence_threshold: d_convergence(),
            min_score_threshold: d_min_score(),
            regression_threshold: d_regression(),
            success_weight: d_success_weight(),
            score_weight: d_score_weight(),
            error_weight: d_error_weight(),
            use_best_prompt: true,
            max_prompt_growth: d_max_growth(),
            save_artifacts: true,
            artifacts_dir: d_artifacts_dir(),
            verbose: true,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Skill generation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillsConfig {
    #[serde(default = "d_skills_dir")]
    pub output_dir: PathBuf,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            output_dir: d_skills_dir(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub message: String,
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Config {
    /// Sanity-check the configuration, returning warnings and errors.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        let error = |msg: String| ConfigIssue {
            severity: ConfigSeverity::Error,
            message: msg,
        };
        let warning = |msg: String| ConfigIssue {
            severity: ConfigSeverity::Warning,
            message: msg,
        };

        if self.run.max_iterations == 0 {
            issues.push(error("run.max_iterations must be at least 1".into()));
        }
        if self.run.convergence_threshold < 0.0
            || self.run.min_score_threshold < 0.0
            || self.run.regression_threshold < 0.0
        {
            issues.push(error("run thresholds must be non-negative".into()));
        }
        if self.run.success_weight < 0.0
            || self.run.score_weight < 0.0
            || self.run.error_weight < 0.0
        {
            issues.push(error("run score weights must be non-negative".into()));
        }
        let weight_sum = self.run.success_weight + self.run.score_weight + self.run.error_weight;
        if (weight_sum - 1.0).abs() > 0.001 {
            issues.push(warning(format!(
                "run score weights sum to {weight_sum:.3}, expected 1.0"
            )));
        }
        if self.run.max_prompt_growth < 1.0 {
            issues.push(warning(format!(
                "run.max_prompt_growth {} rejects every optimized prompt longer than the original",
                self.run.max_prompt_growth
            )));
        }
        if self.client.max_tokens == 0 {
            issues.push(error("client.max_tokens must be positive".into()));
        }
        issues
    }
}

// ── serde defaults ────────────────────────────────────────────────

fn d_base_url() -> String {
    "https://api.minimax.io/anthropic".into()
}
fn d_model() -> String {
    "MiniMax-M2.1".into()
}
fn d_api_key_env() -> String {
    "ANTHROPIC_API_KEY".into()
}
fn d_timeout() -> u64 {
    120
}
fn d_max_tokens() -> u32 {
    4096
}
fn d_max_iterations() -> usize {
    5
}
fn d_convergence() -> f64 {
    3.0
}
fn d_min_score() -> f64 {
    75.0
}
fn d_regression() -> f64 {
    8.0
}
fn d_success_weight() -> f64 {
    0.4
}
fn d_score_weight() -> f64 {
    0.4
}
fn d_error_weight() -> f64 {
    0.2
}
fn d_max_growth() -> f64 {
    5.0
}
fn d_true() -> bool {
    true
}
fn d_artifacts_dir() -> PathBuf {
    PathBuf::from("./optimization_artifacts")
}
fn d_skills_dir() -> PathBuf {
    PathBuf::from("./generated_skills")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_loop_config_matches_documented_table() {
        let cfg = LoopConfig::default();
        assert_eq!(cfg.max_iterations, 5);
        assert_eq!(cfg.convergence_threshold, 3.0);
        assert_eq!(cfg.min_score_threshold, 75.0);
        assert_eq!(cfg.regression_threshold, 8.0);
        assert_eq!(cfg.success_weight, 0.4);
        assert_eq!(cfg.score_weight, 0.4);
        assert_eq!(cfg.error_weight, 0.2);
        assert!(cfg.use_best_prompt);
        assert_eq!(cfg.max_prompt_growth, 5.0);
        assert!(cfg.save_artifacts);
        assert!(cfg.verbose);
    }

    #[test]
    fn default_config_validates_clean() {
        let issues = Config::default().validate();
        assert!(issues.is_empty(), "unexpected issues: {issues:?}");
    }

    #[test]
    fn zero_iterations_is_an_error() {
        let mut cfg = Config::default();
        cfg.run.max_iterations = 0;
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|i| i.severity == ConfigSeverity::Error && i.message.contains("max_iterations")));
    }

    #[test]
    fn skewed_weights_warn() {
        let mut cfg = Config::default();
        cfg.run.score_weight = 0.9;
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|i| i.severity == ConfigSeverity::Warning && i.message.contains("weights")));
    }
}
