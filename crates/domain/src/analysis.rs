use serde::{Deserialize, Serialize};

/// Failure modes detectable in a reasoning trace (closed set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    ContextDegradation,
    ToolConfusion,
    InstructionDrift,
    Hallucination,
    IncompleteReasoning,
    ToolMisuse,
    GoalAbandonment,
    CircularReasoning,
    PrematureConclusion,
    MissingValidation,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::ContextDegradation => "context_degradation",
            PatternKind::ToolConfusion => "tool_confusion",
            PatternKind::InstructionDrift => "instruction_drift",
            PatternKind::Hallucination => "hallucination",
            PatternKind::IncompleteReasoning => "incomplete_reasoning",
            PatternKind::ToolMisuse => "tool_misuse",
            PatternKind::GoalAbandonment => "goal_abandonment",
            PatternKind::CircularReasoning => "circular_reasoning",
            PatternKind::PrematureConclusion => "premature_conclusion",
            PatternKind::MissingValidation => "missing_validation",
        }
    }

    pub const ALL: [PatternKind; 10] = [
        PatternKind::ContextDegradation,
        PatternKind::ToolConfusion,
        PatternKind::InstructionDrift,
        PatternKind::Hallucination,
        PatternKind::IncompleteReasoning,
        PatternKind::ToolMisuse,
        PatternKind::GoalAbandonment,
        PatternKind::CircularReasoning,
        PatternKind::PrematureConclusion,
        PatternKind::MissingValidation,
    ];
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a detected pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected failure pattern with supporting evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    /// Serialized as `type`, the key used on the wire and in artifacts.
    #[serde(rename = "type")]
    pub kind: PatternKind,
    pub severity: Severity,
    pub description: String,
    /// Excerpts from thinking blocks.
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub turn_indices: Vec<usize>,
    #[serde(default)]
    pub suggestion: String,
    /// 0.0 to 1.0.
    #[serde(default = "d_confidence")]
    pub confidence: f64,
}

fn d_confidence() -> f64 {
    0.5
}

/// Result of analyzing a reasoning trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub trace_id: String,
    pub patterns: Vec<Pattern>,

    // Scores, 0-100.
    pub reasoning_clarity: f64,
    pub goal_adherence: f64,
    pub tool_usage_quality: f64,
    pub error_recovery: f64,
    pub overall_score: f64,

    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,

    pub analyzer_model: String,
    /// The analyzer's own reasoning text.
    pub analyzer_thinking: String,
}

impl AnalysisResult {
    pub fn new(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            patterns: Vec::new(),
            reasoning_clarity: 0.0,
            goal_adherence: 0.0,
            tool_usage_quality: 0.0,
            error_recovery: 0.0,
            overall_score: 0.0,
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            recommendations: Vec::new(),
            analyzer_model: String::new(),
            analyzer_thinking: String::new(),
        }
    }
}
