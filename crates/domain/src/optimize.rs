use serde::{Deserialize, Serialize};

/// One documented change between the original and optimized prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDiff {
    /// Which part changed, e.g. "instructions", "guardrails", "examples".
    pub section: String,
    /// Original text; empty for pure additions.
    #[serde(default)]
    pub original: String,
    #[serde(default)]
    pub optimized: String,
    #[serde(default)]
    pub reason: String,
}

/// Result of one prompt-optimization call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub original_prompt: String,
    /// Falls back to the original prompt when extraction fails entirely.
    pub optimized_prompt: String,
    pub diffs: Vec<PromptDiff>,

    /// Predicted improvement, percent.
    pub predicted_improvement: f64,
    pub confidence: f64,

    /// The optimizer's own reasoning text.
    pub optimizer_thinking: String,
    pub key_changes: Vec<String>,
}

impl OptimizationResult {
    /// A result that changes nothing: the optimized prompt starts out equal
    /// to the original.
    pub fn unchanged(original_prompt: impl Into<String>) -> Self {
        let original_prompt = original_prompt.into();
        Self {
            optimized_prompt: original_prompt.clone(),
            original_prompt,
            diffs: Vec::new(),
            predicted_improvement: 0.0,
            confidence: 0.0,
            optimizer_thinking: String::new(),
            key_changes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchanged_keeps_prompts_equal() {
        let r = OptimizationResult::unchanged("keep me");
        assert_eq!(r.original_prompt, r.optimized_prompt);
        assert!(r.diffs.is_empty());
    }

    #[test]
    fn diff_deserializes_with_empty_original() {
        let d: PromptDiff =
            serde_json::from_str(r#"{"section": "guardrails", "optimized": "new rule"}"#).unwrap();
        assert_eq!(d.section, "guardrails");
        assert!(d.original.is_empty());
    }
}
