//! Converts optimization results into a shareable skill document.
//!
//! One model call turns the accumulated patterns, recommendations, and key
//! changes into section content; a fixed template renders SKILL.md with
//! frontmatter and a metadata block, and the raw data is preserved next to
//! it under `references/`.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use rto_domain::analysis::{AnalysisResult, Pattern};
use rto_domain::error::{Error, Result};
use rto_domain::iteration::LoopResult;
use rto_domain::message::Message;
use rto_providers::{ChatRequest, ModelProvider};

use crate::manifest::{is_valid_skill_name, SkillManifest};

const GENERATOR_SYSTEM_PROMPT: &str = r#"You are an expert at converting agent optimization insights into reusable skills.

Your task is to analyze optimization results and generate a shareable Agent Skill that
captures the learnings so other developers can benefit.

The skill should:
1. Describe WHEN to use these learnings (activation triggers)
2. Explain the PATTERNS to avoid (anti-patterns found)
3. Provide CONCRETE practices that improved performance
4. Give VERIFIABLE guidelines (things that can be checked)
5. Include EXAMPLES showing before/after improvements

Write in a clear, direct style. Focus on actionable guidance, not theory."#;

/// Generates Agent Skills from optimization results.
pub struct SkillGenerator {
    provider: Arc<dyn ModelProvider>,
}

impl SkillGenerator {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self { provider }
    }

    /// Generate a skill from a completed loop run. Returns the SKILL.md
    /// path.
    pub async fn generate(
        &self,
        result: &LoopResult,
        skill_name: &str,
        output_dir: &Path,
        title: Option<&str>,
    ) -> Result<PathBuf> {
        check_name(skill_name)?;

        let patterns = collect_patterns(result);
        let recommendations = collect_recommendations(result);
        let key_changes = collect_key_changes(result);

        let initial_prompt = result
            .iterations
            .first()
            .map(|it| it.trace.system_prompt.as_str())
            .unwrap_or("");
        let content = self
            .generate_content(
                &result.task,
                &patterns,
                &recommendations,
                &key_changes,
                initial_prompt,
                &result.final_prompt,
            )
            .await?;

        let skill_md = render_skill(
            skill_name,
            title,
            &content,
            result.total_iterations,
            result.initial_score,
            result.final_score,
            result.improvement_percentage,
        );

        let skill_dir = output_dir.join(skill_name);
        fs::create_dir_all(&skill_dir)?;
        let skill_path = skill_dir.join("SKILL.md");
        fs::write(&skill_path, skill_md)?;

        save_references(&skill_dir, result)?;

        tracing::info!(path = %skill_path.display(), "skill generated");
        Ok(skill_path)
    }

    /// Generate a skill from bare analyses, without a full loop run. The
    /// synthesized result uses the averaged overall score.
    pub async fn generate_from_analyses(
        &self,
        analyses: &[AnalysisResult],
        skill_name: &str,
        task_description: &str,
        output_dir: &Path,
    ) -> Result<PathBuf> {
        check_name(skill_name)?;

        let mut patterns = Vec::new();
        let mut recommendations = Vec::new();
        let mut seen = HashSet::new();
        for analysis in analyses {
            patterns.extend(analysis.patterns.iter().cloned());
            for rec in &analysis.recommendations {
                if seen.insert(rec.clone()) {
                    recommendations.push(rec.clone());
                }
            }
        }

        let content = self
            .generate_content(task_description, &patterns, &recommendations, &[], "", "")
            .await?;

        let avg_score = if analyses.is_empty() {
            0.0
        } else {
            analyses.iter().map(|a| a.overall_score).sum::<f64>() / analyses.len() as f64
        };

        let skill_md = render_skill(
            skill_name,
            None,
            &content,
            analyses.len(),
            avg_score,
            avg_score,
            0.0,
        );

        let skill_dir = output_dir.join(skill_name);
        fs::create_dir_all(&skill_dir)?;
        let skill_path = skill_dir.join("SKILL.md");
        fs::write(&skill_path, skill_md)?;
        Ok(skill_path)
    }

    /// One model call producing the skill's section content. Falls back to
    /// deterministic defaults derived from the raw data when the reply is
    /// not usable JSON.
    async fn generate_content(
        &self,
        task: &str,
        patterns: &[Pattern],
        recommendations: &[String],
        key_changes: &[String],
        initial_prompt: &str,
        final_prompt: &str,
    ) -> Result<Map<String, Value>> {
        let patterns_text = patterns
            .iter()
            .map(|p| format!("- [{}] {}: {}", p.severity, p.kind, p.description))
            .collect::<Vec<_>>()
            .join("\n");
        let recommendations_text = recommendations
            .iter()
            .map(|r| format!("- {r}"))
            .collect::<Vec<_>>()
            .join("\n");
        let changes_text = key_changes
            .iter()
            .map(|c| format!("- {c}"))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            r#"Generate an Agent Skill based on these optimization insights:

## Task Context
{task}

## Patterns Detected (Anti-patterns to avoid)
{patterns}

## Recommendations from Analysis
{recommendations}

## Key Changes That Improved Performance
{changes}

## Prompt Evolution
Initial: {initial}...
Final: {final_}...

---

Generate skill content as JSON:
```json
{{
    "title": "Human-readable skill title",
    "description": "One-line description for skill discovery (what triggers this skill)",
    "intro": "2-3 sentence introduction explaining what this skill teaches",
    "activation": "Bullet points of when to activate this skill (specific keywords, task types)",
    "concepts": "Core concepts this skill covers (3-5 key ideas)",
    "anti_patterns": "Patterns to AVOID - formatted as markdown list with descriptions",
    "practices": "Recommended practices - formatted as markdown list",
    "guidelines": "Numbered verifiable guidelines (things that can be checked)",
    "examples": "1-2 concrete before/after examples showing improvement"
}}
```"#,
            patterns = or_placeholder(&patterns_text, "No significant patterns detected"),
            recommendations = or_placeholder(&recommendations_text, "No specific recommendations"),
            changes = or_placeholder(&changes_text, "No recorded changes"),
            initial = or_placeholder(&truncate(initial_prompt, 500), "N/A"),
            final_ = or_placeholder(&truncate(final_prompt, 500), "N/A"),
        );

        let req = ChatRequest {
            system: Some(GENERATOR_SYSTEM_PROMPT.to_string()),
            messages: vec![Message::user(prompt)],
            tools: Vec::new(),
            max_tokens: 4096,
            model: None,
        };
        let resp = self.provider.complete(&req).await?;

        for text in resp.text_blocks() {
            let candidate = json_candidate(&text);
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(candidate) {
                return Ok(map);
            }
        }

        tracing::warn!("skill content reply was not usable JSON, using defaults");
        Ok(default_content(task, &patterns_text, &recommendations_text))
    }
}

fn check_name(skill_name: &str) -> Result<()> {
    if !is_valid_skill_name(skill_name) {
        return Err(Error::Skill(format!(
            "invalid skill name '{skill_name}': must match ^[a-z0-9]+(-[a-z0-9]+)*$"
        )));
    }
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Insight collection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Unique patterns across all iterations, keyed by kind plus the first 50
/// characters of the description.
fn collect_patterns(result: &LoopResult) -> Vec<Pattern> {
    let mut patterns = Vec::new();
    let mut seen = HashSet::new();
    for iteration in &result.iterations {
        for pattern in &iteration.analysis.patterns {
            let prefix: String = pattern.description.chars().take(50).collect();
            if seen.insert((pattern.kind, prefix)) {
                patterns.push(pattern.clone());
            }
        }
    }
    patterns
}

fn collect_recommendations(result: &LoopResult) -> Vec<String> {
    let mut recommendations = Vec::new();
    let mut seen = HashSet::new();
    for iteration in &result.iterations {
        for rec in &iteration.analysis.recommendations {
            if seen.insert(rec.clone()) {
                recommendations.push(rec.clone());
            }
        }
    }
    recommendations
}

fn collect_key_changes(result: &LoopResult) -> Vec<String> {
    result
        .iterations
        .iter()
        .filter_map(|it| it.optimization.as_ref())
        .flat_map(|opt| opt.key_changes.iter().cloned())
        .collect()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Rendering
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn render_skill(
    skill_name: &str,
    title: Option<&str>,
    content: &Map<String, Value>,
    iterations: usize,
    initial_score: f64,
    final_score: f64,
    improvement: f64,
) -> String {
    let manifest = SkillManifest {
        name: skill_name.to_string(),
        description: content
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Optimized practices for {skill_name}")),
    };
    let title = title
        .map(str::to_string)
        .or_else(|| {
            content
                .get("title")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| titlecase(skill_name));

    format!(
        "{frontmatter}\n\
         # {title}\n\n\
         {intro}\n\n\
         ## When to Activate\n\n{activation}\n\n\
         ## Core Concepts\n\n{concepts}\n\n\
         ## Patterns to Avoid\n\n{anti_patterns}\n\n\
         ## Recommended Practices\n\n{practices}\n\n\
         ## Guidelines\n\n{guidelines}\n\n\
         ## Examples\n\n{examples}\n\n\
         ---\n\n\
         ## Skill Metadata\n\n\
         **Generated**: {date}\n\
         **Source**: Reasoning Trace Optimizer\n\
         **Optimization Iterations**: {iterations}\n\
         **Score Improvement**: {initial_score:.1} → {final_score:.1} (+{improvement:.1}%)\n",
        frontmatter = manifest.to_frontmatter(),
        intro = text_section(content.get("intro")),
        activation = bulleted_section(content.get("activation")),
        concepts = bulleted_section(content.get("concepts")),
        anti_patterns = bulleted_section(content.get("anti_patterns")),
        practices = bulleted_section(content.get("practices")),
        guidelines = numbered_section(content.get("guidelines")),
        examples = examples_section(content.get("examples")),
        date = chrono::Utc::now().format("%Y-%m-%d"),
    )
}

fn text_section(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// A section the model may return as a string or a list. Lists become
/// bullets; already-bulleted items are not double-bulleted.
fn bulleted_section(value: Option<&Value>) -> String {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| format!("- {}", strip_bullet(&item_text(item))))
            .collect::<Vec<_>>()
            .join("\n"),
        other => text_section(other),
    }
}

fn numbered_section(value: Option<&Value>) -> String {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| format!("{}. {}", i + 1, strip_number(&item_text(item))))
            .collect::<Vec<_>>()
            .join("\n"),
        other => text_section(other),
    }
}

/// Examples may be strings or objects with `context` / `before` / `after` /
/// `improvement` fields.
fn examples_section(value: Option<&Value>) -> String {
    let Some(Value::Array(items)) = value else {
        return text_section(value);
    };

    let mut parts = Vec::new();
    for (i, item) in items.iter().enumerate() {
        match item {
            Value::Object(example) => {
                let context = example
                    .get("context")
                    .and_then(Value::as_str)
                    .unwrap_or("Scenario");
                parts.push(format!("### Example {}: {context}", i + 1));
                if let Some(before) = example.get("before").and_then(Value::as_str) {
                    parts.push(format!("\n**Before:**\n```\n{before}\n```"));
                }
                if let Some(after) = example.get("after").and_then(Value::as_str) {
                    parts.push(format!("\n**After:**\n```\n{after}\n```"));
                }
                if let Some(improvement) = example.get("improvement").and_then(Value::as_str) {
                    parts.push(format!("\n**Improvement:** {improvement}"));
                }
                parts.push(String::new());
            }
            other => parts.push(format!("- {}", item_text(other))),
        }
    }
    parts.join("\n")
}

fn item_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

fn strip_bullet(s: &str) -> &str {
    s.strip_prefix(['-', '*', '•'])
        .map(str::trim_start)
        .unwrap_or(s)
}

fn strip_number(s: &str) -> &str {
    let digits = s.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(rest) = s[digits..].strip_prefix('.') {
            return rest.trim_start();
        }
    }
    s
}

fn titlecase(skill_name: &str) -> String {
    skill_name
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn default_content(task: &str, patterns_text: &str, recommendations_text: &str) -> Map<String, Value> {
    let mut map = Map::new();
    let mut put = |key: &str, value: String| {
        map.insert(key.to_string(), Value::String(value));
    };
    put("title", "Generated Agent Skill".into());
    put("description", format!("Optimized practices for {task}"));
    put(
        "intro",
        "This skill contains learnings from automated prompt optimization.".into(),
    );
    put(
        "activation",
        "- When working on similar tasks\n- When debugging agent failures".into(),
    );
    put("concepts", "See recommendations section.".into());
    put(
        "anti_patterns",
        or_placeholder(patterns_text, "No patterns identified."),
    );
    put(
        "practices",
        or_placeholder(recommendations_text, "No specific practices."),
    );
    put(
        "guidelines",
        "1. Review the anti-patterns before implementation\n2. Apply recommended practices".into(),
    );
    put(
        "examples",
        "See optimization artifacts for detailed examples.".into(),
    );
    map
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// References
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn save_references(skill_dir: &Path, result: &LoopResult) -> Result<()> {
    let refs_dir = skill_dir.join("references");
    fs::create_dir_all(&refs_dir)?;

    let summary = serde_json::json!({
        "task": result.task,
        "iterations": result.total_iterations,
        "initial_score": result.initial_score,
        "final_score": result.final_score,
        "improvement": result.improvement_percentage,
        "converged": result.converged,
        "generated_at": chrono::Utc::now().to_rfc3339(),
    });
    fs::write(
        refs_dir.join("optimization_summary.json"),
        serde_json::to_string_pretty(&summary)?,
    )?;

    fs::write(refs_dir.join("optimized_prompt.txt"), &result.final_prompt)?;

    let patterns: Vec<Value> = result
        .iterations
        .iter()
        .flat_map(|iteration| {
            iteration.analysis.patterns.iter().map(|p| {
                serde_json::json!({
                    "type": p.kind.as_str(),
                    "severity": p.severity.as_str(),
                    "description": p.description,
                    "suggestion": p.suggestion,
                    "iteration": iteration.iteration,
                })
            })
        })
        .collect();
    fs::write(
        refs_dir.join("patterns_found.json"),
        serde_json::to_string_pretty(&patterns)?,
    )?;

    Ok(())
}

// ── Small helpers ─────────────────────────────────────────────────

fn or_placeholder(text: &str, placeholder: &str) -> String {
    if text.is_empty() {
        placeholder.to_string()
    } else {
        text.to_string()
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

fn json_candidate(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        let rest = &text[start + "```json".len()..];
        return match rest.find("```") {
            Some(end) => &rest[..end],
            None => rest,
        };
    }
    text
}
