//! Extraction helpers for adversarial model output.
//!
//! Both the analyzer and the optimizer ask the model for fenced JSON and
//! routinely get prose, partial fences, or mixed output back. The helpers
//! here implement the shared recovery cascade: locate a JSON candidate,
//! probe free text for a score, or scrape a prompt out of markers and code
//! blocks.

use regex::Regex;

/// Candidate JSON payload inside model text: the content of a ```json fence
/// if present, else the content of the first generic fence, else the raw
/// text. The caller decides whether the candidate actually parses.
pub fn json_candidate(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        let rest = &text[start + "```json".len()..];
        return match rest.find("```") {
            Some(end) => &rest[..end],
            None => rest,
        };
    }
    if let Some(start) = text.find("```") {
        let rest = &text[start + 3..];
        if let Some(end) = rest.find("```") {
            return &rest[..end];
        }
    }
    text
}

/// Probe free text for an overall score in [0, 100].
///
/// Recognizes shapes like `"overall": 72`, `Overall Score: 72`, `72/100`,
/// and `score: 72`.
pub fn score_probe(text: &str) -> Option<f64> {
    const PATTERNS: [&str; 5] = [
        r#"(?i)overall["\s:]+(\d+)"#,
        r"(?i)overall score[:\s]+(\d+)",
        r#"(?i)"overall"[:\s]+(\d+)"#,
        r"(\d+)/100",
        r"(?i)score[:\s]+(\d+)",
    ];

    for pattern in PATTERNS {
        let Ok(re) = Regex::new(pattern) else {
            continue;
        };
        if let Some(caps) = re.captures(text) {
            if let Ok(score) = caps[1].parse::<f64>() {
                if (0.0..=100.0).contains(&score) {
                    return Some(score);
                }
            }
        }
    }
    None
}

/// Scrape an optimized prompt out of non-JSON model output.
///
/// Strategies, in order:
/// 1. a quoted `"optimized_prompt": "..."` fragment (unescaped),
/// 2. known prose markers followed by a delimiter, accepted over 50 chars,
/// 3. a fenced non-JSON code block over 100 chars.
pub fn prompt_fallback(text: &str) -> Option<String> {
    if let Ok(re) = Regex::new(r#""optimized_prompt"\s*:\s*"([^"]+)""#) {
        if let Some(caps) = re.captures(text) {
            return Some(unescape_json_fragment(&caps[1]));
        }
    }

    const MARKERS: [(&str, &str); 4] = [
        ("## Optimized Prompt", "##"),
        ("**Optimized Prompt**", "**"),
        ("OPTIMIZED PROMPT:", "\n\n"),
        ("Here is the improved prompt:", "\n\n---"),
    ];
    for (start_marker, end_marker) in MARKERS {
        if let Some(start) = text.find(start_marker) {
            let remaining = text[start + start_marker.len()..].trim();
            if let Some(end) = remaining.find(end_marker) {
                let extracted = remaining[..end].trim();
                if extracted.len() > 50 {
                    return Some(extracted.to_string());
                }
            }
        }
    }

    if let Ok(re) = Regex::new(r"(?s)```(?:text|markdown)?\n(.*?)```") {
        for caps in re.captures_iter(text) {
            let block = caps[1].trim();
            if !block.starts_with('{') && block.len() > 100 {
                return Some(block.to_string());
            }
        }
    }

    None
}

/// Undo the common backslash escapes found inside a JSON string fragment.
fn unescape_json_fragment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
