//! SKILL.md frontmatter: a YAML block delimited by `---` at the top of the
//! file, carrying the fields other tooling uses to discover the skill:
//!
//! ```yaml
//! ---
//! name: web-search-agent
//! description: Optimized practices for web search agents...
//! ---
//! ```

use serde::{Deserialize, Serialize};

/// Validates a skill name: `^[a-z0-9]+(-[a-z0-9]+)*$`
pub fn is_valid_skill_name(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    let mut expect_alnum = true;
    for ch in name.chars() {
        if expect_alnum {
            if !ch.is_ascii_lowercase() && !ch.is_ascii_digit() {
                return false;
            }
            expect_alnum = false;
        } else if ch == '-' {
            expect_alnum = true;
        } else if !ch.is_ascii_lowercase() && !ch.is_ascii_digit() {
            return false;
        }
    }
    !expect_alnum
}

/// Frontmatter of a generated SKILL.md.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillManifest {
    /// Skill name: lowercase, hyphens, no spaces.
    pub name: String,
    /// Trigger description telling an agent when to use this skill.
    pub description: String,
}

impl SkillManifest {
    /// Render the manifest as a `---`-delimited YAML frontmatter block.
    pub fn to_frontmatter(&self) -> String {
        let yaml = serde_yaml::to_string(self).unwrap_or_default();
        format!("---\n{yaml}---\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(is_valid_skill_name("web-search-agent"));
        assert!(is_valid_skill_name("optimized-agent"));
        assert!(is_valid_skill_name("a"));
        assert!(is_valid_skill_name("a1-b2-c3"));
    }

    #[test]
    fn invalid_names() {
        assert!(!is_valid_skill_name(""));
        assert!(!is_valid_skill_name("Web-Search"));
        assert!(!is_valid_skill_name("my_skill"));
        assert!(!is_valid_skill_name("double--dash"));
        assert!(!is_valid_skill_name("-leading"));
        assert!(!is_valid_skill_name("trailing-"));
        assert!(!is_valid_skill_name("has space"));
    }

    #[test]
    fn frontmatter_shape() {
        let manifest = SkillManifest {
            name: "web-search-agent".into(),
            description: "Optimized practices for web search.".into(),
        };
        let fm = manifest.to_frontmatter();
        assert!(fm.starts_with("---\n"));
        assert!(fm.ends_with("---\n"));
        assert!(fm.contains("name: web-search-agent"));
        assert!(fm.contains("description: Optimized practices for web search."));
    }
}
