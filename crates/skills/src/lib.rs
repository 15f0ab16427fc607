//! Skill generation: distills a completed optimization run into a
//! shareable SKILL.md document plus reference materials.

pub mod generator;
pub mod manifest;

pub use generator::SkillGenerator;
pub use manifest::{is_valid_skill_name, SkillManifest};
