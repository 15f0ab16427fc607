//! `rto generate-skill`: rebuild a skill from a prior run's artifacts.

use std::path::Path;

use rto_domain::config::Config;
use rto_domain::iteration::LoopResult;
use rto_engine::{artifacts, load_summary};
use rto_skills::SkillGenerator;

use super::build_provider;

pub async fn run(
    config: &Config,
    api_key: Option<&str>,
    skill_name: &str,
    artifacts_dir: Option<&Path>,
    output_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let artifacts_dir = artifacts_dir.unwrap_or(&config.run.artifacts_dir);

    let summary = match load_summary(artifacts_dir) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("error: {e}. Run `rto optimize` first.");
            std::process::exit(1);
        }
    };

    // Rebuild a minimal loop result from the persisted summary.
    let final_prompt = artifacts::load_final_prompt(artifacts_dir).unwrap_or_default();
    let mut result = LoopResult::new(summary.task, final_prompt);
    result.total_iterations = summary.total_iterations;
    result.converged = summary.converged;
    result.initial_score = summary.initial_score;
    result.final_score = summary.final_score;
    result.improvement_percentage = summary.improvement_percentage;

    let provider = build_provider(config, api_key)?;
    let output_dir = output_dir.unwrap_or(&config.skills.output_dir);
    let path = SkillGenerator::new(provider)
        .generate(&result, skill_name, output_dir, None)
        .await?;

    println!("Generated skill at: {}", path.display());
    Ok(())
}
