//! `rto optimize`: run the full optimization loop, optionally generating
//! an Agent Skill from the results.

use rto_domain::config::Config;
use rto_engine::OptimizationLoop;
use rto_skills::SkillGenerator;

use crate::cli::OptimizeOpts;
use crate::demo;

use super::{build_provider, DEFAULT_SYSTEM_PROMPT};

pub async fn run(config: &Config, api_key: Option<&str>, opts: &OptimizeOpts) -> anyhow::Result<()> {
    let provider = build_provider(config, api_key)?;

    let mut run_config = config.run.clone();
    if let Some(max_iterations) = opts.max_iterations {
        run_config.max_iterations = max_iterations;
    }
    if let Some(convergence_threshold) = opts.convergence_threshold {
        run_config.convergence_threshold = convergence_threshold;
    }
    if let Some(min_score) = opts.min_score {
        run_config.min_score_threshold = min_score;
    }
    if let Some(artifacts_dir) = &opts.artifacts_dir {
        run_config.artifacts_dir = artifacts_dir.clone();
    }
    let artifacts_dir = run_config.artifacts_dir.clone();

    tracing::info!(task = %opts.task, "starting optimization");
    let initial_prompt = opts.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT);
    let (tools, executor) = demo::toolkit(opts.demo_tools);

    let runner = OptimizationLoop::new(provider.clone(), run_config);
    let mut result = runner
        .run(&opts.task, initial_prompt, &tools, executor, None)
        .await?;

    println!(
        "Optimization complete: {} iteration(s), converged: {}, score {:.1} -> {:.1} ({:+.1}%)",
        result.total_iterations,
        result.converged,
        result.initial_score,
        result.final_score,
        result.improvement_percentage,
    );
    println!("Artifacts in: {}", artifacts_dir.display());

    if let Some(output) = &opts.output {
        std::fs::write(output, &result.final_prompt)?;
        println!("Optimized prompt saved to: {}", output.display());
    }

    if opts.generate_skill {
        let skill_name = opts.skill_name.as_deref().unwrap_or("optimized-agent");
        let skills_dir = opts
            .skills_dir
            .clone()
            .unwrap_or_else(|| config.skills.output_dir.clone());
        let generator = SkillGenerator::new(provider);
        let path = generator
            .generate(&result, skill_name, &skills_dir, None)
            .await?;
        result.generated_skill_path = Some(path.clone());
        println!("Generated skill at: {}", path.display());
    }

    Ok(())
}
