use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use rto_domain::config::{Config, ConfigSeverity};

/// rto: debug and optimize tool-using agents via their reasoning traces.
#[derive(Debug, Parser)]
#[command(name = "rto", version, about)]
pub struct Cli {
    /// API key (falls back to the ANTHROPIC_API_KEY environment variable).
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// API base URL (default: https://api.minimax.io/anthropic).
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Model to use (default: MiniMax-M2.1).
    #[arg(long, global = true,
          value_parser = ["MiniMax-M2.1", "MiniMax-M2.1-lightning", "MiniMax-M2"])]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a task and dump the captured reasoning trace.
    Capture {
        /// Task to execute.
        task: String,
        /// System prompt for the agent.
        #[arg(long, short = 's')]
        system_prompt: Option<String>,
        /// Maximum conversation turns before stopping.
        #[arg(long, default_value_t = 10)]
        max_turns: usize,
        /// Output file (defaults to stdout).
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Wire in the built-in demo weather tools.
        #[arg(long)]
        demo_tools: bool,
    },

    /// Capture a trace and analyze it for failure patterns.
    Analyze {
        /// Task to analyze.
        task: String,
        /// System prompt for the agent.
        #[arg(long, short = 's')]
        system_prompt: Option<String>,
        /// Output file (defaults to stdout).
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Wire in the built-in demo weather tools.
        #[arg(long)]
        demo_tools: bool,
    },

    /// Run the full optimization loop.
    Optimize(OptimizeOpts),

    /// Rebuild a skill from a prior run's optimization artifacts.
    GenerateSkill {
        /// Name for the skill (lowercase-with-hyphens).
        skill_name: String,
        /// Directory with optimization artifacts.
        #[arg(long)]
        artifacts_dir: Option<PathBuf>,
        /// Output directory for the skill.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
pub struct OptimizeOpts {
    /// Task to optimize for.
    pub task: String,
    /// Initial system prompt.
    #[arg(long, short = 's')]
    pub system_prompt: Option<String>,
    /// Ceiling on capture→analyze→optimize cycles.
    #[arg(long)]
    pub max_iterations: Option<usize>,
    /// Stop when the non-negative improvement falls below this.
    #[arg(long)]
    pub convergence_threshold: Option<f64>,
    /// Stop as soon as the composite score meets or exceeds this.
    #[arg(long)]
    pub min_score: Option<f64>,
    /// Directory for per-iteration artifacts.
    #[arg(long)]
    pub artifacts_dir: Option<PathBuf>,
    /// Output file for the final prompt.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
    /// Generate an Agent Skill from the results.
    #[arg(long)]
    pub generate_skill: bool,
    /// Name for the generated skill.
    #[arg(long)]
    pub skill_name: Option<String>,
    /// Directory for generated skills.
    #[arg(long)]
    pub skills_dir: Option<PathBuf>,
    /// Wire in the built-in demo weather tools.
    #[arg(long)]
    pub demo_tools: bool,
}

// ── Config loading ────────────────────────────────────────────────

/// Load the configuration from the path in `RTO_CONFIG` (or `rto.toml`),
/// then apply the global CLI overrides. Validation errors abort; warnings
/// are logged.
pub fn load_config(args: &Cli) -> anyhow::Result<Config> {
    let config_path = std::env::var("RTO_CONFIG").unwrap_or_else(|_| "rto.toml".into());

    let mut config: Config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        Config::default()
    };

    if let Some(base_url) = &args.base_url {
        config.client.base_url = base_url.clone();
    }
    if let Some(model) = &args.model {
        config.client.model = model.clone();
    }

    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!("config validation failed");
    }

    Ok(config)
}
