use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod demo;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Cli::parse();
    let config = cli::load_config(&args)?;
    let api_key = args.api_key.as_deref();

    match &args.command {
        Command::Capture {
            task,
            system_prompt,
            max_turns,
            output,
            demo_tools,
        } => {
            commands::capture::run(
                &config,
                api_key,
                task,
                system_prompt.as_deref(),
                *max_turns,
                output.as_deref(),
                *demo_tools,
            )
            .await
        }
        Command::Analyze {
            task,
            system_prompt,
            output,
            demo_tools,
        } => {
            commands::analyze::run(
                &config,
                api_key,
                task,
                system_prompt.as_deref(),
                output.as_deref(),
                *demo_tools,
            )
            .await
        }
        Command::Optimize(opts) => commands::optimize::run(&config, api_key, opts).await,
        Command::GenerateSkill {
            skill_name,
            artifacts_dir,
            output_dir,
        } => {
            commands::skill::run(
                &config,
                api_key,
                skill_name,
                artifacts_dir.as_deref(),
                output_dir.as_deref(),
            )
            .await
        }
    }
}

/// Structured logging to stderr so stdout stays clean for reports.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
