pub mod analyze;
pub mod capture;
pub mod optimize;
pub mod skill;

use std::path::Path;
use std::sync::Arc;

use rto_domain::config::Config;
use rto_providers::{resolve_api_key, MiniMaxProvider, ModelProvider};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Build the shared model provider from config plus an optional explicit
/// key. The same instance is reused across capture, analysis, and
/// optimization.
pub fn build_provider(
    config: &Config,
    api_key: Option<&str>,
) -> anyhow::Result<Arc<dyn ModelProvider>> {
    let key = resolve_api_key(api_key, &config.client.api_key_env)?;
    let provider = MiniMaxProvider::new(
        &config.client.base_url,
        key,
        &config.client.model,
        config.client.timeout_secs,
    )?;
    Ok(Arc::new(provider))
}

/// Write the text to the output file, or print it to stdout.
pub fn write_or_print(output: Option<&Path>, text: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
            tracing::info!(path = %path.display(), "report saved");
        }
        None => println!("{text}"),
    }
    Ok(())
}
