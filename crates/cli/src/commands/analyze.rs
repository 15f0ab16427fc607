//! `rto analyze`: capture a trace and analyze it.

use std::path::Path;

use rto_domain::config::Config;
use rto_engine::{report, TraceAnalyzer, TraceCapture};

use crate::demo;

use super::{build_provider, write_or_print, DEFAULT_SYSTEM_PROMPT};

const ANALYSIS_MAX_TOKENS: u32 = 8192;
const CAPTURE_MAX_TURNS: usize = 10;

pub async fn run(
    config: &Config,
    api_key: Option<&str>,
    task: &str,
    system_prompt: Option<&str>,
    output: Option<&Path>,
    demo_tools: bool,
) -> anyhow::Result<()> {
    let provider = build_provider(config, api_key)?;
    let capture = TraceCapture::new(provider.clone());
    let analyzer = TraceAnalyzer::new(provider);

    tracing::info!(task, "capturing and analyzing");
    let (tools, executor) = demo::toolkit(demo_tools);
    let trace = capture
        .run(
            task,
            system_prompt.unwrap_or(DEFAULT_SYSTEM_PROMPT),
            &tools,
            executor,
            CAPTURE_MAX_TURNS,
            config.client.max_tokens,
        )
        .await;

    let analysis = analyzer.analyze(&trace, ANALYSIS_MAX_TOKENS).await?;
    write_or_print(output, &report::render_analysis(&analysis))
}
