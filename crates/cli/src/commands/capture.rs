//! `rto capture`: run a task and dump the reasoning trace.

use std::path::Path;

use rto_domain::config::Config;
use rto_engine::{report, TraceCapture};

use crate::demo;

use super::{build_provider, write_or_print, DEFAULT_SYSTEM_PROMPT};

pub async fn run(
    config: &Config,
    api_key: Option<&str>,
    task: &str,
    system_prompt: Option<&str>,
    max_turns: usize,
    output: Option<&Path>,
    demo_tools: bool,
) -> anyhow::Result<()> {
    let provider = build_provider(config, api_key)?;
    let capture = TraceCapture::new(provider);

    tracing::info!(task, "capturing trace");
    let (tools, executor) = demo::toolkit(demo_tools);
    let trace = capture
        .run(
            task,
            system_prompt.unwrap_or(DEFAULT_SYSTEM_PROMPT),
            &tools,
            executor,
            max_turns,
            config.client.max_tokens,
        )
        .await;

    write_or_print(output, &report::render_trace(&trace))
}
