//! Explain command

use super::load_engine;
use crate::app::{ExplainArgs, OutputFormat};
use crate::output;
use anyhow::Result;
use callscope_core::{Config, Explorer, LlmOracle, OfflineOracle, ReasoningOracle, RunOptions};
use std::sync::Arc;

pub async fn run(args: ExplainArgs, mut config: Config, format: OutputFormat) -> Result<()> {
    if let Some(max_iters) = args.max_iters {
        config.exploration.max_iters = max_iters;
    }
    if args.planner_model.is_some() {
        config.llm_service.planner_model = args.planner_model;
    }
    if args.synth_model.is_some() {
        config.llm_service.synth_model = args.synth_model;
    }
    let engine = Arc::new(load_engine(&args.repo, &config)?);

    let oracle: Arc<dyn ReasoningOracle> = if args.offline {
        // Nothing to retry against.
        config.exploration.oracle_max_retries = 0;
        Arc::new(OfflineOracle)
    } else {
        Arc::new(
            LlmOracle::from_config(&config.llm_service)?
                .with_snippet_lines(config.exploration.summary_snippet_lines),
        )
    };
    tracing::info!(oracle = oracle.name(), target = %args.target, "starting exploration");

    let options = RunOptions {
        target: args.target,
        hint_file: args.hint_file,
        explanation_prompt: args.prompt,
        outdir: Some(args.outdir),
    };
    let explorer = Explorer::new(engine, oracle, config.exploration, options);

    let cancel = explorer.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted; finishing with the evidence collected so far");
            cancel.cancel();
        }
    });

    let run = explorer.run().await;
    interrupt.abort();

    output::print_run(&run, format)?;
    Ok(())
}
