//! `fetchbench`: fetch a URL list under a concurrency cap, trace every URL and
//! print a statistical summary.
//!
//! Exit codes: 0 once every admitted URL has been reported (per-URL failures
//! included), 2 when the URL source cannot be opened or read.

mod cli;
mod output;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use engine_logging::{engine_error, engine_info, engine_warn};
use fetchbench_engine::{CancellationToken, Engine, ReqwestFetcher, UrlSource};

use cli::Cli;
use output::StdoutSink;

const EXIT_FATAL: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    engine_logging::initialize(cli.log_destination(), cli.effective_log_level());

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            engine_error!("{:#}", err);
            eprintln!("Error: {err:#}");
            EXIT_FATAL
        }
    };
    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<i32> {
    let source = UrlSource::from_arg(&cli.input)
        .open(cli.limit)
        .await
        .context("opening url source")?;
    let fetcher = ReqwestFetcher::new(cli.fetch_settings()).context("building http client")?;
    let engine = Engine::new(cli.engine_settings(), Arc::new(fetcher));
    engine_info!(
        "fetching from {} with strategy {}",
        cli.input,
        engine.settings().strategy
    );

    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    let mut sink = StdoutSink::new(cli.format);
    let report = engine.run(source, &mut sink, cancel).await?;
    let summary = output::render_summary(&report, cli.format).context("rendering summary")?;
    println!("{summary}");

    match report.source_error {
        Some(err) => {
            eprintln!("Error: {err}");
            Ok(EXIT_FATAL)
        }
        None => Ok(0),
    }
}

fn cancel_on_interrupt(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            engine_warn!("interrupt received, cancelling in-flight fetches");
            cancel.cancel();
        }
    });
}
