//! CRUD Dispatch Benchmark CLI
//!
//! Command-line interface for timing bulk Create / Retrieve / Update / Delete
//! runs under the three dispatch strategies.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --operation create --strategy single --entity account --records 500
//! cargo run -- --operation create --strategy execute-multiple --entity account --total-batches 4
//! cargo run -- --operation update --strategy parallel-execute-multiple --entity contact \
//!     --seed-records 5000 --update-fields description --max-concurrent 8
//! cargo run -- --operation retrieve --entity lead --seed-records 12000 --report timings.csv
//! ```
//!
//! Any of operation, strategy or entity left out is asked for interactively.
//! Log output goes to stderr (filtered by `RUST_LOG`, default `info`); the
//! final report goes to stdout.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (invalid settings, nothing to operate on, transport fault, etc.)

use crud_perf_bench::cli::{self, CliArgs, Prompter};
use crud_perf_bench::core::TracingReporter;
use crud_perf_bench::io::write_report_csv;
use crud_perf_bench::runner::BenchmarkRunner;
use crud_perf_bench::types::BenchError;
use std::error::Error;
use std::fs::File;
use std::io;
use std::process;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    // Parse command-line arguments using clap
    let mut args = cli::parse_args();

    let result = run(&mut args);
    if let Err(e) = &result {
        log_error_chain(e);
    }

    if args.pause_on_exit {
        let mut prompter = Prompter::new(io::stdin().lock(), io::stdout());
        if let Err(e) = prompter.pause() {
            warn!("Could not wait for <Enter>: {}", e);
        }
    }

    if result.is_err() {
        process::exit(1);
    }
}

fn run(args: &mut CliArgs) -> Result<(), BenchError> {
    let mut prompter = Prompter::new(io::stdin().lock(), io::stdout());
    cli::fill_missing_choices(args, &mut prompter)?;

    let config = args.to_bench_config()?;
    config.log_settings();

    // One worker thread per allowed connection
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.connection_limit)
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let runner = BenchmarkRunner::new(config.clone(), Arc::new(TracingReporter))?;

        let entity_name = match &config.entity {
            Some(name) => name.clone(),
            None if args.no_prompt => {
                return Err(BenchError::invalid_configuration("--entity is required"));
            }
            None => prompter.choose_entity(|oob| runner.candidate_entities(oob))?,
        };
        let entity = runner.resolve_entity(&entity_name)?;
        runner.seed(&entity)?;

        let cancel = CancellationToken::new();
        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, cancelling the run");
                    cancel.cancel();
                }
            }
        });

        let outcome = runner.run(&entity, &cancel).await?;

        println!();
        println!("{}", outcome.report);
        if !outcome.touched_fields.is_empty() {
            let fields: Vec<_> = outcome.touched_fields.iter().map(String::as_str).collect();
            println!("Fields updated:  {}", fields.join(", "));
        }

        if let Some(path) = &args.report {
            let mut file = File::create(path)?;
            write_report_csv(&outcome.report, &mut file)?;
            info!("Timings written to {}", path.display());
        }

        info!("Completed!");
        Ok(())
    })
}

fn log_error_chain(error: &BenchError) {
    error!("Error: {}", error);
    let mut source = error.source();
    while let Some(cause) = source {
        error!("Caused by: {}", cause);
        source = cause.source();
    }
}
