use anyhow::Context;
use clap::Parser;
use inmet_pipeline::cli::{self, Args};
use std::process;

async fn run(args: Args) -> anyhow::Result<()> {
    let reports = cli::execute(&args)
        .await
        .with_context(|| format!("{:?} command failed", args.command))?;
    cli::print_summary(&reports);
    Ok(())
}

fn main() {
    let args = Args::parse();
    cli::setup_logging(args.verbose);

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        tokio::select! {
            result = run(args) => result,
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => Err(anyhow::anyhow!("Interrupted by user")),
                Err(e) => Err(anyhow::Error::new(e).context("Failed to listen for CTRL+C")),
            },
        }
    });

    match result {
        Ok(()) => process::exit(0),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}
