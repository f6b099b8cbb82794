//! Hourglass CLI: resolve calendar windows and wait on cluster operations.

use std::process::ExitCode;

use clap::Parser;

use hourglass::{CliArgs, init_tracing, run};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = CliArgs::parse();

    match run(args).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            e.exit_code()
        }
    }
}
