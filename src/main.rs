//! kbchat binary entry point.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::EnvFilter;

use kbchat::cli::{execute, format_error, resolve_config, Cli, OutputFormat};
use kbchat::config::ClientConfig;

/// Log filter variable; defaults to `warn`.
const LOG_ENV: &str = "KBCHAT_LOG";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    // stdout carries the answer; logs go to stderr
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Resolves on Ctrl-C. If the handler cannot be installed it never resolves.
async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = resolve_config(cli, ClientConfig::from_env()?)?;
    let runtime = tokio::runtime::Runtime::new()?;
    let mut stdout = io::stdout();
    runtime.block_on(execute(cli, config, ctrl_c(), &mut stdout))
}

fn main() -> ExitCode {
    if let Err(e) = color_eyre::install() {
        eprintln!("Warning: failed to install error handler: {e}");
    }
    init_tracing();

    let cli = Cli::parse();
    let format = OutputFormat::parse(&cli.format);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Piping into `head` closes stdout early
            if let Some(io_err) = e.downcast_ref::<io::Error>() {
                if io_err.kind() == io::ErrorKind::BrokenPipe {
                    return ExitCode::SUCCESS;
                }
            }
            let error_output = format_error(&e, format);
            match format {
                OutputFormat::Json => {
                    let _ = io::stdout().write_all(error_output.as_bytes());
                }
                OutputFormat::Text => eprintln!("Error: {error_output}"),
            }
            ExitCode::FAILURE
        }
    }
}
