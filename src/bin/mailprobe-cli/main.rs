use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod args;
mod batch;
mod single;

use args::{Cli, Commands};

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let exit_code = match cli.cmd {
        Commands::Check {
            email,
            format,
            probe,
        } => single::run_check(email, format, &probe.to_options())?,
        Commands::Batch {
            file,
            column,
            out,
            delay_ms,
            probe,
        } => batch::run_batch_file(&file, &column, &out, delay_ms, probe.to_options())?,
    };

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
