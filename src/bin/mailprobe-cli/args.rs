use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "mailprobe-cli", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check a single address; prompts for one when no argument is given
    Check {
        /// email address to test
        email: Option<String>,
        /// output format
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
        #[command(flatten)]
        probe: ProbeArgs,
    },
    /// Validate every address in a CSV or spreadsheet file
    Batch {
        /// input file (.csv, .xlsx, .xls or .ods)
        file: PathBuf,
        /// name of the column holding the addresses
        #[arg(long)]
        column: String,
        /// where to write the augmented CSV
        #[arg(long, default_value = "email_validation_results.csv")]
        out: PathBuf,
        /// pause between records (ms), to stay under rate limits
        #[arg(long = "delay", default_value_t = 100)]
        delay_ms: u64,
        #[command(flatten)]
        probe: ProbeArgs,
    },
}

#[derive(clap::Args)]
pub struct ProbeArgs {
    /// envelope MAIL FROM (default postmaster@<target domain>)
    #[arg(long = "from")]
    pub mail_from: Option<String>,
    /// name used in the HELO greeting
    #[arg(long)]
    pub helo: Option<String>,
    /// per-connection timeout (ms)
    #[arg(long = "timeout", default_value_t = 15_000)]
    pub timeout_ms: u64,
    /// cap on the number of MX hosts interrogated (0 = all)
    #[arg(long = "max-hosts", default_value_t = 0)]
    pub max_hosts: usize,
    /// SMTP port
    #[arg(long, default_value_t = 25)]
    pub port: u16,
}

impl ProbeArgs {
    pub fn to_options(&self) -> mailprobe_lib::ProbeOptions {
        let mut options = mailprobe_lib::ProbeOptions::default();
        if let Some(mail_from) = &self.mail_from {
            options.mail_from = mail_from.clone();
        }
        if let Some(helo) = &self.helo {
            options.helo_name = helo.clone();
        }
        options.timeout_ms = self.timeout_ms;
        options.max_hosts = self.max_hosts;
        options.port = self.port;
        options
    }
}
