use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use mailprobe_lib::{
    run_batch, BatchObserver, BatchOptions, BatchSummary, ProbeOptions, SmtpProber, Table,
};

pub fn run_batch_file(
    file: &Path,
    column: &str,
    out: &Path,
    delay_ms: u64,
    probe_options: ProbeOptions,
) -> Result<i32> {
    let table = Table::from_path(file)
        .with_context(|| format!("error processing file '{}'", file.display()))?;
    tracing::info!(
        records = table.len(),
        columns = table.headers.len(),
        "loaded input file"
    );

    let options = BatchOptions {
        email_column: column.to_string(),
        pacing: Duration::from_millis(delay_ms),
    };
    let prober = SmtpProber::new(probe_options);
    let observer = ProgressObserver::new(table.len());

    let outcome = run_batch(&table, &options, &prober, &observer)?;

    write_csv_atomically(&outcome.table, out)
        .with_context(|| format!("writing results to '{}'", out.display()))?;

    print_summary(&outcome.summary);
    println!("Results written to {}", out.display());
    Ok(0)
}

fn print_summary(summary: &BatchSummary) {
    println!("Summary");
    println!("  Total emails: {}", summary.total);
    println!("  Valid format: {}", summary.format_valid_display());
    println!("  Reachable:    {}", summary.reachable_display());
    println!();
    println!("Note: many email providers block SMTP verification for security reasons.");
    println!("A failed check does NOT guarantee an address is invalid.");
}

/// Drives an `indicatif` bar from the batch observer callbacks.
struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Self { bar }
    }
}

impl BatchObserver for ProgressObserver {
    fn on_record(&self, index: usize, total: usize, email: &str) {
        self.bar
            .set_message(format!("Processing {} of {}: {}", index + 1, total, email));
        self.bar.set_position(index as u64);
    }

    fn on_finished(&self, summary: &BatchSummary) {
        self.bar.set_position(summary.total as u64);
        self.bar
            .finish_with_message(format!("Processed {} records", summary.total));
    }
}

fn write_csv_atomically(table: &Table, path: &Path) -> Result<()> {
    let mut buffer = Vec::new();
    table.write_csv(&mut buffer)?;
    let tmp = path.with_extension("csv.tmp");
    std::fs::write(&tmp, &buffer)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
