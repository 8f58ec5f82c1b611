//! Batch validation of every address in a tabular file.
//!
//! [`run_batch`] is a pure transform: it reads records out of an input
//! [`Table`] and produces a new, augmented table with the validation columns
//! appended, plus a [`BatchSummary`]. Progress reporting goes through the
//! injected [`BatchObserver`] so the probing logic stays free of UI concerns.

mod table;

pub use table::{Table, TableError};

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::format::{is_email_format_valid, split_address};
use crate::probe::Prober;

/// Columns appended to every record, in output order.
pub const RESULT_COLUMNS: [&str; 5] = [
    "format_valid",
    "reachable",
    "validation_message",
    "username",
    "domain",
];

pub const INVALID_FORMAT_MESSAGE: &str = "Invalid email format";

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("column '{name}' not found in the input file")]
    ColumnNotFound { name: String },
    #[error("the input table has no records")]
    EmptyTable,
    #[error(transparent)]
    Table(#[from] TableError),
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Name of the column holding the candidate addresses.
    pub email_column: String,
    /// Pause inserted between records to avoid tripping abuse defenses on the
    /// probed servers.
    pub pacing: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            email_column: "email".to_string(),
            pacing: Duration::from_millis(100),
        }
    }
}

/// Progress side-channel. Implementations must not assume they are called
/// from any particular thread; the batch runner is single-threaded.
pub trait BatchObserver {
    fn on_record(&self, index: usize, total: usize, email: &str);
    fn on_finished(&self, summary: &BatchSummary);
}

/// Observer that reports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl BatchObserver for NullObserver {
    fn on_record(&self, _index: usize, _total: usize, _email: &str) {}
    fn on_finished(&self, _summary: &BatchSummary) {}
}

/// Counts over a finished batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub format_valid: usize,
    pub reachable: usize,
}

impl BatchSummary {
    pub fn format_valid_display(&self) -> String {
        display_with_percent(self.format_valid, self.total)
    }

    pub fn reachable_display(&self) -> String {
        display_with_percent(self.reachable, self.total)
    }
}

fn display_with_percent(count: usize, total: usize) -> String {
    if total == 0 {
        return format!("{count} (0.0%)");
    }
    let percent = count as f64 / total as f64 * 100.0;
    format!("{count} ({percent:.1}%)")
}

/// Augmented table plus summary returned by [`run_batch`].
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub table: Table,
    pub summary: BatchSummary,
}

/// Validates every record of `input` and returns a new table with the
/// [`RESULT_COLUMNS`] appended.
///
/// Format-invalid or empty addresses never reach the prober; format-valid
/// ones are probed through `prober` with the configured pacing delay between
/// records. Probe failures are recorded in the row's message column and never
/// abort the run; only file-level problems (missing column, empty table) do.
/// Execution is fully sequential.
pub fn run_batch(
    input: &Table,
    options: &BatchOptions,
    prober: &dyn Prober,
    observer: &dyn BatchObserver,
) -> Result<BatchOutcome, BatchError> {
    if input.is_empty() {
        return Err(BatchError::EmptyTable);
    }
    let column = input
        .column_index(&options.email_column)
        .ok_or_else(|| BatchError::ColumnNotFound {
            name: options.email_column.clone(),
        })?;

    let mut headers = input.headers.clone();
    headers.extend(RESULT_COLUMNS.iter().map(|name| name.to_string()));

    let total = input.len();
    let mut rows = Vec::with_capacity(total);
    let mut summary = BatchSummary {
        total,
        format_valid: 0,
        reachable: 0,
    };

    for (index, row) in input.rows.iter().enumerate() {
        let email = row.get(column).map(String::as_str).unwrap_or_default().trim();
        observer.on_record(index, total, email);

        let result = validate_record(email, prober);
        if result.format_valid {
            summary.format_valid += 1;
        }
        if result.reachable {
            summary.reachable += 1;
        }

        let mut augmented = row.clone();
        // Records shorter than the header are padded so the result columns
        // stay aligned.
        augmented.resize(input.headers.len(), String::new());
        augmented.push(result.format_valid.to_string());
        augmented.push(result.reachable.to_string());
        augmented.push(result.message);
        augmented.push(result.username);
        augmented.push(result.domain);
        rows.push(augmented);

        if index + 1 < total && !options.pacing.is_zero() {
            std::thread::sleep(options.pacing);
        }
    }

    observer.on_finished(&summary);
    Ok(BatchOutcome {
        table: Table::new(headers, rows),
        summary,
    })
}

struct RecordResult {
    format_valid: bool,
    reachable: bool,
    message: String,
    username: String,
    domain: String,
}

fn validate_record(email: &str, prober: &dyn Prober) -> RecordResult {
    if !is_email_format_valid(email) {
        return RecordResult {
            format_valid: false,
            reachable: false,
            message: INVALID_FORMAT_MESSAGE.to_string(),
            username: String::new(),
            domain: String::new(),
        };
    }

    // The format gate guarantees exactly one '@' with text on both sides.
    let (username, domain) = split_address(email).unwrap_or(("", ""));

    // Probe failures are per-record: the row carries the error message and
    // the remaining records are still processed.
    let (reachable, message) = match prober.probe(email) {
        Ok(report) => (report.is_reachable(), report.outcome.message()),
        Err(err) => {
            tracing::warn!(%email, error = %err, "probe failed, record marked unreachable");
            (false, format!("Probe error: {err}"))
        }
    };

    RecordResult {
        format_valid: true,
        reachable,
        message,
        username: username.to_string(),
        domain: domain.to_string(),
    }
}
