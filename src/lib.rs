#![forbid(unsafe_code)]
//! mailprobe_lib — two-stage email validation: a regex format check plus an
//! SMTP reachability probe (MX lookup + minimal RCPT handshake, no message sent).

pub mod batch;
pub mod format;
pub mod probe;

pub use format::{is_email_format_valid, split_address};
pub use probe::{
    probe_address, ProbeError, ProbeOptions, ProbeOutcome, ProbeReport, Prober, SmtpProber,
};

pub use batch::{
    run_batch, BatchError, BatchObserver, BatchOptions, BatchOutcome, BatchSummary, NullObserver,
    Table, TableError,
};
