use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use serde::Serialize;

use mailprobe_lib::{is_email_format_valid, probe_address, ProbeOptions, ProbeReport};

use crate::args::OutputFormat;

pub fn run_check(email: Option<String>, format: OutputFormat, options: &ProbeOptions) -> Result<i32> {
    let email = match email {
        Some(email) => email,
        None => prompt_for_address()?,
    };
    let email = email.trim().to_string();

    let format_valid = is_email_format_valid(&email);
    if !format_valid {
        match format {
            OutputFormat::Human => {
                println!("Format check: [INVALID] does not match local@domain.tld");
                println!("Reachability: Invalid email format");
            }
            OutputFormat::Json => print_json(&email, false, None)?,
        }
        return Ok(2);
    }

    let report = probe_address(&email, options).context("reachability probe failed")?;

    match format {
        OutputFormat::Human => {
            println!("Format check: [OK] valid");
            println!("Reachability: {}", report.outcome.message());
            if !report.hosts_tried.is_empty() {
                println!("MX tried: {}", report.hosts_tried.join(", "));
            }
            if !report.is_reachable() {
                println!();
                println!("Note: many email providers block SMTP verification for security reasons.");
                println!("A failed check does NOT guarantee the address is invalid.");
                println!("For critical applications, verify by sending a confirmation link instead.");
            }
        }
        OutputFormat::Json => print_json(&email, true, Some(&report))?,
    }

    Ok(0)
}

fn prompt_for_address() -> Result<String> {
    print!("Enter email to verify: ");
    io::stdout().flush().context("flush prompt")?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read stdin")?;
    Ok(line)
}

#[derive(Serialize)]
struct CheckPayload<'a> {
    email: &'a str,
    format_valid: bool,
    reachable: bool,
    message: String,
    hosts_tried: &'a [String],
}

fn print_json(email: &str, format_valid: bool, report: Option<&ProbeReport>) -> Result<()> {
    let payload = match report {
        Some(report) => CheckPayload {
            email,
            format_valid,
            reachable: report.is_reachable(),
            message: report.outcome.message(),
            hosts_tried: &report.hosts_tried,
        },
        None => CheckPayload {
            email,
            format_valid,
            reachable: false,
            message: "Invalid email format".to_string(),
            hosts_tried: &[],
        },
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}
