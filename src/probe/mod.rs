//! SMTP reachability probing.
//!
//! The public entry point is [`probe_address`], which resolves the MX records
//! of the target domain and interrogates each exchanger in preference order
//! with a minimal greeting / MAIL FROM / RCPT TO dialogue. No message is ever
//! sent. The first host that answers the recipient declaration with code 250
//! wins; an exhausted host list is reported as inconclusive rather than as a
//! proof of non-existence, because many servers deliberately decline probes.

mod dns;
mod error;
mod options;
mod session;
mod types;

pub use dns::{LookupMx, MxRecord, MxResolution};
pub use error::ProbeError;
pub use options::ProbeOptions;
pub use types::{ProbeOutcome, ProbeReport, SmtpReply};

use crate::format::split_address;

use self::dns::{build_resolver, normalize_domain, resolve_mx};
use self::session::{resolve_socket_addrs, SmtpSession};

/// Abstraction over the prober, so batch processing can be exercised in tests
/// without any network access.
pub trait Prober {
    fn probe(&self, email: &str) -> Result<ProbeReport, ProbeError>;
}

/// The real prober: system DNS plus blocking SMTP sessions.
#[derive(Debug, Clone, Default)]
pub struct SmtpProber {
    pub options: ProbeOptions,
}

impl SmtpProber {
    pub fn new(options: ProbeOptions) -> Self {
        Self { options }
    }
}

impl Prober for SmtpProber {
    fn probe(&self, email: &str) -> Result<ProbeReport, ProbeError> {
        probe_address(email, &self.options)
    }
}

/// Attempts to determine whether a receiving mail server would accept a
/// message to `email`, without sending one.
pub fn probe_address(email: &str, options: &ProbeOptions) -> Result<ProbeReport, ProbeError> {
    let resolver = build_resolver()?;
    probe_with_resolver(email, options, &resolver)
}

pub(crate) fn probe_with_resolver<R: LookupMx>(
    email: &str,
    options: &ProbeOptions,
    resolver: &R,
) -> Result<ProbeReport, ProbeError> {
    let (local, domain) = split_address(email).ok_or(ProbeError::MalformedAddress)?;
    let ascii_domain = normalize_domain(domain)?;

    let records = match resolve_mx(resolver, &ascii_domain) {
        MxResolution::Records(records) => records,
        MxResolution::NoRecords => {
            tracing::debug!(domain = %ascii_domain, "no MX records, probe skipped");
            return Ok(report(
                email,
                &ascii_domain,
                ProbeOutcome::NoMxRecords {
                    domain: ascii_domain.clone(),
                },
                Vec::new(),
            ));
        }
        MxResolution::Failed(detail) => {
            tracing::warn!(domain = %ascii_domain, %detail, "MX lookup failed");
            return Ok(report(
                email,
                &ascii_domain,
                ProbeOutcome::DnsError { detail },
                Vec::new(),
            ));
        }
    };

    let helo = options.helo_name(&ascii_domain).into_owned();
    let mail_from = options.mail_from(&ascii_domain);

    let mut hosts_tried = Vec::new();
    for record in records.iter().take(options.host_limit(records.len())) {
        hosts_tried.push(record.exchange.clone());
        match probe_host(record, local, &ascii_domain, &helo, &mail_from, options) {
            Ok(reply) if reply.code == 250 => {
                tracing::debug!(exchange = %record.exchange, "recipient accepted");
                return Ok(report(
                    email,
                    &ascii_domain,
                    ProbeOutcome::Accepted { reply },
                    hosts_tried,
                ));
            }
            Ok(reply) => {
                tracing::debug!(
                    exchange = %record.exchange,
                    code = reply.code,
                    "recipient not accepted, trying next exchanger"
                );
            }
            // Unreachable or misbehaving host: recovered locally by moving on.
            Err(err) => {
                tracing::warn!(exchange = %record.exchange, error = %err, "host probe failed");
            }
        }
    }

    Ok(report(
        email,
        &ascii_domain,
        ProbeOutcome::Inconclusive,
        hosts_tried,
    ))
}

/// Runs the handshake against a single exchanger and returns the reply to the
/// recipient declaration. Any [`io::Error`](std::io::Error) here means the
/// host could not give a usable answer; the caller falls through to the next.
fn probe_host(
    record: &MxRecord,
    local: &str,
    ascii_domain: &str,
    helo: &str,
    mail_from: &str,
    options: &ProbeOptions,
) -> std::io::Result<SmtpReply> {
    let addrs = resolve_socket_addrs(&record.exchange, options.port)?;
    let mut session = SmtpSession::connect(&addrs, options.timeout())?;

    let greeting = session.read_reply()?;
    if !greeting.is_positive_completion() {
        session.quit();
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("unexpected greeting: {}", greeting.code),
        ));
    }

    session.send_command(&format!("HELO {helo}"))?;
    let helo_reply = session.read_reply()?;
    if !helo_reply.is_positive_completion() {
        session.quit();
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("HELO rejected: {}", helo_reply.code),
        ));
    }

    session.send_command(&format!("MAIL FROM:<{mail_from}>"))?;
    let _ = session.read_reply()?;

    session.send_command(&format!("RCPT TO:<{local}@{ascii_domain}>"))?;
    let rcpt_reply = session.read_reply()?;

    session.quit();
    Ok(rcpt_reply)
}

fn report(
    email: &str,
    ascii_domain: &str,
    outcome: ProbeOutcome,
    hosts_tried: Vec<String>,
) -> ProbeReport {
    ProbeReport {
        email: email.to_string(),
        ascii_domain: ascii_domain.to_string(),
        outcome,
        hosts_tried,
    }
}

#[cfg(test)]
mod tests {
    use super::dns::StubResolver;
    use super::*;
    use std::io::{self, BufRead, BufReader, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc};
    use std::thread;

    fn options_for_port(port: u16) -> ProbeOptions {
        ProbeOptions {
            port,
            timeout_ms: 2_000,
            ..ProbeOptions::default()
        }
    }

    /// Loopback SMTP server answering RCPT TO with `rcpt_code`, counting
    /// accepted connections.
    fn spawn_mock_server(rcpt_code: u16) -> (u16, Arc<AtomicUsize>, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let port = listener.local_addr().expect("addr").port();
        let connections = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&connections);
        let (ready_tx, ready_rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            ready_tx.send(()).ok();
            if let Ok((mut stream, _)) = listener.accept() {
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = handle_session(&mut stream, rcpt_code);
            }
        });
        ready_rx.recv().expect("server ready");
        (port, connections, handle)
    }

    fn handle_session(stream: &mut TcpStream, rcpt_code: u16) -> io::Result<()> {
        let mut reader = BufReader::new(stream.try_clone()?);
        stream.write_all(b"220 mock.smtp.test ESMTP\r\n")?;
        stream.flush()?;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line)? == 0 {
                return Ok(());
            }
            let response = if line.starts_with("HELO") {
                "250 mock.smtp.test\r\n".to_string()
            } else if line.starts_with("MAIL FROM:") {
                "250 2.1.0 Ok\r\n".to_string()
            } else if line.starts_with("RCPT TO:") {
                format!("{rcpt_code} mock reply\r\n")
            } else if line.starts_with("QUIT") {
                stream.write_all(b"221 2.0.0 Bye\r\n")?;
                stream.flush()?;
                return Ok(());
            } else {
                "502 5.5.2 Not implemented\r\n".to_string()
            };
            stream.write_all(response.as_bytes())?;
            stream.flush()?;
        }
    }

    #[test]
    fn malformed_address_is_rejected_before_dns() {
        let resolver = StubResolver::new(|_| panic!("lookup must not run"));
        let err = probe_with_resolver("nobody", &ProbeOptions::default(), &resolver)
            .expect_err("should fail");
        assert!(matches!(err, ProbeError::MalformedAddress));
    }

    #[test]
    fn empty_mx_set_skips_the_network() {
        // Lookups succeed with no records; any connection attempt would hit a
        // real socket and show up as a non-NoMxRecords outcome.
        let resolver = StubResolver::new(|domain| {
            assert_eq!(domain, "example.com");
            Ok(Vec::new())
        });
        let report = probe_with_resolver("user@example.com", &ProbeOptions::default(), &resolver)
            .expect("probe");
        assert!(matches!(report.outcome, ProbeOutcome::NoMxRecords { .. }));
        assert!(report.hosts_tried.is_empty());
        assert_eq!(
            report.outcome.message(),
            "No MX records found for domain example.com"
        );
    }

    #[test]
    #[ignore = "requires loopback TCP binding"]
    fn first_accepting_host_short_circuits() {
        let (port, first_hits, first) = spawn_mock_server(250);
        let resolver = StubResolver::new(move |_| {
            Ok(vec![
                MxRecord::new(10, "127.0.0.1"),
                MxRecord::new(20, "127.0.0.2"),
            ])
        });
        let report =
            probe_with_resolver("user@example.com", &options_for_port(port), &resolver)
                .expect("probe");
        assert!(report.is_reachable());
        assert_eq!(report.outcome.message(), "Email exists");
        assert_eq!(report.hosts_tried, vec!["127.0.0.1".to_string()]);
        assert_eq!(first_hits.load(Ordering::SeqCst), 1);
        first.join().expect("server thread");
    }

    #[test]
    #[ignore = "requires loopback TCP binding"]
    fn rejecting_host_yields_inconclusive_with_caveat() {
        let (port, _, handle) = spawn_mock_server(550);
        let resolver = StubResolver::new(move |_| Ok(vec![MxRecord::new(10, "127.0.0.1")]));
        let report =
            probe_with_resolver("user@example.com", &options_for_port(port), &resolver)
                .expect("probe");
        assert!(!report.is_reachable());
        assert!(matches!(report.outcome, ProbeOutcome::Inconclusive));
        assert!(report
            .outcome
            .message()
            .contains("many servers block SMTP verification"));
        handle.join().expect("server thread");
    }

    #[test]
    #[ignore = "requires loopback TCP binding"]
    fn multibyte_greeting_is_a_per_host_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let handle = thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let _ = stream.write_all("22\u{e9} mock greeting\r\n".as_bytes());
            }
        });
        let resolver = StubResolver::new(move |_| Ok(vec![MxRecord::new(10, "127.0.0.1")]));
        let report =
            probe_with_resolver("user@example.com", &options_for_port(port), &resolver)
                .expect("probe");
        assert!(matches!(report.outcome, ProbeOutcome::Inconclusive));
        assert_eq!(report.hosts_tried.len(), 1);
        handle.join().expect("server thread");
    }

    #[test]
    #[ignore = "requires loopback TCP binding"]
    fn unreachable_hosts_are_all_tried_in_order() {
        // Bind then drop to get ports that refuse connections.
        let dead_port = {
            let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
            listener.local_addr().expect("addr").port()
        };
        let resolver = StubResolver::new(move |_| {
            Ok(vec![
                MxRecord::new(10, "127.0.0.1"),
                MxRecord::new(20, "127.0.0.1"),
            ])
        });
        let report =
            probe_with_resolver("user@example.com", &options_for_port(dead_port), &resolver)
                .expect("probe");
        assert!(matches!(report.outcome, ProbeOutcome::Inconclusive));
        assert_eq!(report.hosts_tried.len(), 2);
    }
}
