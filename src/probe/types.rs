use std::fmt;

use serde::{Deserialize, Serialize};

/// A raw SMTP reply, preserving the numeric status code and message text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpReply {
    pub code: u16,
    pub message: String,
}

impl SmtpReply {
    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

/// Aggregate classification of a reachability probe.
///
/// `Inconclusive` is deliberately not a hard negative: many servers decline
/// this kind of probing (greylisting, blocking, silent drops), so an exhausted
/// MX list proves nothing about the mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeOutcome {
    /// An MX host answered the recipient declaration with code 250.
    Accepted { reply: SmtpReply },
    /// The domain resolved but advertises no mail exchangers.
    NoMxRecords { domain: String },
    /// MX resolution itself failed (timeout, servfail, ...).
    DnsError { detail: String },
    /// Every MX host was tried without an accepting reply.
    Inconclusive,
}

impl ProbeOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// Human-readable result line. Callers surfacing this string must keep the
    /// caveat wording of the inconclusive case intact.
    pub fn message(&self) -> String {
        match self {
            Self::Accepted { .. } => "Email exists".to_string(),
            Self::NoMxRecords { domain } => {
                format!("No MX records found for domain {domain}")
            }
            Self::DnsError { detail } => format!("DNS error: {detail}"),
            Self::Inconclusive => {
                "Email validation failed or timed out. This doesn't necessarily mean \
                 the email is invalid - many servers block SMTP verification."
                    .to_string()
            }
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Final report produced by [`probe_address`](super::probe_address).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub email: String,
    pub ascii_domain: String,
    pub outcome: ProbeOutcome,
    /// Exchanges contacted, in interrogation order.
    pub hosts_tried: Vec<String>,
}

impl ProbeReport {
    pub fn is_reachable(&self) -> bool {
        self.outcome.is_reachable()
    }
}
