use std::borrow::Cow;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Controls how [`probe_address`](super::probe_address) interrogates SMTP servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOptions {
    /// Envelope sender declared in `MAIL FROM`. Empty means a
    /// `postmaster@<target domain>` placeholder is synthesised.
    pub mail_from: String,
    /// Name announced in `HELO`. Empty falls back to the target's ASCII domain.
    pub helo_name: String,
    /// Per-connection and per-command deadline.
    pub timeout_ms: u64,
    /// Cap on the number of MX hosts interrogated. Zero means every
    /// advertised host is tried before giving up.
    pub max_hosts: usize,
    /// SMTP port. Overridable so tests can target a loopback listener.
    pub port: u16,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            mail_from: String::new(),
            helo_name: String::new(),
            timeout_ms: 15_000,
            max_hosts: 0,
            port: 25,
        }
    }
}

impl ProbeOptions {
    /// Returns the timeout as a [`Duration`]. Zero disables the deadline.
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.timeout_ms))
        }
    }

    pub fn helo_name<'a>(&'a self, fallback: &'a str) -> Cow<'a, str> {
        if self.helo_name.trim().is_empty() {
            Cow::Borrowed(fallback)
        } else {
            Cow::Borrowed(self.helo_name.as_str())
        }
    }

    pub fn mail_from(&self, ascii_domain: &str) -> String {
        if self.mail_from.is_empty() {
            format!("postmaster@{ascii_domain}")
        } else {
            self.mail_from.clone()
        }
    }

    /// Number of hosts to interrogate out of `available`.
    pub fn host_limit(&self, available: usize) -> usize {
        if self.max_hosts == 0 {
            available
        } else {
            self.max_hosts.min(available)
        }
    }
}
