//! MX resolution for the reachability probe.
//!
//! Lookups go through the [`LookupMx`] seam so tests can substitute a stub
//! resolver instead of the system one.

use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::Resolver;

use super::error::ProbeError;

/// One mail exchanger advertised for a domain.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MxRecord {
    pub preference: u16,
    pub exchange: String,
}

impl MxRecord {
    pub fn new(preference: u16, exchange: impl Into<String>) -> Self {
        Self {
            preference,
            exchange: exchange.into(),
        }
    }
}

/// Result of resolving a domain's mail exchangers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MxResolution {
    /// Sorted (ascending preference), deduplicated records.
    Records(Vec<MxRecord>),
    /// The name exists but advertises no mail exchangers, or does not exist.
    NoRecords,
    /// The lookup itself failed.
    Failed(String),
}

pub fn build_resolver() -> Result<Resolver, ProbeError> {
    Resolver::from_system_conf().map_err(ProbeError::resolver_init)
}

/// Resolve the MX set for `ascii_domain`, normalising the outcome into
/// [`MxResolution`]. A no-records answer (including NXDOMAIN) is not an error:
/// it is a definitive "this domain has no mail servers" signal.
pub fn resolve_mx<R: LookupMx>(resolver: &R, ascii_domain: &str) -> MxResolution {
    match resolver.lookup_mx(ascii_domain) {
        Ok(mut records) => {
            records.sort();
            records.dedup();
            if records.is_empty() {
                MxResolution::NoRecords
            } else {
                MxResolution::Records(records)
            }
        }
        Err(err) => match err.kind() {
            ResolveErrorKind::NoRecordsFound { .. } => MxResolution::NoRecords,
            _ => MxResolution::Failed(err.to_string()),
        },
    }
}

pub(crate) fn normalize_domain(domain: &str) -> Result<String, ProbeError> {
    idna::domain_to_ascii(domain.trim()).map_err(ProbeError::idna)
}

pub(crate) fn normalize_exchange(exchange: String) -> String {
    exchange.trim_end_matches('.').to_ascii_lowercase()
}

/// Seam over the raw MX query.
pub trait LookupMx {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError>;
}

impl LookupMx for Resolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError> {
        let lookup = Resolver::mx_lookup(self, domain)?;
        let mut records = Vec::new();
        for mx in lookup.iter() {
            let exchange = normalize_exchange(mx.exchange().to_utf8());
            records.push(MxRecord::new(mx.preference(), exchange));
        }
        Ok(records)
    }
}

#[cfg(test)]
pub(crate) struct StubResolver {
    pub on_lookup: Box<dyn Fn(&str) -> Result<Vec<MxRecord>, ResolveError>>,
}

#[cfg(test)]
impl StubResolver {
    pub(crate) fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> Result<Vec<MxRecord>, ResolveError> + 'static,
    {
        Self {
            on_lookup: Box::new(f),
        }
    }
}

#[cfg(test)]
impl LookupMx for StubResolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError> {
        (self.on_lookup)(domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_mx_sorts_and_dedups_records() {
        let stub = StubResolver::new(|domain| {
            assert_eq!(domain, "example.com");
            Ok(vec![
                MxRecord::new(20, "mx2.example.com"),
                MxRecord::new(10, "mx1.example.com"),
                MxRecord::new(10, "mx1.example.com"),
                MxRecord::new(30, "mx3.example.com"),
            ])
        });

        let records = match resolve_mx(&stub, "example.com") {
            MxResolution::Records(records) => records,
            other => panic!("expected records, got {other:?}"),
        };
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].exchange, "mx1.example.com");
        assert_eq!(records[2].preference, 30);
    }

    #[test]
    fn resolve_mx_handles_empty_answer() {
        let stub = StubResolver::new(|_| Ok(Vec::new()));
        assert_eq!(resolve_mx(&stub, "example.com"), MxResolution::NoRecords);
    }

    #[test]
    fn normalize_exchange_trims_dot_and_lowercases() {
        let out = normalize_exchange("Mail.EXAMPLE.com.".to_string());
        assert_eq!(out, "mail.example.com");
    }

    #[test]
    fn normalize_domain_converts_idna() {
        let ascii = normalize_domain("exämple.com").expect("conversion");
        assert_eq!(ascii, "xn--exmple-cua.com");
    }
}
