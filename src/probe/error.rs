use thiserror::Error;

/// Errors that abort a reachability probe before any MX host is contacted.
///
/// Per-host transport and protocol failures are deliberately *not* here: those
/// are recovered locally by advancing to the next MX host and only surface in
/// the aggregate [`ProbeOutcome`](super::ProbeOutcome).
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid email address (missing @ symbol)")]
    MalformedAddress,
    #[error("domain IDNA conversion failed")]
    IdnaConversion {
        #[source]
        source: idna::Errors,
    },
    #[error("resolver initialization failed: {source}")]
    ResolverInit {
        #[source]
        source: std::io::Error,
    },
}

impl ProbeError {
    pub(crate) fn idna(source: idna::Errors) -> Self {
        Self::IdnaConversion { source }
    }

    pub(crate) fn resolver_init(source: std::io::Error) -> Self {
        Self::ResolverInit { source }
    }
}
