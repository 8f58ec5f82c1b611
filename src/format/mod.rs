//! Syntactic email format checks.
//!
//! This is a pure, offline stage: a candidate string either matches the
//! `localpart@domain.tld` shape or it does not. Passing the check is a
//! necessary but not sufficient condition for deliverability; it only exists
//! to reject structurally invalid strings before the network probe runs.

use once_cell::sync::Lazy;
use regex::Regex;

/// Local part: letters, digits and `._%+-`. Domain: letters, digits and `.-`,
/// ending in a dot followed by at least two letters.
static EMAIL_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
        .expect("email format pattern is valid")
});

/// Returns `true` when `email` matches the accepted address shape.
///
/// Never errors: unmatched input simply yields `false`.
pub fn is_email_format_valid(email: &str) -> bool {
    EMAIL_FORMAT.is_match(email)
}

/// Splits an address into `(local_part, domain)`.
///
/// Succeeds only when the string contains exactly one `@` with non-empty text
/// on both sides. Anything else is a format error and yields `None`.
pub fn split_address(email: &str) -> Option<(&str, &str)> {
    let mut parts = email.split('@');
    let local = parts.next()?;
    let domain = parts.next()?;
    if parts.next().is_some() || local.is_empty() || domain.is_empty() {
        return None;
    }
    Some((local, domain))
}
