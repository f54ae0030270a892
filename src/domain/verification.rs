//! Reachability check results.

use std::fmt;

/// IP address family a check runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stack {
    V4,
    V6,
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stack::V4 => write!(f, "IPv4"),
            Stack::V6 => write!(f, "IPv6"),
        }
    }
}

/// Outcome of checking one hostname over both stacks.
///
/// `ipv6_ok` is also true when the name has no AAAA records at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub domain: String,
    pub http_ok: bool,
    pub ipv6_ok: bool,
}

impl VerificationResult {
    pub fn new(domain: impl Into<String>, http_ok: bool, ipv6_ok: bool) -> Self {
        Self {
            domain: domain.into(),
            http_ok,
            ipv6_ok,
        }
    }

    /// Both stacks passed.
    pub fn passed(&self) -> bool {
        self.http_ok && self.ipv6_ok
    }
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = |ok: bool| if ok { "ok" } else { "FAIL" };
        write!(
            f,
            "{} (IPv4 {}, IPv6 {})",
            self.domain,
            mark(self.http_ok),
            mark(self.ipv6_ok)
        )
    }
}

/// Results for a base domain and its www variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainVerification {
    pub base: VerificationResult,
    pub www: VerificationResult,
}
