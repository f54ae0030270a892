//! Address lookups for the reachability checks.
//!
//! The verifier only needs A and AAAA answers, plus a distinction between
//! "this name has no such record" (not a failure for IPv6) and every other
//! resolver failure.

use std::collections::HashMap;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::op::ResponseCode;

use crate::domain::validate_hostname;
use crate::error::{Result, WardenError};

/// Why a lookup produced no addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Name exists without records of this type, or does not exist
    NoRecords,
    /// Server does not implement the query
    NotImplemented,
    /// Name cannot be queried at all
    InvalidName,
    /// No answer within the resolver timeout
    Timeout,
    /// Any other resolver failure (server failure, refused, io)
    Failed(String),
}

impl LookupError {
    /// True for the classes that mean "there is no address to check".
    pub fn is_absence(&self) -> bool {
        matches!(
            self,
            LookupError::NoRecords | LookupError::NotImplemented | LookupError::InvalidName
        )
    }
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::NoRecords => write!(f, "no records found"),
            LookupError::NotImplemented => write!(f, "query not implemented by server"),
            LookupError::InvalidName => write!(f, "invalid name"),
            LookupError::Timeout => write!(f, "lookup timed out"),
            LookupError::Failed(msg) => write!(f, "lookup failed: {}", msg),
        }
    }
}

/// A/AAAA lookups
#[async_trait]
pub trait AddressResolver: Send + Sync {
    async fn lookup_ipv4(&self, host: &str) -> std::result::Result<Vec<Ipv4Addr>, LookupError>;

    async fn lookup_ipv6(&self, host: &str) -> std::result::Result<Vec<Ipv6Addr>, LookupError>;
}

/// Resolver backed by the system DNS configuration.
pub struct SystemResolver {
    inner: TokioAsyncResolver,
}

impl SystemResolver {
    /// Build from /etc/resolv.conf with a single attempt bounded by `timeout`.
    pub fn from_system_conf(timeout: Duration) -> Result<Self> {
        let (config, mut opts) = hickory_resolver::system_conf::read_system_conf()
            .map_err(|e| WardenError::Resolver(format!("cannot read system DNS config: {}", e)))?;
        opts.timeout = timeout;
        opts.attempts = 1;
        Ok(Self {
            inner: TokioAsyncResolver::tokio(config, opts),
        })
    }
}

impl fmt::Debug for SystemResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemResolver").finish_non_exhaustive()
    }
}

#[async_trait]
impl AddressResolver for SystemResolver {
    async fn lookup_ipv4(&self, host: &str) -> std::result::Result<Vec<Ipv4Addr>, LookupError> {
        if validate_hostname(host).is_err() {
            return Err(LookupError::InvalidName);
        }
        let lookup = self
            .inner
            .ipv4_lookup(host)
            .await
            .map_err(|e| classify_resolve_error(&e))?;
        Ok(lookup.iter().map(|a| a.0).collect())
    }

    async fn lookup_ipv6(&self, host: &str) -> std::result::Result<Vec<Ipv6Addr>, LookupError> {
        if validate_hostname(host).is_err() {
            return Err(LookupError::InvalidName);
        }
        let lookup = self
            .inner
            .ipv6_lookup(host)
            .await
            .map_err(|e| classify_resolve_error(&e))?;
        Ok(lookup.iter().map(|aaaa| aaaa.0).collect())
    }
}

fn classify_resolve_error(err: &ResolveError) -> LookupError {
    classify_kind(err.kind())
}

fn classify_kind(kind: &ResolveErrorKind) -> LookupError {
    match kind {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => match *response_code {
            ResponseCode::NotImp => LookupError::NotImplemented,
            ResponseCode::FormErr => LookupError::InvalidName,
            _ => LookupError::NoRecords,
        },
        ResolveErrorKind::Timeout => LookupError::Timeout,
        other => LookupError::Failed(other.to_string()),
    }
}

/// Fixed answer table. Hosts missing from a table have no records of that type.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    v4: HashMap<String, std::result::Result<Vec<Ipv4Addr>, LookupError>>,
    v6: HashMap<String, std::result::Result<Vec<Ipv6Addr>, LookupError>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ipv4(mut self, host: impl Into<String>, addrs: Vec<Ipv4Addr>) -> Self {
        self.v4.insert(host.into(), Ok(addrs));
        self
    }

    pub fn with_ipv6(mut self, host: impl Into<String>, addrs: Vec<Ipv6Addr>) -> Self {
        self.v6.insert(host.into(), Ok(addrs));
        self
    }

    pub fn with_ipv4_error(mut self, host: impl Into<String>, err: LookupError) -> Self {
        self.v4.insert(host.into(), Err(err));
        self
    }

    pub fn with_ipv6_error(mut self, host: impl Into<String>, err: LookupError) -> Self {
        self.v6.insert(host.into(), Err(err));
        self
    }
}

#[async_trait]
impl AddressResolver for StaticResolver {
    async fn lookup_ipv4(&self, host: &str) -> std::result::Result<Vec<Ipv4Addr>, LookupError> {
        self.v4.get(host).cloned().unwrap_or(Err(LookupError::NoRecords))
    }

    async fn lookup_ipv6(&self, host: &str) -> std::result::Result<Vec<Ipv6Addr>, LookupError> {
        self.v6.get(host).cloned().unwrap_or(Err(LookupError::NoRecords))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absence_classes() {
        assert!(LookupError::NoRecords.is_absence());
        assert!(LookupError::NotImplemented.is_absence());
        assert!(LookupError::InvalidName.is_absence());
        assert!(!LookupError::Timeout.is_absence());
        assert!(!LookupError::Failed("SERVFAIL".into()).is_absence());
    }

    #[test]
    fn test_classify_timeout() {
        assert_eq!(classify_kind(&ResolveErrorKind::Timeout), LookupError::Timeout);
    }

    #[test]
    fn test_classify_other_is_failure() {
        let classified = classify_kind(&ResolveErrorKind::Message("no connections available"));
        assert!(matches!(classified, LookupError::Failed(ref msg) if msg.contains("no connections")));
    }

    #[tokio::test]
    async fn test_static_resolver_answers() {
        let resolver = StaticResolver::new()
            .with_ipv4("example.com", vec![Ipv4Addr::new(192, 0, 2, 1)])
            .with_ipv6_error("example.com", LookupError::Timeout);

        assert_eq!(
            resolver.lookup_ipv4("example.com").await,
            Ok(vec![Ipv4Addr::new(192, 0, 2, 1)])
        );
        assert_eq!(resolver.lookup_ipv6("example.com").await, Err(LookupError::Timeout));
        assert_eq!(resolver.lookup_ipv4("other.com").await, Err(LookupError::NoRecords));
    }

    #[test]
    fn test_lookup_error_display() {
        assert_eq!(LookupError::NoRecords.to_string(), "no records found");
        assert_eq!(LookupError::Failed("refused".into()).to_string(), "lookup failed: refused");
    }
}
