//! Managed domain entries and hostname validation.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WardenError};

const MAX_HOSTNAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// One managed base domain.
///
/// Deserializing goes through `DomainEntry::new`, so every entry holds a
/// validated, normalized hostname.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDomainEntry")]
pub struct DomainEntry {
    pub domain: String,
}

#[derive(Deserialize)]
struct RawDomainEntry {
    domain: String,
}

impl TryFrom<RawDomainEntry> for DomainEntry {
    type Error = WardenError;

    fn try_from(raw: RawDomainEntry) -> Result<Self> {
        DomainEntry::new(raw.domain)
    }
}

impl DomainEntry {
    /// Create an entry, normalizing case and surrounding whitespace.
    pub fn new(domain: impl Into<String>) -> Result<Self> {
        let domain = domain.into().trim().to_ascii_lowercase();
        validate_hostname(&domain)?;
        Ok(Self { domain })
    }

    /// The derived `www.` variant.
    pub fn www(&self) -> String {
        format!("www.{}", self.domain)
    }
}

/// Check that `name` is a syntactically valid DNS hostname.
pub fn validate_hostname(name: &str) -> Result<()> {
    let invalid = || WardenError::InvalidHostname(name.to_string());

    if name.is_empty() || name.len() > MAX_HOSTNAME_LEN {
        return Err(invalid());
    }

    for label in name.split('.') {
        if label.is_empty() || label.len() > MAX_LABEL_LEN {
            return Err(invalid());
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(invalid());
        }
        if !label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
            return Err(invalid());
        }
    }

    Ok(())
}
