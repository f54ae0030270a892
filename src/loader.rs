//! Domain Set Loader
//!
//! Reads the JSON domain list fresh on every call. The list is an array of
//! objects with a `domain` field:
//!
//! ```json
//! [{ "domain": "example.com" }, { "domain": "example.org" }]
//! ```
//!
//! Structural problems (unreadable file, invalid JSON, missing fields) fail
//! the whole load. Entries with an invalid hostname are skipped with an error
//! log so one typo cannot block the rest of the list.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{error, warn};
use serde::Deserialize;

use crate::domain::DomainEntry;
use crate::error::{Result, WardenError};

#[derive(Debug, Deserialize)]
struct RawEntry {
    domain: String,
}

/// Loads the managed domain set from a JSON file.
#[derive(Debug, Clone)]
pub struct DomainSetLoader {
    path: PathBuf,
}

impl DomainSetLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the current domain list.
    pub fn load(&self) -> Result<Vec<DomainEntry>> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            WardenError::DomainList(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        parse_domain_list(&content)
            .map_err(|e| WardenError::DomainList(format!("{}: {}", self.path.display(), e)))
    }
}

/// Parse domain list JSON, dropping invalid hostnames and duplicates.
pub fn parse_domain_list(content: &str) -> Result<Vec<DomainEntry>> {
    let raw: Vec<RawEntry> = serde_json::from_str(content)?;

    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(raw.len());
    for item in raw {
        let entry = match DomainEntry::new(item.domain) {
            Ok(entry) => entry,
            Err(e) => {
                error!("Skipping domain list entry: {}", e);
                continue;
            }
        };
        if !seen.insert(entry.domain.clone()) {
            warn!("Duplicate domain {} in domain list, processing it once", entry.domain);
            continue;
        }
        entries.push(entry);
    }

    Ok(entries)
}
