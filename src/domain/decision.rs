//! Certification decision: which names go into one certificate.

use std::fmt;

/// Ordered, non-empty subject list; the first subject is the primary name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificationDecision {
    subjects: Vec<String>,
}

impl CertificationDecision {
    /// Certificate for the base domain alone.
    pub fn single(base: impl Into<String>) -> Self {
        Self {
            subjects: vec![base.into()],
        }
    }

    /// Certificate for the base domain plus its www variant.
    pub fn with_www(base: impl Into<String>, www: impl Into<String>) -> Self {
        Self {
            subjects: vec![base.into(), www.into()],
        }
    }

    /// Build from an arbitrary subject list; `None` if empty.
    pub fn from_subjects(subjects: Vec<String>) -> Option<Self> {
        if subjects.is_empty() {
            None
        } else {
            Some(Self { subjects })
        }
    }

    /// The primary (common) name.
    pub fn primary(&self) -> &str {
        &self.subjects[0]
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }
}

impl fmt::Display for CertificationDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.subjects.join(", "))
    }
}
