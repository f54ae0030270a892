//! acmewarden - certificate renewal orchestration
//!
//! acmewarden checks that each managed domain serves an HTTP challenge token
//! over both IPv4 and IPv6, asks an external ACME client to issue certificates
//! for the names that pass, and publishes the issued certificate and key to a
//! web-server-visible directory.

pub mod config;
pub mod daemon;
pub mod domain;
pub mod error;
pub mod issue;
pub mod loader;
pub mod policy;
pub mod verify;

pub use error::{Result, WardenError};
