//! Reachability Verifier
//!
//! Dual-stack checks that a hostname serves the challenge token:
//! - resolver: address lookups with "no record" classification
//! - probe: HTTP fetch of the challenge file pinned to one address family

pub mod probe;
pub mod resolver;

pub use probe::{Reachability, ReachabilityVerifier};
pub use resolver::{AddressResolver, LookupError, StaticResolver, SystemResolver};
