//! Issuance Invoker
//!
//! Wraps the external ACME client:
//! - command: argument composition and scoped subprocess execution
//! - classify: exit status and output text to a typed outcome class
//! - transcript: append-only log of every invocation
//! - publish: atomic copy of the issued pair to the serving location
//! - invoker: ties the above together behind the `Issuer` trait

pub mod classify;
pub mod command;
pub mod invoker;
pub mod publish;
pub mod transcript;

pub use classify::{ALREADY_VALID_MARKERS, Classification, classify};
pub use command::{AcmeCommand, ProcessReport};
pub use invoker::{IssuanceInvoker, Issuer};
pub use publish::Publisher;
pub use transcript::Transcript;
