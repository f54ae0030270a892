//! Issuance Invoker: compose, run, classify, publish.

use std::path::PathBuf;

use async_trait::async_trait;
use log::{error, info};

use crate::config::AcmeConfig;
use crate::domain::{CertificationDecision, IssuanceOutcome};
use crate::issue::classify::{Classification, classify};
use crate::issue::command::AcmeCommand;
use crate::issue::publish::Publisher;
use crate::issue::transcript::Transcript;

/// Issues a certificate for one decision.
///
/// Implementations are total: every path ends in an `IssuanceOutcome`.
#[async_trait]
pub trait Issuer: Send + Sync {
    async fn issue(&self, decision: &CertificationDecision) -> IssuanceOutcome;
}

/// Issuer backed by the external ACME client.
#[derive(Debug, Clone)]
pub struct IssuanceInvoker {
    config: AcmeConfig,
    publisher: Publisher,
    transcript_path: PathBuf,
}

impl IssuanceInvoker {
    pub fn new(config: AcmeConfig, publisher: Publisher, transcript_path: impl Into<PathBuf>) -> Self {
        Self {
            config,
            publisher,
            transcript_path: transcript_path.into(),
        }
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    async fn run(&self, decision: &CertificationDecision, transcript: &mut Transcript) -> IssuanceOutcome {
        let command = AcmeCommand::compose(&self.config, decision);
        transcript.record("command", &command.display());

        let report = match command.run().await {
            Ok(report) => report,
            Err(e) => {
                transcript.record("error", &e.to_string());
                return IssuanceOutcome::Failed(format!("cannot run ACME client: {}", e));
            }
        };

        let exit = report
            .exit_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| "signal".to_string());
        transcript.record("exit", &exit);
        transcript.record("stdout", &report.stdout);
        transcript.record("stderr", &report.stderr);

        let primary = decision.primary();
        match classify(&report) {
            Classification::Success => match self.publisher.publish(primary) {
                Ok(paths) => IssuanceOutcome::Issued(paths),
                Err(e) => IssuanceOutcome::Failed(format!("issued but not published: {}", e)),
            },
            Classification::AlreadyValid(reason) => match self.publisher.republish_if_stale(primary) {
                Ok(Some(paths)) => {
                    info!(
                        "Republished current certificate for {} to {}",
                        primary,
                        paths.cert.display()
                    );
                    IssuanceOutcome::AlreadyValid(reason)
                }
                Ok(None) => IssuanceOutcome::AlreadyValid(reason),
                Err(e) => IssuanceOutcome::Failed(format!("certificate valid but republish failed: {}", e)),
            },
            Classification::Failure(detail) => IssuanceOutcome::Failed(detail),
        }
    }
}

#[async_trait]
impl Issuer for IssuanceInvoker {
    async fn issue(&self, decision: &CertificationDecision) -> IssuanceOutcome {
        info!("Requesting certificate for {}", decision);

        let mut transcript = Transcript::open(&self.transcript_path, decision.primary());
        let outcome = self.run(decision, &mut transcript).await;
        transcript.record("outcome", &outcome.to_string());

        match &outcome {
            IssuanceOutcome::Issued(_) => info!("Certificate generated for {}", decision),
            IssuanceOutcome::AlreadyValid(reason) => {
                info!("Certificate for {} already valid: {}", decision, reason)
            }
            IssuanceOutcome::Failed(detail) => {
                error!("Failed to generate certificate for {}: {}", decision, detail)
            }
        }
        outcome
    }
}
