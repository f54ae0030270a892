//! External ACME client invocation.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::config::{AcmeConfig, expand_tilde};
use crate::domain::CertificationDecision;

/// Captured result of one tool run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessReport {
    /// Exit code, `None` if the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessReport {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

impl From<std::process::Output> for ProcessReport {
    fn from(output: std::process::Output) -> Self {
        Self {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// A fully composed issuance command.
#[derive(Debug, Clone)]
pub struct AcmeCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl AcmeCommand {
    /// Compose the issue request for every subject of `decision`.
    pub fn compose(config: &AcmeConfig, decision: &CertificationDecision) -> Self {
        let mut args = config.leading_args.clone();
        args.push("--issue".to_string());
        for subject in decision.subjects() {
            args.push("-d".to_string());
            args.push(subject.clone());
        }
        args.push("--webroot".to_string());
        args.push(config.webroot_for(decision.primary()));
        args.push("--home".to_string());
        args.push(expand_tilde(&config.cert_home).to_string_lossy().into_owned());
        args.push("--keylength".to_string());
        args.push(config.keylength.clone());

        Self {
            program: expand_tilde(&config.command),
            args,
            timeout: config.timeout(),
        }
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Command line for logging
    pub fn display(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            if arg.contains(char::is_whitespace) {
                line.push_str(&format!("'{}'", arg));
            } else {
                line.push_str(arg);
            }
        }
        line
    }

    /// Run to completion, capturing output. The child is killed on timeout.
    pub async fn run(&self) -> std::io::Result<ProcessReport> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn()?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map(ProcessReport::from),
            Err(_) => Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("Command timed out after {}ms", self.timeout.as_millis()),
            )),
        }
    }
}
