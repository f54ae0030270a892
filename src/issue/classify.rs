//! Turns a raw tool result into a typed outcome class.
//!
//! Text matching on tool output happens here and nowhere else.

use crate::issue::command::ProcessReport;

/// Output fragments meaning "certificate is current, nothing to do".
pub const ALREADY_VALID_MARKERS: &[&str] = &[
    "Skip, Next renewal time is",
    "Domains not changed",
    "Not yet due for renewal",
    "not due for renewal",
];

/// Outcome class of one tool run, before artifact publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Exit 0 with an empty error stream
    Success,
    /// Tool declined to renew; carries the tool's message
    AlreadyValid(String),
    /// Anything else; carries the error detail
    Failure(String),
}

/// Classify a finished tool run.
pub fn classify(report: &ProcessReport) -> Classification {
    let stderr = report.stderr.trim();

    if report.success() && stderr.is_empty() {
        return Classification::Success;
    }

    // stdout is only consulted when the error stream is empty.
    let marker = if stderr.is_empty() {
        find_marker(&report.stdout)
    } else {
        find_marker(stderr)
    };
    if let Some(line) = marker {
        return Classification::AlreadyValid(line);
    }

    let exit = match report.exit_code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    };
    if stderr.is_empty() {
        Classification::Failure(exit)
    } else {
        Classification::Failure(format!("{}: {}", exit, stderr))
    }
}

/// The first output line containing an already-valid marker.
fn find_marker(text: &str) -> Option<String> {
    text.lines()
        .find(|line| ALREADY_VALID_MARKERS.iter().any(|m| line.contains(m)))
        .map(|line| line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(exit_code: Option<i32>, stdout: &str, stderr: &str) -> ProcessReport {
        ProcessReport {
            exit_code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn test_clean_exit_is_success() {
        assert_eq!(classify(&report(Some(0), "Cert success.", "")), Classification::Success);
    }

    #[test]
    fn test_whitespace_only_stderr_is_success() {
        assert_eq!(classify(&report(Some(0), "", "\n  \n")), Classification::Success);
    }

    #[test]
    fn test_skip_marker_in_stderr() {
        let stderr = "[Mon Oct 19 10:00:00 UTC 2026] Domains not changed.\n\
                      [Mon Oct 19 10:00:00 UTC 2026] Skip, Next renewal time is: 2026-12-01T00:00:00Z\n";
        let class = classify(&report(Some(1), "", stderr));
        assert_eq!(
            class,
            Classification::AlreadyValid(
                "[Mon Oct 19 10:00:00 UTC 2026] Domains not changed.".to_string()
            )
        );
    }

    #[test]
    fn test_skip_marker_in_stdout_with_exit_2() {
        let stdout = "[Mon Oct 19] Skip, Next renewal time is: Tue Dec  1 00:00:00 UTC 2026\n\
                      [Mon Oct 19] Add '--force' to force to renew.\n";
        match classify(&report(Some(2), stdout, "")) {
            Classification::AlreadyValid(msg) => assert!(msg.contains("Next renewal time")),
            other => panic!("expected AlreadyValid, got {other:?}"),
        }
    }

    #[test]
    fn test_nonzero_without_marker_is_failure() {
        let class = classify(&report(Some(1), "", "Verify error: Invalid response"));
        assert_eq!(
            class,
            Classification::Failure("exit code 1: Verify error: Invalid response".to_string())
        );
    }

    #[test]
    fn test_stdout_marker_ignored_when_stderr_has_error() {
        let class = classify(&report(
            Some(1),
            "[Mon Oct 19] Domains not changed.",
            "Verify error: 403 Forbidden",
        ));
        assert_eq!(
            class,
            Classification::Failure("exit code 1: Verify error: 403 Forbidden".to_string())
        );
    }

    #[test]
    fn test_nonzero_silent_is_failure() {
        assert_eq!(
            classify(&report(Some(1), "", "")),
            Classification::Failure("exit code 1".to_string())
        );
    }

    #[test]
    fn test_zero_exit_with_unrecognized_stderr_is_failure() {
        let class = classify(&report(Some(0), "ok", "rate limited: too many certificates"));
        assert!(matches!(class, Classification::Failure(ref d) if d.contains("rate limited")));
    }

    #[test]
    fn test_signal_termination() {
        assert_eq!(
            classify(&report(None, "", "")),
            Classification::Failure("terminated by signal".to_string())
        );
    }
}
