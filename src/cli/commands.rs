//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: the daemon (startup pass, hourly schedule, domain list watch)
//! - once: a single pass
//! - verify: reachability checks for one domain, no issuance
//! - list: the managed domains

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// acmewarden - dual-stack domain verification and certificate renewal
#[derive(Parser, Debug)]
#[command(name = "acmewarden")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the daemon: pass at startup, on schedule, and on domain list changes
    Run,

    /// Run a single pass and exit
    Once,

    /// Check one domain and its www variant over IPv4 and IPv6 without issuing
    Verify {
        /// Base domain to check
        domain: String,
    },

    /// List managed domains
    List,
}
