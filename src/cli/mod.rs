//! CLI module for acmewarden - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for running the daemon,
//! a single pass, and read-only inspection.

pub mod commands;

pub use commands::Cli;
