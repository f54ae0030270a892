use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::{error, info, log};
use std::fs;

mod cli;

use acmewarden::config::Config;
use acmewarden::daemon::{DaemonContext, DomainStatus, PassStatus};
use acmewarden::domain::{DomainEntry, VerificationResult};
use acmewarden::policy;
use cli::Cli;
use cli::commands::Commands;

fn setup_logging(config: &Config, verbose: bool) -> Result<()> {
    let log_file = config.log_path();

    // Create log directory
    if let Some(log_dir) = log_file.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let level = if verbose {
        "debug".to_string()
    } else {
        config.log_level.clone().unwrap_or_else(|| "info".to_string())
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: &Cli, config: Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    let context = DaemonContext::new(config).context("Failed to initialize components")?;

    match cli.command.clone().unwrap_or(Commands::Run) {
        Commands::Run => handle_run_command(&context).await,
        Commands::Once => handle_once_command(&context).await,
        Commands::Verify { domain } => handle_verify_command(&context, &domain).await,
        Commands::List => handle_list_command(&context),
    }
}

async fn handle_run_command(context: &DaemonContext) -> Result<()> {
    let domains = context
        .load_domains()
        .context("Cannot read domain list at startup")?;
    info!("Managing {} domains", domains.len());
    println!(
        "{} {} domains from {}",
        "Watching:".green(),
        domains.len(),
        context.config.domains_file.display()
    );

    context
        .run_daemon(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Cannot listen for Ctrl-C, stop the daemon with a signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
        .context("Daemon failed")?;
    Ok(())
}

async fn handle_once_command(context: &DaemonContext) -> Result<()> {
    match context.run_once().await {
        PassStatus::Completed(report) => {
            for domain in &report.domains {
                let status = domain.status();
                let label = match status {
                    DomainStatus::Issued => status.to_string().green(),
                    DomainStatus::AlreadyValid => status.to_string().cyan(),
                    DomainStatus::Failed => status.to_string().red(),
                    DomainStatus::Unverified => status.to_string().yellow(),
                };
                let detail = match &domain.outcome {
                    Some(outcome) => outcome.to_string(),
                    None => domain.verification.base.to_string(),
                };
                println!("{:<40} {:<14} {}", domain.domain, label, detail);
            }
            println!("{}", report.summary());
            Ok(())
        }
        PassStatus::Aborted(reason) => Err(eyre!("Pass aborted: {}", reason)),
        PassStatus::Busy => Err(eyre!("Another pass is already running")),
    }
}

fn print_result(result: &VerificationResult) {
    let mark = |ok: bool| if ok { "ok".green() } else { "FAIL".red() };
    println!(
        "  {:<40} IPv4 {:<6} IPv6 {}",
        result.domain,
        mark(result.http_ok),
        mark(result.ipv6_ok)
    );
}

async fn handle_verify_command(context: &DaemonContext, domain: &str) -> Result<()> {
    let entry = DomainEntry::new(domain).context("Invalid domain")?;
    info!("Verifying {} on request", entry.domain);
    println!("{} {}", "Verifying:".green(), entry.domain);

    let verification = context.orchestrator.verify_entry(&entry).await;
    print_result(&verification.base);
    print_result(&verification.www);

    match policy::decide(&verification) {
        Some(decision) => println!("{} {}", "Would certify:".green(), decision),
        None => println!("{} base domain failed verification", "Would skip:".red()),
    }
    Ok(())
}

fn handle_list_command(context: &DaemonContext) -> Result<()> {
    let domains = context.load_domains().context("Cannot read domain list")?;
    println!(
        "{} {} ({} domains)",
        "Domain list:".green(),
        context.config.domains_file.display(),
        domains.len()
    );
    for entry in &domains {
        println!("  {} (+ {})", entry.domain, entry.www());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let (config, notes) = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging before anything else runs
    setup_logging(&config, cli.is_verbose()).context("Failed to setup logging")?;
    for note in notes {
        log!(note.level, "{}", note.message);
    }

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, config).await.context("Application failed")?;

    Ok(())
}
