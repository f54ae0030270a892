use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
    pub domains_file: PathBuf,
    pub challenge: ChallengeConfig,
    pub acme: AcmeConfig,
    pub publish: PublishConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeConfig {
    pub path: String,
    pub expected_token: String,
    pub port: u16,
    pub timeout_ms: u64,
    pub dns_timeout_ms: u64,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            path: "/.well-known/acme-challenge/test-file.txt".to_string(),
            expected_token: "test".to_string(),
            port: 80,
            timeout_ms: 5000,
            dns_timeout_ms: 3000,
        }
    }
}

impl ChallengeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.dns_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcmeConfig {
    pub command: PathBuf,
    pub leading_args: Vec<String>,
    pub webroot: String,
    pub cert_home: PathBuf,
    pub keylength: String,
    pub timeout_ms: u64,
    pub transcript: Option<PathBuf>,
}

impl Default for AcmeConfig {
    fn default() -> Self {
        Self {
            command: PathBuf::from("~/.acme.sh/acme.sh"),
            leading_args: Vec::new(),
            webroot: "/var/www/html".to_string(),
            cert_home: PathBuf::from("~/.acme.sh"),
            keylength: "2048".to_string(),
            timeout_ms: 300000,
            transcript: None,
        }
    }
}

impl AcmeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Webroot for a certificate whose primary subject is `primary`
    pub fn webroot_for(&self, primary: &str) -> String {
        expand_tilde(Path::new(&self.webroot.replace("{domain}", primary)))
            .to_string_lossy()
            .into_owned()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub target_root: PathBuf,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            target_root: PathBuf::from("/etc/ssl/acmewarden"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_secs: u64,
    pub run_at_start: bool,
    pub watch_domains_file: bool,
    pub debounce_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            run_at_start: true,
            watch_domains_file: true,
            debounce_ms: 500,
        }
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            log_file: None,
            domains_file: PathBuf::from("domains.json"),
            challenge: ChallengeConfig::default(),
            acme: AcmeConfig::default(),
            publish: PublishConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

/// Message produced while loading configuration.
///
/// Configuration loads before the logger exists, so these are handed back
/// to the caller and emitted once logging is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadNote {
    pub level: log::Level,
    pub message: String,
}

impl LoadNote {
    fn info(message: impl Into<String>) -> Self {
        Self {
            level: log::Level::Info,
            message: message.into(),
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            level: log::Level::Warn,
            message: message.into(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<(Self, Vec<LoadNote>)> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            let config = Self::load_from_file(path)
                .context(format!("Failed to load config from {}", path.display()))?;
            let note = LoadNote::info(format!("Loaded config from: {}", path.display()));
            return Ok((config, vec![note]));
        }

        Ok(Self::load_first(&Self::candidates()))
    }

    /// Default lookup locations, most specific first
    fn candidates() -> Vec<PathBuf> {
        let project_name = env!("CARGO_PKG_NAME");
        let mut candidates = Vec::new();

        // Primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join(project_name).join(format!("{}.yml", project_name)));
        }

        // Fallback location: ./<project>.yml
        candidates.push(PathBuf::from(format!("{}.yml", project_name)));
        candidates
    }

    /// First candidate that exists and parses; defaults if none does
    fn load_first(candidates: &[PathBuf]) -> (Self, Vec<LoadNote>) {
        let mut notes = Vec::new();
        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => {
                    notes.push(LoadNote::info(format!("Loaded config from: {}", path.display())));
                    return (config, notes);
                }
                Err(e) => notes.push(LoadNote::warn(format!(
                    "Failed to load config from {}: {:#}",
                    path.display(),
                    e
                ))),
            }
        }

        // No usable config file found, use defaults
        notes.push(LoadNote::info("No config file found, using defaults"));
        (Self::default(), notes)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Main log file, under the local data dir unless configured
    pub fn log_path(&self) -> PathBuf {
        match &self.log_file {
            Some(path) => expand_tilde(path),
            None => default_data_dir().join("logs").join("acmewarden.log"),
        }
    }

    /// Issuance transcript, next to the main log unless configured
    pub fn transcript_path(&self) -> PathBuf {
        match &self.acme.transcript {
            Some(path) => expand_tilde(path),
            None => self
                .log_path()
                .parent()
                .map(|dir| dir.join("issuance.log"))
                .unwrap_or_else(|| PathBuf::from("issuance.log")),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("acmewarden")
}

/// Expand a leading `~/` to the home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
