//! Monitor configuration.
//!
//! Values resolve in three layers: built-in defaults, an optional JSON config
//! file, then command-line flags. Credentials never live here; notifiers read
//! them from the environment.
use crate::cli::ConfigArgs;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SOURCE_URL: &str = "https://reformlacharter.lacity.gov/public-events";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_REPORT_PATH: &str = "docs/index.html";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SMTP_HOST: &str = "smtp.mailgun.org";
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub source_url: String,
    pub data_dir: PathBuf,
    pub report_path: PathBuf,
    pub fetch_timeout: Duration,
    pub email_enabled: bool,
    pub ticket_enabled: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            report_path: PathBuf::from(DEFAULT_REPORT_PATH),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            email_enabled: false,
            ticket_enabled: false,
            smtp_host: DEFAULT_SMTP_HOST.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
        }
    }
}

/// On-disk config; every field is optional and overrides the default.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub source_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
    pub fetch_timeout_secs: Option<u64>,
    pub email_enabled: Option<bool>,
    pub ticket_enabled: Option<bool>,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
}

/// Load a JSON config file.
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let file: ConfigFile = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    Ok(file)
}

impl MonitorConfig {
    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(url) = file.source_url {
            self.source_url = url;
        }
        if let Some(dir) = file.data_dir {
            self.data_dir = dir;
        }
        if let Some(path) = file.report_path {
            self.report_path = path;
        }
        if let Some(secs) = file.fetch_timeout_secs {
            self.fetch_timeout = Duration::from_secs(secs);
        }
        if let Some(enabled) = file.email_enabled {
            self.email_enabled = enabled;
        }
        if let Some(enabled) = file.ticket_enabled {
            self.ticket_enabled = enabled;
        }
        if let Some(host) = file.smtp_host {
            self.smtp_host = host;
        }
        if let Some(port) = file.smtp_port {
            self.smtp_port = port;
        }
    }

    fn apply_args(&mut self, args: &ConfigArgs) {
        if let Some(url) = &args.url {
            self.source_url = url.clone();
        }
        if let Some(dir) = &args.data_dir {
            self.data_dir = dir.clone();
        }
        if let Some(path) = &args.report {
            self.report_path = path.clone();
        }
        if let Some(secs) = args.timeout_secs {
            self.fetch_timeout = Duration::from_secs(secs);
        }
    }
}

/// Resolve defaults, the optional config file, and flags into a validated config.
pub fn resolve_config(args: &ConfigArgs) -> Result<MonitorConfig> {
    let config = merge_config(args)?;
    validate_config(&config)?;
    Ok(config)
}

/// Like [`resolve_config`], with `--email`/`--ticket` applied before validation.
///
/// The flags can only enable a notifier that the file leaves disabled.
pub fn resolve_run_config(args: &ConfigArgs, email: bool, ticket: bool) -> Result<MonitorConfig> {
    let mut config = merge_config(args)?;
    config.email_enabled |= email;
    config.ticket_enabled |= ticket;
    validate_config(&config)?;
    Ok(config)
}

fn merge_config(args: &ConfigArgs) -> Result<MonitorConfig> {
    let mut config = MonitorConfig::default();
    if let Some(path) = &args.config {
        config.apply_file(load_config_file(path)?);
    }
    config.apply_args(args);
    Ok(config)
}

/// Reject values that would only fail later, mid-run.
pub fn validate_config(config: &MonitorConfig) -> Result<()> {
    let url = config.source_url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(anyhow!(
            "source_url must be an http(s) URL (got {:?})",
            config.source_url
        ));
    }
    if config.fetch_timeout.is_zero() {
        return Err(anyhow!("fetch timeout must be at least one second"));
    }
    if config.data_dir.as_os_str().is_empty() {
        return Err(anyhow!("data_dir must be non-empty"));
    }
    if config.report_path.file_name().is_none() {
        return Err(anyhow!(
            "report_path must name a file (got {})",
            config.report_path.display()
        ));
    }
    if config.email_enabled && (config.smtp_host.trim().is_empty() || config.smtp_port == 0) {
        return Err(anyhow!("email notifications need smtp_host and smtp_port"));
    }
    Ok(())
}
