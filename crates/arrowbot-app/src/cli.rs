//! CLI argument definitions for the Arrowbot server.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use arrowbot_core::config::ArrowConfig;

/// Arrowbot - the Arrow Conveyancing assistant API server.
#[derive(Parser, Debug, Default)]
#[command(name = "arrowbot", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Address to bind.
    #[arg(long = "host")]
    pub host: Option<String>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// SQLite file for the conversation log.
    #[arg(short = 'd', long = "db-path")]
    pub db_path: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > ARROWBOT_CONFIG env var > ./arrowbot.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        self.resolve_config_path_from(|key| std::env::var(key).ok())
    }

    fn resolve_config_path_from<F>(&self, lookup: F) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Some(p) = lookup("ARROWBOT_CONFIG").filter(|p| !p.trim().is_empty()) {
            return PathBuf::from(p);
        }
        PathBuf::from("arrowbot.toml")
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > ARROWBOT_LOG env var > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.resolve_log_level_from(config_level, |key| std::env::var(key).ok())
    }

    fn resolve_log_level_from<F>(&self, config_level: &str, lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ref level) = self.log_level {
            return level.clone();
        }
        lookup("ARROWBOT_LOG")
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| config_level.to_string())
    }

    /// Overlay the flags onto a config that already has env applied.
    pub fn apply(&self, config: &mut ArrowConfig) {
        if let Some(ref host) = self.host {
            config.general.host = host.clone();
        }
        if let Some(port) = self.port {
            config.general.port = port;
        }
        if let Some(ref path) = self.db_path {
            config.storage.db_path = Some(path.to_string_lossy().to_string());
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
    }
}
