//! Runtime configuration.
//!
//! Settings come from three places, highest precedence first: command-line
//! flags (each also readable from a `HOOKFEED_*` environment variable), the
//! TOML config file, and built-in defaults.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use ingest::StoreFailurePolicy;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = ".hookfeed/config.toml";
pub const DEFAULT_STORE_PATH: &str = ".hookfeed/events.jsonl";

#[derive(Parser, Debug)]
#[command(name = "hookfeed", about = "Receives GitHub webhooks and serves a feed of recent repository activity")]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(long, env = "HOOKFEED_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Address to listen on (host:port)
    #[arg(long, env = "HOOKFEED_BIND")]
    pub bind: Option<SocketAddr>,

    /// Storage backend
    #[arg(long, env = "HOOKFEED_STORE", value_enum)]
    pub store: Option<StoreKind>,

    /// File used by the jsonl store
    #[arg(long, env = "HOOKFEED_STORE_PATH")]
    pub store_path: Option<PathBuf>,

    /// What the webhook sender sees when an event cannot be stored (log_only, fail_response)
    #[arg(long, env = "HOOKFEED_STORE_FAILURE_POLICY")]
    pub store_failure_policy: Option<StoreFailurePolicy>,

    /// Log output format
    #[arg(long, env = "HOOKFEED_LOG_FORMAT", value_enum)]
    pub log_format: Option<LogFormat>,

    /// OTLP collector endpoint; spans are exported when set
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Keep events in memory; they are lost on restart.
    Memory,
    /// Append events to a JSON-lines file.
    #[default]
    Jsonl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable, for local runs.
    Pretty,
}

/// Contents of the config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub bind: Option<SocketAddr>,
    pub store: Option<StoreKind>,
    pub store_path: Option<PathBuf>,
    pub store_failure_policy: Option<StoreFailurePolicy>,
    pub log_format: Option<LogFormat>,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigFile {
    /// Loads the file at `path`. A missing file yields the empty config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub bind: SocketAddr,
    pub store: StoreKind,
    pub store_path: PathBuf,
    pub store_failure_policy: StoreFailurePolicy,
    pub log_format: LogFormat,
    pub otlp_endpoint: Option<String>,
}

impl Settings {
    /// Reads the config file named by `cli` and merges it under the flags.
    pub fn load(cli: Cli) -> Result<Self, ConfigError> {
        let file = ConfigFile::load(&cli.config)?;
        Ok(Self::merge(cli, file))
    }

    pub fn merge(cli: Cli, file: ConfigFile) -> Self {
        Self {
            bind: cli.bind.or(file.bind).unwrap_or_else(default_bind),
            store: cli.store.or(file.store).unwrap_or_default(),
            store_path: cli
                .store_path
                .or(file.store_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH)),
            store_failure_policy: cli
                .store_failure_policy
                .or(file.store_failure_policy)
                .unwrap_or_default(),
            log_format: cli.log_format.or(file.log_format).unwrap_or_default(),
            otlp_endpoint: cli.otlp_endpoint.or(file.otlp_endpoint),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5000))
}
