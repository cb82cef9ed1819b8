use std::io::Error as IoError;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating the configuration.
///
/// Every variant is fatal at start-up.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: IoError,
    },

    #[error("failed to parse config: {0}")]
    ParseFailed(#[from] toml::de::Error),

    #[error("no config path available, set XDG_CONFIG_HOME or HOME or pass --conf-file")]
    ConfigPathUnavailable,

    #[error("no sites configured")]
    NoSites,

    #[error("invalid site '{url}': {reason}")]
    InvalidSite { url: String, reason: String },

    #[error("invalid storage configuration: {0}")]
    InvalidStorage(String),

    #[error("invalid setting '{name}': {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}

/// Errors raised by a result sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("invalid table name '{0}'")]
    InvalidTableName(String),

    #[error("invalid database target: {0}")]
    InvalidTarget(String),

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: IoError,
    },

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("malformed row in '{table}': {reason}")]
    MalformedRow { table: String, reason: String },

    #[error("malformed record on line {line}: {source}")]
    MalformedRecord {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl SinkError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: IoError) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// Top-level error returned by the application shell.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("cannot open result sink: {0}")]
    Sink(#[from] SinkError),

    #[error("cannot build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
