use std::time::Duration;
use std::{env, fmt, fs, path};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;
use crate::monitoring::{RetryPolicy, SiteSpec, monitor::DEFAULT_MAX_RETRY};
use crate::validation::{
    validate_check_interval, validate_http_endpoint, validate_table_name, validate_timeout,
};

pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_TABLE_NAME: &str = "wsmon_results";

/// Raw configuration as read from the TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Retries after a failed attempt, shared by every site
    #[serde(default = "default_max_retry")]
    pub max_retry: u32,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Pause before each retry, zero for immediate retries
    #[serde(default)]
    pub retry_delay_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageConfig>,

    #[serde(default)]
    pub sites: Vec<SiteConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    pub url: String,

    #[serde(default = "default_check_interval")]
    pub check_interval: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Where terminal outcomes are persisted. Exactly one backend is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StorageConfig {
    Database(DatabaseTarget),
    File(FileTarget),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseTarget {
    /// Local database file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<path::PathBuf>,

    /// Remote database URL (`libsql://…`, `https://…`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    #[serde(default = "default_table_name")]
    pub table_name: String,
}

/// Resolved location of a database target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseLocation<'a> {
    Local(&'a path::Path),
    Remote { url: &'a str, auth_token: &'a str },
}

impl DatabaseTarget {
    pub fn local(path: impl Into<path::PathBuf>, table_name: impl Into<String>) -> Self {
        Self { path: Some(path.into()), url: None, auth_token: None, table_name: table_name.into() }
    }

    pub fn location(&self) -> Result<DatabaseLocation<'_>, String> {
        match (&self.path, &self.url) {
            (Some(path), None) => Ok(DatabaseLocation::Local(path)),
            (None, Some(url)) => Ok(DatabaseLocation::Remote {
                url,
                auth_token: self.auth_token.as_deref().unwrap_or_default(),
            }),
            (Some(_), Some(_)) => Err("set either `path` or `url` for the database, not both".into()),
            (None, None) => Err("the database needs a `path` or a `url`".into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTarget {
    pub path: path::PathBuf,
}

impl StorageConfig {
    /// Table name or file path, as it appears in records and logs
    pub fn target_name(&self) -> String {
        match self {
            StorageConfig::Database(db) => db.table_name.clone(),
            StorageConfig::File(file) => file.path.display().to_string(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            StorageConfig::Database(db) => {
                db.location().map_err(ConfigError::InvalidStorage)?;
                validate_table_name(&db.table_name).to_result().map_err(ConfigError::InvalidStorage)
            }
            StorageConfig::File(file) => {
                if file.path.as_os_str().is_empty() {
                    return Err(ConfigError::InvalidStorage("file path cannot be empty".into()));
                }
                Ok(())
            }
        }
    }
}

/// Validated settings handed to the monitoring engine.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub sites: Vec<SiteSpec>,
    pub retry_policy: RetryPolicy,
    pub request_timeout: Duration,
    pub storage: StorageConfig,
}

fn default_max_retry() -> u32 {
    DEFAULT_MAX_RETRY
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_check_interval() -> u64 {
    DEFAULT_CHECK_INTERVAL_SECS
}

fn default_table_name() -> String {
    DEFAULT_TABLE_NAME.to_string()
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/wsmon/config.toml or
/// $HOME/.config/...)
#[allow(deprecated)]
fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::ConfigPathUnavailable);
    };

    Ok(path.join("wsmon/config.toml"))
}

impl SiteConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), check_interval: DEFAULT_CHECK_INTERVAL_SECS, pattern: None }
    }

    fn resolve(&self) -> Result<SiteSpec, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidSite { url: self.url.clone(), reason };

        validate_http_endpoint(&self.url).to_result().map_err(invalid)?;
        validate_check_interval(self.check_interval).to_result().map_err(invalid)?;

        let pattern = self
            .pattern
            .as_deref()
            .filter(|pattern| !pattern.is_empty())
            .map(Regex::new)
            .transpose()
            .map_err(|e| invalid(format!("invalid pattern: {e}")))?;

        SiteSpec::new(self.url.clone(), Duration::from_secs(self.check_interval), pattern)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);
        let write_title_2 = write_title_indented(2);
        let write_2 = write_indented(2);

        writeln!(f, "Current Configuration State:")?;
        write_title_1(f, "Retry")?;
        write_1(f, "Max Retry", &self.max_retry)?;
        write_1(f, "Retry Delay (s)", &self.retry_delay_secs)?;
        write_1(f, "Request Timeout (s)", &self.request_timeout_secs)?;

        write_title_1(f, "Storage")?;
        match &self.storage {
            Some(StorageConfig::Database(db)) => {
                let location = match db.location() {
                    Ok(DatabaseLocation::Local(path)) => path.display().to_string(),
                    Ok(DatabaseLocation::Remote { url, .. }) => url.to_string(),
                    Err(e) => e,
                };
                write_1(f, "Kind", &"database")?;
                write_1(f, "Location", &location)?;
                write_1(f, "Table", &db.table_name)?;
            }
            Some(StorageConfig::File(file)) => {
                write_1(f, "Kind", &"file")?;
                write_1(f, "Path", &file.path.display())?;
            }
            None => write_1(f, "Kind", &"none")?,
        }

        write_title_1(f, "Sites")?;
        for site in &self.sites {
            write_title_2(f, &site.url)?;
            write_2(f, "Check Interval (s)", &site.check_interval)?;
            write_2(f, "Pattern", &site.pattern.as_deref().unwrap_or("None"))?;
        }

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Reads the specified path, or ~/.config/wsmon/config.toml when none
    /// is given. A missing file is an error.
    ///
    /// ```ignore
    /// let cfg = config::Config::from_config(None::<&path::Path>)?;
    /// println!("{}", cfg);
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        info!(path = %config_path.display(), "loading configuration");
        let raw_string = fs::read_to_string(&config_path)
            .map_err(|source| ConfigError::ReadFailed { path: config_path.clone(), source })?;

        Self::from_toml_str(&raw_string)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Select the file backend at `path`, replacing any configured storage.
    pub fn with_results_file(mut self, path: impl Into<path::PathBuf>) -> Self {
        self.storage = Some(StorageConfig::File(FileTarget { path: path.into() }));
        self
    }

    /// Validate everything and produce the settings the engine runs on.
    pub fn resolve(&self) -> Result<MonitorSettings, ConfigError> {
        validate_timeout(self.request_timeout_secs).to_result().map_err(|reason| {
            ConfigError::InvalidSetting { name: "request_timeout_secs", reason }
        })?;

        let storage = self.storage.clone().ok_or_else(|| {
            ConfigError::InvalidStorage("no [storage] section and no --results-file given".into())
        })?;
        storage.validate()?;

        if self.sites.is_empty() {
            return Err(ConfigError::NoSites);
        }
        let sites = self.sites.iter().map(SiteConfig::resolve).collect::<Result<Vec<_>, _>>()?;

        Ok(MonitorSettings {
            sites,
            retry_policy: RetryPolicy {
                max_retry: self.max_retry,
                retry_delay: Duration::from_secs(self.retry_delay_secs),
            },
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            storage,
        })
    }
}
