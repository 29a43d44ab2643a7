//! Store runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into the
//! store. Request paths never read environment variables.
//!
//! Recognised variables:
//! - `HOSPITAL_DB_PATH`: database file; unset means a private in-memory store.
//! - `HOSPITAL_APPOINTMENT_FETCH`: `eager` (default) or `lazy`.
//! - `HOSPITAL_PAGE_SIZE_DEFAULT` / `HOSPITAL_PAGE_SIZE_MAX`: list page policy.
//! - `HOSPITAL_LOG_LEVEL`: `trace|debug|info|warn|error`.
//! - `HOSPITAL_LOG_DIR`: absolute directory for rolling log files; unset
//!   disables file logging.

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::logging::default_log_level;
use crate::repo::entity::FetchMode;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DB_PATH: &str = "HOSPITAL_DB_PATH";
pub const ENV_APPOINTMENT_FETCH: &str = "HOSPITAL_APPOINTMENT_FETCH";
pub const ENV_PAGE_SIZE_DEFAULT: &str = "HOSPITAL_PAGE_SIZE_DEFAULT";
pub const ENV_PAGE_SIZE_MAX: &str = "HOSPITAL_PAGE_SIZE_MAX";
pub const ENV_LOG_LEVEL: &str = "HOSPITAL_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "HOSPITAL_LOG_DIR";

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    InvalidValue { key: &'static str, value: String },
    /// Page policy default is zero or above the maximum.
    InvalidPagePolicy { default_size: u32, max_size: u32 },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value } => write!(f, "invalid value `{value}` for {key}"),
            Self::InvalidPagePolicy {
                default_size,
                max_size,
            } => write!(
                f,
                "page size default {default_size} must be between 1 and max {max_size}"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Deployment policy for list page sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePolicy {
    default_size: u32,
    max_size: u32,
}

impl PagePolicy {
    pub fn new(default_size: u32, max_size: u32) -> Result<Self, ConfigError> {
        if default_size == 0 || default_size > max_size {
            return Err(ConfigError::InvalidPagePolicy {
                default_size,
                max_size,
            });
        }
        Ok(Self {
            default_size,
            max_size,
        })
    }

    pub fn default_size(&self) -> u32 {
        self.default_size
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    /// Missing or zero sizes fall back to the default; larger sizes clamp to
    /// the maximum.
    pub fn normalize(&self, requested: Option<u32>) -> u32 {
        match requested {
            None | Some(0) => self.default_size,
            Some(size) => size.min(self.max_size),
        }
    }
}

impl Default for PagePolicy {
    fn default() -> Self {
        Self {
            default_size: DEFAULT_PAGE_SIZE,
            max_size: MAX_PAGE_SIZE,
        }
    }
}

/// Store configuration resolved at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    db_path: Option<PathBuf>,
    appointment_fetch: FetchMode,
    page_policy: PagePolicy,
    log_level: String,
    log_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            appointment_fetch: FetchMode::default(),
            page_policy: PagePolicy::default(),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl StoreConfig {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        config.db_path = read(ENV_DB_PATH).map(PathBuf::from);
        config.log_dir = read(ENV_LOG_DIR).map(PathBuf::from);
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level;
        }

        if let Some(value) = read(ENV_APPOINTMENT_FETCH) {
            config.appointment_fetch =
                FetchMode::parse(&value).ok_or(ConfigError::InvalidValue {
                    key: ENV_APPOINTMENT_FETCH,
                    value,
                })?;
        }

        let default_size = parse_u32(ENV_PAGE_SIZE_DEFAULT, read(ENV_PAGE_SIZE_DEFAULT))?
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let max_size =
            parse_u32(ENV_PAGE_SIZE_MAX, read(ENV_PAGE_SIZE_MAX))?.unwrap_or(MAX_PAGE_SIZE);
        config.page_policy = PagePolicy::new(default_size, max_size)?;

        Ok(config)
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    pub fn with_appointment_fetch(mut self, fetch: FetchMode) -> Self {
        self.appointment_fetch = fetch;
        self
    }

    pub fn with_page_policy(mut self, policy: PagePolicy) -> Self {
        self.page_policy = policy;
        self
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub fn appointment_fetch(&self) -> FetchMode {
        self.appointment_fetch
    }

    pub fn page_policy(&self) -> PagePolicy {
        self.page_policy
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }

    /// Opens the configured database with migrations applied.
    pub fn open_db(&self) -> DbResult<Connection> {
        match self.db_path.as_deref() {
            Some(path) => open_db(path),
            None => open_db_in_memory(),
        }
    }
}

fn parse_u32(key: &'static str, value: Option<String>) -> Result<Option<u32>, ConfigError> {
    value
        .map(|value| {
            value
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidValue { key, value })
        })
        .transpose()
}
