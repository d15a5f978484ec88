use crate::Result;
use crate::blizzard::{ClientOptions, PeriodPlan};
use crate::wow::RealmAliases;
use camino::Utf8Path;
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;

/// The default configuration TOML content, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../default_config.toml");

/// Configuration file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "ookstats.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub fetch: FetchConfig,

    pub periods: PeriodPlan,

    /// Region → (child slug → parent slug)
    #[serde(default)]
    pub merged_realms: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FetchConfig {
    /// Maximum requests in flight
    pub concurrency: usize,

    /// Outbound request pace
    pub requests_per_second: u32,

    /// Wall-clock limit for one HTTP call
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Attempts per request before giving up
    pub max_attempts: u32,

    /// Deadline for the three sub-fetches of one player profile
    #[serde(with = "humantime_serde")]
    pub profile_timeout: Duration,
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// An explicit path must exist; the implicit `ookstats.toml` may be absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation
    pub fn load(config_path: Option<&Utf8Path>) -> Result<Self> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading configuration file '{path}'"))?;
            (path.to_owned(), text)
        } else {
            let path = Utf8Path::new(DEFAULT_CONFIG_FILE).to_owned();
            match fs::read_to_string(&path) {
                Ok(text) => (path, text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Self::defaults(),
                Err(e) => return Err(e).into_app_err_with(|| format!("reading configuration file '{path}'")),
            }
        };

        let config: Self = toml::from_str(&text).into_app_err_with(|| format!("parsing configuration file '{final_path}'"))?;
        config.validate()?;

        Ok(config)
    }

    /// The embedded defaults
    ///
    /// # Errors
    ///
    /// Returns an error only if the embedded file is broken
    pub fn defaults() -> Result<Self> {
        toml::from_str(DEFAULT_CONFIG_TOML).into_app_err("parsing built-in configuration")
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error naming the first value out of range
    fn validate(&self) -> Result<()> {
        if self.fetch.concurrency == 0 {
            return Err(app_err!("fetch.concurrency must be at least 1"));
        }

        if self.fetch.requests_per_second == 0 {
            return Err(app_err!("fetch.requests_per_second must be at least 1"));
        }

        if self.fetch.max_attempts == 0 {
            return Err(app_err!("fetch.max_attempts must be at least 1"));
        }

        if self.periods.primary.trim().is_empty() {
            return Err(app_err!("periods.primary must not be empty"));
        }

        if self.periods.default.is_empty() {
            return Err(app_err!("periods.default must list at least one period"));
        }

        if let Some((region, _)) = self.periods.regions.iter().find(|(_, list)| list.is_empty()) {
            return Err(app_err!("periods.regions.{region} must list at least one period"));
        }

        Ok(())
    }

    #[must_use]
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            concurrency: self.fetch.concurrency,
            requests_per_second: self.fetch.requests_per_second,
            timeout: self.fetch.timeout,
            max_attempts: self.fetch.max_attempts,
            profile_timeout: self.fetch.profile_timeout,
            ..ClientOptions::default()
        }
    }

    #[must_use]
    pub fn realm_aliases(&self) -> RealmAliases {
        RealmAliases::new(&self.merged_realms)
    }
}
