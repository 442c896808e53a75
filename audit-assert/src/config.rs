//! Configuration for audit log verification.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::expectation::RealmPolicy;

/// Environment variable naming the active audit log.
pub const LOG_FILE_ENV: &str = "AUDIT_LOG_FILE";

/// Environment variable naming the rolled-over (previous day) audit log.
pub const ROLLED_OVER_LOG_FILE_ENV: &str = "AUDIT_ROLLED_OVER_LOG_FILE";

/// Environment variable overriding the polling interval, e.g. `250ms`.
pub const POLL_INTERVAL_ENV: &str = "AUDIT_POLL_INTERVAL";

/// Environment variable overriding the verification timeout, e.g. `30s`.
pub const TIMEOUT_ENV: &str = "AUDIT_TIMEOUT";

pub const DEFAULT_ADMIN_PRINCIPAL: &str = "test_admin";
pub const DEFAULT_ADMIN_REALM: &str = "default_file";
pub const DEFAULT_NATIVE_REALM: &str = "default_native";

/// Internal index names the administrator can reach but which never show up
/// in administrator-facing results.
pub const DEFAULT_RESTRICTED_INDICES: [&str; 3] = [".security", ".security-6", ".security-7"];

/// Configuration for an audit verification session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Path to the active audit log.
    pub log_file: PathBuf,

    /// Path the active log is renamed to when it rolls over.
    pub rolled_over_log_file: PathBuf,

    /// Interval between verification attempts.
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Overall deadline for a single verification.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Principal the test cluster's administrative client runs as.
    #[serde(default = "default_admin_principal")]
    pub admin_principal: String,

    /// Realm that authenticates the administrative principal.
    #[serde(default = "default_admin_realm")]
    pub admin_realm: String,

    /// Realm that authenticates every user created by the tests.
    #[serde(default = "default_native_realm")]
    pub native_realm: String,

    /// Index names scrubbed from the administrator's records.
    #[serde(default = "default_restricted_indices")]
    pub restricted_indices: Vec<String>,
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_admin_principal() -> String {
    DEFAULT_ADMIN_PRINCIPAL.to_string()
}

fn default_admin_realm() -> String {
    DEFAULT_ADMIN_REALM.to_string()
}

fn default_native_realm() -> String {
    DEFAULT_NATIVE_REALM.to_string()
}

fn default_restricted_indices() -> Vec<String> {
    DEFAULT_RESTRICTED_INDICES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl AuditConfig {
    /// Create a config for the given log pair with every other field defaulted.
    pub fn new(log_file: impl Into<PathBuf>, rolled_over_log_file: impl Into<PathBuf>) -> Self {
        Self {
            log_file: log_file.into(),
            rolled_over_log_file: rolled_over_log_file.into(),
            poll_interval: default_poll_interval(),
            timeout: default_timeout(),
            admin_principal: default_admin_principal(),
            admin_realm: default_admin_realm(),
            native_realm: default_native_realm(),
            restricted_indices: default_restricted_indices(),
        }
    }

    /// Load the config from the process environment.
    pub fn from_env() -> Result<Self> {
        RawAuditConfig::from_env()?.finalize()
    }

    /// Parse a complete config from TOML.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        RawAuditConfig::from_toml_str(contents)?.finalize()
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_admin_principal(mut self, principal: impl Into<String>) -> Self {
        self.admin_principal = principal.into();
        self
    }

    #[must_use]
    pub fn with_restricted_indices<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.restricted_indices = names.into_iter().map(Into::into).collect();
        self
    }

    /// Realms expected for the administrator and for test users.
    pub fn realm_policy(&self) -> RealmPolicy {
        RealmPolicy {
            admin_principal: self.admin_principal.clone(),
            admin_realm: self.admin_realm.clone(),
            native_realm: self.native_realm.clone(),
        }
    }
}

/// One configuration layer where every field is optional.
///
/// Layers are merged with [`RawAuditConfig::merge`] and turned into an
/// [`AuditConfig`] by [`RawAuditConfig::finalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawAuditConfig {
    pub log_file: Option<PathBuf>,
    pub rolled_over_log_file: Option<PathBuf>,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
    pub admin_principal: Option<String>,
    pub admin_realm: Option<String>,
    pub native_realm: Option<String>,
    pub restricted_indices: Option<Vec<String>>,
}

impl RawAuditConfig {
    /// Read the layer supplied through environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_file: std::env::var_os(LOG_FILE_ENV).map(PathBuf::from),
            rolled_over_log_file: std::env::var_os(ROLLED_OVER_LOG_FILE_ENV).map(PathBuf::from),
            poll_interval: duration_from_env(POLL_INTERVAL_ENV)?,
            timeout: duration_from_env(TIMEOUT_ENV)?,
            ..Self::default()
        })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))
    }

    /// Overlay `overlay` on top of `self`; values set in the overlay win.
    #[must_use]
    pub fn merge(self, overlay: RawAuditConfig) -> RawAuditConfig {
        RawAuditConfig {
            log_file: overlay.log_file.or(self.log_file),
            rolled_over_log_file: overlay.rolled_over_log_file.or(self.rolled_over_log_file),
            poll_interval: overlay.poll_interval.or(self.poll_interval),
            timeout: overlay.timeout.or(self.timeout),
            admin_principal: overlay.admin_principal.or(self.admin_principal),
            admin_realm: overlay.admin_realm.or(self.admin_realm),
            native_realm: overlay.native_realm.or(self.native_realm),
            restricted_indices: overlay.restricted_indices.or(self.restricted_indices),
        }
    }

    /// Apply defaults; both log paths are mandatory.
    pub fn finalize(self) -> Result<AuditConfig> {
        let log_file = self.log_file.ok_or(Error::MissingSetting {
            var: LOG_FILE_ENV,
            hint: "It should be the absolute path to the audit log file written by the \
                   cluster under test with audit logging enabled.",
        })?;
        let rolled_over_log_file = self.rolled_over_log_file.ok_or(Error::MissingSetting {
            var: ROLLED_OVER_LOG_FILE_ENV,
            hint: "It should be the path the audit log is renamed to when it rolls over.",
        })?;

        if self.poll_interval.is_some_and(|d| d.is_zero()) {
            return Err(Error::Config("poll_interval must be greater than zero".into()));
        }

        Ok(AuditConfig {
            log_file,
            rolled_over_log_file,
            poll_interval: self.poll_interval.unwrap_or_else(default_poll_interval),
            timeout: self.timeout.unwrap_or_else(default_timeout),
            admin_principal: self.admin_principal.unwrap_or_else(default_admin_principal),
            admin_realm: self.admin_realm.unwrap_or_else(default_admin_realm),
            native_realm: self.native_realm.unwrap_or_else(default_native_realm),
            restricted_indices: self
                .restricted_indices
                .unwrap_or_else(default_restricted_indices),
        })
    }
}

fn duration_from_env(var: &'static str) -> Result<Option<Duration>> {
    let Ok(value) = std::env::var(var) else {
        return Ok(None);
    };
    humantime_serde::re::humantime::parse_duration(&value)
        .map(Some)
        .map_err(|e| Error::Config(format!("{var}={value:?}: {e}")))
}
