use anyhow::{Context, Result};
use audit_assert::{AuditConfig, RawAuditConfig};
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user file, explicit file, environment)
    pub fn load(explicit: Option<&Path>) -> Result<AuditConfig> {
        let mut raw = RawAuditConfig::default();

        // Layer 1: User config
        if let Some(user_path) = Self::user_config_path()
            && user_path.exists()
        {
            raw = raw.merge(Self::load_layer(&user_path)?);
        }

        // Layer 2: Config file given on the command line
        if let Some(path) = explicit {
            raw = raw.merge(Self::load_layer(path)?);
        }

        // Layer 3: Environment
        raw = raw.merge(RawAuditConfig::from_env()?);

        Ok(raw.finalize()?)
    }

    /// Get user config path
    ///
    /// Returns `$XDG_CONFIG_HOME/audit-assert/config.toml` if set, otherwise
    /// `~/.config/audit-assert/config.toml`.
    pub fn user_config_path() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            Some(PathBuf::from(xdg_config).join("audit-assert/config.toml"))
        } else {
            dirs::home_dir().map(|home| home.join(".config/audit-assert/config.toml"))
        }
    }

    fn load_layer(path: &Path) -> Result<RawAuditConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        RawAuditConfig::from_toml_str(&contents)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::time::Duration;
    use tempfile::TempDir;

    const ENV_VARS: [&str; 5] = [
        "XDG_CONFIG_HOME",
        "AUDIT_LOG_FILE",
        "AUDIT_ROLLED_OVER_LOG_FILE",
        "AUDIT_POLL_INTERVAL",
        "AUDIT_TIMEOUT",
    ];

    /// Point the user config at an empty directory and clear overrides.
    fn isolate(dir: &TempDir) {
        // SAFETY: tests touching the environment are serialized.
        unsafe {
            for var in ENV_VARS {
                std::env::remove_var(var);
            }
            std::env::set_var("XDG_CONFIG_HOME", dir.path().join("xdg"));
        }
    }

    fn restore() {
        // SAFETY: tests touching the environment are serialized.
        unsafe {
            for var in ENV_VARS {
                std::env::remove_var(var);
            }
        }
    }

    #[test]
    #[serial]
    fn test_load_explicit_file() {
        let dir = TempDir::new().unwrap();
        isolate(&dir);
        let path = dir.path().join("audit.toml");
        std::fs::write(
            &path,
            "log_file = \"/logs/audit.json\"\nrolled_over_log_file = \"/logs/old.json\"\ntimeout = \"3s\"\n",
        )
        .unwrap();

        let config = ConfigLoader::load(Some(&path)).unwrap();
        restore();

        assert_eq!(config.log_file, PathBuf::from("/logs/audit.json"));
        assert_eq!(config.timeout, Duration::from_secs(3));
    }

    #[test]
    #[serial]
    fn test_env_overrides_files() {
        let dir = TempDir::new().unwrap();
        isolate(&dir);
        let user_dir = dir.path().join("xdg/audit-assert");
        std::fs::create_dir_all(&user_dir).unwrap();
        std::fs::write(
            user_dir.join("config.toml"),
            "log_file = \"/user/audit.json\"\nrolled_over_log_file = \"/user/old.json\"\n",
        )
        .unwrap();
        // SAFETY: tests touching the environment are serialized.
        unsafe {
            std::env::set_var("AUDIT_LOG_FILE", "/env/audit.json");
        }

        let config = ConfigLoader::load(None).unwrap();
        restore();

        assert_eq!(config.log_file, PathBuf::from("/env/audit.json"));
        assert_eq!(config.rolled_over_log_file, PathBuf::from("/user/old.json"));
    }

    #[test]
    #[serial]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        isolate(&dir);

        let result = ConfigLoader::load(Some(&dir.path().join("nope.toml")));
        restore();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }

    #[test]
    #[serial]
    fn test_missing_log_file_setting() {
        let dir = TempDir::new().unwrap();
        isolate(&dir);

        let result = ConfigLoader::load(None);
        restore();

        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("AUDIT_LOG_FILE must be set")
        );
    }

    #[test]
    #[serial]
    fn test_user_config_path_respects_xdg() {
        // SAFETY: tests touching the environment are serialized.
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", "/custom/config");
        }
        let path = ConfigLoader::user_config_path();
        restore();

        assert_eq!(
            path,
            Some(PathBuf::from("/custom/config/audit-assert/config.toml"))
        );
    }
}
