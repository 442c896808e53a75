//! Suite state shared between separate `audit-assert` runs.
//!
//! A shell-driven suite calls the binary once per step, so whether an earlier
//! verification timed out has to outlive the process. It is kept in a small
//! JSON file until `teardown` removes it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteState {
    /// An earlier verification timed out; its records may still arrive.
    #[serde(default)]
    pub poisoned: bool,
}

pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    /// Use `explicit` if given, otherwise `<cache dir>/audit-assert/state.json`.
    pub fn resolve(explicit: Option<&Path>) -> Self {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("audit-assert/state.json"),
        };
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is a clean state.
    pub fn load(&self) -> Result<SuiteState> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(SuiteState::default()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read state {}", self.path.display()));
            }
        };
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse state {}", self.path.display()))
    }

    pub fn save(&self, state: &SuiteState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(&self.path, serde_json::to_string(state)?)
            .with_context(|| format!("failed to write state {}", self.path.display()))
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("failed to remove state {}", self.path.display()))
            }
        }
    }
}
