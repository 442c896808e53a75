//! Baseline offsets into the active audit log.

use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};

/// Byte offset into an audit log file.
///
/// Only meaningful for the file it was captured against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogPosition(pub u64);

impl LogPosition {
    pub const START: LogPosition = LogPosition(0);

    pub fn bytes(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for LogPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capture how much of the log had been written before a test started.
///
/// A log that does not exist yet has a baseline of zero. A path that exists
/// but is not a regular file is a misconfigured environment and fails.
pub async fn capture_baseline(path: &Path) -> Result<LogPosition> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "audit log does not exist yet, baseline is 0");
            return Ok(LogPosition::START);
        }
        Err(source) => {
            return Err(Error::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    if !metadata.is_file() {
        return Err(Error::NotAPlainFile(path.to_path_buf()));
    }

    let position = LogPosition(metadata.len());
    debug!(path = %path.display(), baseline = position.0, "captured audit log baseline");
    Ok(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_has_zero_baseline() {
        let dir = TempDir::new().unwrap();
        let position = capture_baseline(&dir.path().join("audit.json"))
            .await
            .unwrap();
        assert_eq!(position, LogPosition::START);
    }

    #[tokio::test]
    async fn baseline_is_file_length() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.json");
        std::fs::write(&path, "{\"a\":1}\n{\"b\":2}\n").unwrap();

        let position = capture_baseline(&path).await.unwrap();
        assert_eq!(position.bytes(), 16);
    }

    #[tokio::test]
    async fn directory_is_not_a_plain_file() {
        let dir = TempDir::new().unwrap();
        let err = capture_baseline(dir.path()).await.unwrap_err();
        assert!(matches!(err, Error::NotAPlainFile(_)));
    }
}
