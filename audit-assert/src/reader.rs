//! Rotation-aware reading of the audit log.
//!
//! The cluster writes to an active log file that is occasionally renamed to a
//! rolled-over file, after which a fresh active file starts. A test that
//! straddles the rollover has to read the tail of the rolled-over file and
//! then the whole new active file as one ordered stream of lines.

use std::collections::VecDeque;
use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::offset::LogPosition;

/// The active audit log and the path it rolls over to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFiles {
    pub active: PathBuf,
    pub rolled_over: PathBuf,
}

impl LogFiles {
    pub fn new(active: impl Into<PathBuf>, rolled_over: impl Into<PathBuf>) -> Self {
        Self {
            active: active.into(),
            rolled_over: rolled_over.into(),
        }
    }
}

/// Whether the active log has been seen to roll over.
///
/// Rotation only goes one way, so once observed the flag stays set until the
/// owner resets it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotationState {
    observed: bool,
}

impl RotationState {
    pub fn observed(&self) -> bool {
        self.observed
    }

    pub fn mark_observed(&mut self) {
        if !self.observed {
            debug!("audit log rollover observed");
        }
        self.observed = true;
    }

    pub fn reset(&mut self) {
        self.observed = false;
    }
}

struct Segment {
    path: PathBuf,
    reader: BufReader<File>,
    /// No more bytes will be appended to this file.
    complete: bool,
}

/// Lazy sequence of the lines appended to the log since a baseline.
///
/// Finite and not restartable; open a new one for every pass.
pub struct LogLines {
    segments: VecDeque<Segment>,
    buf: String,
}

impl LogLines {
    /// Open the line sequence starting at `baseline`.
    ///
    /// `rotation_seen` is the rotation flag as it stood when the caller's
    /// verification began. When rotation had not been seen and the rolled-over
    /// file exists, the baseline belongs to that file: it is read from the
    /// baseline to its end, followed by the whole active file, and `rotation`
    /// is marked observed.
    pub async fn open(
        files: &LogFiles,
        baseline: LogPosition,
        rotation_seen: bool,
        rotation: &mut RotationState,
    ) -> Result<Self> {
        let mut segments = VecDeque::with_capacity(2);

        let active_offset = if !rotation_seen && path_exists(&files.rolled_over).await? {
            rotation.mark_observed();
            if let Some(segment) = open_segment(&files.rolled_over, baseline, true).await? {
                segments.push_back(segment);
            }
            LogPosition::START
        } else {
            baseline
        };

        match open_segment(&files.active, active_offset, false).await? {
            Some(segment) => segments.push_back(segment),
            None => trace!(path = %files.active.display(), "active audit log not created yet"),
        }

        Ok(Self {
            segments,
            buf: String::new(),
        })
    }

    /// Next complete line, without its line terminator.
    ///
    /// An unterminated line at the end of the active file is still being
    /// written and is not returned.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        while let Some(segment) = self.segments.front_mut() {
            self.buf.clear();
            let read = segment
                .reader
                .read_line(&mut self.buf)
                .await
                .map_err(|source| Error::Read {
                    path: segment.path.clone(),
                    source,
                })?;

            if read == 0 {
                self.segments.pop_front();
                continue;
            }

            if let Some(line) = self.buf.strip_suffix('\n') {
                return Ok(Some(line.strip_suffix('\r').unwrap_or(line).to_string()));
            }

            if segment.complete {
                return Ok(Some(self.buf.clone()));
            }

            trace!(
                path = %segment.path.display(),
                bytes = read,
                "holding back unterminated trailing line"
            );
            self.segments.pop_front();
        }
        Ok(None)
    }

    /// Drain the remaining lines.
    pub async fn collect(mut self) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        while let Some(line) = self.next_line().await? {
            lines.push(line);
        }
        Ok(lines)
    }
}

async fn path_exists(path: &Path) -> Result<bool> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })
}

async fn open_segment(path: &Path, offset: LogPosition, complete: bool) -> Result<Option<Segment>> {
    let read_err = |source| Error::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(read_err(e)),
    };
    file.seek(SeekFrom::Start(offset.0)).await.map_err(read_err)?;

    trace!(path = %path.display(), offset = offset.0, complete, "opened audit log segment");
    Ok(Some(Segment {
        path: path.to_path_buf(),
        reader: BufReader::new(file),
        complete,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn log_files(dir: &TempDir) -> LogFiles {
        LogFiles::new(
            dir.path().join("audit.json"),
            dir.path().join("audit-rolled.json"),
        )
    }

    fn append(path: &Path, contents: &str) {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    async fn read_all(
        files: &LogFiles,
        baseline: u64,
        rotation: &mut RotationState,
    ) -> Vec<String> {
        let seen = rotation.observed();
        LogLines::open(files, LogPosition(baseline), seen, rotation)
            .await
            .unwrap()
            .collect()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn skips_bytes_before_baseline() {
        let dir = TempDir::new().unwrap();
        let files = log_files(&dir);
        append(&files.active, "old-1\nold-2\n");
        append(&files.active, "new-1\nnew-2\n");

        let mut rotation = RotationState::default();
        let lines = read_all(&files, 12, &mut rotation).await;

        assert_eq!(lines, vec!["new-1", "new-2"]);
        assert!(!rotation.observed());
    }

    #[tokio::test]
    async fn missing_active_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let files = log_files(&dir);

        let mut rotation = RotationState::default();
        assert!(read_all(&files, 0, &mut rotation).await.is_empty());
    }

    #[tokio::test]
    async fn spans_rotation_boundary() {
        let dir = TempDir::new().unwrap();
        let files = log_files(&dir);
        append(&files.rolled_over, "before\nafter-1\n");
        append(&files.active, "after-2\nafter-3\n");

        let mut rotation = RotationState::default();
        let lines = read_all(&files, 7, &mut rotation).await;

        assert_eq!(lines, vec!["after-1", "after-2", "after-3"]);
        assert!(rotation.observed());
    }

    #[tokio::test]
    async fn observed_rotation_reads_only_active_file() {
        let dir = TempDir::new().unwrap();
        let files = log_files(&dir);
        append(&files.rolled_over, "rolled-1\nrolled-2\n");
        append(&files.active, "active-1\nactive-2\n");

        let mut rotation = RotationState::default();
        rotation.mark_observed();
        let lines = read_all(&files, 9, &mut rotation).await;

        assert_eq!(lines, vec!["active-2"]);
    }

    #[tokio::test]
    async fn snapshot_keeps_reading_predecessor_after_marking() {
        let dir = TempDir::new().unwrap();
        let files = log_files(&dir);
        append(&files.rolled_over, "x\ny\n");
        append(&files.active, "z\n");

        let mut rotation = RotationState::default();
        for _ in 0..2 {
            let lines = LogLines::open(&files, LogPosition(2), false, &mut rotation)
                .await
                .unwrap()
                .collect()
                .await
                .unwrap();
            assert_eq!(lines, vec!["y", "z"]);
        }
        assert!(rotation.observed());
    }

    #[tokio::test]
    async fn holds_back_unterminated_active_line() {
        let dir = TempDir::new().unwrap();
        let files = log_files(&dir);
        append(&files.active, "done\n{\"partial\":");

        let mut rotation = RotationState::default();
        assert_eq!(read_all(&files, 0, &mut rotation).await, vec!["done"]);

        append(&files.active, "true}\n");
        assert_eq!(
            read_all(&files, 0, &mut rotation).await,
            vec!["done", "{\"partial\":true}"]
        );
    }

    #[tokio::test]
    async fn rolled_over_file_returns_unterminated_last_line() {
        let dir = TempDir::new().unwrap();
        let files = log_files(&dir);
        append(&files.rolled_over, "first\nlast");
        append(&files.active, "next\n");

        let mut rotation = RotationState::default();
        assert_eq!(
            read_all(&files, 0, &mut rotation).await,
            vec!["first", "last", "next"]
        );
    }

    #[tokio::test]
    async fn strips_carriage_returns() {
        let dir = TempDir::new().unwrap();
        let files = log_files(&dir);
        append(&files.active, "one\r\ntwo\r\n");

        let mut rotation = RotationState::default();
        assert_eq!(read_all(&files, 0, &mut rotation).await, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn baseline_past_end_reads_nothing() {
        let dir = TempDir::new().unwrap();
        let files = log_files(&dir);
        append(&files.active, "short\n");

        let mut rotation = RotationState::default();
        assert!(read_all(&files, 1024, &mut rotation).await.is_empty());
    }

    #[test]
    fn rotation_reset() {
        let mut rotation = RotationState::default();
        rotation.mark_observed();
        rotation.mark_observed();
        assert!(rotation.observed());
        rotation.reset();
        assert!(!rotation.observed());
    }
}
