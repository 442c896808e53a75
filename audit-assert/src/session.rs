//! Verification sessions.
//!
//! An [`AuditSession`] holds the state shared by every test in a suite: the
//! baseline offset captured before each test, whether the log has rolled
//! over, and whether an earlier verification failed. The audit writer runs
//! independently of the tests, so [`AuditSession::verify`] polls the log
//! until the expected records show up or the configured timeout elapses.

use std::time::Instant;

use tracing::{debug, trace, warn};

use crate::config::AuditConfig;
use crate::error::{Error, Result};
use crate::expectation::{Expectation, ExpectationSet};
use crate::matcher::{MatchReport, reconcile};
use crate::offset::{LogPosition, capture_baseline};
use crate::reader::{LogFiles, LogLines, RotationState};
use crate::record::{AuditRecord, RecordNormalizer};

pub struct AuditSession {
    config: AuditConfig,
    files: LogFiles,
    normalizer: RecordNormalizer,
    baseline: LogPosition,
    rotation: RotationState,
    poisoned: bool,
}

impl AuditSession {
    pub fn new(config: AuditConfig) -> Self {
        let files = LogFiles::new(&config.log_file, &config.rolled_over_log_file);
        let normalizer =
            RecordNormalizer::new(&config.admin_principal, config.restricted_indices.clone());
        Self {
            config,
            files,
            normalizer,
            baseline: LogPosition::START,
            rotation: RotationState::default(),
            poisoned: false,
        }
    }

    /// Continue from a baseline captured elsewhere, e.g. by an earlier
    /// process in a shell-driven suite.
    pub fn resume(config: AuditConfig, baseline: LogPosition, rotation_observed: bool) -> Self {
        let mut session = Self::new(config);
        session.baseline = baseline;
        if rotation_observed {
            session.rotation.mark_observed();
        }
        session
    }

    /// Carry over the outcome of an earlier verification in the same suite.
    #[must_use]
    pub fn with_poisoned(mut self, poisoned: bool) -> Self {
        self.poisoned = poisoned;
        self
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn baseline(&self) -> LogPosition {
        self.baseline
    }

    pub fn rotation_observed(&self) -> bool {
        self.rotation.observed()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Record how much of the log exists before a test runs.
    ///
    /// Also locks in a rollover that already happened: a test that never
    /// verifies could run across midnight, and a later verification must not
    /// apply the new baseline to the rolled-over file.
    pub async fn begin_test(&mut self) -> Result<LogPosition> {
        // A rollover between the existence check and the size read would pair
        // the new file's size with the old file's state, so measure again.
        let rolled_over = loop {
            let before = self.predecessor_exists().await?;
            let baseline = capture_baseline(&self.files.active).await?;
            let after = self.predecessor_exists().await?;
            if before == after {
                self.baseline = baseline;
                break after;
            }
            debug!("audit log rolled over while capturing the baseline, retrying");
        };

        if rolled_over {
            self.rotation.mark_observed();
        }

        Ok(self.baseline)
    }

    async fn predecessor_exists(&self) -> Result<bool> {
        tokio::fs::try_exists(&self.files.rolled_over)
            .await
            .map_err(|source| Error::Read {
                path: self.files.rolled_over.clone(),
                source,
            })
    }

    /// A fresh expectation builder using this session's realms.
    pub fn expectations(&self) -> ExpectationSet {
        ExpectationSet::new(self.config.realm_policy())
    }

    /// Read and normalize everything appended since the baseline.
    ///
    /// `rotation_seen` is the rotation flag as it stood when the calling
    /// verification started.
    pub async fn read_records(&mut self, rotation_seen: bool) -> Result<Vec<AuditRecord>> {
        let mut lines =
            LogLines::open(&self.files, self.baseline, rotation_seen, &mut self.rotation).await?;

        let mut records = Vec::new();
        while let Some(line) = lines.next_line().await? {
            if let Some(record) = self.normalizer.normalize(&line)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// One read and reconcile pass. Decision records missing a field end up
    /// in [`MatchReport::invalid`] instead of failing the pass.
    async fn reconcile_pass(
        &mut self,
        expectations: &[Expectation],
        rotation_seen: bool,
    ) -> Result<MatchReport> {
        let mut lines =
            LogLines::open(&self.files, self.baseline, rotation_seen, &mut self.rotation).await?;

        let mut records = Vec::new();
        let mut invalid = Vec::new();
        while let Some(line) = lines.next_line().await? {
            match self.normalizer.normalize(&line) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(err @ Error::InvalidRecord { .. }) => invalid.push(err.to_string()),
                Err(err) => return Err(err),
            }
        }

        let mut report = reconcile(expectations, records);
        report.invalid = invalid;
        Ok(report)
    }

    /// Run a single read and reconcile pass without retrying.
    pub async fn check(&mut self, expected: &ExpectationSet) -> Result<MatchReport> {
        let rotation_seen = self.rotation.observed();
        let expectations: Vec<_> = expected.iter().cloned().collect();
        self.reconcile_pass(&expectations, rotation_seen).await
    }

    /// Wait until the log holds exactly the expected records.
    ///
    /// Malformed log lines and I/O problems fail straight away. A mismatch,
    /// including decision records missing a field, that outlives the timeout
    /// fails with the last report and poisons the session; every later call
    /// then fails with [`Error::PriorFailure`] until [`AuditSession::teardown`].
    pub async fn verify(&mut self, expected: ExpectationSet) -> Result<()> {
        if self.poisoned {
            return Err(Error::PriorFailure);
        }

        let expectations = expected.into_vec();
        // Retries must keep reading the rolled-over file if this
        // verification found it, even though the flag flips on the first pass.
        let rotation_seen = self.rotation.observed();
        let started = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let report = self.reconcile_pass(&expectations, rotation_seen).await?;

            if report.is_clean() {
                debug!(
                    attempts,
                    records = report.all_records.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "audit records verified"
                );
                return Ok(());
            }

            trace!(
                attempt = attempts,
                missing = report.missing.len(),
                leftover = report.leftover.len(),
                invalid = report.invalid.len(),
                "audit records not reconciled yet, retrying..."
            );

            let elapsed = started.elapsed();
            if elapsed >= self.config.timeout {
                self.poisoned = true;
                warn!(
                    attempts,
                    missing = ?report.missing_indices(),
                    leftover = report.leftover.len(),
                    "Failed to find the expected audit records. Skipping remaining audit \
                     verifications in this session because the missing records could turn up later."
                );
                return Err(Error::VerificationFailed {
                    attempts,
                    elapsed,
                    report: Box::new(report),
                });
            }

            let pause = self.config.poll_interval.min(self.config.timeout - elapsed);
            tokio::time::sleep(pause).await;
        }
    }

    /// Reset all shared state so the next suite starts clean.
    pub fn teardown(&mut self) {
        debug!(poisoned = self.poisoned, "tearing down audit session");
        self.baseline = LogPosition::START;
        self.rotation.reset();
        self.poisoned = false;
    }
}
