//! Audit log assertions for secured SQL integration tests.
//!
//! Tests run SQL as different users and then check that the cluster's audit
//! log recorded exactly the authorization decisions they expected. The log
//! is written asynchronously by the cluster and rolls over daily, so
//! verification tails the log from a per-test baseline, follows a rollover
//! when one happens, and retries until the records line up or a deadline
//! passes.
//!
//! # Key Types
//!
//! - [`AuditSession`] - Shared state for a suite plus the polling `verify` loop
//! - [`ExpectationSet`] - Fluent builder for the records a test expects
//! - [`LogLines`] - Rotation-aware line reader over the audit log pair
//! - [`RecordNormalizer`] - Parses, filters and scrubs audit records
//! - [`reconcile`] - First-fit matching of expectations to records
//!
//! # Example
//!
//! ```no_run
//! use audit_assert::{AuditConfig, AuditSession, Outcome, TrackedAction, IndexMatcher};
//!
//! # async fn run() -> audit_assert::Result<()> {
//! let mut session = AuditSession::new(AuditConfig::from_env()?);
//! session.begin_test().await?;
//!
//! // ... run SQL as `no_access` ...
//!
//! let expected = session.expectations().expect(
//!     Outcome::Denied,
//!     TrackedAction::SqlQuery,
//!     "no_access",
//!     IndexMatcher::Empty,
//! );
//! session.verify(expected).await?;
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod config;
pub mod error;
pub mod expectation;
pub mod matcher;
pub mod offset;
pub mod reader;
pub mod record;
pub mod scenarios;
pub mod session;

// Re-exports
pub use actions::{Outcome, TrackedAction};
pub use config::{AuditConfig, RawAuditConfig};
pub use error::{Error, Result};
pub use expectation::{Expectation, ExpectationSet, IndexMatcher, RealmPolicy};
pub use matcher::{MatchReport, reconcile};
pub use offset::{LogPosition, capture_baseline};
pub use reader::{LogFiles, LogLines, RotationState};
pub use record::{AuditRecord, RecordNormalizer};
pub use scenarios::{Scenario, ScenarioKind};
pub use session::AuditSession;
