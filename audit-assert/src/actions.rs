//! Authorization outcomes and the actions tracked by the verifier.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// `event.action` value of a granted authorization.
pub const ACCESS_GRANTED: &str = "access_granted";
/// `event.action` value of a denied authorization.
pub const ACCESS_DENIED: &str = "access_denied";

/// Outcome of one authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Granted,
    Denied,
}

impl Outcome {
    pub fn from_granted(granted: bool) -> Self {
        if granted { Self::Granted } else { Self::Denied }
    }

    /// The `event.action` value this outcome is logged as.
    pub fn event_action(&self) -> &'static str {
        match self {
            Self::Granted => ACCESS_GRANTED,
            Self::Denied => ACCESS_DENIED,
        }
    }

    pub fn from_event_action(value: &str) -> Option<Self> {
        match value {
            ACCESS_GRANTED => Some(Self::Granted),
            ACCESS_DENIED => Some(Self::Denied),
            _ => None,
        }
    }
}

/// Actions whose audit records take part in verification.
///
/// Records for any other action are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedAction {
    /// The SQL query endpoint.
    SqlQuery,
    /// Index resolution used by `SHOW TABLES`.
    GetIndex,
    /// Field capability resolution used by queries and `DESCRIBE`.
    FieldCaps,
}

impl TrackedAction {
    pub const ALL: [TrackedAction; 3] = [Self::SqlQuery, Self::GetIndex, Self::FieldCaps];

    /// Action name as written to the audit log.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SqlQuery => "indices:data/read/sql",
            Self::GetIndex => "indices:admin/get",
            Self::FieldCaps => "indices:data/read/field_caps",
        }
    }

    /// `request.name` the cluster logs for this action.
    pub fn request_name(&self) -> &'static str {
        match self {
            Self::SqlQuery => "SqlQueryRequest",
            Self::GetIndex => "GetIndexRequest",
            Self::FieldCaps => "FieldCapabilitiesRequest",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }
}

impl std::str::FromStr for TrackedAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| Error::UnknownAction(s.to_string()))
    }
}

impl std::fmt::Display for TrackedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
