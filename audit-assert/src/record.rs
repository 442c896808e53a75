//! Parsing and normalization of audit log lines.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use tracing::trace;

use crate::actions::{Outcome, TrackedAction};
use crate::error::{Error, Result};

pub const EVENT_ACTION_FIELD: &str = "event.action";
pub const ACTION_FIELD: &str = "action";
pub const PRINCIPAL_FIELD: &str = "user.name";
pub const REALM_FIELD: &str = "user.realm";
pub const RUN_BY_PRINCIPAL_FIELD: &str = "user.run_by.name";
pub const RUN_BY_REALM_FIELD: &str = "user.run_by.realm";
pub const REQUEST_NAME_FIELD: &str = "request.name";
pub const INDICES_FIELD: &str = "indices";

/// One authorization decision read from the audit log.
///
/// `indices` holds the normalized index list, which is also written back
/// into the field map so diagnostics show exactly what was matched.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    fields: Map<String, Value>,
    indices: Vec<String>,
}

impl AuditRecord {
    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn event_action(&self) -> Option<&str> {
        self.str_field(EVENT_ACTION_FIELD)
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.event_action().and_then(Outcome::from_event_action)
    }

    pub fn action(&self) -> Option<&str> {
        self.str_field(ACTION_FIELD)
    }

    pub fn principal(&self) -> Option<&str> {
        self.str_field(PRINCIPAL_FIELD)
    }

    pub fn realm(&self) -> Option<&str> {
        self.str_field(REALM_FIELD)
    }

    pub fn request_name(&self) -> Option<&str> {
        self.str_field(REQUEST_NAME_FIELD)
    }

    /// True when the record was not run on behalf of another principal.
    pub fn is_direct(&self) -> bool {
        [RUN_BY_PRINCIPAL_FIELD, RUN_BY_REALM_FIELD]
            .iter()
            .all(|key| self.fields.get(*key).is_none_or(Value::is_null))
    }

    pub fn indices(&self) -> &[String] {
        &self.indices
    }
}

impl std::fmt::Display for AuditRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string(&self.fields) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{:?}", self.fields),
        }
    }
}

/// Turns raw log lines into [`AuditRecord`]s.
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    admin_principal: String,
    restricted_indices: BTreeSet<String>,
}

impl RecordNormalizer {
    pub fn new<I, S>(admin_principal: impl Into<String>, restricted_indices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            admin_principal: admin_principal.into(),
            restricted_indices: restricted_indices.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse one line.
    ///
    /// Returns `Ok(None)` for blank lines, records that are not an
    /// authorization decision, and actions that are not tracked. A line that
    /// is not a JSON object is [`Error::MalformedRecord`]; a decision record
    /// missing the fields matching depends on is [`Error::InvalidRecord`].
    pub fn normalize(&self, line: &str) -> Result<Option<AuditRecord>> {
        if line.trim().is_empty() {
            return Ok(None);
        }

        let mut fields: Map<String, Value> =
            serde_json::from_str(line).map_err(|source| Error::MalformedRecord {
                line: line.to_string(),
                source,
            })?;

        let decision = fields
            .get(EVENT_ACTION_FIELD)
            .and_then(Value::as_str)
            .and_then(Outcome::from_event_action);
        if decision.is_none() {
            return Ok(None);
        }

        let Some(action) = fields.get(ACTION_FIELD) else {
            return Err(invalid(line, "missing `action`"));
        };
        if action.as_str().and_then(TrackedAction::from_name).is_none() {
            trace!(%action, "ignoring untracked action");
            return Ok(None);
        }

        let principal = match fields.get(PRINCIPAL_FIELD) {
            Some(Value::String(name)) => name.clone(),
            Some(_) => return Err(invalid(line, "`user.name` is not a string")),
            None => return Err(invalid(line, "missing `user.name`")),
        };

        let raw_indices = match fields.get(INDICES_FIELD) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| invalid(line, "`indices` contains a non-string entry"))
                })
                .collect::<Result<Vec<_>>>()?,
            Some(_) => return Err(invalid(line, "`indices` is not an array")),
        };

        let indices = self.normalize_indices(&principal, raw_indices);
        fields.insert(
            INDICES_FIELD.to_string(),
            Value::Array(indices.iter().cloned().map(Value::String).collect()),
        );

        Ok(Some(AuditRecord { fields, indices }))
    }

    /// Scrub restricted names for the administrator and sort.
    ///
    /// Idempotent for every principal.
    pub fn normalize_indices(&self, principal: &str, mut indices: Vec<String>) -> Vec<String> {
        if principal == self.admin_principal {
            indices.retain(|name| !self.restricted_indices.contains(name));
        }
        indices.sort();
        indices
    }
}

fn invalid(line: &str, reason: &str) -> Error {
    Error::InvalidRecord {
        line: line.to_string(),
        reason: reason.to_string(),
    }
}
