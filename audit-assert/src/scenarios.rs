//! Expected audit trails for the SQL security suite.
//!
//! Each scenario describes what the audit log should contain after one kind
//! of SQL interaction: which principals are authorized for which actions,
//! and which indices each resolution step touches.

use crate::actions::{Outcome, TrackedAction};
use crate::error::Error;
use crate::expectation::{ExpectationSet, IndexMatcher};

/// Index queried by the fixture queries.
pub const QUERY_INDEX: &str = "test";

/// Indices listed by `SHOW TABLES` against the fixture data.
pub const SHOW_TABLES_INDICES: [&str; 2] = ["bort", "test"];

/// Placeholder expression the cluster resolves when no index is reachable.
pub const NO_INDICES_PLACEHOLDER: [&str; 2] = ["*", "-*"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioKind {
    /// The administrator runs a query.
    QueryAsAdmin,
    /// The administrator and a user run equivalent queries.
    QueryMatchesAdmin,
    /// Like `QueryMatchesAdmin` but both queries scroll through two extra pages.
    ScrollMatchesAdmin,
    /// The user may not run SQL at all.
    Forbidden,
    /// The user may run SQL but can see none of the queried indices.
    WrongAccess,
    /// Only the user's query is audited, e.g. `DESCRIBE` or a query rejected
    /// for an unknown column after authorization succeeded.
    FieldCapsOnly,
    /// The administrator lists tables.
    ShowTablesAsAdmin,
    /// The administrator and a user list tables.
    ShowTablesMatchesAdmin,
    /// Both list tables matching a pattern neither can resolve.
    ShowTablesUnavailableIndex,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 9] = [
        Self::QueryAsAdmin,
        Self::QueryMatchesAdmin,
        Self::ScrollMatchesAdmin,
        Self::Forbidden,
        Self::WrongAccess,
        Self::FieldCapsOnly,
        Self::ShowTablesAsAdmin,
        Self::ShowTablesMatchesAdmin,
        Self::ShowTablesUnavailableIndex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QueryAsAdmin => "query-as-admin",
            Self::QueryMatchesAdmin => "query-matches-admin",
            Self::ScrollMatchesAdmin => "scroll-matches-admin",
            Self::Forbidden => "forbidden",
            Self::WrongAccess => "wrong-access",
            Self::FieldCapsOnly => "field-caps-only",
            Self::ShowTablesAsAdmin => "show-tables-as-admin",
            Self::ShowTablesMatchesAdmin => "show-tables-matches-admin",
            Self::ShowTablesUnavailableIndex => "show-tables-unavailable-index",
        }
    }

    /// Whether the scenario involves a principal besides the administrator.
    pub fn needs_principal(&self) -> bool {
        !matches!(self, Self::QueryAsAdmin | Self::ShowTablesAsAdmin)
    }

    /// Indices the scenario resolves when the caller doesn't name any.
    pub fn default_indices(&self) -> &'static [&'static str] {
        match self {
            Self::ShowTablesAsAdmin | Self::ShowTablesMatchesAdmin => &SHOW_TABLES_INDICES,
            _ => &[QUERY_INDEX],
        }
    }
}

impl std::str::FromStr for ScenarioKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::UnknownScenario(s.to_string()))
    }
}

impl std::fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scenario applied to one principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub kind: ScenarioKind,
    /// The non-administrative principal; ignored by the admin-only kinds.
    pub principal: String,
    pub indices: Vec<String>,
}

impl Scenario {
    pub fn new(kind: ScenarioKind, principal: impl Into<String>) -> Self {
        Self {
            kind,
            principal: principal.into(),
            indices: kind.default_indices().iter().map(|s| s.to_string()).collect(),
        }
    }

    #[must_use]
    pub fn with_indices<I, S>(mut self, indices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indices = indices.into_iter().map(Into::into).collect();
        self
    }

    /// Append this scenario's expectations. `admin` is the administrative
    /// principal the suite compares users against.
    pub fn apply(&self, set: ExpectationSet, admin: &str) -> ExpectationSet {
        let user = self.principal.as_str();
        let indices: Vec<&str> = self.indices.iter().map(String::as_str).collect();
        let sql = |set: ExpectationSet, principal: &str| {
            set.expect(
                Outcome::Granted,
                TrackedAction::SqlQuery,
                principal,
                IndexMatcher::Empty,
            )
        };

        match self.kind {
            ScenarioKind::QueryAsAdmin => set.expect_sql_field_caps(admin, &indices),
            ScenarioKind::QueryMatchesAdmin => set
                .expect_sql_field_caps(admin, &indices)
                .expect_sql_field_caps(user, &indices),
            ScenarioKind::ScrollMatchesAdmin => {
                // Scrolling re-authorizes the SQL action without touching the
                // index again.
                let set = set.expect_sql_field_caps(admin, &indices);
                let set = sql(sql(set, admin), admin);
                let set = set.expect_sql_field_caps(user, &indices);
                sql(sql(set, user), user)
            }
            ScenarioKind::Forbidden => set.expect(
                Outcome::Denied,
                TrackedAction::SqlQuery,
                user,
                IndexMatcher::Empty,
            ),
            ScenarioKind::WrongAccess => sql(set, user).expect(
                Outcome::Granted,
                TrackedAction::FieldCaps,
                user,
                IndexMatcher::has_items(NO_INDICES_PLACEHOLDER),
            ),
            ScenarioKind::FieldCapsOnly => set.expect_sql_field_caps(user, &indices),
            ScenarioKind::ShowTablesAsAdmin => set.expect_sql_get_index(admin, &indices),
            ScenarioKind::ShowTablesMatchesAdmin => set
                .expect_sql_get_index(admin, &indices)
                .expect_sql_get_index(user, &indices),
            ScenarioKind::ShowTablesUnavailableIndex => {
                let placeholder = || IndexMatcher::contains(NO_INDICES_PLACEHOLDER);
                sql(set, admin)
                    .expect(Outcome::Granted, TrackedAction::GetIndex, admin, placeholder())
                    .expect(
                        Outcome::Granted,
                        TrackedAction::SqlQuery,
                        user,
                        IndexMatcher::Empty,
                    )
                    .expect(Outcome::Granted, TrackedAction::GetIndex, user, placeholder())
            }
        }
    }
}
