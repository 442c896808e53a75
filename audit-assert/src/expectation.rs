//! Declarative expectations over audit records.

use serde::{Deserialize, Serialize};

use crate::actions::{Outcome, TrackedAction};
use crate::record::AuditRecord;

/// Predicate over a record's normalized index list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "matcher", rename_all = "snake_case")]
pub enum IndexMatcher {
    /// No indices at all.
    Empty,
    /// Every listed name is present; other names may be too.
    HasItems { names: Vec<String> },
    /// Exactly the listed names, in order.
    Contains { names: Vec<String> },
}

impl IndexMatcher {
    pub fn has_items<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::HasItems {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Contains {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, indices: &[String]) -> bool {
        match self {
            Self::Empty => indices.is_empty(),
            Self::HasItems { names } => names.iter().all(|n| indices.contains(n)),
            Self::Contains { names } => indices == names.as_slice(),
        }
    }
}

impl std::fmt::Display for IndexMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::HasItems { names } => write!(f, "has items {names:?}"),
            Self::Contains { names } => write!(f, "exactly {names:?}"),
        }
    }
}

/// One authorization decision that must appear in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectation {
    pub outcome: Outcome,
    pub action: String,
    pub principal: String,
    pub realm: String,
    pub indices: IndexMatcher,
    pub request_name: String,
}

impl Expectation {
    pub fn matches(&self, record: &AuditRecord) -> bool {
        record.event_action() == Some(self.outcome.event_action())
            && record.action() == Some(self.action.as_str())
            && record.principal() == Some(self.principal.as_str())
            && record.realm() == Some(self.realm.as_str())
            && record.is_direct()
            && self.indices.matches(record.indices())
            && record.request_name() == Some(self.request_name.as_str())
    }
}

impl std::fmt::Display for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} [{}] by {}/{} with indices {}",
            self.outcome.event_action(),
            self.action,
            self.request_name,
            self.principal,
            self.realm,
            self.indices
        )
    }
}

/// Realms expected for the administrator and for everyone else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealmPolicy {
    pub admin_principal: String,
    pub admin_realm: String,
    pub native_realm: String,
}

impl RealmPolicy {
    pub fn realm_for(&self, principal: &str) -> &str {
        if principal == self.admin_principal {
            &self.admin_realm
        } else {
            &self.native_realm
        }
    }
}

impl Default for RealmPolicy {
    fn default() -> Self {
        Self {
            admin_principal: crate::config::DEFAULT_ADMIN_PRINCIPAL.to_string(),
            admin_realm: crate::config::DEFAULT_ADMIN_REALM.to_string(),
            native_realm: crate::config::DEFAULT_NATIVE_REALM.to_string(),
        }
    }
}

/// Ordered list of expectations for one verification.
///
/// Declaration order decides which record an expectation claims when more
/// than one would match, but does not need to follow log order.
#[derive(Debug, Clone, Default)]
pub struct ExpectationSet {
    realms: RealmPolicy,
    expectations: Vec<Expectation>,
}

impl ExpectationSet {
    pub fn new(realms: RealmPolicy) -> Self {
        Self {
            realms,
            expectations: Vec::new(),
        }
    }

    /// Expect `principal` to be `outcome`ed for `action`, authenticated by
    /// the realm the policy assigns to that principal.
    #[must_use]
    pub fn expect(
        self,
        outcome: Outcome,
        action: TrackedAction,
        principal: &str,
        indices: IndexMatcher,
    ) -> Self {
        let realm = self.realms.realm_for(principal).to_string();
        self.expect_exact(
            outcome,
            action.name(),
            principal,
            &realm,
            indices,
            action.request_name(),
        )
    }

    #[must_use]
    pub fn expect_exact(
        mut self,
        outcome: Outcome,
        action: &str,
        principal: &str,
        realm: &str,
        indices: IndexMatcher,
        request_name: &str,
    ) -> Self {
        self.expectations.push(Expectation {
            outcome,
            action: action.to_string(),
            principal: principal.to_string(),
            realm: realm.to_string(),
            indices,
            request_name: request_name.to_string(),
        });
        self
    }

    /// The SQL authorization followed by the index resolution behind
    /// `SHOW TABLES`.
    #[must_use]
    pub fn expect_sql_get_index(self, principal: &str, indices: &[&str]) -> Self {
        self.expect(
            Outcome::Granted,
            TrackedAction::SqlQuery,
            principal,
            IndexMatcher::Empty,
        )
        .expect(
            Outcome::Granted,
            TrackedAction::GetIndex,
            principal,
            IndexMatcher::has_items(indices.iter().copied()),
        )
    }

    /// The SQL authorization followed by the field capabilities lookup
    /// behind queries and `DESCRIBE`.
    #[must_use]
    pub fn expect_sql_field_caps(self, principal: &str, indices: &[&str]) -> Self {
        self.expect(
            Outcome::Granted,
            TrackedAction::SqlQuery,
            principal,
            IndexMatcher::Empty,
        )
        .expect(
            Outcome::Granted,
            TrackedAction::FieldCaps,
            principal,
            IndexMatcher::has_items(indices.iter().copied()),
        )
    }

    pub fn len(&self) -> usize {
        self.expectations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expectations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Expectation> {
        self.expectations.iter()
    }

    pub fn into_vec(self) -> Vec<Expectation> {
        self.expectations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordNormalizer;

    fn record(line: &str) -> AuditRecord {
        RecordNormalizer::new("test_admin", [".security"])
            .normalize(line)
            .unwrap()
            .unwrap()
    }

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn index_matchers() {
        let indices = names(&["*", "-*"]);

        assert!(IndexMatcher::Empty.matches(&[]));
        assert!(!IndexMatcher::Empty.matches(&indices));
        assert!(IndexMatcher::has_items(["-*"]).matches(&indices));
        assert!(!IndexMatcher::has_items(["test"]).matches(&indices));
        assert!(IndexMatcher::contains(["*", "-*"]).matches(&indices));
        assert!(!IndexMatcher::contains(["-*", "*"]).matches(&indices));
        assert!(!IndexMatcher::contains(["*"]).matches(&indices));
    }

    #[test]
    fn expect_derives_realm_and_request() {
        let set = ExpectationSet::default()
            .expect(
                Outcome::Granted,
                TrackedAction::SqlQuery,
                "only_a",
                IndexMatcher::Empty,
            )
            .expect(
                Outcome::Denied,
                TrackedAction::FieldCaps,
                "test_admin",
                IndexMatcher::Empty,
            );

        let expectations = set.into_vec();
        assert_eq!(expectations[0].realm, "default_native");
        assert_eq!(expectations[0].request_name, "SqlQueryRequest");
        assert_eq!(expectations[1].realm, "default_file");
        assert_eq!(expectations[1].request_name, "FieldCapabilitiesRequest");
    }

    #[test]
    fn composite_helpers_expand_to_two_steps() {
        let set = ExpectationSet::default()
            .expect_sql_get_index("read_bort", &["bort"])
            .expect_sql_field_caps("only_a", &["test"]);

        let actions: Vec<_> = set.iter().map(|e| e.action.clone()).collect();
        assert_eq!(
            actions,
            vec![
                "indices:data/read/sql",
                "indices:admin/get",
                "indices:data/read/sql",
                "indices:data/read/field_caps",
            ]
        );
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn sql_expectation_matches_record() {
        let expectation = ExpectationSet::default()
            .expect(
                Outcome::Granted,
                TrackedAction::SqlQuery,
                "only_a",
                IndexMatcher::Empty,
            )
            .into_vec()
            .remove(0);

        let matching = record(
            r#"{"event.action":"access_granted","action":"indices:data/read/sql","user.name":"only_a","user.realm":"default_native","indices":[],"request.name":"SqlQueryRequest"}"#,
        );
        assert!(expectation.matches(&matching));

        let denied = record(
            r#"{"event.action":"access_denied","action":"indices:data/read/sql","user.name":"only_a","user.realm":"default_native","request.name":"SqlQueryRequest"}"#,
        );
        assert!(!expectation.matches(&denied));

        let wrong_realm = record(
            r#"{"event.action":"access_granted","action":"indices:data/read/sql","user.name":"only_a","user.realm":"default_file","request.name":"SqlQueryRequest"}"#,
        );
        assert!(!expectation.matches(&wrong_realm));

        let run_as = record(
            r#"{"event.action":"access_granted","action":"indices:data/read/sql","user.name":"only_a","user.realm":"default_native","user.run_by.name":"test_admin","user.run_by.realm":"default_file","request.name":"SqlQueryRequest"}"#,
        );
        assert!(!expectation.matches(&run_as));
    }

    #[test]
    fn display_describes_expectation() {
        let expectation = ExpectationSet::default()
            .expect(
                Outcome::Denied,
                TrackedAction::SqlQuery,
                "no_access",
                IndexMatcher::Empty,
            )
            .into_vec()
            .remove(0);

        assert_eq!(
            expectation.to_string(),
            "access_denied indices:data/read/sql [SqlQueryRequest] by no_access/default_native with indices empty"
        );
    }

    #[test]
    fn index_matcher_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            indices: IndexMatcher,
        }

        let parsed: Wrapper =
            toml::from_str(r#"indices = { matcher = "has_items", names = ["*", "-*"] }"#).unwrap();
        assert_eq!(parsed.indices, IndexMatcher::has_items(["*", "-*"]));

        let parsed: Wrapper = toml::from_str(r#"indices = { matcher = "empty" }"#).unwrap();
        assert_eq!(parsed.indices, IndexMatcher::Empty);
    }
}
