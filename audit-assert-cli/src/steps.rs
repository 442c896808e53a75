//! Expectations files.
//!
//! A TOML file with one `[[step]]` table per expected decision or
//! authorization + resolution pair:
//!
//! ```toml
//! [[step]]
//! kind = "sql_field_caps"
//! principal = "only_a"
//! indices = ["test"]
//!
//! [[step]]
//! kind = "single"
//! outcome = "granted"
//! action = "indices:data/read/field_caps"
//! principal = "wrong_access"
//! indices = { matcher = "has_items", names = ["*", "-*"] }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use audit_assert::{ExpectationSet, IndexMatcher, Outcome, TrackedAction};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct StepsFile {
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    SqlGetIndex {
        principal: String,
        indices: Vec<String>,
    },
    SqlFieldCaps {
        principal: String,
        indices: Vec<String>,
    },
    Single {
        outcome: Outcome,
        action: String,
        principal: String,
        #[serde(default = "empty_matcher")]
        indices: IndexMatcher,
    },
}

fn empty_matcher() -> IndexMatcher {
    IndexMatcher::Empty
}

impl StepsFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read expectations {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse expectations {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Append every step, in file order.
    pub fn apply(&self, mut set: ExpectationSet) -> Result<ExpectationSet> {
        for step in &self.steps {
            set = match step {
                Step::SqlGetIndex { principal, indices } => {
                    set.expect_sql_get_index(principal, &as_strs(indices))
                }
                Step::SqlFieldCaps { principal, indices } => {
                    set.expect_sql_field_caps(principal, &as_strs(indices))
                }
                Step::Single {
                    outcome,
                    action,
                    principal,
                    indices,
                } => {
                    let action: TrackedAction = action.parse()?;
                    set.expect(*outcome, action, principal, indices.clone())
                }
            };
        }
        Ok(set)
    }
}

fn as_strs(items: &[String]) -> Vec<&str> {
    items.iter().map(String::as_str).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WRONG_ACCESS: &str = r#"
[[step]]
kind = "single"
outcome = "granted"
action = "indices:data/read/sql"
principal = "wrong_access"

[[step]]
kind = "single"
outcome = "granted"
action = "indices:data/read/field_caps"
principal = "wrong_access"
indices = { matcher = "has_items", names = ["*", "-*"] }
"#;

    #[test]
    fn test_parse_single_steps() {
        let file = StepsFile::parse(WRONG_ACCESS).unwrap();
        let expectations = file.apply(ExpectationSet::default()).unwrap().into_vec();

        assert_eq!(expectations.len(), 2);
        assert_eq!(expectations[0].indices, IndexMatcher::Empty);
        assert_eq!(expectations[1].request_name, "FieldCapabilitiesRequest");
        assert_eq!(expectations[1].indices, IndexMatcher::has_items(["*", "-*"]));
    }

    #[test]
    fn test_composite_steps_expand() {
        let file = StepsFile::parse(
            r#"
[[step]]
kind = "sql_get_index"
principal = "test_admin"
indices = ["bort", "test"]

[[step]]
kind = "sql_field_caps"
principal = "only_a"
indices = ["test"]
"#,
        )
        .unwrap();

        let expectations = file.apply(ExpectationSet::default()).unwrap().into_vec();
        assert_eq!(expectations.len(), 4);
        assert_eq!(expectations[0].realm, "default_file");
        assert_eq!(expectations[3].realm, "default_native");
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let file = StepsFile::parse(
            r#"
[[step]]
kind = "single"
outcome = "denied"
action = "indices:data/read/search"
principal = "no_access"
"#,
        )
        .unwrap();

        let err = file.apply(ExpectationSet::default()).unwrap_err();
        assert!(err.to_string().contains("unknown action"));
    }

    #[test]
    fn test_empty_file_has_no_steps() {
        let file = StepsFile::parse("").unwrap();
        assert!(file.steps.is_empty());
    }
}
