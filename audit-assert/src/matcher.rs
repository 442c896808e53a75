//! Unordered reconciliation of expectations against records.

use crate::expectation::Expectation;
use crate::record::AuditRecord;

/// Result of one reconciliation pass.
#[derive(Debug, Clone)]
pub struct MatchReport {
    /// Expectations that claimed no record, with their declaration index.
    pub missing: Vec<(usize, Expectation)>,
    /// Every record the pass considered, in arrival order.
    pub all_records: Vec<AuditRecord>,
    /// Records no expectation claimed.
    pub leftover: Vec<AuditRecord>,
    /// Decision records that could not be matched because a field was
    /// missing. The writer may still be mid-record, so these are retried.
    pub invalid: Vec<String>,
}

impl MatchReport {
    /// Every expectation claimed a record and every record was claimed.
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.leftover.is_empty() && self.invalid.is_empty()
    }

    pub fn missing_indices(&self) -> Vec<usize> {
        self.missing.iter().map(|(idx, _)| *idx).collect()
    }
}

/// Match each expectation to a distinct record.
///
/// Greedy first fit: expectations are taken in declaration order and each
/// claims the first unclaimed record, in arrival order, that it matches.
/// This is not an optimal assignment; an ambiguous earlier expectation can
/// take the record a later one needed.
pub fn reconcile(expectations: &[Expectation], records: Vec<AuditRecord>) -> MatchReport {
    let all_records = records.clone();
    let mut remaining = records;
    let mut missing = Vec::new();

    for (idx, expectation) in expectations.iter().enumerate() {
        match remaining.iter().position(|r| expectation.matches(r)) {
            Some(pos) => {
                remaining.remove(pos);
            }
            None => missing.push((idx, expectation.clone())),
        }
    }

    MatchReport {
        missing,
        all_records,
        leftover: remaining,
        invalid: Vec::new(),
    }
}

fn write_records(f: &mut std::fmt::Formatter<'_>, records: &[AuditRecord]) -> std::fmt::Result {
    if records.is_empty() {
        return writeln!(f, "  none!");
    }
    for record in records {
        writeln!(f, "  {record}")?;
    }
    Ok(())
}

impl std::fmt::Display for MatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.missing.is_empty() {
            writeln!(f, "Every expectation matched a record.")?;
        } else {
            writeln!(
                f,
                "Some expectations {:?} didn't match any records:",
                self.missing_indices()
            )?;
            for (idx, expectation) in &self.missing {
                writeln!(f, "  [{idx}] {expectation}")?;
            }
        }
        if !self.leftover.is_empty() {
            writeln!(
                f,
                "Not all records matched: {} left unclaimed.",
                self.leftover.len()
            )?;
        }
        if !self.invalid.is_empty() {
            writeln!(f, "Invalid records:")?;
            for problem in &self.invalid {
                writeln!(f, "  {problem}")?;
            }
        }
        writeln!(f, "All records:")?;
        write_records(f, &self.all_records)?;
        writeln!(f, "Remaining records:")?;
        write_records(f, &self.leftover)
    }
}
