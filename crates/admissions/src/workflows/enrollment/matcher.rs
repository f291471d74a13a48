use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::debug;

use super::columns::ColumnMap;
use super::normalizer::{date_key, format_date_key, normalize_value};
use super::parser::RawRow;
use crate::workflows::applications::{ApplicantRecord, ApplicationStatus};

/// Minimum number of agreeing identity fields for a row to be accepted.
pub const MIN_MATCH_SCORE: u8 = 3;

/// Normalized `(lastName, firstName, email, dob)` tuple compared between rows and records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    pub last_name: String,
    pub first_name: String,
    pub email: String,
    pub date_of_birth: String,
}

impl IdentityKey {
    pub fn from_record(record: &ApplicantRecord) -> Self {
        Self {
            last_name: normalize_value(record.last_name.as_deref().unwrap_or("")),
            first_name: normalize_value(record.given_name.as_deref().unwrap_or("")),
            email: normalize_value(&record.email),
            date_of_birth: record.date_of_birth.map(format_date_key).unwrap_or_default(),
        }
    }

    pub fn from_row(row: &RawRow, columns: &ColumnMap) -> Self {
        Self {
            last_name: normalize_value(row.value(&columns.last_name)),
            first_name: normalize_value(row.value(&columns.first_name)),
            email: normalize_value(row.value(&columns.email)),
            date_of_birth: date_key(row.value(&columns.date_of_birth)),
        }
    }

    fn fields(&self) -> [&str; 4] {
        [
            self.last_name.as_str(),
            self.first_name.as_str(),
            self.email.as_str(),
            self.date_of_birth.as_str(),
        ]
    }

    pub fn populated(&self) -> usize {
        self.fields().iter().filter(|field| !field.is_empty()).count()
    }

    /// Number of non-empty fields on `self` equal to the same field on `other`.
    pub fn score(&self, other: &IdentityKey) -> u8 {
        self.fields()
            .iter()
            .zip(other.fields())
            .filter(|(mine, theirs)| !mine.is_empty() && **mine == *theirs)
            .count() as u8
    }
}

/// Why a row could not be tied to a single application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmatchedReason {
    InsufficientFields { populated: usize },
    NoMatch { best_score: u8 },
    Ambiguous { score: u8, candidates: usize },
}

impl UnmatchedReason {
    pub const fn label(self) -> &'static str {
        match self {
            UnmatchedReason::InsufficientFields { .. } => "insufficient fields",
            UnmatchedReason::NoMatch { .. } => "no match",
            UnmatchedReason::Ambiguous { .. } => "ambiguous",
        }
    }

    pub fn detail(self) -> String {
        match self {
            UnmatchedReason::InsufficientFields { populated } => format!(
                "Need at least three of: first name, last name, email, birthdate ({populated} provided)"
            ),
            UnmatchedReason::NoMatch { best_score } => format!(
                "No matching application found (needs at least 3 of 4 fields to match, best was {best_score})"
            ),
            UnmatchedReason::Ambiguous { score, candidates } => format!(
                "{candidates} applications match {score} of 4 fields; resolve manually"
            ),
        }
    }
}

impl fmt::Display for UnmatchedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchedRow<'a> {
    pub row: RawRow,
    pub candidate: &'a ApplicantRecord,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmatchedRow {
    pub row: RawRow,
    pub reason: UnmatchedReason,
}

/// Outcome of matching every row of one upload.
#[derive(Debug, Default)]
pub struct MatchReport<'a> {
    pub matched: Vec<MatchedRow<'a>>,
    pub already_enrolled: Vec<RawRow>,
    pub unmatched: Vec<UnmatchedRow>,
}

impl MatchReport<'_> {
    pub fn total_rows(&self) -> usize {
        self.matched.len() + self.already_enrolled.len() + self.unmatched.len()
    }
}

enum Resolution {
    Found { index: usize, score: u8 },
    Unmatched(UnmatchedReason),
}

/// Candidate set with precomputed identity keys and an exact-match index.
pub struct IdentityMatcher<'a> {
    candidates: &'a [ApplicantRecord],
    keys: Vec<IdentityKey>,
    exact: HashMap<IdentityKey, usize>,
}

impl<'a> IdentityMatcher<'a> {
    pub fn new(candidates: &'a [ApplicantRecord]) -> Self {
        let keys: Vec<IdentityKey> = candidates.iter().map(IdentityKey::from_record).collect();
        let mut exact = HashMap::with_capacity(keys.len());
        for (index, key) in keys.iter().enumerate() {
            exact.entry(key.clone()).or_insert(index);
        }

        Self {
            candidates,
            keys,
            exact,
        }
    }

    fn resolve(&self, key: &IdentityKey) -> Resolution {
        let populated = key.populated();
        if populated < usize::from(MIN_MATCH_SCORE) {
            return Resolution::Unmatched(UnmatchedReason::InsufficientFields { populated });
        }

        if let Some(&index) = self.exact.get(key) {
            return Resolution::Found { index, score: 4 };
        }

        let mut best_score = 0u8;
        let mut best_index = None;
        let mut tied = 0usize;
        for (index, candidate) in self.keys.iter().enumerate() {
            let score = key.score(candidate);
            if score > best_score {
                best_score = score;
                best_index = Some(index);
                tied = 1;
            } else if score == best_score && score > 0 {
                tied += 1;
            }
        }

        match best_index {
            Some(index) if best_score >= MIN_MATCH_SCORE && tied == 1 => Resolution::Found {
                index,
                score: best_score,
            },
            Some(_) if best_score >= MIN_MATCH_SCORE => {
                Resolution::Unmatched(UnmatchedReason::Ambiguous {
                    score: best_score,
                    candidates: tied,
                })
            }
            _ => Resolution::Unmatched(UnmatchedReason::NoMatch { best_score }),
        }
    }

    /// Classify every row. A candidate matched earlier in the same run counts as already enrolled.
    pub fn match_rows(&self, rows: Vec<RawRow>, columns: &ColumnMap) -> MatchReport<'a> {
        let mut report = MatchReport::default();
        let mut consumed: HashSet<usize> = HashSet::new();
        let candidates: &'a [ApplicantRecord] = self.candidates;

        for row in rows {
            let key = IdentityKey::from_row(&row, columns);
            match self.resolve(&key) {
                Resolution::Found { index, score } => {
                    let candidate = &candidates[index];
                    if candidate.status == ApplicationStatus::Enrolled || consumed.contains(&index) {
                        debug!(line = row.line, application_id = %candidate.id, "row already enrolled");
                        report.already_enrolled.push(row);
                    } else {
                        debug!(line = row.line, application_id = %candidate.id, score, "row matched");
                        consumed.insert(index);
                        report.matched.push(MatchedRow {
                            row,
                            candidate,
                            score,
                        });
                    }
                }
                Resolution::Unmatched(reason) => {
                    debug!(line = row.line, reason = %reason, "row unmatched");
                    report.unmatched.push(UnmatchedRow { row, reason });
                }
            }
        }

        report
    }
}

/// Match `rows` against `candidates` using the resolved `columns`.
pub fn match_rows<'a>(
    rows: Vec<RawRow>,
    columns: &ColumnMap,
    candidates: &'a [ApplicantRecord],
) -> MatchReport<'a> {
    IdentityMatcher::new(candidates).match_rows(rows, columns)
}
