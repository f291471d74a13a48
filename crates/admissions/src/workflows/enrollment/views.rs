use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::matcher::{MatchReport, UnmatchedRow};

pub const COMPLETION_MESSAGE: &str = "Batch enrollment matching completed.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportCounts {
    pub total_rows: usize,
    pub matched_and_updated: usize,
    pub already_enrolled: usize,
    pub unmatched: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmatchedSample {
    pub line: u64,
    pub row: BTreeMap<String, String>,
    pub reason: String,
    pub detail: String,
}

impl From<&UnmatchedRow> for UnmatchedSample {
    fn from(unmatched: &UnmatchedRow) -> Self {
        Self {
            line: unmatched.row.line,
            row: unmatched.row.values.clone(),
            reason: unmatched.reason.label().to_string(),
            detail: unmatched.reason.detail(),
        }
    }
}

/// Response body returned after a registrar upload has been reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub message: String,
    pub summary: ImportCounts,
    pub unmatched_samples: Vec<UnmatchedSample>,
}

impl ImportSummary {
    pub fn from_report(report: &MatchReport<'_>, sample_limit: usize) -> Self {
        Self {
            message: COMPLETION_MESSAGE.to_string(),
            summary: ImportCounts {
                total_rows: report.total_rows(),
                matched_and_updated: report.matched.len(),
                already_enrolled: report.already_enrolled.len(),
                unmatched: report.unmatched.len(),
            },
            unmatched_samples: report
                .unmatched
                .iter()
                .take(sample_limit)
                .map(UnmatchedSample::from)
                .collect(),
        }
    }
}
