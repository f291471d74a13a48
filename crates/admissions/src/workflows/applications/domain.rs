use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for stored applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status tracked for every application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Verified,
    Incomplete,
    Admitted,
    Rejected,
    Enrolled,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Verified => "verified",
            ApplicationStatus::Incomplete => "incomplete",
            ApplicationStatus::Admitted => "admitted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Enrolled => "enrolled",
        }
    }

    pub const fn ordered() -> [ApplicationStatus; 6] {
        [
            ApplicationStatus::Pending,
            ApplicationStatus::Verified,
            ApplicationStatus::Incomplete,
            ApplicationStatus::Admitted,
            ApplicationStatus::Rejected,
            ApplicationStatus::Enrolled,
        ]
    }

    /// Applicants who were offered a place, whether or not they have enrolled yet.
    pub const fn is_admission(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Admitted | ApplicationStatus::Enrolled
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ApplicationStatus {
    type Err = InvalidStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        ApplicationStatus::ordered()
            .into_iter()
            .find(|status| status.label() == normalized)
            .ok_or_else(|| InvalidStatusError {
                value: value.to_string(),
            })
    }
}

/// Raised when a status mutation names a value outside the fixed enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a valid application status")]
pub struct InvalidStatusError {
    pub value: String,
}

/// Stored application as owned by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantRecord {
    pub id: ApplicationId,
    pub name: String,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub email: String,
    pub contact: String,
    pub course_applied: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub photo_url: String,
    #[serde(default)]
    pub signature_url: String,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub archived_at: Option<DateTime<Utc>>,
}

/// Binary payload handed to the media store during intake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl MediaUpload {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Form contents collected from an applicant before validation.
#[derive(Debug, Clone, Default)]
pub struct ApplicationSubmission {
    pub name: String,
    pub given_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub contact: String,
    pub course_applied: String,
    pub date_of_birth: Option<NaiveDate>,
    pub photo: Option<MediaUpload>,
    pub signature: Option<MediaUpload>,
}

/// Normalizes an email address the way it is stored.
pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}
