use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::domain::{ApplicantRecord, ApplicationId, ApplicationStatus, MediaUpload};
use super::notifications::Notification;
use crate::workflows::calendar::DateWindow;

/// Storage abstraction for applications so the services can be exercised in isolation.
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    async fn insert(&self, record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError>;
    async fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicantRecord>, RepositoryError>;
    async fn find(&self, filter: &ApplicationFilter)
        -> Result<Vec<ApplicantRecord>, RepositoryError>;
    async fn update_status(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<ApplicantRecord, RepositoryError>;
    async fn set_archived(
        &self,
        id: &ApplicationId,
        archived_at: Option<DateTime<Utc>>,
    ) -> Result<ApplicantRecord, RepositoryError>;
    async fn delete(&self, id: &ApplicationId) -> Result<(), RepositoryError>;
}

/// Hands out identifiers for newly submitted applications.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> ApplicationId;
}

/// Counter-backed ids of the form `<prefix>-000001`, scoped to one generator instance.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }

    /// Prefix stamped with the creation time so restarted processes never reuse an id.
    pub fn stamped(now: DateTime<Utc>) -> Self {
        Self::new(format!("app-{}", now.format("%Y%m%d%H%M%S")))
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> ApplicationId {
        let sequence = self.next.fetch_add(1, Ordering::Relaxed);
        ApplicationId(format!("{}-{sequence:06}", self.prefix))
    }
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Which side of the archival flag a query should see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchivedScope {
    #[default]
    Exclude,
    Only,
    Include,
}

/// Course predicate supported by the stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CourseFilter {
    Exact(String),
    AnyOf(Vec<String>),
    Contains(String),
}

impl CourseFilter {
    /// Comma separated input selects membership, anything else a case-insensitive containment.
    pub fn from_query(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        if trimmed.contains(',') {
            let courses = trimmed
                .split(',')
                .map(str::trim)
                .filter(|course| !course.is_empty())
                .map(str::to_string)
                .collect();
            Some(CourseFilter::AnyOf(courses))
        } else {
            Some(CourseFilter::Contains(trimmed.to_string()))
        }
    }

    pub fn matches(&self, course: &str) -> bool {
        match self {
            CourseFilter::Exact(expected) => course == expected,
            CourseFilter::AnyOf(options) => options.iter().any(|option| option == course),
            CourseFilter::Contains(fragment) => course
                .to_lowercase()
                .contains(&fragment.to_lowercase()),
        }
    }
}

/// Query predicate over stored applications.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationFilter {
    pub submitted: Option<DateWindow>,
    pub status: Option<ApplicationStatus>,
    pub course: Option<CourseFilter>,
    pub archived: ArchivedScope,
    pub search: Option<String>,
}

impl ApplicationFilter {
    /// Every non-archived application.
    pub fn active() -> Self {
        Self::default()
    }

    pub fn archived_only() -> Self {
        Self {
            archived: ArchivedScope::Only,
            ..Self::default()
        }
    }

    pub fn within(window: DateWindow) -> Self {
        Self {
            submitted: Some(window),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: ApplicationStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_course(mut self, course: CourseFilter) -> Self {
        self.course = Some(course);
        self
    }

    pub fn matches(&self, record: &ApplicantRecord) -> bool {
        let archived_ok = match self.archived {
            ArchivedScope::Exclude => !record.archived,
            ArchivedScope::Only => record.archived,
            ArchivedScope::Include => true,
        };
        if !archived_ok {
            return false;
        }

        if let Some(window) = &self.submitted {
            if !window.contains(&record.submitted_at) {
                return false;
            }
        }

        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }

        if let Some(course) = &self.course {
            if !course.matches(&record.course_applied) {
                return false;
            }
        }

        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                record.name.to_lowercase().contains(&term)
                    || record.email.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }
}

/// Destination folders used by the media store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFolder {
    Photos,
    Signatures,
}

impl MediaFolder {
    pub const fn label(self) -> &'static str {
        match self {
            MediaFolder::Photos => "photos",
            MediaFolder::Signatures => "signatures",
        }
    }
}

/// Location of an uploaded asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub url: String,
}

/// Outbound file storage used for applicant photos and signatures.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn store(
        &self,
        folder: MediaFolder,
        upload: MediaUpload,
    ) -> Result<StoredMedia, MediaError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("upload to {folder} timed out after {seconds}s")]
    Timeout { folder: &'static str, seconds: u64 },
    #[error("upload rejected: {0}")]
    Rejected(String),
    #[error("media store unavailable: {0}")]
    Unavailable(String),
}

/// Outbound notification hook (e-mail queue or similar adapter).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient: &str, notification: Notification) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
