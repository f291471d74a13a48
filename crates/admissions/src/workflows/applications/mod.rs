//! Applicant intake, staff review, archival, and applicant notifications.

pub mod domain;
pub mod notifications;
pub mod repository;
pub mod router;
pub mod service;
pub mod views;

#[cfg(test)]
mod tests;

pub use domain::{
    normalize_email, ApplicantRecord, ApplicationId, ApplicationStatus, ApplicationSubmission,
    InvalidStatusError, MediaUpload,
};
pub use notifications::{default_missing_items, EmailMessage, Notification};
pub use repository::{
    ApplicationFilter, ApplicationRepository, ArchivedScope, CourseFilter, IdGenerator, MediaError,
    MediaFolder, MediaStore, Notifier, NotifyError, RepositoryError, SequentialIds, StoredMedia,
};
pub use router::application_router;
pub use service::{ApplicationQuery, ApplicationService, ApplicationServiceError};
pub use views::{
    breakdowns, ApplicationOverview, ApplicationPage, CourseCount, Pagination, StatusCount,
};
