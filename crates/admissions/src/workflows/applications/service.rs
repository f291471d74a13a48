use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use super::domain::{
    normalize_email, ApplicantRecord, ApplicationId, ApplicationStatus, ApplicationSubmission,
    InvalidStatusError, MediaUpload,
};
use super::notifications::{default_missing_items, Notification};
use super::repository::{
    ApplicationFilter, ApplicationRepository, ArchivedScope, CourseFilter, IdGenerator,
    MediaError, MediaFolder, MediaStore, Notifier, RepositoryError, SequentialIds, StoredMedia,
};
use super::views::{breakdowns, ApplicationOverview, ApplicationPage, Pagination};
use crate::config::IntakeConfig;

/// Listing parameters accepted by [`ApplicationService::list`].
#[derive(Debug, Clone)]
pub struct ApplicationQuery {
    pub status: Option<ApplicationStatus>,
    pub course: Option<String>,
    pub search: Option<String>,
    pub page: usize,
    pub limit: usize,
}

impl Default for ApplicationQuery {
    fn default() -> Self {
        Self {
            status: None,
            course: None,
            search: None,
            page: 1,
            limit: 10,
        }
    }
}

/// Service composing the repository, media store, and notifier for applicant intake and review.
pub struct ApplicationService<R, M, N> {
    repository: Arc<R>,
    media: Arc<M>,
    notifier: Arc<N>,
    ids: Arc<dyn IdGenerator>,
    intake: IntakeConfig,
}

fn required(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value.as_deref().and_then(required)
}

impl<R, M, N> ApplicationService<R, M, N>
where
    R: ApplicationRepository + 'static,
    M: MediaStore + 'static,
    N: Notifier + 'static,
{
    pub fn new(repository: Arc<R>, media: Arc<M>, notifier: Arc<N>, intake: IntakeConfig) -> Self {
        Self {
            repository,
            media,
            notifier,
            ids: Arc::new(SequentialIds::stamped(Utc::now())),
            intake,
        }
    }

    /// Replaces the default time-stamped id sequence.
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn intake(&self) -> &IntakeConfig {
        &self.intake
    }

    /// Validate a submission, upload its media, and persist it as `pending`.
    pub async fn submit(
        &self,
        submission: ApplicationSubmission,
    ) -> Result<ApplicantRecord, ApplicationServiceError> {
        let ApplicationSubmission {
            name,
            given_name,
            middle_name,
            last_name,
            email,
            contact,
            course_applied,
            date_of_birth,
            photo,
            signature,
        } = submission;

        let (Some(name), Some(email), Some(contact), Some(course_applied)) = (
            required(&name),
            required(&email),
            required(&contact),
            required(&course_applied),
        ) else {
            return Err(ApplicationServiceError::Validation(
                "Name, email, contact, and course are required".to_string(),
            ));
        };

        let (Some(photo), Some(signature)) = (
            photo.filter(|upload| !upload.is_empty()),
            signature.filter(|upload| !upload.is_empty()),
        ) else {
            return Err(ApplicationServiceError::Validation(
                "Photo and signature are required".to_string(),
            ));
        };

        for (field, upload) in [("photo", &photo), ("signature", &signature)] {
            if upload.len() > self.intake.max_upload_bytes {
                return Err(ApplicationServiceError::Validation(format!(
                    "{field} exceeds the {} byte upload limit",
                    self.intake.max_upload_bytes
                )));
            }
        }

        let (photo, signature) = tokio::try_join!(
            self.upload(MediaFolder::Photos, photo),
            self.upload(MediaFolder::Signatures, signature),
        )?;

        let record = ApplicantRecord {
            id: self.ids.next_id(),
            name,
            given_name: optional(given_name),
            middle_name: optional(middle_name),
            last_name: optional(last_name),
            email: normalize_email(&email),
            contact,
            course_applied,
            date_of_birth,
            status: ApplicationStatus::Pending,
            photo_url: photo.url,
            signature_url: signature.url,
            submitted_at: Utc::now(),
            archived: false,
            archived_at: None,
        };

        let stored = self.repository.insert(record).await?;
        info!(application_id = %stored.id, course = %stored.course_applied, "application submitted");

        self.send(
            &stored.email,
            Notification::SubmissionConfirmation {
                name: stored.name.clone(),
                application_id: stored.id.clone(),
            },
        )
        .await;

        Ok(stored)
    }

    async fn upload(
        &self,
        folder: MediaFolder,
        upload: MediaUpload,
    ) -> Result<StoredMedia, MediaError> {
        let timeout = self.intake.upload_timeout();
        match tokio::time::timeout(timeout, self.media.store(folder, upload)).await {
            Ok(result) => result,
            Err(_) => Err(MediaError::Timeout {
                folder: folder.label(),
                seconds: timeout.as_secs(),
            }),
        }
    }

    /// Non-archived applications, newest first, one page at a time.
    pub async fn list(
        &self,
        query: ApplicationQuery,
    ) -> Result<ApplicationPage, ApplicationServiceError> {
        let filter = ApplicationFilter {
            status: query.status,
            course: query.course.as_deref().and_then(CourseFilter::from_query),
            search: query.search.clone(),
            ..ApplicationFilter::active()
        };

        let mut records = self.repository.find(&filter).await?;
        records.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(paginate(records, query.page, query.limit))
    }

    pub async fn archived(
        &self,
        page: usize,
        limit: usize,
    ) -> Result<ApplicationPage, ApplicationServiceError> {
        let mut records = self
            .repository
            .find(&ApplicationFilter::archived_only())
            .await?;
        records.sort_by(|a, b| {
            b.archived_at
                .cmp(&a.archived_at)
                .then_with(|| b.submitted_at.cmp(&a.submitted_at))
        });
        Ok(paginate(records, page, limit))
    }

    pub async fn get(
        &self,
        application_id: &ApplicationId,
    ) -> Result<ApplicantRecord, ApplicationServiceError> {
        let record = self
            .repository
            .fetch(application_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    /// Apply a staff status decision and notify the applicant where a template exists.
    pub async fn update_status(
        &self,
        application_id: &ApplicationId,
        raw_status: &str,
    ) -> Result<ApplicantRecord, ApplicationServiceError> {
        let status: ApplicationStatus = raw_status.parse()?;
        let record = self
            .repository
            .update_status(application_id, status)
            .await?;
        info!(application_id = %record.id, status = %status, "application status updated");

        let notification = match status {
            ApplicationStatus::Incomplete => Some(Notification::MissingRequirements {
                name: record.name.clone(),
                missing_items: default_missing_items(),
            }),
            ApplicationStatus::Admitted | ApplicationStatus::Rejected => {
                Some(Notification::AdmissionResult {
                    name: record.name.clone(),
                    status,
                    course: record.course_applied.clone(),
                })
            }
            _ => None,
        };

        if let Some(notification) = notification {
            self.send(&record.email, notification).await;
        }

        Ok(record)
    }

    pub async fn archive(
        &self,
        application_id: &ApplicationId,
    ) -> Result<ApplicantRecord, ApplicationServiceError> {
        let record = self
            .repository
            .set_archived(application_id, Some(Utc::now()))
            .await?;
        Ok(record)
    }

    pub async fn unarchive(
        &self,
        application_id: &ApplicationId,
    ) -> Result<ApplicantRecord, ApplicationServiceError> {
        let record = self.repository.set_archived(application_id, None).await?;
        Ok(record)
    }

    pub async fn delete(&self, application_id: &ApplicationId) -> Result<(), ApplicationServiceError> {
        self.repository.delete(application_id).await?;
        Ok(())
    }

    /// Totals across every stored application, archived included.
    pub async fn overview(
        &self,
        now: DateTime<Utc>,
    ) -> Result<ApplicationOverview, ApplicationServiceError> {
        let filter = ApplicationFilter {
            archived: ArchivedScope::Include,
            ..ApplicationFilter::default()
        };
        let records = self.repository.find(&filter).await?;

        let recent_cutoff = now - Duration::days(7);
        let recent_applications = records
            .iter()
            .filter(|record| record.submitted_at >= recent_cutoff)
            .count();

        let (status_breakdown, course_breakdown) = breakdowns(&records);

        Ok(ApplicationOverview {
            total_applications: records.len(),
            recent_applications,
            status_breakdown,
            course_breakdown,
        })
    }

    async fn send(&self, recipient: &str, notification: Notification) {
        let template = notification.template();
        if let Err(err) = self.notifier.notify(recipient, notification).await {
            warn!(%recipient, template, error = %err, "failed to send applicant notification");
        }
    }
}

fn paginate(records: Vec<ApplicantRecord>, page: usize, limit: usize) -> ApplicationPage {
    let page = page.max(1);
    let limit = limit.max(1);
    let total = records.len();
    let applications = records
        .into_iter()
        .skip((page - 1).saturating_mul(limit))
        .take(limit)
        .collect();

    ApplicationPage {
        applications,
        pagination: Pagination::new(page, limit, total),
    }
}

/// Error raised by the application service.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationServiceError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    InvalidStatus(#[from] InvalidStatusError),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
