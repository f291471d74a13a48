use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::to_bytes;
use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::config::IntakeConfig;
use crate::workflows::applications::{
    ApplicantRecord, ApplicationFilter, ApplicationId, ApplicationRepository, ApplicationService,
    ApplicationStatus, ApplicationSubmission, MediaError, MediaFolder, MediaStore, MediaUpload,
    Notification, Notifier, NotifyError, RepositoryError, StoredMedia,
};

#[derive(Default)]
pub(super) struct MemoryRepository {
    records: Mutex<HashMap<ApplicationId, ApplicantRecord>>,
}

impl MemoryRepository {
    pub(super) fn stored(&self, id: &ApplicationId) -> Option<ApplicantRecord> {
        self.records.lock().unwrap().get(id).cloned()
    }

    pub(super) fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    fn update<F>(&self, id: &ApplicationId, apply: F) -> Result<ApplicantRecord, RepositoryError>
    where
        F: FnOnce(&mut ApplicantRecord),
    {
        let mut guard = self.records.lock().unwrap();
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        apply(record);
        Ok(record.clone())
    }
}

#[async_trait]
impl ApplicationRepository for MemoryRepository {
    async fn insert(&self, record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError> {
        let mut guard = self.records.lock().unwrap();
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicantRecord>, RepositoryError> {
        Ok(self.stored(id))
    }

    async fn find(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<ApplicantRecord>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<ApplicantRecord, RepositoryError> {
        self.update(id, |record| record.status = status)
    }

    async fn set_archived(
        &self,
        id: &ApplicationId,
        archived_at: Option<DateTime<Utc>>,
    ) -> Result<ApplicantRecord, RepositoryError> {
        self.update(id, |record| {
            record.archived = archived_at.is_some();
            record.archived_at = archived_at;
        })
    }

    async fn delete(&self, id: &ApplicationId) -> Result<(), RepositoryError> {
        self.records
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

#[derive(Default)]
pub(super) struct MemoryMedia {
    pub(super) uploads: Mutex<Vec<(MediaFolder, String)>>,
    pub(super) delay: Option<Duration>,
}

#[async_trait]
impl MediaStore for MemoryMedia {
    async fn store(
        &self,
        folder: MediaFolder,
        upload: MediaUpload,
    ) -> Result<StoredMedia, MediaError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.uploads
            .lock()
            .unwrap()
            .push((folder, upload.file_name.clone()));
        Ok(StoredMedia {
            url: format!("memory://{}/{}", folder.label(), upload.file_name),
        })
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifier {
    pub(super) sent: Mutex<Vec<(String, Notification)>>,
    pub(super) fail: bool,
}

impl MemoryNotifier {
    pub(super) fn templates(&self) -> Vec<&'static str> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, notification)| notification.template())
            .collect()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn notify(&self, recipient: &str, notification: Notification) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Transport("smtp offline".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), notification));
        Ok(())
    }
}

pub(super) type MemoryService = ApplicationService<MemoryRepository, MemoryMedia, MemoryNotifier>;

pub(super) struct Harness {
    pub(super) service: Arc<MemoryService>,
    pub(super) repository: Arc<MemoryRepository>,
    pub(super) media: Arc<MemoryMedia>,
    pub(super) notifier: Arc<MemoryNotifier>,
}

pub(super) fn harness_with(media: MemoryMedia, notifier: MemoryNotifier, intake: IntakeConfig) -> Harness {
    let repository = Arc::new(MemoryRepository::default());
    let media = Arc::new(media);
    let notifier = Arc::new(notifier);
    let service = Arc::new(ApplicationService::new(
        Arc::clone(&repository),
        Arc::clone(&media),
        Arc::clone(&notifier),
        intake,
    ));
    Harness {
        service,
        repository,
        media,
        notifier,
    }
}

pub(super) fn harness() -> Harness {
    harness_with(
        MemoryMedia::default(),
        MemoryNotifier::default(),
        IntakeConfig::default(),
    )
}

pub(super) fn upload(file_name: &str, size: usize) -> MediaUpload {
    MediaUpload {
        file_name: file_name.to_string(),
        content_type: Some("image/png".to_string()),
        bytes: vec![7; size],
    }
}

pub(super) fn submission() -> ApplicationSubmission {
    ApplicationSubmission {
        name: "Ana Cruz".to_string(),
        given_name: Some("Ana".to_string()),
        middle_name: None,
        last_name: Some("Cruz".to_string()),
        email: "  Ana.Cruz@Example.COM ".to_string(),
        contact: "09171234567".to_string(),
        course_applied: "Bachelor of Science in Nursing".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(2004, 5, 17),
        photo: Some(upload("photo.png", 64)),
        signature: Some(upload("signature.png", 32)),
    }
}

pub(super) fn record(
    id: &str,
    name: &str,
    course: &str,
    status: ApplicationStatus,
    submitted: (i32, u32, u32),
) -> ApplicantRecord {
    ApplicantRecord {
        id: ApplicationId(id.to_string()),
        name: name.to_string(),
        given_name: None,
        middle_name: None,
        last_name: None,
        email: format!("{}@example.com", id),
        contact: "09170000000".to_string(),
        course_applied: course.to_string(),
        date_of_birth: None,
        status,
        photo_url: String::new(),
        signature_url: String::new(),
        submitted_at: Utc
            .with_ymd_and_hms(submitted.0, submitted.1, submitted.2, 9, 0, 0)
            .unwrap(),
        archived: false,
        archived_at: None,
    }
}

pub(super) async fn seed(repository: &MemoryRepository, records: Vec<ApplicantRecord>) {
    for record in records {
        repository.insert(record).await.expect("seed record");
    }
}

pub(super) async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}
