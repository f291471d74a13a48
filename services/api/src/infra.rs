use admissions::workflows::analytics::{
    CourseTarget, TargetId, TargetKey, TargetQuery, TargetRepository, UpsertOutcome,
};
use admissions::workflows::applications::{
    ApplicantRecord, ApplicationFilter, ApplicationId, ApplicationRepository, ApplicationStatus,
    EmailMessage, MediaError, MediaFolder, MediaStore, MediaUpload, Notification, Notifier,
    NotifyError, RepositoryError, StoredMedia,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryApplicationRepository {
    records: Arc<Mutex<BTreeMap<ApplicationId, ApplicantRecord>>>,
}

impl InMemoryApplicationRepository {
    pub(crate) fn from_records(records: Vec<ApplicantRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();
        Self {
            records: Arc::new(Mutex::new(records)),
        }
    }

    pub(crate) fn snapshot(&self) -> Result<Vec<ApplicantRecord>, RepositoryError> {
        Ok(lock(&self.records)?.values().cloned().collect())
    }

    fn modify<F>(&self, id: &ApplicationId, apply: F) -> Result<ApplicantRecord, RepositoryError>
    where
        F: FnOnce(&mut ApplicantRecord),
    {
        let mut guard = lock(&self.records)?;
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        apply(record);
        Ok(record.clone())
    }
}

#[async_trait]
impl ApplicationRepository for InMemoryApplicationRepository {
    async fn insert(&self, record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError> {
        let mut guard = lock(&self.records)?;
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicantRecord>, RepositoryError> {
        Ok(lock(&self.records)?.get(id).cloned())
    }

    async fn find(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<ApplicantRecord>, RepositoryError> {
        Ok(lock(&self.records)?
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
        self.modify(id, |record| record.status = status)
    }

    async fn set_archived(
        &self,
        id: &ApplicationId,
        archived_at: Option<DateTime<Utc>>,
    ) -> Result<ApplicantRecord, RepositoryError> {
        self.modify(id, |record| {
            record.archived = archived_at.is_some();
            record.archived_at = archived_at;
        })
    }

    async fn delete(&self, id: &ApplicationId) -> Result<(), RepositoryError> {
        lock(&self.records)?
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryTargetRepository {
    targets: Arc<Mutex<HashMap<TargetKey, CourseTarget>>>,
    sequence: Arc<AtomicU64>,
}

#[async_trait]
impl TargetRepository for InMemoryTargetRepository {
    async fn find(&self, query: &TargetQuery) -> Result<Vec<CourseTarget>, RepositoryError> {
        Ok(lock(&self.targets)?
            .values()
            .filter(|target| query.matches(target))
            .cloned()
            .collect())
    }

    async fn fetch(&self, id: &TargetId) -> Result<Option<CourseTarget>, RepositoryError> {
        Ok(lock(&self.targets)?
            .values()
            .find(|target| &target.id == id)
            .cloned())
    }

    async fn upsert(
        &self,
        key: TargetKey,
        target: u32,
        actor: &str,
    ) -> Result<UpsertOutcome, RepositoryError> {
        let now = Utc::now();
        let mut guard = lock(&self.targets)?;
        if let Some(existing) = guard.get_mut(&key) {
            existing.target = target;
            existing.is_active = true;
            existing.updated_by = Some(actor.to_string());
            existing.updated_at = now;
            return Ok(UpsertOutcome {
                target: existing.clone(),
                created: false,
            });
        }

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let created = CourseTarget {
            id: TargetId(format!("target-{sequence:06}")),
            course_name: key.course_name.clone(),
            target,
            academic_year: key.academic_year,
            term: key.term,
            is_active: true,
            created_by: Some(actor.to_string()),
            updated_by: Some(actor.to_string()),
            created_at: now,
            updated_at: now,
        };
        guard.insert(key, created.clone());
        Ok(UpsertOutcome {
            target: created,
            created: true,
        })
    }

    async fn update_target(
        &self,
        id: &TargetId,
        target: u32,
        actor: &str,
    ) -> Result<CourseTarget, RepositoryError> {
        let mut guard = lock(&self.targets)?;
        let stored = guard
            .values_mut()
            .find(|stored| &stored.id == id)
            .ok_or(RepositoryError::NotFound)?;
        stored.target = target;
        stored.updated_by = Some(actor.to_string());
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete(&self, id: &TargetId) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.targets)?;
        let before = guard.len();
        guard.retain(|_, stored| &stored.id != id);
        if guard.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Keeps uploaded photos and signatures in process memory under `memory://` URLs.
#[derive(Default, Clone)]
pub(crate) struct InMemoryMediaStore {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    sequence: Arc<AtomicU64>,
}

impl InMemoryMediaStore {
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.objects.lock().map(|guard| guard.len()).unwrap_or(0)
    }
}

#[async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn store(
        &self,
        folder: MediaFolder,
        upload: MediaUpload,
    ) -> Result<StoredMedia, MediaError> {
        if upload.is_empty() {
            return Err(MediaError::Rejected(format!(
                "{} is empty",
                upload.file_name
            )));
        }

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let url = format!(
            "memory://{}/{sequence:06}-{}",
            folder.label(),
            upload.file_name
        );
        self.objects
            .lock()
            .map_err(|_| MediaError::Unavailable("media mutex poisoned".to_string()))?
            .insert(url.clone(), upload.bytes);
        Ok(StoredMedia { url })
    }
}

/// Renders notifications with the institution name and queues them instead of sending.
#[derive(Clone)]
pub(crate) struct OutboxNotifier {
    institution: String,
    outbox: Arc<Mutex<Vec<(String, EmailMessage)>>>,
}

impl OutboxNotifier {
    pub(crate) fn new(institution: impl Into<String>) -> Self {
        Self {
            institution: institution.into(),
            outbox: Arc::new(Mutex::new(Vec::new())),
        }
    }

    #[cfg(test)]
    pub(crate) fn sent(&self) -> Vec<(String, EmailMessage)> {
        self.outbox
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn notify(&self, recipient: &str, notification: Notification) -> Result<(), NotifyError> {
        let message = notification.render(&self.institution);
        info!(
            recipient,
            template = notification.template(),
            subject = %message.subject,
            "notification queued"
        );
        self.outbox
            .lock()
            .map_err(|_| NotifyError::Transport("outbox mutex poisoned".to_string()))?
            .push((recipient.to_string(), message));
        Ok(())
    }
}

pub(crate) fn read_applications(path: &Path) -> Result<Vec<ApplicantRecord>, std::io::Error> {
    let raw = std::fs::read(path)?;
    Ok(serde_json::from_slice(&raw)?)
}

pub(crate) fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), std::io::Error> {
    let rendered = serde_json::to_vec_pretty(value)?;
    std::fs::write(path, rendered)
}
