#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use admissions::workflows::analytics::{
    CourseTarget, TargetId, TargetKey, TargetQuery, TargetRepository, UpsertOutcome,
};
use admissions::workflows::applications::{
    ApplicantRecord, ApplicationFilter, ApplicationId, ApplicationRepository, ApplicationStatus,
    RepositoryError,
};
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::Request;
use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

#[derive(Default)]
pub struct SharedApplications {
    records: Mutex<Vec<ApplicantRecord>>,
    pub status_writes: Mutex<usize>,
}

impl SharedApplications {
    pub fn with(records: Vec<ApplicantRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            status_writes: Mutex::new(0),
        }
    }

    pub fn status_of(&self, id: &str) -> Option<ApplicationStatus> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|record| record.id.0 == id)
            .map(|record| record.status)
    }

    pub fn writes(&self) -> usize {
        *self.status_writes.lock().unwrap()
    }

    fn modify<F>(&self, id: &ApplicationId, apply: F) -> Result<ApplicantRecord, RepositoryError>
    where
        F: FnOnce(&mut ApplicantRecord),
    {
        let mut guard = self.records.lock().unwrap();
        let record = guard
            .iter_mut()
            .find(|record| &record.id == id)
            .ok_or(RepositoryError::NotFound)?;
        apply(record);
        Ok(record.clone())
    }
}

#[async_trait]
impl ApplicationRepository for SharedApplications {
    async fn insert(&self, record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicantRecord>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|record| &record.id == id)
            .cloned())
    }

    async fn find(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<ApplicantRecord>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<ApplicantRecord, RepositoryError> {
        *self.status_writes.lock().unwrap() += 1;
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
        let mut guard = self.records.lock().unwrap();
        let before = guard.len();
        guard.retain(|record| &record.id != id);
        if guard.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct SharedTargets {
    targets: Mutex<HashMap<TargetKey, CourseTarget>>,
    sequence: Mutex<u64>,
}

#[async_trait]
impl TargetRepository for SharedTargets {
    async fn find(&self, query: &TargetQuery) -> Result<Vec<CourseTarget>, RepositoryError> {
        Ok(self
            .targets
            .lock()
            .unwrap()
            .values()
            .filter(|target| query.matches(target))
            .cloned()
            .collect())
    }

    async fn fetch(&self, id: &TargetId) -> Result<Option<CourseTarget>, RepositoryError> {
        Ok(self
            .targets
            .lock()
            .unwrap()
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
        let mut guard = self.targets.lock().unwrap();
        if let Some(existing) = guard.get_mut(&key) {
            existing.target = target;
            existing.updated_by = Some(actor.to_string());
            existing.updated_at = now;
            return Ok(UpsertOutcome {
                target: existing.clone(),
                created: false,
            });
        }

        let mut sequence = self.sequence.lock().unwrap();
        *sequence += 1;
        let created = CourseTarget {
            id: TargetId(format!("target-{:04}", *sequence)),
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
        let mut guard = self.targets.lock().unwrap();
        let existing = guard
            .values_mut()
            .find(|stored| &stored.id == id)
            .ok_or(RepositoryError::NotFound)?;
        existing.target = target;
        existing.updated_by = Some(actor.to_string());
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }

    async fn delete(&self, id: &TargetId) -> Result<(), RepositoryError> {
        let mut guard = self.targets.lock().unwrap();
        let before = guard.len();
        guard.retain(|_, stored| &stored.id != id);
        if guard.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

pub fn applicant(
    id: &str,
    given: &str,
    last: &str,
    email: &str,
    dob: (i32, u32, u32),
    course: &str,
    status: ApplicationStatus,
    submitted: (i32, u32, u32),
) -> ApplicantRecord {
    ApplicantRecord {
        id: ApplicationId(id.to_string()),
        name: format!("{given} {last}"),
        given_name: Some(given.to_string()),
        middle_name: None,
        last_name: Some(last.to_string()),
        email: email.to_string(),
        contact: "09170000000".to_string(),
        course_applied: course.to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(dob.0, dob.1, dob.2),
        status,
        photo_url: String::new(),
        signature_url: String::new(),
        submitted_at: Utc
            .with_ymd_and_hms(submitted.0, submitted.1, submitted.2, 10, 0, 0)
            .unwrap(),
        archived: false,
        archived_at: None,
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn put_json(uri: &str, body: Value) -> Request<Body> {
    Request::put(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn delete(uri: &str) -> Request<Body> {
    Request::delete(uri).body(Body::empty()).unwrap()
}

pub async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}
