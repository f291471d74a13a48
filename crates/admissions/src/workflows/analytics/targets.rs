use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::workflows::applications::RepositoryError;
use crate::workflows::calendar::AcademicTerm;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(pub String);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Enrollment goal for one course in one academic year and term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseTarget {
    pub id: TargetId,
    pub course_name: String,
    pub target: u32,
    pub academic_year: i32,
    pub term: AcademicTerm,
    pub is_active: bool,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CourseTarget {
    pub fn key(&self) -> TargetKey {
        TargetKey {
            course_name: self.course_name.clone(),
            academic_year: self.academic_year,
            term: self.term,
        }
    }
}

/// Uniqueness key of a course target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetKey {
    pub course_name: String,
    pub academic_year: i32,
    pub term: AcademicTerm,
}

/// Selection of targets for a year, optionally narrowed to one term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetQuery {
    pub academic_year: i32,
    pub term: Option<AcademicTerm>,
    pub active_only: bool,
}

impl TargetQuery {
    pub fn for_term(academic_year: i32, term: AcademicTerm) -> Self {
        Self {
            academic_year,
            term: Some(term),
            active_only: true,
        }
    }

    pub fn for_year(academic_year: i32) -> Self {
        Self {
            academic_year,
            term: None,
            active_only: false,
        }
    }

    pub fn matches(&self, target: &CourseTarget) -> bool {
        target.academic_year == self.academic_year
            && self.term.map_or(true, |term| target.term == term)
            && (!self.active_only || target.is_active)
    }
}

/// Ordered course → target seed table used when no persisted target exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultTargets {
    entries: Vec<(String, u32)>,
}

impl DefaultTargets {
    pub fn standard() -> Self {
        Self::new([
            ("Bachelor of Science in Marine Transportation", 50),
            ("Bachelor of Science in Marine Engineering", 40),
            ("Bachelor of Science in Nursing", 80),
            ("Bachelor of Early Childhood Education", 30),
            (
                "Bachelor of Technical-Vocational Teacher Education (Major in Food and Service Management)",
                25,
            ),
            ("Bachelor of Science in Entrepreneurship", 35),
            ("Bachelor of Science in Management Accounting", 30),
            ("Bachelor of Science in Information System", 45),
            ("Bachelor of Science in Tourism Management", 40),
            ("Bachelor of Science in Criminology", 60),
        ])
    }

    /// Later duplicates of a course name are ignored.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let entries = entries
            .into_iter()
            .map(|(course, target)| (course.into(), target))
            .filter(|(course, _)| seen.insert(course.clone()))
            .collect();
        Self { entries }
    }

    /// Parses a JSON object of course name to target, keeping the file's key order.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.entries
            .iter()
            .map(|(course, target)| (course.as_str(), *target))
    }

    pub fn get(&self, course: &str) -> Option<u32> {
        self.iter()
            .find(|(name, _)| *name == course)
            .map(|(_, target)| target)
    }
}

impl Default for DefaultTargets {
    fn default() -> Self {
        Self::standard()
    }
}

impl<'de> Deserialize<'de> for DefaultTargets {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = DefaultTargets;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of course name to non-negative target")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries: Vec<(String, u32)> = Vec::new();
                while let Some((course, target)) = access.next_entry::<String, u32>()? {
                    entries.push((course, target));
                }
                Ok(DefaultTargets::new(entries))
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

/// Persistence collaborator for course targets.
#[async_trait]
pub trait TargetRepository: Send + Sync {
    async fn find(&self, query: &TargetQuery) -> Result<Vec<CourseTarget>, RepositoryError>;
    async fn fetch(&self, id: &TargetId) -> Result<Option<CourseTarget>, RepositoryError>;
    /// Creates or updates the target stored under `key`.
    async fn upsert(
        &self,
        key: TargetKey,
        target: u32,
        actor: &str,
    ) -> Result<UpsertOutcome, RepositoryError>;
    async fn update_target(
        &self,
        id: &TargetId,
        target: u32,
        actor: &str,
    ) -> Result<CourseTarget, RepositoryError>;
    async fn delete(&self, id: &TargetId) -> Result<(), RepositoryError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub target: CourseTarget,
    pub created: bool,
}

/// Body of a single create-or-update request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetRequest {
    #[serde(default)]
    pub course_name: Option<String>,
    #[serde(default)]
    pub target: Option<u32>,
    #[serde(default)]
    pub academic_year: Option<i32>,
    #[serde(default)]
    pub term: Option<AcademicTerm>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetEntry {
    #[serde(default)]
    pub course_name: Option<String>,
    #[serde(default)]
    pub target: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkTargetRequest {
    pub targets: Vec<TargetEntry>,
    #[serde(default)]
    pub academic_year: Option<i32>,
    #[serde(default)]
    pub term: Option<AcademicTerm>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkOutcome {
    pub targets: Vec<CourseTarget>,
    pub count: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum TargetServiceError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub const SYSTEM_ACTOR: &str = "system";

/// Administers course targets and seeds the default table.
pub struct CourseTargetService<T> {
    repository: Arc<T>,
    defaults: DefaultTargets,
}

impl<T> CourseTargetService<T>
where
    T: TargetRepository + 'static,
{
    pub fn new(repository: Arc<T>, defaults: DefaultTargets) -> Self {
        Self {
            repository,
            defaults,
        }
    }

    pub fn defaults(&self) -> &DefaultTargets {
        &self.defaults
    }

    /// Active targets for the year sorted by course name; `None` spans every term.
    pub async fn list(
        &self,
        academic_year: i32,
        term: Option<AcademicTerm>,
    ) -> Result<Vec<CourseTarget>, TargetServiceError> {
        let query = TargetQuery {
            academic_year,
            term,
            active_only: true,
        };
        let mut targets = self.repository.find(&query).await?;
        targets.sort_by(|a, b| a.course_name.cmp(&b.course_name));
        Ok(targets)
    }

    pub async fn upsert(
        &self,
        request: TargetRequest,
        actor: &str,
    ) -> Result<UpsertOutcome, TargetServiceError> {
        let (Some(course_name), Some(target)) = (
            request.course_name.as_deref().map(str::trim).filter(|name| !name.is_empty()),
            request.target,
        ) else {
            return Err(TargetServiceError::Validation(
                "Course name and target are required".to_string(),
            ));
        };

        let key = TargetKey {
            course_name: course_name.to_string(),
            academic_year: request.academic_year.unwrap_or_else(current_year),
            term: request.term.unwrap_or_default(),
        };
        let outcome = self.repository.upsert(key, target, actor).await?;
        info!(
            course = %outcome.target.course_name,
            year = outcome.target.academic_year,
            term = %outcome.target.term,
            target = outcome.target.target,
            created = outcome.created,
            "course target saved"
        );
        Ok(outcome)
    }

    /// Saves every valid entry for one year/term, skipping entries without a name or target.
    pub async fn bulk_upsert(
        &self,
        request: BulkTargetRequest,
        actor: &str,
    ) -> Result<BulkOutcome, TargetServiceError> {
        let academic_year = request.academic_year.unwrap_or_else(current_year);
        let term = request.term.unwrap_or_default();

        let mut saved = Vec::new();
        for entry in request.targets {
            let (Some(course_name), Some(target)) = (
                entry
                    .course_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|name| !name.is_empty()),
                entry.target,
            ) else {
                continue;
            };

            let key = TargetKey {
                course_name: course_name.to_string(),
                academic_year,
                term,
            };
            saved.push(self.repository.upsert(key, target, actor).await?.target);
        }

        info!(year = academic_year, term = %term, count = saved.len(), "course targets bulk saved");
        let count = saved.len();
        Ok(BulkOutcome {
            targets: saved,
            count,
        })
    }

    pub async fn update(
        &self,
        id: &TargetId,
        target: Option<u32>,
        actor: &str,
    ) -> Result<CourseTarget, TargetServiceError> {
        let target = target
            .ok_or_else(|| TargetServiceError::Validation("Target value is required".to_string()))?;
        let updated = self.repository.update_target(id, target, actor).await?;
        Ok(updated)
    }

    pub async fn delete(&self, id: &TargetId) -> Result<(), TargetServiceError> {
        self.repository.delete(id).await?;
        Ok(())
    }

    /// Creates `all`-term targets from the default table when the year has none yet.
    pub async fn seed_defaults(&self, academic_year: i32) -> Result<usize, TargetServiceError> {
        let existing = self
            .repository
            .find(&TargetQuery::for_year(academic_year))
            .await?;
        if !existing.is_empty() {
            return Ok(0);
        }

        let mut created = 0;
        for (course_name, target) in self.defaults.iter() {
            let key = TargetKey {
                course_name: course_name.to_string(),
                academic_year,
                term: AcademicTerm::All,
            };
            if self.repository.upsert(key, target, SYSTEM_ACTOR).await?.created {
                created += 1;
            }
        }

        info!(year = academic_year, created, "default course targets seeded");
        Ok(created)
    }
}

fn current_year() -> i32 {
    Utc::now().year()
}
