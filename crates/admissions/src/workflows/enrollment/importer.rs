use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::info;

use super::columns::{resolve_columns, ColumnResolutionError};
use super::matcher::match_rows;
use super::parser::parse_sheet;
use super::views::ImportSummary;
use super::workbook::{is_workbook, parse_workbook};
use crate::config::ImportConfig;
use crate::workflows::applications::{
    ApplicationFilter, ApplicationId, ApplicationRepository, ApplicationStatus, RepositoryError,
};

#[derive(Debug, thiserror::Error)]
pub enum EnrollmentImportError {
    #[error("invalid registrar CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("unreadable registrar workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("the uploaded file does not contain any data rows")]
    EmptyFile,
    #[error(transparent)]
    Columns(#[from] ColumnResolutionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Reconciles registrar uploads against stored applications and marks matches as enrolled.
pub struct EnrollmentImporter<R> {
    repository: Arc<R>,
    config: ImportConfig,
}

impl<R> EnrollmentImporter<R>
where
    R: ApplicationRepository + 'static,
{
    pub fn new(repository: Arc<R>, config: ImportConfig) -> Self {
        Self { repository, config }
    }

    pub async fn import_batch(&self, bytes: &[u8]) -> Result<ImportSummary, EnrollmentImportError> {
        let sheet = if is_workbook(bytes) {
            parse_workbook(bytes)?
        } else {
            parse_sheet(bytes)?
        };
        if sheet.rows.is_empty() {
            return Err(EnrollmentImportError::EmptyFile);
        }
        let columns = resolve_columns(&sheet.headers)?;

        let candidates = self.repository.find(&ApplicationFilter::active()).await?;
        let report = match_rows(sheet.rows, &columns, &candidates);

        let enrolled: Vec<ApplicationId> = report
            .matched
            .iter()
            .map(|matched| matched.candidate.id.clone())
            .collect();
        self.enroll(enrolled).await?;

        let summary = ImportSummary::from_report(&report, self.config.unmatched_sample_limit);
        info!(
            total_rows = summary.summary.total_rows,
            matched = summary.summary.matched_and_updated,
            already_enrolled = summary.summary.already_enrolled,
            unmatched = summary.summary.unmatched,
            "enrollment import completed"
        );
        Ok(summary)
    }

    /// Every status write runs concurrently; the first failure is reported once all have settled.
    async fn enroll(&self, ids: Vec<ApplicationId>) -> Result<(), EnrollmentImportError> {
        let mut writes = JoinSet::new();
        for id in ids {
            let repository = Arc::clone(&self.repository);
            writes.spawn(async move {
                repository
                    .update_status(&id, ApplicationStatus::Enrolled)
                    .await
            });
        }

        let mut failure: Option<RepositoryError> = None;
        while let Some(joined) = writes.join_next().await {
            let outcome = joined.map_err(|err| RepositoryError::Unavailable(err.to_string()));
            if let Err(err) = outcome.and_then(|result| result.map(|_| ())) {
                failure.get_or_insert(err);
            }
        }

        match failure {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}
