use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use super::domain::{ApplicationId, ApplicationStatus, ApplicationSubmission, MediaUpload};
use super::repository::{ApplicationRepository, MediaStore, Notifier};
use super::service::{ApplicationQuery, ApplicationService, ApplicationServiceError};
use super::views::{ApplicationOverview, ApplicationPage};
use crate::error::AppError;

/// Slack on top of the two media limits for the text fields of the form.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

type SharedService<R, M, N> = State<Arc<ApplicationService<R, M, N>>>;

/// Router builder exposing applicant intake and staff review endpoints.
pub fn application_router<R, M, N>(service: Arc<ApplicationService<R, M, N>>) -> Router
where
    R: ApplicationRepository + 'static,
    M: MediaStore + 'static,
    N: Notifier + 'static,
{
    let body_limit = service
        .intake()
        .max_upload_bytes
        .saturating_mul(2)
        .saturating_add(FORM_OVERHEAD_BYTES);

    Router::new()
        .route(
            "/api/v1/applications",
            post(submit_handler::<R, M, N>).get(list_handler::<R, M, N>),
        )
        .route(
            "/api/v1/applications/archived",
            get(archived_handler::<R, M, N>),
        )
        .route(
            "/api/v1/applications/stats/overview",
            get(overview_handler::<R, M, N>),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(get_handler::<R, M, N>).delete(delete_handler::<R, M, N>),
        )
        .route(
            "/api/v1/applications/:application_id/status",
            patch(status_handler::<R, M, N>),
        )
        .route(
            "/api/v1/applications/:application_id/archive",
            patch(archive_handler::<R, M, N>),
        )
        .route(
            "/api/v1/applications/:application_id/unarchive",
            patch(unarchive_handler::<R, M, N>),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(service)
}

fn invalid_form(err: impl std::fmt::Display) -> ApplicationServiceError {
    ApplicationServiceError::Validation(format!("invalid application form: {err}"))
}

/// Collects the multipart form into a submission; unknown fields are ignored.
async fn read_submission(mut multipart: Multipart) -> Result<ApplicationSubmission, AppError> {
    let mut submission = ApplicationSubmission::default();

    while let Some(field) = multipart.next_field().await.map_err(invalid_form)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "photo" | "signature" => {
                let file_name = field.file_name().unwrap_or(name.as_str()).to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(invalid_form)?.to_vec();
                let upload = MediaUpload {
                    file_name,
                    content_type,
                    bytes,
                };
                if name == "photo" {
                    submission.photo = Some(upload);
                } else {
                    submission.signature = Some(upload);
                }
            }
            _ => {
                let value = field.text().await.map_err(invalid_form)?;
                apply_text_field(&mut submission, &name, value)?;
            }
        }
    }

    Ok(submission)
}

fn apply_text_field(
    submission: &mut ApplicationSubmission,
    name: &str,
    value: String,
) -> Result<(), ApplicationServiceError> {
    match name {
        "name" => submission.name = value,
        "givenName" => submission.given_name = Some(value),
        "middleName" => submission.middle_name = Some(value),
        "lastName" => submission.last_name = Some(value),
        "email" => submission.email = value,
        "contact" => submission.contact = value,
        "courseApplied" => submission.course_applied = value,
        "dateOfBirth" if !value.trim().is_empty() => {
            let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
                ApplicationServiceError::Validation(format!(
                    "dateOfBirth must be formatted as YYYY-MM-DD (got '{value}')"
                ))
            })?;
            submission.date_of_birth = Some(date);
        }
        _ => {}
    }
    Ok(())
}

async fn submit_handler<R, M, N>(
    State(service): SharedService<R, M, N>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), AppError>
where
    R: ApplicationRepository + 'static,
    M: MediaStore + 'static,
    N: Notifier + 'static,
{
    let submission = read_submission(multipart).await?;
    let record = service.submit(submission).await?;
    let payload = json!({
        "message": "Application submitted successfully",
        "application": record,
    });
    Ok((StatusCode::CREATED, Json(payload)))
}

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    status: Option<String>,
    course: Option<String>,
    search: Option<String>,
    page: Option<usize>,
    limit: Option<usize>,
}

impl ListParams {
    fn into_query(self) -> Result<ApplicationQuery, ApplicationServiceError> {
        let defaults = ApplicationQuery::default();
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(raw) => Some(raw.parse::<ApplicationStatus>()?),
        };
        Ok(ApplicationQuery {
            status,
            course: self.course,
            search: self.search,
            page: self.page.unwrap_or(defaults.page),
            limit: self.limit.unwrap_or(defaults.limit),
        })
    }
}

async fn list_handler<R, M, N>(
    State(service): SharedService<R, M, N>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApplicationPage>, AppError>
where
    R: ApplicationRepository + 'static,
    M: MediaStore + 'static,
    N: Notifier + 'static,
{
    let page = service.list(params.into_query()?).await?;
    Ok(Json(page))
}

async fn archived_handler<R, M, N>(
    State(service): SharedService<R, M, N>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApplicationPage>, AppError>
where
    R: ApplicationRepository + 'static,
    M: MediaStore + 'static,
    N: Notifier + 'static,
{
    let defaults = ApplicationQuery::default();
    let page = service
        .archived(
            params.page.unwrap_or(defaults.page),
            params.limit.unwrap_or(defaults.limit),
        )
        .await?;
    Ok(Json(page))
}

async fn overview_handler<R, M, N>(
    State(service): SharedService<R, M, N>,
) -> Result<Json<ApplicationOverview>, AppError>
where
    R: ApplicationRepository + 'static,
    M: MediaStore + 'static,
    N: Notifier + 'static,
{
    let overview = service.overview(Utc::now()).await?;
    Ok(Json(overview))
}

async fn get_handler<R, M, N>(
    State(service): SharedService<R, M, N>,
    Path(application_id): Path<String>,
) -> Result<Json<Value>, AppError>
where
    R: ApplicationRepository + 'static,
    M: MediaStore + 'static,
    N: Notifier + 'static,
{
    let record = service.get(&ApplicationId(application_id)).await?;
    Ok(Json(json!(record)))
}

async fn delete_handler<R, M, N>(
    State(service): SharedService<R, M, N>,
    Path(application_id): Path<String>,
) -> Result<Json<Value>, AppError>
where
    R: ApplicationRepository + 'static,
    M: MediaStore + 'static,
    N: Notifier + 'static,
{
    service.delete(&ApplicationId(application_id)).await?;
    Ok(Json(json!({ "message": "Application deleted successfully" })))
}

#[derive(Debug, Deserialize)]
struct StatusChange {
    #[serde(default)]
    status: String,
}

async fn status_handler<R, M, N>(
    State(service): SharedService<R, M, N>,
    Path(application_id): Path<String>,
    Json(change): Json<StatusChange>,
) -> Result<Json<Value>, AppError>
where
    R: ApplicationRepository + 'static,
    M: MediaStore + 'static,
    N: Notifier + 'static,
{
    let record = service
        .update_status(&ApplicationId(application_id), &change.status)
        .await?;
    Ok(Json(json!({
        "message": "Application status updated successfully",
        "application": record,
    })))
}

async fn archive_handler<R, M, N>(
    State(service): SharedService<R, M, N>,
    Path(application_id): Path<String>,
) -> Result<Json<Value>, AppError>
where
    R: ApplicationRepository + 'static,
    M: MediaStore + 'static,
    N: Notifier + 'static,
{
    let record = service.archive(&ApplicationId(application_id)).await?;
    Ok(Json(json!({
        "message": "Application archived successfully",
        "application": record,
    })))
}

async fn unarchive_handler<R, M, N>(
    State(service): SharedService<R, M, N>,
    Path(application_id): Path<String>,
) -> Result<Json<Value>, AppError>
where
    R: ApplicationRepository + 'static,
    M: MediaStore + 'static,
    N: Notifier + 'static,
{
    let record = service.unarchive(&ApplicationId(application_id)).await?;
    Ok(Json(json!({
        "message": "Application unarchived successfully",
        "application": record,
    })))
}
