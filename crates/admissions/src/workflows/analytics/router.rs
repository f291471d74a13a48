use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{Datelike, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use super::service::AnalyticsService;
use super::targets::{
    BulkTargetRequest, CourseTargetService, TargetId, TargetRepository, TargetRequest,
};
use super::views::{ComparisonReport, CourseDetail, EnrollmentReport};
use super::AnalyticsError;
use crate::error::AppError;
use crate::workflows::applications::ApplicationRepository;
use crate::workflows::calendar::AcademicTerm;

/// Header naming the staff member performing a target change.
pub const ACTOR_HEADER: &str = "x-actor";
const DEFAULT_ACTOR: &str = "admin";

#[derive(Debug, Default, Deserialize)]
struct PeriodParams {
    year: Option<i32>,
    term: Option<String>,
}

impl PeriodParams {
    fn year(&self) -> i32 {
        self.year.unwrap_or_else(|| Utc::now().year())
    }

    fn term(&self) -> Result<Option<AcademicTerm>, AnalyticsError> {
        match self.term.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Ok(Some(raw.parse()?)),
        }
    }
}

pub fn analytics_router<R, T>(service: Arc<AnalyticsService<R, T>>) -> Router
where
    R: ApplicationRepository + 'static,
    T: TargetRepository + 'static,
{
    Router::new()
        .route("/api/v1/analytics/enrollment", get(enrollment_handler::<R, T>))
        .route("/api/v1/analytics/comparison", get(comparison_handler::<R, T>))
        .route(
            "/api/v1/analytics/course/:course_name",
            get(course_handler::<R, T>),
        )
        .with_state(service)
}

async fn enrollment_handler<R, T>(
    State(service): State<Arc<AnalyticsService<R, T>>>,
    Query(params): Query<PeriodParams>,
) -> Result<Json<EnrollmentReport>, AppError>
where
    R: ApplicationRepository + 'static,
    T: TargetRepository + 'static,
{
    let term = params.term()?.unwrap_or_default();
    let report = service.enrollment(params.year(), term).await?;
    Ok(Json(report))
}

async fn comparison_handler<R, T>(
    State(service): State<Arc<AnalyticsService<R, T>>>,
    Query(params): Query<PeriodParams>,
) -> Result<Json<ComparisonReport>, AppError>
where
    R: ApplicationRepository + 'static,
    T: TargetRepository + 'static,
{
    let report = service.comparison(params.year()).await?;
    Ok(Json(report))
}

async fn course_handler<R, T>(
    State(service): State<Arc<AnalyticsService<R, T>>>,
    Path(course_name): Path<String>,
    Query(params): Query<PeriodParams>,
) -> Result<Json<CourseDetail>, AppError>
where
    R: ApplicationRepository + 'static,
    T: TargetRepository + 'static,
{
    let detail = service.course_detail(&course_name, params.year()).await?;
    Ok(Json(detail))
}

pub fn course_target_router<T>(service: Arc<CourseTargetService<T>>) -> Router
where
    T: TargetRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/course-targets",
            get(list_targets_handler::<T>).post(upsert_target_handler::<T>),
        )
        .route("/api/v1/course-targets/bulk", post(bulk_targets_handler::<T>))
        .route("/api/v1/course-targets/seed", post(seed_targets_handler::<T>))
        .route(
            "/api/v1/course-targets/:id",
            put(update_target_handler::<T>).delete(delete_target_handler::<T>),
        )
        .with_state(service)
}

fn actor(headers: &HeaderMap) -> String {
    headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_ACTOR)
        .to_string()
}

async fn list_targets_handler<T>(
    State(service): State<Arc<CourseTargetService<T>>>,
    Query(params): Query<PeriodParams>,
) -> Result<Json<Value>, AppError>
where
    T: TargetRepository + 'static,
{
    let term = params.term()?.filter(|term| *term != AcademicTerm::All);
    let targets = service.list(params.year(), term).await?;
    Ok(Json(json!(targets)))
}

async fn upsert_target_handler<T>(
    State(service): State<Arc<CourseTargetService<T>>>,
    headers: HeaderMap,
    Json(request): Json<TargetRequest>,
) -> Result<Json<Value>, AppError>
where
    T: TargetRepository + 'static,
{
    let outcome = service.upsert(request, &actor(&headers)).await?;
    let message = if outcome.created {
        "Course target created successfully"
    } else {
        "Course target updated successfully"
    };
    Ok(Json(json!({ "message": message, "target": outcome.target })))
}

async fn bulk_targets_handler<T>(
    State(service): State<Arc<CourseTargetService<T>>>,
    headers: HeaderMap,
    Json(request): Json<BulkTargetRequest>,
) -> Result<Json<Value>, AppError>
where
    T: TargetRepository + 'static,
{
    let outcome = service.bulk_upsert(request, &actor(&headers)).await?;
    Ok(Json(json!({
        "message": "Bulk update completed successfully",
        "targets": outcome.targets,
        "count": outcome.count,
    })))
}

#[derive(Debug, Deserialize)]
struct TargetUpdate {
    target: Option<u32>,
}

async fn update_target_handler<T>(
    State(service): State<Arc<CourseTargetService<T>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(update): Json<TargetUpdate>,
) -> Result<Json<Value>, AppError>
where
    T: TargetRepository + 'static,
{
    let target = service
        .update(&TargetId(id), update.target, &actor(&headers))
        .await?;
    Ok(Json(json!({
        "message": "Course target updated successfully",
        "target": target,
    })))
}

async fn delete_target_handler<T>(
    State(service): State<Arc<CourseTargetService<T>>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError>
where
    T: TargetRepository + 'static,
{
    service.delete(&TargetId(id)).await?;
    Ok(Json(json!({ "message": "Course target deleted successfully" })))
}

async fn seed_targets_handler<T>(
    State(service): State<Arc<CourseTargetService<T>>>,
    Query(params): Query<PeriodParams>,
) -> Result<Json<Value>, AppError>
where
    T: TargetRepository + 'static,
{
    let created = service.seed_defaults(params.year()).await?;
    Ok(Json(json!({ "created": created })))
}
