use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};

use super::service::{BackupEntry, BackupService, BackupStats};
use crate::error::AppError;
use crate::workflows::applications::ApplicationRepository;

pub fn backup_router<R>(service: Arc<BackupService<R>>) -> Router
where
    R: ApplicationRepository + 'static,
{
    Router::new()
        .route("/api/v1/backups", get(list_handler::<R>))
        .route("/api/v1/backups/stats", get(stats_handler::<R>))
        .route("/api/v1/backups/full", post(full_handler::<R>))
        .route("/api/v1/backups/incremental", post(incremental_handler::<R>))
        .route("/api/v1/backups/:name", delete(delete_handler::<R>))
        .route("/api/v1/backups/:name/restore", post(restore_handler::<R>))
        .route("/api/v1/backups/:name/download", get(download_handler::<R>))
        .with_state(service)
}

async fn list_handler<R>(
    State(service): State<Arc<BackupService<R>>>,
) -> Result<Json<Vec<BackupEntry>>, AppError>
where
    R: ApplicationRepository + 'static,
{
    Ok(Json(service.list()?))
}

async fn stats_handler<R>(
    State(service): State<Arc<BackupService<R>>>,
) -> Result<Json<BackupStats>, AppError>
where
    R: ApplicationRepository + 'static,
{
    Ok(Json(service.stats()?))
}

async fn full_handler<R>(
    State(service): State<Arc<BackupService<R>>>,
) -> Result<Json<Value>, AppError>
where
    R: ApplicationRepository + 'static,
{
    let created = service.create_full(Utc::now()).await?;
    Ok(Json(json!({
        "message": "Full backup created successfully",
        "backupName": created.backup_name,
        "manifest": created.manifest,
    })))
}

async fn incremental_handler<R>(
    State(service): State<Arc<BackupService<R>>>,
) -> Result<Json<Value>, AppError>
where
    R: ApplicationRepository + 'static,
{
    let created = service.create_incremental(Utc::now()).await?;
    Ok(Json(json!({
        "message": "Incremental backup created successfully",
        "backupName": created.backup_name,
        "manifest": created.manifest,
    })))
}

async fn restore_handler<R>(
    State(service): State<Arc<BackupService<R>>>,
    Path(name): Path<String>,
) -> Result<Json<Value>, AppError>
where
    R: ApplicationRepository + 'static,
{
    let outcome = service.restore(&name).await?;
    Ok(Json(json!({
        "message": "Backup restored successfully",
        "type": outcome.kind,
        "restored": outcome.restored,
    })))
}

async fn download_handler<R>(
    State(service): State<Arc<BackupService<R>>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    R: ApplicationRepository + 'static,
{
    let bytes = service.archive(&name)?;
    let stem = name.strip_suffix(".zip").unwrap_or(&name);
    let disposition = format!("attachment; filename=\"{stem}.zip\"");
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

async fn delete_handler<R>(
    State(service): State<Arc<BackupService<R>>>,
    Path(name): Path<String>,
) -> Result<Json<Value>, AppError>
where
    R: ApplicationRepository + 'static,
{
    service.delete(&name)?;
    Ok(Json(json!({ "message": "Backup deleted successfully" })))
}
