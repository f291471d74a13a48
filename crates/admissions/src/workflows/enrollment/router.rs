use std::sync::Arc;

use axum::{body::Bytes, extract::DefaultBodyLimit, extract::State, routing::post, Json, Router};

use super::importer::EnrollmentImporter;
use super::views::ImportSummary;
use crate::error::AppError;
use crate::workflows::applications::ApplicationRepository;

/// Upper bound for a registrar upload body.
pub const MAX_REGISTRAR_BYTES: usize = 10 * 1024 * 1024;

pub fn enrollment_import_router<R>(importer: Arc<EnrollmentImporter<R>>) -> Router
where
    R: ApplicationRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/enrollment-import/batch-enrollment",
            post(batch_enrollment_handler::<R>),
        )
        .layer(DefaultBodyLimit::max(MAX_REGISTRAR_BYTES))
        .with_state(importer)
}

async fn batch_enrollment_handler<R>(
    State(importer): State<Arc<EnrollmentImporter<R>>>,
    body: Bytes,
) -> Result<Json<ImportSummary>, AppError>
where
    R: ApplicationRepository + 'static,
{
    let summary = importer.import_batch(&body).await?;
    Ok(Json(summary))
}
