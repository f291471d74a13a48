use crate::infra::{
    AppState, InMemoryApplicationRepository, InMemoryMediaStore, InMemoryTargetRepository,
    OutboxNotifier,
};
use admissions::config::AppConfig;
use admissions::error::AppError;
use admissions::workflows::analytics::{
    analytics_router, course_target_router, AnalyticsService, CourseTargetService,
};
use admissions::workflows::applications::{application_router, ApplicationService};
use admissions::workflows::backup::{backup_router, BackupService};
use admissions::workflows::enrollment::{enrollment_import_router, EnrollmentImporter};
use admissions::workflows::export::export_router;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub(crate) type Applications =
    ApplicationService<InMemoryApplicationRepository, InMemoryMediaStore, OutboxNotifier>;

/// Every workflow service wired against the in-memory collaborators.
pub(crate) struct AdmissionStack {
    pub(crate) repository: Arc<InMemoryApplicationRepository>,
    pub(crate) applications: Arc<Applications>,
    pub(crate) importer: Arc<EnrollmentImporter<InMemoryApplicationRepository>>,
    pub(crate) analytics: Arc<AnalyticsService<InMemoryApplicationRepository, InMemoryTargetRepository>>,
    pub(crate) targets: Arc<CourseTargetService<InMemoryTargetRepository>>,
    pub(crate) backups: Arc<BackupService<InMemoryApplicationRepository>>,
}

impl AdmissionStack {
    pub(crate) fn new(
        config: &AppConfig,
        repository: InMemoryApplicationRepository,
    ) -> Result<Self, AppError> {
        let defaults = config.analytics.default_targets()?;
        let repository = Arc::new(repository);
        let target_repository = Arc::new(InMemoryTargetRepository::default());

        let applications = Arc::new(ApplicationService::new(
            Arc::clone(&repository),
            Arc::new(InMemoryMediaStore::default()),
            Arc::new(OutboxNotifier::new(config.mail.institution_name.clone())),
            config.intake.clone(),
        ));
        let importer = Arc::new(EnrollmentImporter::new(
            Arc::clone(&repository),
            config.import.clone(),
        ));
        let analytics = Arc::new(AnalyticsService::new(
            Arc::clone(&repository),
            Arc::clone(&target_repository),
            defaults.clone(),
        ));
        let targets = Arc::new(CourseTargetService::new(target_repository, defaults));
        let backups = Arc::new(BackupService::new(
            Arc::clone(&repository),
            config.backup.clone(),
        ));

        Ok(Self {
            repository,
            applications,
            importer,
            analytics,
            targets,
            backups,
        })
    }

    pub(crate) fn router(&self) -> Router {
        application_router(Arc::clone(&self.applications))
            .merge(enrollment_import_router(Arc::clone(&self.importer)))
            .merge(analytics_router(Arc::clone(&self.analytics)))
            .merge(course_target_router(Arc::clone(&self.targets)))
            .merge(export_router(Arc::clone(&self.repository)))
            .merge(backup_router(Arc::clone(&self.backups)))
    }
}

pub(crate) fn with_operational_routes(router: Router) -> Router {
    router
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
