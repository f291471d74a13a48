use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::analytics::{AnalyticsError, TargetServiceError};
use crate::workflows::applications::{ApplicationServiceError, RepositoryError};
use crate::workflows::backup::BackupError;
use crate::workflows::enrollment::EnrollmentImportError;
use crate::workflows::export::ExportError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Import(EnrollmentImportError),
    Application(ApplicationServiceError),
    Targets(TargetServiceError),
    Analytics(AnalyticsError),
    Export(ExportError),
    Backup(BackupError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Import(EnrollmentImportError::Repository(err))
            | AppError::Application(ApplicationServiceError::Repository(err))
            | AppError::Targets(TargetServiceError::Repository(err))
            | AppError::Analytics(AnalyticsError::Repository(err))
            | AppError::Export(ExportError::Repository(err))
            | AppError::Backup(BackupError::Repository(err)) => repository_status(err),
            AppError::Backup(BackupError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Import(_)
            | AppError::Application(ApplicationServiceError::Validation(_))
            | AppError::Application(ApplicationServiceError::InvalidStatus(_))
            | AppError::Targets(TargetServiceError::Validation(_))
            | AppError::Backup(BackupError::InvalidName(_))
            | AppError::Analytics(_) => StatusCode::BAD_REQUEST,
            AppError::Application(ApplicationServiceError::Media(_)) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Export(_)
            | AppError::Backup(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict => StatusCode::CONFLICT,
        RepositoryError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Import(err) => write!(f, "enrollment import failed: {}", err),
            AppError::Application(err) => write!(f, "{}", err),
            AppError::Targets(err) => write!(f, "course target error: {}", err),
            AppError::Analytics(err) => write!(f, "analytics error: {}", err),
            AppError::Export(err) => write!(f, "export failed: {}", err),
            AppError::Backup(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Import(err) => Some(err),
            AppError::Application(err) => Some(err),
            AppError::Targets(err) => Some(err),
            AppError::Analytics(err) => Some(err),
            AppError::Export(err) => Some(err),
            AppError::Backup(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<EnrollmentImportError> for AppError {
    fn from(value: EnrollmentImportError) -> Self {
        Self::Import(value)
    }
}

impl From<ApplicationServiceError> for AppError {
    fn from(value: ApplicationServiceError) -> Self {
        Self::Application(value)
    }
}

impl From<TargetServiceError> for AppError {
    fn from(value: TargetServiceError) -> Self {
        Self::Targets(value)
    }
}

impl From<AnalyticsError> for AppError {
    fn from(value: AnalyticsError) -> Self {
        Self::Analytics(value)
    }
}

impl From<ExportError> for AppError {
    fn from(value: ExportError) -> Self {
        Self::Export(value)
    }
}

impl From<BackupError> for AppError {
    fn from(value: BackupError) -> Self {
        Self::Backup(value)
    }
}
