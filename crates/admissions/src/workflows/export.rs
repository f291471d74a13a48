//! Application exports: CSV, JSON dump, system statistics, and a zipped package of all three.

use std::io::{Cursor, Seek, Write};
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Datelike, Duration, SecondsFormat, Utc};
use serde::Serialize;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::AppError;
use crate::workflows::applications::{
    breakdowns, ApplicantRecord, ApplicationFilter, ApplicationRepository, ArchivedScope,
    CourseCount, RepositoryError, StatusCount,
};

pub const PACKAGE_DESCRIPTION: &str = "Complete admissions system export package";
const RECENT_DAYS: i64 = 7;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("unable to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("unable to flush export: {0}")]
    Io(#[from] std::io::Error),
    #[error("unable to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unable to build archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Serialize)]
struct ExportRow<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Email")]
    email: &'a str,
    #[serde(rename = "Contact")]
    contact: &'a str,
    #[serde(rename = "Course Applied")]
    course_applied: &'a str,
    #[serde(rename = "Status")]
    status: &'static str,
    #[serde(rename = "Date of Birth")]
    date_of_birth: String,
    #[serde(rename = "Photo URL")]
    photo_url: &'a str,
    #[serde(rename = "Signature URL")]
    signature_url: &'a str,
    #[serde(rename = "Submitted At")]
    submitted_at: String,
    #[serde(rename = "Archived")]
    archived: bool,
}

impl<'a> From<&'a ApplicantRecord> for ExportRow<'a> {
    fn from(record: &'a ApplicantRecord) -> Self {
        Self {
            id: &record.id.0,
            name: &record.name,
            email: &record.email,
            contact: &record.contact,
            course_applied: &record.course_applied,
            status: record.status.label(),
            date_of_birth: record
                .date_of_birth
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            photo_url: &record.photo_url,
            signature_url: &record.signature_url,
            submitted_at: record
                .submitted_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            archived: record.archived,
        }
    }
}

/// Writes one row per application, oldest submission first; returns the row count.
pub fn write_applications_csv<W: Write>(
    records: &[ApplicantRecord],
    writer: W,
) -> Result<usize, ExportError> {
    let mut ordered: Vec<&ApplicantRecord> = records.iter().collect();
    ordered.sort_by(|a, b| {
        a.submitted_at
            .cmp(&b.submitted_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in &ordered {
        csv_writer.serialize(ExportRow::from(*record))?;
    }
    csv_writer.flush()?;
    Ok(ordered.len())
}

/// Every stored application, archived included.
pub async fn load_all<R>(repository: &R) -> Result<Vec<ApplicantRecord>, RepositoryError>
where
    R: ApplicationRepository + ?Sized,
{
    let filter = ApplicationFilter {
        archived: ArchivedScope::Include,
        ..ApplicationFilter::default()
    };
    repository.find(&filter).await
}

pub async fn export_applications<R>(repository: &R) -> Result<Vec<u8>, ExportError>
where
    R: ApplicationRepository + ?Sized,
{
    let records = load_all(repository).await?;
    let mut buffer = Vec::new();
    let rows = write_applications_csv(&records, &mut buffer)?;
    tracing::info!(rows, "applications exported");
    Ok(buffer)
}

/// `2025-06-01T08:30:00.000Z` becomes `2025-06-01T08-30-00-000Z` for use in file names.
pub fn file_stamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDump<'a> {
    pub applications: &'a [ApplicantRecord],
    pub exported_at: DateTime<Utc>,
    pub total_applications: usize,
}

impl<'a> ApplicationDump<'a> {
    pub fn new(applications: &'a [ApplicantRecord], exported_at: DateTime<Utc>) -> Self {
        Self {
            applications,
            exported_at,
            total_applications: applications.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCount {
    pub year: i32,
    pub month: u32,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total_applications: usize,
    pub oldest_application: Option<DateTime<Utc>>,
    pub newest_application: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub export_date: DateTime<Utc>,
    pub summary: StatsSummary,
    pub status_breakdown: Vec<StatusCount>,
    pub course_breakdown: Vec<CourseCount>,
    pub monthly_applications: Vec<MonthlyCount>,
    pub recent_applications: usize,
}

pub fn system_stats(records: &[ApplicantRecord], now: DateTime<Utc>) -> SystemStats {
    let (status_breakdown, course_breakdown) = breakdowns(records);

    let mut monthly_applications: Vec<MonthlyCount> = Vec::new();
    let mut months: Vec<(i32, u32)> = records
        .iter()
        .map(|record| (record.submitted_at.year(), record.submitted_at.month()))
        .collect();
    months.sort_unstable();
    for (year, month) in months {
        match monthly_applications.last_mut() {
            Some(last) if last.year == year && last.month == month => last.count += 1,
            _ => monthly_applications.push(MonthlyCount {
                year,
                month,
                count: 1,
            }),
        }
    }

    let recent_cutoff = now - Duration::days(RECENT_DAYS);
    SystemStats {
        export_date: now,
        summary: StatsSummary {
            total_applications: records.len(),
            oldest_application: records.iter().map(|record| record.submitted_at).min(),
            newest_application: records.iter().map(|record| record.submitted_at).max(),
        },
        status_breakdown,
        course_breakdown,
        monthly_applications,
        recent_applications: records
            .iter()
            .filter(|record| record.submitted_at >= recent_cutoff)
            .count(),
    }
}

/// Writes each named entry deflated into a fresh archive and hands back the writer.
pub(crate) fn write_zip<W: Write + Seek>(
    writer: W,
    entries: &[(&str, &[u8])],
) -> Result<W, zip::result::ZipError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut archive = ZipWriter::new(writer);
    for (name, contents) in entries {
        archive.start_file(*name, options)?;
        archive.write_all(contents)?;
    }
    archive.finish()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PackageManifest<'a> {
    package_name: &'a str,
    created: DateTime<Utc>,
    files: Vec<&'a str>,
    description: &'static str,
}

pub struct ExportPackage {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ExportPackage {
    pub fn file_name(&self) -> String {
        format!("{}.zip", self.name)
    }
}

/// Zips the CSV export, the JSON dump, the statistics, and a manifest listing them.
pub fn export_package(
    records: &[ApplicantRecord],
    now: DateTime<Utc>,
) -> Result<ExportPackage, ExportError> {
    let stamp = file_stamp(now);
    let name = format!("admissions-export-{stamp}");
    let csv_name = format!("applications-export-{stamp}.csv");
    let json_name = format!("applications-export-{stamp}.json");
    let stats_name = format!("system-stats-{stamp}.json");

    let mut csv = Vec::new();
    write_applications_csv(records, &mut csv)?;
    let json = serde_json::to_vec_pretty(&ApplicationDump::new(records, now))?;
    let stats = serde_json::to_vec_pretty(&system_stats(records, now))?;
    let manifest = serde_json::to_vec_pretty(&PackageManifest {
        package_name: &name,
        created: now,
        files: vec![csv_name.as_str(), json_name.as_str(), stats_name.as_str()],
        description: PACKAGE_DESCRIPTION,
    })?;

    let bytes = write_zip(
        Cursor::new(Vec::new()),
        &[
            (csv_name.as_str(), csv.as_slice()),
            (json_name.as_str(), json.as_slice()),
            (stats_name.as_str(), stats.as_slice()),
            ("manifest.json", manifest.as_slice()),
        ],
    )?
    .into_inner();

    tracing::info!(package = %name, applications = records.len(), bytes = bytes.len(), "export package built");
    Ok(ExportPackage { name, bytes })
}

pub fn export_router<R>(repository: Arc<R>) -> Router
where
    R: ApplicationRepository + 'static,
{
    Router::new()
        .route("/api/v1/export/applications.csv", get(export_handler::<R>))
        .route("/api/v1/export/applications.json", get(dump_handler::<R>))
        .route("/api/v1/export/stats", get(stats_handler::<R>))
        .route("/api/v1/export/package", get(package_handler::<R>))
        .with_state(repository)
}

async fn export_handler<R>(
    State(repository): State<Arc<R>>,
) -> Result<impl IntoResponse, AppError>
where
    R: ApplicationRepository + 'static,
{
    let body = export_applications(repository.as_ref()).await?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"applications.csv\"",
            ),
        ],
        body,
    ))
}

async fn dump_handler<R>(
    State(repository): State<Arc<R>>,
) -> Result<Json<serde_json::Value>, AppError>
where
    R: ApplicationRepository + 'static,
{
    let records = load_all(repository.as_ref())
        .await
        .map_err(ExportError::from)?;
    let dump = serde_json::to_value(ApplicationDump::new(&records, Utc::now()))
        .map_err(ExportError::from)?;
    Ok(Json(dump))
}

async fn stats_handler<R>(
    State(repository): State<Arc<R>>,
) -> Result<Json<SystemStats>, AppError>
where
    R: ApplicationRepository + 'static,
{
    let records = load_all(repository.as_ref())
        .await
        .map_err(ExportError::from)?;
    Ok(Json(system_stats(&records, Utc::now())))
}

async fn package_handler<R>(
    State(repository): State<Arc<R>>,
) -> Result<impl IntoResponse, AppError>
where
    R: ApplicationRepository + 'static,
{
    let records = load_all(repository.as_ref())
        .await
        .map_err(ExportError::from)?;
    let package = export_package(&records, Utc::now())?;
    let disposition = format!("attachment; filename=\"{}\"", package.file_name());
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        package.bytes,
    ))
}
