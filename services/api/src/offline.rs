use crate::infra::{read_applications, write_json, InMemoryApplicationRepository};
use admissions::config::AppConfig;
use admissions::error::AppError;
use admissions::workflows::analytics::{
    compute_comparison, compute_course_detail, compute_enrollment,
};
use admissions::workflows::calendar::AcademicTerm;
use admissions::workflows::enrollment::{EnrollmentImporter, ImportSummary};
use admissions::workflows::export::{write_applications_csv, ExportError};
use chrono::{Datelike, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// JSON array of stored applications to match against
    #[arg(long)]
    pub(crate) applications: PathBuf,
    /// Registrar CSV or Excel export listing enrolled students
    #[arg(long)]
    pub(crate) registrar: PathBuf,
    /// Write the updated applications back out as JSON
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum AnalyticsCommand {
    /// Course target achievement for a year and term
    Enrollment {
        #[arg(long)]
        applications: PathBuf,
        #[arg(long)]
        year: Option<i32>,
        /// all, 1st, 2nd, or summer
        #[arg(long, default_value = "all")]
        term: AcademicTerm,
    },
    /// Three-year comparison ending at the given year
    Comparison {
        #[arg(long)]
        applications: PathBuf,
        #[arg(long)]
        year: Option<i32>,
    },
    /// Status and monthly breakdown for one course
    Course {
        #[arg(long)]
        applications: PathBuf,
        #[arg(long)]
        course: String,
        #[arg(long)]
        year: Option<i32>,
    },
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    /// JSON array of stored applications
    #[arg(long)]
    pub(crate) applications: PathBuf,
    /// Destination CSV file
    #[arg(long)]
    pub(crate) out: PathBuf,
}

fn current_year(year: Option<i32>) -> i32 {
    year.unwrap_or_else(|| Utc::now().year())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    println!("{rendered}");
    Ok(())
}

pub(crate) async fn run_import(args: ImportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let summary = import_registrar(&args, &config).await?;
    print_json(&summary)
}

async fn import_registrar(args: &ImportArgs, config: &AppConfig) -> Result<ImportSummary, AppError> {
    let repository =
        InMemoryApplicationRepository::from_records(read_applications(&args.applications)?);
    let importer = EnrollmentImporter::new(Arc::new(repository.clone()), config.import.clone());

    let registrar = std::fs::read(&args.registrar)?;
    let summary = importer.import_batch(&registrar).await?;

    if let Some(output) = &args.output {
        let records = repository.snapshot().map_err(ExportError::from)?;
        write_json(output, &records)?;
    }
    Ok(summary)
}

pub(crate) fn run_analytics(command: AnalyticsCommand) -> Result<(), AppError> {
    match command {
        AnalyticsCommand::Enrollment {
            applications,
            year,
            term,
        } => {
            let config = AppConfig::load()?;
            let defaults = config.analytics.default_targets()?;
            let records = read_applications(&applications)?;
            let report = compute_enrollment(current_year(year), term, &records, &[], &defaults)?;
            print_json(&report)
        }
        AnalyticsCommand::Comparison { applications, year } => {
            let records = read_applications(&applications)?;
            print_json(&compute_comparison(current_year(year), &records)?)
        }
        AnalyticsCommand::Course {
            applications,
            course,
            year,
        } => {
            let records = read_applications(&applications)?;
            print_json(&compute_course_detail(&course, current_year(year), &records)?)
        }
    }
}

pub(crate) fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let records = read_applications(&args.applications)?;
    let file = File::create(&args.out)?;
    let rows = write_applications_csv(&records, file)?;
    println!("Exported {rows} applications to {}", args.out.display());
    Ok(())
}
