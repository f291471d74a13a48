//! Student admission tracking: applicant intake, registrar enrollment matching, and
//! course-target analytics.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
