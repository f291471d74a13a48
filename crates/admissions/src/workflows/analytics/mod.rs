//! Enrollment analytics: target achievement per term, multi-year comparison, and course detail.

mod comparison;
mod course;
mod enrollment;
mod router;
mod service;
pub mod targets;
mod views;

pub use comparison::compute_comparison;
pub use course::compute_course_detail;
pub use enrollment::{compute_enrollment, resolve_targets};
pub use router::{analytics_router, course_target_router};
pub use service::AnalyticsService;
pub use targets::{
    BulkOutcome, BulkTargetRequest, CourseTarget, CourseTargetService, DefaultTargets, TargetEntry,
    TargetId, TargetKey, TargetQuery, TargetRepository, TargetRequest, TargetServiceError,
    UpsertOutcome,
};
pub use views::{
    ComparisonReport, CourseDetail, CourseGrowth, CourseProgress, EnrollmentReport, MonthCount,
    YearSummary,
};

use crate::workflows::applications::RepositoryError;
use crate::workflows::calendar::UnknownTermError;

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("{0} is not a supported academic year")]
    InvalidYear(i32),
    #[error(transparent)]
    UnknownTerm(#[from] UnknownTermError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Rounds halves toward positive infinity, so 2.5 becomes 3 and -2.5 becomes -2.
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Whole-number percentage of `part` in `whole`; zero when `whole` is zero.
pub fn percentage(part: usize, whole: usize) -> i64 {
    if whole == 0 {
        0
    } else {
        round_half_up(part as f64 / whole as f64 * 100.0)
    }
}

/// Growth from `previous` to `current`; growth from nothing is 100 when anything arrived.
pub fn growth_percent(current: usize, previous: usize) -> i64 {
    if previous == 0 {
        if current > 0 {
            100
        } else {
            0
        }
    } else {
        round_half_up((current as f64 - previous as f64) / previous as f64 * 100.0)
    }
}
