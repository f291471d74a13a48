use std::collections::BTreeMap;

use super::views::{CourseDetail, MonthCount};
use super::AnalyticsError;
use crate::workflows::applications::ApplicantRecord;
use crate::workflows::calendar::{month_name, submission_month, DateWindow};

/// Status and monthly submission counts for one course across a calendar year.
pub fn compute_course_detail(
    course: &str,
    year: i32,
    records: &[ApplicantRecord],
) -> Result<CourseDetail, AnalyticsError> {
    let window = DateWindow::calendar_year(year).ok_or(AnalyticsError::InvalidYear(year))?;

    let mut status_breakdown = BTreeMap::new();
    let mut monthly = [0usize; 12];
    let mut total_applications = 0;

    for record in records.iter().filter(|record| {
        !record.archived && record.course_applied == course && window.contains(&record.submitted_at)
    }) {
        total_applications += 1;
        *status_breakdown.entry(record.status).or_insert(0) += 1;
        let month = submission_month(&record.submitted_at);
        if let Some(slot) = monthly.get_mut(month.saturating_sub(1) as usize) {
            *slot += 1;
        }
    }

    let monthly_breakdown = (1..=12u32)
        .zip(monthly)
        .map(|(month, count)| MonthCount {
            month,
            month_name: month_name(month),
            count,
        })
        .collect();

    Ok(CourseDetail {
        course_name: course.to_string(),
        year,
        total_applications,
        status_breakdown,
        monthly_breakdown,
    })
}
