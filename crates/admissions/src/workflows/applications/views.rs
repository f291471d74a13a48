use std::collections::BTreeMap;

use serde::Serialize;

use super::domain::{ApplicantRecord, ApplicationStatus};

#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub current: usize,
    pub pages: usize,
    pub total: usize,
}

impl Pagination {
    pub fn new(current: usize, limit: usize, total: usize) -> Self {
        let pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            current,
            pages,
            total,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationPage {
    pub applications: Vec<ApplicantRecord>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status: ApplicationStatus,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseCount {
    pub course: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationOverview {
    pub total_applications: usize,
    pub recent_applications: usize,
    pub status_breakdown: Vec<StatusCount>,
    pub course_breakdown: Vec<CourseCount>,
}

/// Status counts in status order and course counts busiest first.
pub fn breakdowns(records: &[ApplicantRecord]) -> (Vec<StatusCount>, Vec<CourseCount>) {
    let mut by_status: BTreeMap<ApplicationStatus, usize> = BTreeMap::new();
    let mut by_course: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        *by_status.entry(record.status).or_default() += 1;
        *by_course.entry(record.course_applied.as_str()).or_default() += 1;
    }

    let status_breakdown = by_status
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect();

    let mut course_breakdown: Vec<CourseCount> = by_course
        .into_iter()
        .map(|(course, count)| CourseCount {
            course: course.to_string(),
            count,
        })
        .collect();
    course_breakdown.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.course.cmp(&b.course)));

    (status_breakdown, course_breakdown)
}
