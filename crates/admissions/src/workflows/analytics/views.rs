use std::collections::BTreeMap;

use serde::Serialize;

use crate::workflows::applications::ApplicationStatus;
use crate::workflows::calendar::AcademicTerm;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
    pub course_name: String,
    pub target: u32,
    pub actual: usize,
    pub achievement: i64,
    pub variance: i64,
}

/// Target achievement for one academic year and term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentReport {
    pub year: i32,
    pub term: AcademicTerm,
    pub total_enrolled: usize,
    pub total_target: u64,
    pub courses_meeting_target: usize,
    pub courses_below_target: usize,
    pub average_achievement: i64,
    pub course_data: Vec<CourseProgress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearSummary {
    pub year: i32,
    pub total_applications: usize,
    pub admissions: usize,
    pub enrollment: usize,
    pub enrollment_rate: i64,
    pub admission_to_enrollment_rate: i64,
    pub growth: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseGrowth {
    pub name: String,
    pub enrollment: usize,
    pub previous: usize,
    pub growth: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub yearly_data: Vec<YearSummary>,
    pub top_courses: Vec<CourseGrowth>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthCount {
    pub month: u32,
    pub month_name: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetail {
    pub course_name: String,
    pub year: i32,
    pub total_applications: usize,
    pub status_breakdown: BTreeMap<ApplicationStatus, usize>,
    pub monthly_breakdown: Vec<MonthCount>,
}
