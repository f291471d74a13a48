use std::collections::{HashMap, HashSet};

use super::targets::{CourseTarget, DefaultTargets};
use super::views::{CourseProgress, EnrollmentReport};
use super::{round_half_up, AnalyticsError};
use crate::workflows::applications::{ApplicantRecord, ApplicationStatus};
use crate::workflows::calendar::{AcademicTerm, DateWindow};

/// Course → target pairs in report order: persisted by name, then missing defaults in table order.
pub fn resolve_targets(
    year: i32,
    term: AcademicTerm,
    persisted: &[CourseTarget],
    defaults: &DefaultTargets,
) -> Vec<(String, u32)> {
    let mut stored: Vec<&CourseTarget> = persisted
        .iter()
        .filter(|target| target.is_active && target.academic_year == year && target.term == term)
        .collect();
    stored.sort_by(|a, b| a.course_name.cmp(&b.course_name));

    let mut seen: HashSet<&str> = HashSet::new();
    let mut resolved: Vec<(String, u32)> = Vec::new();
    for target in stored {
        if seen.insert(target.course_name.as_str()) {
            resolved.push((target.course_name.clone(), target.target));
        }
    }

    for (course, target) in defaults.iter() {
        if !seen.contains(course) {
            resolved.push((course.to_string(), target));
        }
    }

    resolved
}

/// Compares enrolled, non-archived submissions inside the term window with the resolved targets.
pub fn compute_enrollment(
    year: i32,
    term: AcademicTerm,
    records: &[ApplicantRecord],
    persisted: &[CourseTarget],
    defaults: &DefaultTargets,
) -> Result<EnrollmentReport, AnalyticsError> {
    let window = DateWindow::for_term(year, term).ok_or(AnalyticsError::InvalidYear(year))?;

    let mut enrolled_by_course: HashMap<&str, usize> = HashMap::new();
    let mut total_enrolled = 0;
    for record in records {
        if record.archived
            || record.status != ApplicationStatus::Enrolled
            || !window.contains(&record.submitted_at)
        {
            continue;
        }
        total_enrolled += 1;
        *enrolled_by_course
            .entry(record.course_applied.as_str())
            .or_default() += 1;
    }

    let course_data: Vec<CourseProgress> = resolve_targets(year, term, persisted, defaults)
        .into_iter()
        .map(|(course_name, target)| {
            let actual = enrolled_by_course
                .get(course_name.as_str())
                .copied()
                .unwrap_or(0);
            let achievement = if target > 0 {
                round_half_up(actual as f64 / f64::from(target) * 100.0)
            } else {
                0
            };
            CourseProgress {
                variance: actual as i64 - i64::from(target),
                course_name,
                target,
                actual,
                achievement,
            }
        })
        .collect();

    let total_target = course_data
        .iter()
        .map(|course| u64::from(course.target))
        .sum();
    let courses_meeting_target = course_data
        .iter()
        .filter(|course| course.achievement >= 100)
        .count();
    let courses_below_target = course_data
        .iter()
        .filter(|course| course.achievement < 80)
        .count();
    let average_achievement = if course_data.is_empty() {
        0
    } else {
        let sum: i64 = course_data.iter().map(|course| course.achievement).sum();
        round_half_up(sum as f64 / course_data.len() as f64)
    };

    Ok(EnrollmentReport {
        year,
        term,
        total_enrolled,
        total_target,
        courses_meeting_target,
        courses_below_target,
        average_achievement,
        course_data,
    })
}
