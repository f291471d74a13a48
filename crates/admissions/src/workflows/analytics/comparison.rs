use std::collections::HashMap;

use chrono::Datelike;

use super::views::{ComparisonReport, CourseGrowth, YearSummary};
use super::{growth_percent, percentage, AnalyticsError};
use crate::workflows::applications::{ApplicantRecord, ApplicationStatus};

const TOP_COURSES: usize = 5;

#[derive(Default)]
struct YearTally {
    total: usize,
    admissions: usize,
    enrolled: usize,
}

/// Three-year view ending at `year` plus the strongest courses of that year.
pub fn compute_comparison(
    year: i32,
    records: &[ApplicantRecord],
) -> Result<ComparisonReport, AnalyticsError> {
    let first_year = year.checked_sub(2).ok_or(AnalyticsError::InvalidYear(year))?;
    if chrono::NaiveDate::from_ymd_opt(first_year, 1, 1).is_none()
        || chrono::NaiveDate::from_ymd_opt(year, 12, 31).is_none()
    {
        return Err(AnalyticsError::InvalidYear(year));
    }
    let years = [first_year, year - 1, year];

    let mut tallies: HashMap<i32, YearTally> = HashMap::new();
    let mut current_courses: HashMap<&str, usize> = HashMap::new();
    let mut previous_courses: HashMap<&str, usize> = HashMap::new();

    for record in records.iter().filter(|record| !record.archived) {
        let submitted_year = record.submitted_at.date_naive().year();
        if !years.contains(&submitted_year) {
            continue;
        }

        let tally = tallies.entry(submitted_year).or_default();
        tally.total += 1;
        if record.status.is_admission() {
            tally.admissions += 1;
        }
        if record.status == ApplicationStatus::Enrolled {
            tally.enrolled += 1;
            let course = record.course_applied.as_str();
            if submitted_year == year {
                *current_courses.entry(course).or_default() += 1;
            } else if submitted_year == year - 1 {
                *previous_courses.entry(course).or_default() += 1;
            }
        }
    }

    let mut yearly_data: Vec<YearSummary> = Vec::with_capacity(years.len());
    for summary_year in years {
        let tally = tallies.remove(&summary_year).unwrap_or_default();
        let growth = yearly_data
            .last()
            .map(|previous| growth_percent(tally.enrolled, previous.enrollment))
            .unwrap_or(0);

        yearly_data.push(YearSummary {
            year: summary_year,
            total_applications: tally.total,
            admissions: tally.admissions,
            enrollment: tally.enrolled,
            enrollment_rate: percentage(tally.enrolled, tally.total),
            admission_to_enrollment_rate: percentage(tally.enrolled, tally.admissions),
            growth,
        });
    }

    let mut top_courses: Vec<CourseGrowth> = current_courses
        .into_iter()
        .map(|(name, enrollment)| {
            let previous = previous_courses.get(name).copied().unwrap_or(0);
            CourseGrowth {
                name: name.to_string(),
                enrollment,
                previous,
                growth: growth_percent(enrollment, previous),
            }
        })
        .collect();
    top_courses.sort_by(|a, b| {
        b.enrollment
            .cmp(&a.enrollment)
            .then_with(|| a.name.cmp(&b.name))
    });
    top_courses.truncate(TOP_COURSES);

    Ok(ComparisonReport {
        yearly_data,
        top_courses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::applications::ApplicationId;
    use chrono::{TimeZone, Utc};

    fn record(year: i32, course: &str, status: ApplicationStatus) -> ApplicantRecord {
        ApplicantRecord {
            id: ApplicationId(format!("app-{year}-{course}")),
            name: "Applicant".to_string(),
            given_name: None,
            middle_name: None,
            last_name: None,
            email: "applicant@x.com".to_string(),
            contact: "0917".to_string(),
            course_applied: course.to_string(),
            date_of_birth: None,
            status,
            photo_url: String::new(),
            signature_url: String::new(),
            submitted_at: Utc.with_ymd_and_hms(year, 6, 1, 0, 0, 0).unwrap(),
            archived: false,
            archived_at: None,
        }
    }

    fn repeat(count: usize, year: i32, course: &str, status: ApplicationStatus) -> Vec<ApplicantRecord> {
        (0..count).map(|_| record(year, course, status)).collect()
    }

    #[test]
    fn yearly_rates_and_growth() {
        let mut records = Vec::new();
        records.extend(repeat(2, 2023, "Nursing", ApplicationStatus::Enrolled));
        records.extend(repeat(4, 2024, "Nursing", ApplicationStatus::Enrolled));
        records.extend(repeat(2, 2024, "Nursing", ApplicationStatus::Admitted));
        records.extend(repeat(2, 2024, "Nursing", ApplicationStatus::Pending));
        records.extend(repeat(5, 2025, "Nursing", ApplicationStatus::Enrolled));

        let report = compute_comparison(2025, &records).expect("report");
        let years: Vec<i32> = report.yearly_data.iter().map(|entry| entry.year).collect();
        assert_eq!(years, vec![2023, 2024, 2025]);

        let first = &report.yearly_data[0];
        assert_eq!(first.growth, 0);

        let middle = &report.yearly_data[1];
        assert_eq!(middle.total_applications, 8);
        assert_eq!(middle.admissions, 6);
        assert_eq!(middle.enrollment, 4);
        assert_eq!(middle.enrollment_rate, 50);
        assert_eq!(middle.admission_to_enrollment_rate, 67);
        assert_eq!(middle.growth, 100);

        assert_eq!(report.yearly_data[2].growth, 25);
    }

    #[test]
    fn empty_years_report_zero_rates() {
        let report = compute_comparison(2025, &[]).expect("report");
        for entry in &report.yearly_data {
            assert_eq!(entry.enrollment_rate, 0);
            assert_eq!(entry.admission_to_enrollment_rate, 0);
            assert_eq!(entry.growth, 0);
        }
        assert!(report.top_courses.is_empty());
    }

    #[test]
    fn course_growth_from_zero_is_one_hundred_percent() {
        let records = repeat(5, 2025, "Tourism", ApplicationStatus::Enrolled);
        let report = compute_comparison(2025, &records).expect("report");
        assert_eq!(report.top_courses[0].growth, 100);
        assert_eq!(report.yearly_data[2].growth, 100);
    }

    #[test]
    fn top_courses_are_sorted_and_capped() {
        let mut records = Vec::new();
        for (index, course) in ["A", "B", "C", "D", "E", "F"].iter().enumerate() {
            records.extend(repeat(index + 1, 2025, course, ApplicationStatus::Enrolled));
        }
        records.extend(repeat(3, 2025, "G", ApplicationStatus::Enrolled));
        records.extend(repeat(4, 2024, "F", ApplicationStatus::Enrolled));

        let report = compute_comparison(2025, &records).expect("report");
        let names: Vec<&str> = report
            .top_courses
            .iter()
            .map(|course| course.name.as_str())
            .collect();
        assert_eq!(names, vec!["F", "E", "D", "C", "G"]);
        assert_eq!(report.top_courses[0].growth, 50);
    }
}
