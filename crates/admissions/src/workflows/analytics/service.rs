use std::sync::Arc;

use chrono::NaiveDate;

use super::targets::{DefaultTargets, TargetQuery, TargetRepository};
use super::views::{ComparisonReport, CourseDetail, EnrollmentReport};
use super::{compute_comparison, compute_course_detail, compute_enrollment, AnalyticsError};
use crate::workflows::applications::{
    ApplicationFilter, ApplicationRepository, ApplicationStatus, CourseFilter,
};
use crate::workflows::calendar::{AcademicTerm, DateWindow};

/// Read-only dashboard queries over applications and course targets.
pub struct AnalyticsService<R, T> {
    applications: Arc<R>,
    targets: Arc<T>,
    defaults: DefaultTargets,
}

impl<R, T> AnalyticsService<R, T>
where
    R: ApplicationRepository + 'static,
    T: TargetRepository + 'static,
{
    pub fn new(applications: Arc<R>, targets: Arc<T>, defaults: DefaultTargets) -> Self {
        Self {
            applications,
            targets,
            defaults,
        }
    }

    pub async fn enrollment(
        &self,
        year: i32,
        term: AcademicTerm,
    ) -> Result<EnrollmentReport, AnalyticsError> {
        let window = DateWindow::for_term(year, term).ok_or(AnalyticsError::InvalidYear(year))?;
        let filter = ApplicationFilter::within(window).with_status(ApplicationStatus::Enrolled);
        let query = TargetQuery::for_term(year, term);

        let (records, persisted) = tokio::try_join!(
            self.applications.find(&filter),
            self.targets.find(&query),
        )?;

        compute_enrollment(year, term, &records, &persisted, &self.defaults)
    }

    pub async fn comparison(&self, year: i32) -> Result<ComparisonReport, AnalyticsError> {
        let start = year
            .checked_sub(2)
            .and_then(|first| NaiveDate::from_ymd_opt(first, 1, 1));
        let end = DateWindow::calendar_year(year).map(|window| window.end);
        let (Some(start), Some(end)) = (start, end) else {
            return Err(AnalyticsError::InvalidYear(year));
        };

        let records = self
            .applications
            .find(&ApplicationFilter::within(DateWindow { start, end }))
            .await?;
        compute_comparison(year, &records)
    }

    pub async fn course_detail(
        &self,
        course: &str,
        year: i32,
    ) -> Result<CourseDetail, AnalyticsError> {
        let window = DateWindow::calendar_year(year).ok_or(AnalyticsError::InvalidYear(year))?;
        let filter =
            ApplicationFilter::within(window).with_course(CourseFilter::Exact(course.to_string()));
        let records = self.applications.find(&filter).await?;
        compute_course_detail(course, year, &records)
    }
}
