use serde::Serialize;

use super::domain::{ApplicationId, ApplicationStatus};

/// Applicant-facing messages emitted by the application workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "template", rename_all = "snake_case")]
pub enum Notification {
    SubmissionConfirmation {
        name: String,
        application_id: ApplicationId,
    },
    MissingRequirements {
        name: String,
        missing_items: Vec<String>,
    },
    AdmissionResult {
        name: String,
        status: ApplicationStatus,
        course: String,
    },
}

/// Rendered e-mail ready for a transport adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub subject: String,
    pub body: String,
}

/// Items requested from applicants whose status moves to `incomplete`.
pub fn default_missing_items() -> Vec<String> {
    ["Updated photo", "Clear signature", "Additional documents"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

impl Notification {
    pub const fn template(&self) -> &'static str {
        match self {
            Notification::SubmissionConfirmation { .. } => "submission_confirmation",
            Notification::MissingRequirements { .. } => "missing_requirements",
            Notification::AdmissionResult { .. } => "admission_result",
        }
    }

    pub fn render(&self, institution: &str) -> EmailMessage {
        match self {
            Notification::SubmissionConfirmation {
                name,
                application_id,
            } => EmailMessage {
                subject: format!("Application Submitted Successfully - {institution}"),
                body: format!(
                    "Dear {name},\n\nWe received your application. Your reference number is {application_id}.\nWe will contact you once your documents have been reviewed.\n\n{institution} Admissions"
                ),
            },
            Notification::MissingRequirements {
                name,
                missing_items,
            } => {
                let mut body = format!(
                    "Dear {name},\n\nYour application is incomplete. Please provide the following:\n"
                );
                for item in missing_items {
                    body.push_str("- ");
                    body.push_str(item);
                    body.push('\n');
                }
                body.push_str(&format!("\n{institution} Admissions"));
                EmailMessage {
                    subject: format!("Missing Requirements - Action Required - {institution}"),
                    body,
                }
            }
            Notification::AdmissionResult {
                name,
                status,
                course,
            } => {
                let (headline, detail) = if *status == ApplicationStatus::Admitted {
                    (
                        "Congratulations",
                        format!("you have been admitted to {course}"),
                    )
                } else {
                    (
                        "Application Update",
                        format!("we are unable to offer you a place in {course} at this time"),
                    )
                };
                EmailMessage {
                    subject: format!("Admission Decision - {headline} - {institution}"),
                    body: format!(
                        "Dear {name},\n\nAfter reviewing your application, {detail}.\n\n{institution} Admissions"
                    ),
                }
            }
        }
    }
}
