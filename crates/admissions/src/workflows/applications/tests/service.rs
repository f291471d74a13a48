use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use super::common::*;
use crate::config::IntakeConfig;
use crate::workflows::applications::{
    ApplicationId, ApplicationQuery, ApplicationService, ApplicationServiceError,
    ApplicationStatus, IdGenerator, MediaError, MediaFolder, Notification, RepositoryError,
    SequentialIds,
};

#[tokio::test]
async fn submit_persists_pending_application_with_normalized_email() {
    let harness = harness();

    let record = harness
        .service
        .submit(submission())
        .await
        .expect("submission accepted");

    assert_eq!(record.status, ApplicationStatus::Pending);
    assert_eq!(record.email, "ana.cruz@example.com");
    assert_eq!(record.photo_url, "memory://photos/photo.png");
    assert_eq!(record.signature_url, "memory://signatures/signature.png");
    assert!(!record.archived);
    assert_eq!(harness.repository.stored(&record.id), Some(record.clone()));

    let uploads = harness.media.uploads.lock().unwrap().clone();
    assert_eq!(uploads.len(), 2);
    assert!(uploads.iter().any(|(folder, _)| *folder == MediaFolder::Signatures));

    let sent = harness.notifier.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "ana.cruz@example.com");
    assert!(matches!(
        &sent[0].1,
        Notification::SubmissionConfirmation { application_id, .. } if *application_id == record.id
    ));
}

#[tokio::test]
async fn submit_requires_contact_details_and_both_uploads() {
    let harness = harness();

    let mut missing_contact = submission();
    missing_contact.contact = "   ".to_string();
    let err = harness.service.submit(missing_contact).await.unwrap_err();
    assert!(matches!(err, ApplicationServiceError::Validation(message) if message.contains("required")));

    let mut missing_signature = submission();
    missing_signature.signature = None;
    let err = harness.service.submit(missing_signature).await.unwrap_err();
    assert!(
        matches!(err, ApplicationServiceError::Validation(message) if message == "Photo and signature are required")
    );

    assert_eq!(harness.repository.len(), 0);
    assert!(harness.media.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn oversized_uploads_are_rejected_before_storage() {
    let harness = harness_with(
        MemoryMedia::default(),
        MemoryNotifier::default(),
        IntakeConfig {
            max_upload_bytes: 16,
            upload_timeout_secs: 5,
        },
    );

    let err = harness.service.submit(submission()).await.unwrap_err();
    assert!(matches!(err, ApplicationServiceError::Validation(message) if message.starts_with("photo exceeds")));
    assert!(harness.media.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn slow_media_store_times_out_with_typed_error() {
    let harness = harness_with(
        MemoryMedia {
            delay: Some(Duration::from_millis(250)),
            ..MemoryMedia::default()
        },
        MemoryNotifier::default(),
        IntakeConfig {
            max_upload_bytes: IntakeConfig::DEFAULT_MAX_UPLOAD,
            upload_timeout_secs: 0,
        },
    );

    let err = harness.service.submit(submission()).await.unwrap_err();
    assert!(matches!(
        err,
        ApplicationServiceError::Media(MediaError::Timeout { seconds: 0, .. })
    ));
    assert_eq!(harness.repository.len(), 0);
}

#[tokio::test]
async fn notification_failures_do_not_fail_the_submission() {
    let harness = harness_with(
        MemoryMedia::default(),
        MemoryNotifier {
            fail: true,
            ..MemoryNotifier::default()
        },
        IntakeConfig::default(),
    );

    let record = harness.service.submit(submission()).await.expect("submitted");
    assert!(harness.repository.stored(&record.id).is_some());
}

#[tokio::test]
async fn status_updates_notify_for_decisions_and_missing_requirements() {
    let harness = harness();
    seed(
        &harness.repository,
        vec![record(
            "app-1",
            "Ana Cruz",
            "Bachelor of Science in Nursing",
            ApplicationStatus::Pending,
            (2025, 2, 1),
        )],
    )
    .await;
    let id = ApplicationId("app-1".to_string());

    harness.service.update_status(&id, "verified").await.expect("verified");
    harness.service.update_status(&id, "incomplete").await.expect("incomplete");
    let record = harness.service.update_status(&id, "ADMITTED").await.expect("admitted");

    assert_eq!(record.status, ApplicationStatus::Admitted);
    assert_eq!(
        harness.notifier.templates(),
        vec!["missing_requirements", "admission_result"]
    );
}

#[tokio::test]
async fn invalid_status_leaves_the_record_untouched() {
    let harness = harness();
    seed(
        &harness.repository,
        vec![record(
            "app-1",
            "Ana Cruz",
            "Nursing",
            ApplicationStatus::Admitted,
            (2025, 2, 1),
        )],
    )
    .await;
    let id = ApplicationId("app-1".to_string());

    let err = harness.service.update_status(&id, "graduated").await.unwrap_err();
    assert!(matches!(err, ApplicationServiceError::InvalidStatus(_)));
    assert_eq!(
        harness.repository.stored(&id).map(|record| record.status),
        Some(ApplicationStatus::Admitted)
    );
    assert!(harness.notifier.templates().is_empty());
}

#[tokio::test]
async fn list_filters_sorts_and_paginates() {
    let harness = harness();
    seed(
        &harness.repository,
        vec![
            record("app-1", "Ana Cruz", "Bachelor of Science in Nursing", ApplicationStatus::Pending, (2025, 1, 5)),
            record("app-2", "Ben Santos", "Bachelor of Science in Nursing", ApplicationStatus::Pending, (2025, 3, 5)),
            record("app-3", "Carla Reyes", "Bachelor of Science in Criminology", ApplicationStatus::Admitted, (2025, 2, 5)),
            record("app-4", "Dan Lim", "Bachelor of Science in Nursing", ApplicationStatus::Pending, (2025, 4, 5)),
        ],
    )
    .await;
    harness
        .service
        .archive(&ApplicationId("app-4".to_string()))
        .await
        .expect("archive");

    let page = harness
        .service
        .list(ApplicationQuery {
            course: Some("nursing".to_string()),
            limit: 1,
            ..ApplicationQuery::default()
        })
        .await
        .expect("list");
    assert_eq!(page.pagination.total, 2);
    assert_eq!(page.pagination.pages, 2);
    assert_eq!(page.applications[0].id.0, "app-2");

    let admitted = harness
        .service
        .list(ApplicationQuery {
            status: Some(ApplicationStatus::Admitted),
            ..ApplicationQuery::default()
        })
        .await
        .expect("list");
    assert_eq!(admitted.applications.len(), 1);
    assert_eq!(admitted.applications[0].id.0, "app-3");

    let searched = harness
        .service
        .list(ApplicationQuery {
            search: Some("santos".to_string()),
            ..ApplicationQuery::default()
        })
        .await
        .expect("list");
    assert_eq!(searched.applications.len(), 1);
}

#[tokio::test]
async fn archive_round_trip_moves_records_between_listings() {
    let harness = harness();
    seed(
        &harness.repository,
        vec![record("app-1", "Ana Cruz", "Nursing", ApplicationStatus::Pending, (2025, 1, 5))],
    )
    .await;
    let id = ApplicationId("app-1".to_string());

    let archived = harness.service.archive(&id).await.expect("archive");
    assert!(archived.archived);
    assert!(archived.archived_at.is_some());
    assert_eq!(harness.service.archived(1, 10).await.expect("archived").pagination.total, 1);
    assert_eq!(
        harness
            .service
            .list(ApplicationQuery::default())
            .await
            .expect("list")
            .pagination
            .total,
        0
    );

    let restored = harness.service.unarchive(&id).await.expect("unarchive");
    assert!(!restored.archived);
    assert!(restored.archived_at.is_none());
}

#[tokio::test]
async fn deleted_applications_are_not_found() {
    let harness = harness();
    seed(
        &harness.repository,
        vec![record("app-1", "Ana Cruz", "Nursing", ApplicationStatus::Pending, (2025, 1, 5))],
    )
    .await;
    let id = ApplicationId("app-1".to_string());

    harness.service.delete(&id).await.expect("delete");
    let err = harness.service.get(&id).await.unwrap_err();
    assert!(matches!(
        err,
        ApplicationServiceError::Repository(RepositoryError::NotFound)
    ));
}

#[tokio::test]
async fn overview_counts_recent_submissions_and_breakdowns() {
    let harness = harness();
    seed(
        &harness.repository,
        vec![
            record("app-1", "Ana Cruz", "Nursing", ApplicationStatus::Pending, (2025, 6, 28)),
            record("app-2", "Ben Santos", "Nursing", ApplicationStatus::Enrolled, (2025, 6, 1)),
            record("app-3", "Carla Reyes", "Criminology", ApplicationStatus::Pending, (2025, 6, 29)),
        ],
    )
    .await;
    harness
        .service
        .archive(&ApplicationId("app-3".to_string()))
        .await
        .expect("archive");

    let now = Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap();
    let overview = harness.service.overview(now).await.expect("overview");

    assert_eq!(overview.total_applications, 3);
    assert_eq!(overview.recent_applications, 2);
    assert_eq!(overview.course_breakdown[0].course, "Nursing");
    assert_eq!(overview.course_breakdown[0].count, 2);
    let pending = overview
        .status_breakdown
        .iter()
        .find(|entry| entry.status == ApplicationStatus::Pending)
        .expect("pending bucket");
    assert_eq!(pending.count, 2);
}

#[tokio::test]
async fn submissions_take_ids_from_the_injected_generator() {
    let service = ApplicationService::new(
        Arc::new(MemoryRepository::default()),
        Arc::new(MemoryMedia::default()),
        Arc::new(MemoryNotifier::default()),
        IntakeConfig::default(),
    )
    .with_id_generator(Arc::new(SequentialIds::new("intake-a")));

    let first = service.submit(submission()).await.expect("first accepted");
    let second = service.submit(submission()).await.expect("second accepted");

    assert_eq!(first.id, ApplicationId("intake-a-000001".to_string()));
    assert_eq!(second.id, ApplicationId("intake-a-000002".to_string()));
}

#[test]
fn separate_generators_keep_separate_sequences() {
    let stamp = Utc.with_ymd_and_hms(2025, 6, 1, 8, 30, 0).unwrap();
    let left = SequentialIds::stamped(stamp);
    let right = SequentialIds::new("app-other");

    assert_eq!(left.next_id().0, "app-20250601083000-000001");
    assert_eq!(right.next_id().0, "app-other-000001");
    assert_eq!(left.next_id().0, "app-20250601083000-000002");
}
