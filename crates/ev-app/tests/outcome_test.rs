mod common;

use std::time::Duration;

use common::{base_time, checkpoint, jpeg, Harness, NATIONAL_ID};
use ev_app::usecases::{FailureReason, FAILURE_REDIRECT_SECS, SUCCESS_REDIRECT_SECS};
use ev_core::ids::VoterId;
use ev_core::ports::KeyValueStorePort;
use ev_core::storage_keys;
use ev_core::verification::{ImageFile, VerificationResult};

#[tokio::test(start_paused = true)]
async fn success_page_reads_checkpoint_and_redirects() {
    let h = Harness::checked_in().await;
    h.seed_checkpoint(&checkpoint(true, 91.4, base_time())).await;
    let outcomes = h.outcomes();

    let summary = outcomes.success_summary().await.expect("summary");
    assert_eq!(summary.national_id, NATIONAL_ID);
    assert_eq!(summary.voter_id, VoterId(7));
    let certificate = summary.certificate();
    assert!(certificate.starts_with("VERIFICATION CERTIFICATE"));
    assert!(certificate.contains("  National ID: 12345678901234"));
    assert!(certificate.contains("  Match Percentage: 91.4%"));
    assert!(certificate.contains("Wednesday, May 1, 2024 10:00:00 UTC"));
    assert_eq!(
        summary.certificate_file_name(1_714_557_600_000),
        "verification_12345678901234_1714557600000.txt"
    );

    let mut remaining = outcomes.start_success_redirect();
    assert_eq!(*remaining.borrow(), SUCCESS_REDIRECT_SECS);
    remaining.changed().await.expect("tick");
    assert_eq!(*remaining.borrow(), SUCCESS_REDIRECT_SECS - 1);

    tokio::time::sleep(Duration::from_secs(SUCCESS_REDIRECT_SECS as u64)).await;
    assert_eq!(h.navigator.urls(), vec!["/elections".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn success_page_skip_cancels_countdown() {
    let h = Harness::checked_in().await;
    let outcomes = h.outcomes();
    outcomes.start_success_redirect();

    outcomes.go_to_elections_now();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.navigator.urls(), vec!["/elections".to_string()]);
}

#[tokio::test]
async fn success_page_without_outcome_has_nothing_to_show() {
    let h = Harness::checked_in().await;
    h.seed_checkpoint(&checkpoint(false, 20.0, base_time())).await;
    assert!(h.outcomes().success_summary().await.is_none());
}

#[tokio::test]
async fn failure_page_explains_face_mismatch() {
    let h = Harness::new().await;
    h.store
        .start_session(NATIONAL_ID, VoterId(7))
        .await
        .expect("start session");
    h.store
        .set_id_card_image(ImageFile::new("id.jpg", "image/jpeg", jpeg(512), base_time()))
        .await
        .expect("id card");
    h.store
        .set_face_image(ImageFile::new("me.jpg", "image/jpeg", jpeg(512), base_time()))
        .await
        .expect("selfie");
    h.store
        .record_outcome(VerificationResult::remote(
            false,
            Some(18.0),
            Some("Faces do not match".into()),
            base_time(),
        ))
        .await
        .expect("record");

    let summary = h.outcomes().failure_summary().await;
    assert_eq!(summary.reason, FailureReason::FaceFailed);
    assert_eq!(summary.reason.message(), "Face verification failed");
    assert_eq!(summary.national_id.as_deref(), Some(NATIONAL_ID));
    let labels: Vec<_> = summary.details.iter().map(|d| (d.label, d.passed)).collect();
    assert_eq!(
        labels,
        vec![
            ("ID Card Status", true),
            ("Face Verification", false),
            ("Error Message", false)
        ]
    );
    assert_eq!(summary.details[2].value, "Faces do not match");
}

#[tokio::test]
async fn failure_page_without_data_reports_expired_session() {
    let h = Harness::new().await;
    let summary = h.outcomes().failure_summary().await;
    assert_eq!(summary.reason, FailureReason::SessionExpired);
    assert!(summary.details.is_empty());

    h.session_storage
        .set(storage_keys::FACE_VERIFICATION_DATA, "nope")
        .await
        .unwrap();
    assert_eq!(
        h.outcomes().failure_summary().await.reason,
        FailureReason::DataError
    );
}

#[tokio::test(start_paused = true)]
async fn failure_page_retry_keeps_national_id() {
    let h = Harness::checked_in().await;
    h.store
        .start_session(NATIONAL_ID, VoterId(7))
        .await
        .expect("start session");
    let outcomes = h.outcomes();
    let remaining = outcomes.start_failure_redirect();
    assert_eq!(*remaining.borrow(), FAILURE_REDIRECT_SECS);

    outcomes.retry().await.expect("retry");
    assert!(h.store.session().await.is_none());
    assert_eq!(
        h.session_storage.get(storage_keys::NATIONAL_ID).await.unwrap(),
        Some(NATIONAL_ID.to_string())
    );

    tokio::time::sleep(Duration::from_secs(FAILURE_REDIRECT_SECS as u64 + 1)).await;
    assert_eq!(h.navigator.urls(), vec!["/verify".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn dispose_stops_pending_redirect() {
    let h = Harness::checked_in().await;
    let outcomes = h.outcomes();
    outcomes.start_failure_redirect();
    outcomes.dispose();

    tokio::time::sleep(Duration::from_secs(FAILURE_REDIRECT_SECS as u64 + 1)).await;
    assert!(h.navigator.urls().is_empty());
}
