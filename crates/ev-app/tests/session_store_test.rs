mod common;

use std::sync::Arc;

use common::{base_time, jpeg, Harness, NATIONAL_ID};
use ev_app::usecases::VerificationSessionStore;
use ev_core::ids::VoterId;
use ev_core::ports::KeyValueStorePort;
use ev_core::storage_keys;
use ev_core::verification::{ImageFile, VerificationResult, VerificationStatus};
use ev_core::VerificationStep;

fn image(name: &str, mime_type: &str, len: usize) -> ImageFile {
    ImageFile::new(name, mime_type, jpeg(len), base_time())
}

async fn with_both_images(h: &Harness) {
    h.store
        .start_session(NATIONAL_ID, VoterId(7))
        .await
        .expect("start session");
    h.store
        .set_id_card_image(image("id.jpg", "image/jpeg", 2048))
        .await
        .expect("id card");
    h.store
        .set_face_image(image("selfie.webp", "image/webp", 1024))
        .await
        .expect("selfie");
}

#[tokio::test]
async fn session_store_restores_persisted_session() {
    let h = Harness::new().await;
    with_both_images(&h).await;
    assert_eq!(h.store.current_step(), VerificationStep::Verification);
    assert!(h.store.can_advance_to_verification());

    let reopened = VerificationSessionStore::open(
        h.session_storage.clone(),
        h.durable_storage.clone(),
        h.clock.clone(),
        VerificationStatus::default_window(),
    )
    .await;

    assert_eq!(reopened.current_step(), VerificationStep::Verification);
    assert_eq!(reopened.national_id().await.as_deref(), Some(NATIONAL_ID));
    let id_card = reopened.id_card_image().expect("id card restored");
    assert_eq!(id_card.name(), "id.jpg");
    assert_eq!(id_card.size(), 2048);
    assert!(!id_card.has_data());
    assert!(!reopened.can_advance_to_verification());
    assert_eq!(reopened.face_image().map(|f| f.mime_type().to_string()), Some("image/webp".into()));
    assert!(h
        .durable_storage
        .get(storage_keys::VERIFICATION_SESSION)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn session_store_clears_corrupt_snapshot() {
    let h = Harness::new().await;
    h.session_storage
        .set(storage_keys::FACE_VERIFICATION_DATA, "{\"currentStep\":")
        .await
        .unwrap();

    assert!(!h.store.restore().await);
    assert_eq!(h.store.current_step(), VerificationStep::IdCard);
    assert_eq!(
        h.session_storage
            .get(storage_keys::FACE_VERIFICATION_DATA)
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn session_store_rejects_invalid_images() {
    let h = Harness::new().await;

    let err = h
        .store
        .set_id_card_image(image("huge.jpg", "image/jpeg", 5 * 1024 * 1024 + 1))
        .await
        .expect_err("too large");
    assert_eq!(err.user_message(), "File size too large. Maximum 5MB");

    let err = h
        .store
        .set_face_image(image("empty.png", "image/png", 0))
        .await
        .expect_err("empty");
    assert_eq!(err.user_message(), "The selected file is empty");
    assert!(h.store.session().await.is_none());
}

#[tokio::test]
async fn session_store_checkpoint_survives_reset() {
    let h = Harness::new().await;
    with_both_images(&h).await;

    let status = h
        .store
        .record_outcome(VerificationResult::remote(true, Some(87.0), None, base_time()))
        .await
        .expect("record");
    assert!(status.verified);
    assert_eq!(h.store.current_step(), VerificationStep::Complete);
    assert!(h.store.is_verified());
    assert!(h.store.is_user_verified(Some(NATIONAL_ID)).await);
    assert!(!h.store.is_user_verified(Some("00000000000000")).await);

    h.store.reset().await.expect("reset");
    assert!(h.store.session().await.is_none());
    assert!(!h.store.is_verified());
    assert_eq!(h.store.current_step(), VerificationStep::IdCard);
    assert_eq!(
        h.session_storage
            .get(storage_keys::FACE_VERIFICATION_DATA)
            .await
            .unwrap(),
        None
    );
    assert!(h.store.is_user_verified(Some(NATIONAL_ID)).await);
    assert!(h
        .durable_storage
        .get(storage_keys::VERIFICATION_SESSION)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn session_store_clearing_selfie_drops_outcome() {
    let h = Harness::new().await;
    with_both_images(&h).await;
    h.store
        .record_outcome(VerificationResult::remote(false, Some(12.0), None, base_time()))
        .await
        .expect("record");

    h.store.clear_face_image().await.expect("clear selfie");
    assert!(h.store.face_image().is_none());
    assert!(h.store.verification_result().is_none());
    assert_eq!(h.store.current_step(), VerificationStep::FaceCapture);
    assert!(!h.store.can_advance_to_verification());
}

#[tokio::test]
async fn session_store_malformed_checkpoint_is_cleared() {
    let h = Harness::new().await;
    h.durable_storage
        .set(storage_keys::USER_VERIFICATION_STATUS, "[1, 2")
        .await
        .unwrap();

    assert!(h.store.verification_status().await.is_none());
    assert!(!h.store.is_user_verified(None).await);
    assert_eq!(
        h.durable_storage
            .get(storage_keys::USER_VERIFICATION_STATUS)
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn session_store_new_voter_replaces_session() {
    let h = Harness::new().await;
    with_both_images(&h).await;

    h.store
        .start_session(NATIONAL_ID, VoterId(8))
        .await
        .expect("same voter");
    assert!(h.store.id_card_image().is_some());
    assert_eq!(h.store.session().await.map(|s| s.voter_id()), Some(VoterId(8)));

    h.store
        .start_session("22222222222222", VoterId(9))
        .await
        .expect("other voter");
    assert!(h.store.id_card_image().is_none());
    assert!(h.store.face_image().is_none());
    assert_eq!(h.store.current_step(), VerificationStep::IdCard);
}

#[tokio::test]
async fn session_store_publishes_step_changes() {
    let h = Harness::new().await;
    let store = Arc::clone(&h.store);
    let mut step = store.subscribe_current_step();
    assert!(!step.has_changed().unwrap());

    store
        .set_id_card_image(image("id.png", "image/png", 64))
        .await
        .expect("id card");
    assert!(step.has_changed().unwrap());
    assert_eq!(*step.borrow_and_update(), VerificationStep::FaceCapture);
    assert_eq!(store.progress().percentage, 50);
}

#[tokio::test]
async fn session_store_rewinds_restored_session_without_image_bytes() {
    let h = Harness::new().await;
    with_both_images(&h).await;
    let reloaded = h.reload().await;

    let step = reloaded
        .store
        .rewind_to_missing_image()
        .await
        .expect("rewind");
    assert_eq!(step, Some(VerificationStep::IdCard));
    assert_eq!(reloaded.store.current_step(), VerificationStep::IdCard);
    assert!(reloaded.store.id_card_image().is_none());
    assert!(reloaded.store.face_image().is_none());

    let session = reloaded.store.session().await.expect("session kept");
    assert_eq!(session.national_id(), NATIONAL_ID);
    assert!(session.id_card_image().is_none());
    assert!(session.steps_completed().is_empty());

    let again = reloaded
        .store
        .rewind_to_missing_image()
        .await
        .expect("second rewind");
    assert_eq!(again, None);
}
