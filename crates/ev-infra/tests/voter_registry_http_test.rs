use std::time::Duration;

use ev_core::ids::{NationalId, VoterId};
use ev_core::ports::{VoterRegistryError, VoterRegistryPort};
use ev_infra::HttpVoterRegistry;
use mockito::{Matcher, Server};
use serde_json::json;

#[tokio::test]
async fn check_voter_posts_national_id() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/Voter/check-voter")
        .match_body(Matcher::Json(json!({"nationalId": "12345678901234"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success": true, "message": "Voter found", "voterId": 42}"#)
        .create_async()
        .await;

    let registry = HttpVoterRegistry::new(server.url(), Duration::from_secs(5));
    let id = NationalId::parse("12345678901234").unwrap();

    let response = registry.check_voter(&id).await.unwrap();

    mock.assert_async().await;
    assert!(response.success);
    assert_eq!(response.voter_id, Some(VoterId(42)));
    assert_eq!(response.message.as_deref(), Some("Voter found"));
}

#[tokio::test]
async fn check_voter_surfaces_server_message_on_error_status() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/Voter/check-voter")
        .with_status(404)
        .with_body(r#"{"message": "National ID not registered"}"#)
        .create_async()
        .await;

    let registry = HttpVoterRegistry::new(server.url(), Duration::from_secs(5));
    let id = NationalId::parse("12345678901234").unwrap();

    let err = registry.check_voter(&id).await.unwrap_err();

    assert_eq!(
        err,
        VoterRegistryError::Status {
            status: 404,
            message: Some("National ID not registered".to_string())
        }
    );
    assert_eq!(err.user_message(), "National ID not registered");
}

#[tokio::test]
async fn check_voter_rejects_malformed_body() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/Voter/check-voter")
        .with_status(200)
        .with_body("<html></html>")
        .create_async()
        .await;

    let registry = HttpVoterRegistry::new(server.url(), Duration::from_secs(5));
    let id = NationalId::parse("12345678901234").unwrap();

    let err = registry.check_voter(&id).await.unwrap_err();
    assert!(matches!(err, VoterRegistryError::InvalidResponse(_)));
}
