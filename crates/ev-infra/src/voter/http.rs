use std::time::Duration;

use async_trait::async_trait;
use ev_core::ids::NationalId;
use ev_core::ports::{VoterCheckResponse, VoterRegistryError, VoterRegistryPort};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

pub const CHECK_VOTER_PATH: &str = "/Voter/check-voter";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckVoterRequest<'a> {
    national_id: &'a str,
}

/// Client for the voter registry lookup.
pub struct HttpVoterRegistry {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpVoterRegistry {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn check_voter_url(&self) -> String {
        format!("{}{}", self.base_url, CHECK_VOTER_PATH)
    }

    fn map_error(&self, err: reqwest::Error) -> VoterRegistryError {
        if err.is_timeout() {
            VoterRegistryError::Timeout {
                after_secs: self.timeout.as_secs(),
            }
        } else if err.is_decode() || err.is_body() {
            VoterRegistryError::InvalidResponse(err.to_string())
        } else {
            VoterRegistryError::Network(err.to_string())
        }
    }
}

/// Pull a human-readable message out of an error body, if it has one.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error", "title"]
        .iter()
        .filter_map(|k| value.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl VoterRegistryPort for HttpVoterRegistry {
    async fn check_voter(
        &self,
        national_id: &NationalId,
    ) -> Result<VoterCheckResponse, VoterRegistryError> {
        let response = self
            .client
            .post(self.check_voter_url())
            .timeout(self.timeout)
            .json(&CheckVoterRequest {
                national_id: national_id.as_str(),
            })
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Voter check rejected");
            return Err(VoterRegistryError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let parsed: VoterCheckResponse = response.json().await.map_err(|e| self.map_error(e))?;
        debug!(
            success = parsed.success,
            voter_id = ?parsed.voter_id,
            "Voter check answered"
        );
        Ok(parsed)
    }
}
