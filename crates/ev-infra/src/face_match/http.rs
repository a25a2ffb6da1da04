use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ev_core::ports::{ClockPort, FaceMatchError, FaceMatchPort, ServiceHealth};
use ev_core::verification::{normalize_response, ImageFile, VerificationResult};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info, warn};

pub const VERIFY_PATH: &str = "/face/verify";
pub const HEALTH_PATH: &str = "/face/health";

const ID_CARD_FILE_NAME: &str = "id-card.jpg";
const FACE_FILE_NAME: &str = "face-image.jpg";

/// Client for the remote face-match service.
pub struct HttpFaceMatchClient {
    client: reqwest::Client,
    base_url: String,
    verify_timeout: Duration,
    health_timeout: Duration,
    clock: Arc<dyn ClockPort>,
}

#[derive(Debug, Deserialize)]
struct HealthBody {
    status: String,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

impl HttpFaceMatchClient {
    pub fn new(
        base_url: impl Into<String>,
        verify_timeout: Duration,
        health_timeout: Duration,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            verify_timeout,
            health_timeout,
            clock,
        }
    }

    pub fn verify_url(&self) -> String {
        format!("{}{}", self.base_url, VERIFY_PATH)
    }

    pub fn health_url(&self) -> String {
        format!("{}{}", self.base_url, HEALTH_PATH)
    }

    fn image_part(image: &ImageFile, file_name: &'static str) -> Result<Part, FaceMatchError> {
        let data = image.data().ok_or_else(|| {
            FaceMatchError::InvalidRequest(format!(
                "image bytes for {} are no longer available",
                image.name()
            ))
        })?;
        Part::bytes(data.to_vec())
            .file_name(file_name)
            .mime_str(image.mime_type())
            .map_err(|e| FaceMatchError::InvalidRequest(e.to_string()))
    }

    fn map_error(&self, err: reqwest::Error, timeout: Duration) -> FaceMatchError {
        if err.is_timeout() {
            FaceMatchError::Timeout {
                after_secs: timeout.as_secs(),
            }
        } else if err.is_body() || err.is_decode() {
            FaceMatchError::Body(err.to_string())
        } else {
            FaceMatchError::Network(err.to_string())
        }
    }

    fn parse_health(&self, body: &[u8]) -> Option<ServiceHealth> {
        let parsed: HealthBody = serde_json::from_slice(body).ok()?;
        let timestamp = parsed
            .timestamp
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| self.clock.now());
        Some(ServiceHealth {
            status: parsed.status,
            timestamp,
            version: parsed.version,
        })
    }
}

#[async_trait]
impl FaceMatchPort for HttpFaceMatchClient {
    async fn verify(
        &self,
        id_card: &ImageFile,
        face: &ImageFile,
    ) -> Result<VerificationResult, FaceMatchError> {
        let now = self.clock.now();
        let form = Form::new()
            .part("img1", Self::image_part(id_card, ID_CARD_FILE_NAME)?)
            .part("img2", Self::image_part(face, FACE_FILE_NAME)?)
            .text("timestamp", now.to_rfc3339());

        info!(
            id_card = %id_card.name(),
            face = %face.name(),
            timeout_secs = self.verify_timeout.as_secs(),
            "Sending face verification request"
        );

        let response = self
            .client
            .post(self.verify_url())
            .timeout(self.verify_timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.map_error(e, self.verify_timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Face verification request rejected");
            return Err(FaceMatchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_error(e, self.verify_timeout))?;

        let result = normalize_response(&body, self.clock.now());
        debug!(
            verified = result.verified(),
            confidence = ?result.confidence(),
            "Face verification response normalized"
        );
        Ok(result)
    }

    async fn check_health(&self) -> ServiceHealth {
        let response = self
            .client
            .get(self.health_url())
            .timeout(self.health_timeout)
            .send()
            .await;

        let health = match response {
            Ok(resp) if resp.status().is_success() => match resp.bytes().await {
                Ok(body) => self.parse_health(&body),
                Err(e) => {
                    debug!(error = %e, "Failed to read health response");
                    None
                }
            },
            Ok(resp) => {
                debug!(status = resp.status().as_u16(), "Health probe returned error status");
                None
            }
            Err(e) => {
                debug!(error = %e, "Health probe failed");
                None
            }
        };

        health.unwrap_or_else(|| ServiceHealth::offline(self.clock.now()))
    }
}
