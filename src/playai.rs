//! Play.ai synthesis API client.
//!
//! Two calls: submit a PDF URL for two-voice podcast synthesis, and poll a
//! job by id. Submission goes out as multipart/form-data with the fixed
//! voice and style parameters the product always uses; authentication is
//! the raw API key in `AUTHORIZATION` plus the account id in `X-USER-ID`.

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::models::PlayNoteStatus;
use chrono::{DateTime, Utc};
use reqwest::{multipart, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Synthesis style sent with every job.
pub const SYNTHESIS_STYLE: &str = "podcast";

/// First speaker: Angelo.
pub const VOICE1: &str =
    "s3://voice-cloning-zero-shot/baf1ef41-36b6-428c-9bdf-50ba54682bd8/original/manifest.json";
pub const VOICE1_NAME: &str = "Angelo";

/// Second speaker: Deedee.
pub const VOICE2: &str =
    "s3://voice-cloning-zero-shot/e040bd1b-f190-4bdb-83f0-75ef85b18f84/original/manifest.json";
pub const VOICE2_NAME: &str = "Deedee";

/// Client for the Play.ai playnotes endpoints.
pub struct PlayAiClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
    user_id: String,
}

/// Fields of interest from a successful submission.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedJob {
    /// External job identifier; becomes the playnote's primary key.
    pub id: String,
    #[serde(default)]
    pub requested_at: Option<DateTime<Utc>>,
}

/// A single status poll result, also proxied verbatim to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusReport {
    pub status: PlayNoteStatus,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl PlayAiClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let base_url = Url::parse(&config.playai_base_url)
            .map_err(|e| AppError::InvalidConfig(format!("playai base URL: {}", e)))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            api_key: config.playai_api_key.clone(),
            user_id: config.playai_user_id.clone(),
        })
    }

    /// Submit a publicly reachable PDF URL for synthesis.
    pub async fn submit(&self, source_file_url: &str) -> Result<SubmittedJob> {
        let url = self.endpoint(&["api", "v1", "playnotes"])?;
        let form = multipart::Form::new()
            .text("sourceFileUrl", source_file_url.to_string())
            .text("synthesisStyle", SYNTHESIS_STYLE)
            .text("voice1", VOICE1)
            .text("voice1Name", VOICE1_NAME)
            .text("voice2", VOICE2)
            .text("voice2Name", VOICE2_NAME);

        debug!(source_file_url, "submitting synthesis job");
        let response = self
            .http
            .post(url)
            .header("AUTHORIZATION", &self.api_key)
            .header("X-USER-ID", &self.user_id)
            .header("accept", "application/json")
            .multipart(form)
            .send()
            .await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(rate_limited(&response));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body, "synthesis submission rejected");
            return Err(AppError::SynthesisSubmit {
                detail: format!("{}: {}", status, body),
            });
        }

        let job: SubmittedJob = response.json().await?;
        debug!(job_id = %job.id, "synthesis job accepted");
        Ok(job)
    }

    /// Fetch the current state of a job.
    pub async fn status(&self, job_id: &str) -> Result<JobStatusReport> {
        let url = self.endpoint(&["api", "v1", "playnotes", job_id])?;
        let response = self
            .http
            .get(url)
            .header("AUTHORIZATION", &self.api_key)
            .header("X-USER-ID", &self.user_id)
            .header("accept", "application/json")
            .send()
            .await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(rate_limited(&response));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::SynthesisStatus {
                job_id: job_id.to_string(),
                detail: format!("{}: {}", status, body),
            });
        }

        Ok(response.json().await?)
    }

    /// Build an endpoint URL; path segments are percent-encoded, which
    /// matters because job ids can contain characters like `/` and `:`.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::InvalidConfig("playai base URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Map a 429 response, honouring `Retry-After` when the server sends one.
fn rate_limited(response: &reqwest::Response) -> AppError {
    let retry_after_secs = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());
    AppError::RateLimited { retry_after_secs }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_report_parses_api_payload() {
        let json = r#"{
            "status": "completed",
            "audioUrl": "https://audio.play.ai/out.mp3",
            "duration": 512.4
        }"#;
        let report: JobStatusReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.status, PlayNoteStatus::Completed);
        assert_eq!(report.audio_url.as_deref(), Some("https://audio.play.ai/out.mp3"));
        assert_eq!(report.duration, Some(512.4));
        assert!(report.error.is_none());
    }

    #[test]
    fn status_report_tolerates_missing_fields() {
        let report: JobStatusReport = serde_json::from_str(r#"{"status": "generating"}"#).unwrap();
        assert_eq!(report.status, PlayNoteStatus::Generating);
        assert!(report.audio_url.is_none());
        assert!(report.duration.is_none());
    }

    #[test]
    fn submitted_job_parses_id() {
        let job: SubmittedJob =
            serde_json::from_str(r#"{"id": "pn-123", "requestedAt": "2024-06-01T10:00:00Z"}"#)
                .unwrap();
        assert_eq!(job.id, "pn-123");
        assert!(job.requested_at.is_some());
    }

    #[test]
    fn endpoint_encodes_job_ids() {
        let config = AppConfig {
            playai_base_url: "https://api.play.ai".into(),
            ..AppConfig::default()
        };
        let client = PlayAiClient::new(&config).unwrap();
        let url = client
            .endpoint(&["api", "v1", "playnotes", "job/with:odd chars"])
            .unwrap();
        assert!(url.as_str().starts_with("https://api.play.ai/api/v1/playnotes/"));
        assert!(!url.path().ends_with("job/with:odd chars"));
        assert!(url.path().contains("job%2Fwith"));
    }

    #[test]
    fn both_voices_are_distinct() {
        assert_ne!(VOICE1, VOICE2);
        assert_ne!(VOICE1_NAME, VOICE2_NAME);
    }
}
