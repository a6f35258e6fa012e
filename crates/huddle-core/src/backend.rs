use reqwest::Client;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::errors::MeetingError;
use crate::mapper;
use crate::models::JoinMeetingRequest;

/// Talks to the meeting backend that issues meeting and attendee credentials.
///
/// Every call is a single attempt; failures are returned as-is.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    http: Client,
}

impl BackendClient {
    pub fn new(config: &ClientConfig) -> Result<Self, MeetingError> {
        let base_url = config.validated_backend_url()?;
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| MeetingError::Config(format!("http client: {e}")))?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a meeting and return its id.
    pub async fn create_meeting(&self) -> Result<String, MeetingError> {
        let payload = self.create_meeting_payload().await?;
        let meeting_id = mapper::meeting_id(&payload)?;
        tracing::info!("created meeting {meeting_id}");
        Ok(meeting_id)
    }

    /// Join `meeting_id` as `attendee_name` and return the attendee id.
    pub async fn join_meeting(
        &self,
        meeting_id: &str,
        attendee_name: &str,
    ) -> Result<String, MeetingError> {
        let payload = self.join_meeting_payload(meeting_id, attendee_name).await?;
        let attendee_id = mapper::attendee_id(&payload)?;
        tracing::info!("joined meeting {meeting_id} as attendee {attendee_id}");
        Ok(attendee_id)
    }

    /// Calls `POST /createMeeting` with an empty body.
    pub async fn create_meeting_payload(&self) -> Result<Value, MeetingError> {
        tracing::info!("creating meeting via {}", self.base_url);
        let response = self.http.post(self.url("/createMeeting")).send().await?;
        read_json(response).await
    }

    /// Calls `POST /joinMeeting` with `{meetingId, attendeeName}`.
    pub async fn join_meeting_payload(
        &self,
        meeting_id: &str,
        attendee_name: &str,
    ) -> Result<Value, MeetingError> {
        tracing::info!("joining meeting {meeting_id} as {attendee_name}");
        let response = self
            .http
            .post(self.url("/joinMeeting"))
            .json(&JoinMeetingRequest {
                meeting_id,
                attendee_name,
            })
            .send()
            .await?;
        read_json(response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value, MeetingError> {
    let status = response.status();
    if !status.is_success() {
        return Err(MeetingError::Network(format!(
            "backend returned status {}",
            status.as_u16()
        )));
    }

    let raw = response.text().await?;
    tracing::debug!("raw response: {raw}");

    if raw.trim().is_empty() {
        tracing::warn!("received an empty response from the backend");
        return Err(MeetingError::EmptyResponse);
    }

    serde_json::from_str(&raw).map_err(|e| MeetingError::malformed("$", e.to_string()))
}
