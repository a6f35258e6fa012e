use serde::Serialize;

/// Identifiers and media endpoints for one meeting, as issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingDescriptor {
    pub meeting_id: String,
    pub external_meeting_id: Option<String>,
    pub media_region: String,
    pub media_placement: MediaPlacement,
    pub features: MeetingFeatures,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPlacement {
    pub audio_host_url: String,
    pub audio_fallback_url: Option<String>,
    pub signaling_url: String,
    pub turn_control_url: String,
    pub screen_data_url: Option<String>,
    pub screen_sharing_url: Option<String>,
    pub screen_viewing_url: Option<String>,
}

impl MediaPlacement {
    /// Apply `f` to every URL in the placement.
    pub fn map_urls(&self, f: impl Fn(&str) -> String) -> Self {
        Self {
            audio_host_url: f(&self.audio_host_url),
            audio_fallback_url: self.audio_fallback_url.as_deref().map(&f),
            signaling_url: f(&self.signaling_url),
            turn_control_url: f(&self.turn_control_url),
            screen_data_url: self.screen_data_url.as_deref().map(&f),
            screen_sharing_url: self.screen_sharing_url.as_deref().map(&f),
            screen_viewing_url: self.screen_viewing_url.as_deref().map(&f),
        }
    }
}

/// Optional capability limits advertised for the meeting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeetingFeatures {
    pub video_max_resolution: Option<VideoResolution>,
    pub content_max_resolution: Option<VideoResolution>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoResolution {
    pub width: u32,
    pub height: u32,
}

/// Credentials for one attendee of a meeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendeeDescriptor {
    pub attendee_id: String,
    pub external_user_id: String,
    /// Empty when the backend does not issue one.
    pub join_token: String,
}

/// Entry of the attendee list shown by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendeeInfo {
    pub attendee_id: String,
    pub external_user_id: String,
    pub name: Option<String>,
    pub is_local: bool,
}

impl AttendeeInfo {
    pub fn local(attendee_id: &str, name: Option<&str>) -> Self {
        Self {
            attendee_id: attendee_id.to_string(),
            external_user_id: attendee_id.to_string(),
            name: name.map(str::to_string),
            is_local: true,
        }
    }

    pub fn remote(attendee_id: &str, external_user_id: &str) -> Self {
        Self {
            attendee_id: attendee_id.to_string(),
            external_user_id: external_user_id.to_string(),
            name: None,
            is_local: false,
        }
    }
}

/// Body of `POST /joinMeeting`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinMeetingRequest<'a> {
    pub meeting_id: &'a str,
    pub attendee_name: &'a str,
}
