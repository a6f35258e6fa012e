//! Maps backend JSON payloads onto meeting and attendee descriptors.
//!
//! Two payload shapes are understood:
//!
//! - the flat shape returned by the meeting service itself:
//!   `{"Meeting": {...}, "Attendee": {...}}`
//! - the `joinInfo` envelope:
//!   `{"joinInfo": {"meetingResponse": {"meeting": {...}}, "attendeeResponse": {"attendee": {...}}}}`
//!
//! Every missing required field is reported with its full dotted path.

use serde_json::Value;

use crate::errors::MeetingError;
use crate::models::{
    AttendeeDescriptor, MediaPlacement, MeetingDescriptor, MeetingFeatures, VideoResolution,
};

const MEETING_PATHS: [&[&str]; 2] = [&["Meeting"], &["joinInfo", "meetingResponse", "meeting"]];
const ATTENDEE_PATHS: [&[&str]; 2] = [&["Attendee"], &["joinInfo", "attendeeResponse", "attendee"]];

/// A JSON object together with the path it was found at.
#[derive(Clone, Copy)]
struct Node<'a> {
    value: &'a Value,
    path: &'a str,
}

/// Extract `Meeting.MeetingId` from a create-meeting reply.
pub fn meeting_id(payload: &Value) -> Result<String, MeetingError> {
    let (meeting, path) = locate(payload, &MEETING_PATHS)?;
    required_string(Node { value: meeting, path: &path }, "MeetingId")
}

/// Extract `Attendee.AttendeeId` from a join-meeting reply.
pub fn attendee_id(payload: &Value) -> Result<String, MeetingError> {
    let (attendee, path) = locate(payload, &ATTENDEE_PATHS)?;
    required_string(Node { value: attendee, path: &path }, "AttendeeId")
}

/// Whether the payload carries a meeting object in any known shape.
pub fn has_meeting(payload: &Value) -> bool {
    locate(payload, &MEETING_PATHS).is_ok()
}

pub fn map_meeting(payload: &Value) -> Result<MeetingDescriptor, MeetingError> {
    let (meeting, path) = locate(payload, &MEETING_PATHS)?;
    let node = Node { value: meeting, path: &path };

    let meeting_id = required_string(node, "MeetingId")?;
    let external_meeting_id = optional_string(node, "ExternalMeetingId")?;
    let media_region = required_string(node, "MediaRegion")?;

    let placement_path = format!("{path}.MediaPlacement");
    let placement = node
        .value
        .get("MediaPlacement")
        .ok_or_else(|| MeetingError::missing(&placement_path))?;
    let placement = object(placement, &placement_path)?;
    let media_placement = map_placement(Node {
        value: placement,
        path: &placement_path,
    })?;

    let features = match node.value.get("MeetingFeatures") {
        None | Some(Value::Null) => MeetingFeatures::default(),
        Some(v) => {
            let features_path = format!("{path}.MeetingFeatures");
            map_features(Node {
                value: object(v, &features_path)?,
                path: &features_path,
            })?
        }
    };

    Ok(MeetingDescriptor {
        meeting_id,
        external_meeting_id,
        media_region,
        media_placement,
        features,
    })
}

pub fn map_attendee(payload: &Value) -> Result<AttendeeDescriptor, MeetingError> {
    let (attendee, path) = locate(payload, &ATTENDEE_PATHS)?;
    let node = Node { value: attendee, path: &path };
    Ok(AttendeeDescriptor {
        attendee_id: required_string(node, "AttendeeId")?,
        external_user_id: required_string(node, "ExternalUserId")?,
        join_token: optional_string(node, "JoinToken")?.unwrap_or_default(),
    })
}

/// Map a payload that carries both objects.
pub fn map_join_info(
    payload: &Value,
) -> Result<(MeetingDescriptor, AttendeeDescriptor), MeetingError> {
    Ok((map_meeting(payload)?, map_attendee(payload)?))
}

fn map_placement(node: Node<'_>) -> Result<MediaPlacement, MeetingError> {
    Ok(MediaPlacement {
        audio_host_url: required_string(node, "AudioHostUrl")?,
        audio_fallback_url: optional_string(node, "AudioFallbackUrl")?,
        signaling_url: required_string(node, "SignalingUrl")?,
        turn_control_url: required_string(node, "TurnControlUrl")?,
        screen_data_url: optional_string(node, "ScreenDataUrl")?,
        screen_sharing_url: optional_string(node, "ScreenSharingUrl")?,
        screen_viewing_url: optional_string(node, "ScreenViewingUrl")?,
    })
}

fn map_features(node: Node<'_>) -> Result<MeetingFeatures, MeetingError> {
    Ok(MeetingFeatures {
        video_max_resolution: max_resolution(node, "Video")?,
        content_max_resolution: max_resolution(node, "Content")?,
    })
}

/// Reads `<section>.MaxResolution`; the section key is matched case-insensitively.
fn max_resolution(node: Node<'_>, section: &str) -> Result<Option<VideoResolution>, MeetingError> {
    let Some((key, value)) = node
        .value
        .as_object()
        .and_then(|o| o.iter().find(|(k, _)| k.eq_ignore_ascii_case(section)))
    else {
        return Ok(None);
    };
    if value.is_null() {
        return Ok(None);
    }

    let section_path = format!("{}.{key}", node.path);
    let section = object(value, &section_path)?;
    let res_path = format!("{section_path}.MaxResolution");
    let res = match section.get("MaxResolution") {
        None | Some(Value::Null) => return Ok(None),
        Some(v) => object(v, &res_path)?,
    };

    let dim = |name: &str| -> Result<u32, MeetingError> {
        let p = format!("{res_path}.{name}");
        let v = res.get(name).ok_or_else(|| MeetingError::missing(&p))?;
        v.as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| MeetingError::malformed(&p, "expected a non-negative integer"))
    };

    Ok(Some(VideoResolution {
        width: dim("Width")?,
        height: dim("Height")?,
    }))
}

fn locate<'a>(
    payload: &'a Value,
    candidates: &[&[&str]],
) -> Result<(&'a Value, String), MeetingError> {
    if !payload.is_object() {
        return Err(MeetingError::malformed("$", "expected a JSON object"));
    }
    // Report against the shape the payload claims to use.
    let mut first_missing: Option<String> = None;
    for segments in candidates {
        let mut current = payload;
        let mut found = true;
        for (depth, segment) in segments.iter().enumerate() {
            match current.get(segment) {
                Some(next) if !next.is_null() => current = next,
                _ => {
                    if depth > 0 || first_missing.is_none() {
                        first_missing = Some(segments[..=depth].join("."));
                    }
                    found = false;
                    break;
                }
            }
        }
        if found {
            let path = segments.join(".");
            object(current, &path)?;
            return Ok((current, path));
        }
    }
    Err(MeetingError::missing(
        first_missing.unwrap_or_else(|| "$".to_string()),
    ))
}

fn object<'a>(value: &'a Value, path: &str) -> Result<&'a Value, MeetingError> {
    if value.is_object() {
        Ok(value)
    } else {
        Err(MeetingError::malformed(path, "expected a JSON object"))
    }
}

fn required_string(node: Node<'_>, key: &str) -> Result<String, MeetingError> {
    let path = format!("{}.{key}", node.path);
    match node.value.get(key) {
        None | Some(Value::Null) => Err(MeetingError::missing(path)),
        Some(Value::String(s)) if s.trim().is_empty() => {
            Err(MeetingError::malformed(path, "value is empty"))
        }
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(MeetingError::malformed(path, "expected a string")),
    }
}

fn optional_string(node: Node<'_>, key: &str) -> Result<Option<String>, MeetingError> {
    match node.value.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(MeetingError::malformed(
            format!("{}.{key}", node.path),
            "expected a string",
        )),
    }
}
