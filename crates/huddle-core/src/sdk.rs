//! Contract with the external media SDK.
//!
//! The SDK owns audio/video capture, transport and rendering. The core only
//! sees it through these traits; platform shells provide the implementation.

use std::sync::Arc;

use crate::errors::SdkError;
use crate::session::SessionConfiguration;

/// Creates meeting sessions. Implemented by the platform's SDK binding.
pub trait MediaSdk: Send + Sync {
    fn create_session(
        &self,
        config: SessionConfiguration,
    ) -> Result<Arc<dyn AudioVideoFacade>, SdkError>;
}

/// Entry object for audio/video control of one session.
///
/// Implementations may invoke observers from any thread.
pub trait AudioVideoFacade: Send + Sync {
    fn start(&self) -> Result<(), SdkError>;
    fn stop(&self) -> Result<(), SdkError>;

    fn add_video_tile_observer(&self, observer: Arc<dyn VideoTileObserver>);
    fn add_realtime_observer(&self, observer: Arc<dyn RealtimeObserver>);

    fn bind_video_view(&self, view: Arc<dyn VideoRenderView>, tile_id: i32)
        -> Result<(), SdkError>;
    fn unbind_video_view(&self, tile_id: i32) -> Result<(), SdkError>;

    fn start_local_video(&self) -> Result<(), SdkError>;
    fn stop_local_video(&self) -> Result<(), SdkError>;
    fn realtime_local_mute(&self) -> Result<(), SdkError>;
    fn realtime_local_unmute(&self) -> Result<(), SdkError>;
}

/// Video tile lifecycle callbacks.
pub trait VideoTileObserver: Send + Sync {
    fn on_video_tile_added(&self, tile: VideoTileState);
    fn on_video_tile_removed(&self, tile: VideoTileState);
    fn on_video_tile_paused(&self, tile: VideoTileState);
    fn on_video_tile_resumed(&self, tile: VideoTileState);
    fn on_video_tile_size_changed(&self, tile: VideoTileState);
}

/// Attendee presence callbacks.
pub trait RealtimeObserver: Send + Sync {
    fn on_attendees_joined(&self, attendees: Vec<AttendeeRef>);
    fn on_attendees_left(&self, attendees: Vec<AttendeeRef>);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendeeRef {
    pub attendee_id: String,
    pub external_user_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoPauseState {
    Unpaused,
    PausedByUserRequest,
    PausedForPoorConnection,
}

/// Snapshot of a tile as reported by the SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoTileState {
    pub tile_id: i32,
    pub attendee_id: String,
    pub pause_state: VideoPauseState,
    pub is_local_tile: bool,
    pub is_content: bool,
    pub video_stream_content_width: u32,
    pub video_stream_content_height: u32,
}

impl VideoTileState {
    pub fn is_paused(&self) -> bool {
        self.pause_state != VideoPauseState::Unpaused
    }
}

/// A decoded frame handed to a render view by the SDK.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub timestamp_ns: i64,
    pub rotation: u32,
    pub data: Arc<[u8]>,
}

/// Render target a tile can be bound to.
pub trait VideoRenderView: Send + Sync {
    fn on_video_frame_received(&self, frame: VideoFrame);
}
