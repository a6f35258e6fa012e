#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::http::StatusCode;
use axum::routing::post;
use serde_json::{Value, json};

use huddle_core::SdkError;
use huddle_core::events::{MeetingEvent, MeetingEventListener};
use huddle_core::sdk::{
    AttendeeRef, AudioVideoFacade, MediaSdk, RealtimeObserver, VideoFrame, VideoPauseState,
    VideoRenderView, VideoTileObserver, VideoTileState,
};
use huddle_core::session::SessionConfiguration;

// ── Stub backend ─────────────────────────────────────────────────────

pub type Reply = (StatusCode, String);

pub fn ok_json(body: Value) -> Reply {
    (StatusCode::OK, body.to_string())
}

pub async fn bind() -> tokio::net::TcpListener {
    tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap()
}

pub fn serve_on(listener: tokio::net::TcpListener, app: Router) -> String {
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Backend answering both endpoints with canned replies; join bodies are recorded.
pub struct StubBackend {
    pub url: String,
    pub join_bodies: Arc<Mutex<Vec<String>>>,
}

pub async fn spawn_backend(create: Reply, join: Reply) -> StubBackend {
    let join_bodies = Arc::new(Mutex::new(Vec::new()));
    let seen = join_bodies.clone();
    let app = Router::new()
        .route(
            "/createMeeting",
            post(move || {
                let reply = create.clone();
                async move { reply }
            }),
        )
        .route(
            "/joinMeeting",
            post(move |body: String| {
                let reply = join.clone();
                let seen = seen.clone();
                async move {
                    seen.lock().unwrap().push(body);
                    reply
                }
            }),
        );
    let url = serve_on(bind().await, app);
    StubBackend { url, join_bodies }
}

/// URL nothing listens on.
pub async fn unreachable_url() -> String {
    let listener = bind().await;
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

// ── Payloads ─────────────────────────────────────────────────────────

pub fn meeting_json(meeting_id: &str) -> Value {
    json!({
        "MeetingId": meeting_id,
        "ExternalMeetingId": "weekly-sync",
        "MediaRegion": "us-east-1",
        "MediaPlacement": {
            "AudioHostUrl": "audio.example.com:3478",
            "AudioFallbackUrl": "wss://audio.example.com/fallback",
            "SignalingUrl": "wss://signal.example.com/control",
            "TurnControlUrl": "https://turn.example.com/control",
            "ScreenDataUrl": "wss://screen.example.com/data",
            "ScreenSharingUrl": "wss://screen.example.com/share"
        }
    })
}

pub fn attendee_json(attendee_id: &str, external_user_id: &str) -> Value {
    json!({
        "AttendeeId": attendee_id,
        "ExternalUserId": external_user_id,
        "JoinToken": "join-token"
    })
}

pub fn join_reply(meeting_id: &str, attendee_id: &str) -> Value {
    json!({
        "Meeting": meeting_json(meeting_id),
        "Attendee": attendee_json(attendee_id, "alice")
    })
}

// ── Fake media SDK ───────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeFacade {
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<&'static str>>,
    tile_observers: Mutex<Vec<Arc<dyn VideoTileObserver>>>,
    realtime_observers: Mutex<Vec<Arc<dyn RealtimeObserver>>>,
    /// Fire `on_video_tile_added` from inside `bind_video_view`.
    pub added_on_bind: AtomicBool,
}

impl FakeFacade {
    pub fn fail(&self, call: &'static str) {
        self.failing.lock().unwrap().insert(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    pub fn tile_observer_count(&self) -> usize {
        self.tile_observers.lock().unwrap().len()
    }

    fn record(&self, call: &'static str) -> Result<(), SdkError> {
        self.calls.lock().unwrap().push(call.to_string());
        if self.failing.lock().unwrap().contains(call) {
            Err(SdkError::new(format!("{call} rejected")))
        } else {
            Ok(())
        }
    }

    fn tile_observers(&self) -> Vec<Arc<dyn VideoTileObserver>> {
        self.tile_observers.lock().unwrap().clone()
    }

    pub fn emit_added(&self, tile: VideoTileState) {
        for o in self.tile_observers() {
            o.on_video_tile_added(tile.clone());
        }
    }

    pub fn emit_paused(&self, tile: VideoTileState) {
        for o in self.tile_observers() {
            o.on_video_tile_paused(tile.clone());
        }
    }

    pub fn emit_removed(&self, tile: VideoTileState) {
        for o in self.tile_observers() {
            o.on_video_tile_removed(tile.clone());
        }
    }

    pub fn emit_joined(&self, attendees: Vec<AttendeeRef>) {
        let observers = self.realtime_observers.lock().unwrap().clone();
        for o in observers {
            o.on_attendees_joined(attendees.clone());
        }
    }
}

impl AudioVideoFacade for FakeFacade {
    fn start(&self) -> Result<(), SdkError> {
        self.record("start")
    }

    fn stop(&self) -> Result<(), SdkError> {
        self.record("stop")
    }

    fn add_video_tile_observer(&self, observer: Arc<dyn VideoTileObserver>) {
        self.tile_observers.lock().unwrap().push(observer);
    }

    fn add_realtime_observer(&self, observer: Arc<dyn RealtimeObserver>) {
        self.realtime_observers.lock().unwrap().push(observer);
    }

    fn bind_video_view(
        &self,
        _view: Arc<dyn VideoRenderView>,
        tile_id: i32,
    ) -> Result<(), SdkError> {
        if self.added_on_bind.load(Ordering::SeqCst) {
            self.emit_added(tile(tile_id, "a-remote"));
        }
        self.record("bind_video_view")
    }

    fn unbind_video_view(&self, _tile_id: i32) -> Result<(), SdkError> {
        self.record("unbind_video_view")
    }

    fn start_local_video(&self) -> Result<(), SdkError> {
        self.record("start_local_video")
    }

    fn stop_local_video(&self) -> Result<(), SdkError> {
        self.record("stop_local_video")
    }

    fn realtime_local_mute(&self) -> Result<(), SdkError> {
        self.record("mute")
    }

    fn realtime_local_unmute(&self) -> Result<(), SdkError> {
        self.record("unmute")
    }
}

#[derive(Default)]
pub struct FakeSdk {
    pub facade: Arc<FakeFacade>,
    pub fail_create: AtomicBool,
    configs: Mutex<Vec<SessionConfiguration>>,
}

impl FakeSdk {
    pub fn configs(&self) -> Vec<SessionConfiguration> {
        self.configs.lock().unwrap().clone()
    }
}

impl MediaSdk for FakeSdk {
    fn create_session(
        &self,
        config: SessionConfiguration,
    ) -> Result<Arc<dyn AudioVideoFacade>, SdkError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(SdkError::new("device unavailable"));
        }
        self.configs.lock().unwrap().push(config);
        Ok(self.facade.clone())
    }
}

pub struct NullView;

impl VideoRenderView for NullView {
    fn on_video_frame_received(&self, _frame: VideoFrame) {}
}

pub fn tile(id: i32, attendee_id: &str) -> VideoTileState {
    VideoTileState {
        tile_id: id,
        attendee_id: attendee_id.to_string(),
        pause_state: VideoPauseState::Unpaused,
        is_local_tile: false,
        is_content: false,
        video_stream_content_width: 640,
        video_stream_content_height: 360,
    }
}

#[derive(Default)]
pub struct EventLog {
    pub events: Mutex<Vec<MeetingEvent>>,
}

impl MeetingEventListener for EventLog {
    fn on_event(&self, event: MeetingEvent) {
        self.events.lock().unwrap().push(event);
    }
}
