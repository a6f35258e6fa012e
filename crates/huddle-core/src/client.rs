use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::watch;

use crate::backend::BackendClient;
use crate::config::ClientConfig;
use crate::errors::{MeetingError, SdkError, UiError};
use crate::events::{EventEmitter, MeetingEvent, MeetingEventListener};
use crate::mapper;
use crate::models::{AttendeeInfo, MeetingDescriptor};
use crate::sdk::{AudioVideoFacade, MediaSdk, VideoRenderView, VideoTileState};
use crate::session::{SessionBootstrapper, SessionHandle, UrlRewriter};
use crate::state::{SessionState, StateStore};
use crate::tiles::{ObserverSink, SharedTiles, TileRecord, TileTracker};

/// Drives one meeting at a time: backend calls, session bootstrap, media
/// toggles and the observable state the UI renders.
///
/// Every operation reports failures twice: as the returned `Err` and in the
/// error slot of [`SessionState`].
/// Live handle plus the switch that detaches its observer sink.
struct ActiveSession {
    handle: SessionHandle,
    live: Arc<AtomicBool>,
}

impl ActiveSession {
    /// Detach the sink, then stop the facade.
    fn retire(self) -> Result<(), SdkError> {
        self.live.store(false, Ordering::SeqCst);
        self.handle.stop()
    }
}

pub struct MeetingClient {
    config: ClientConfig,
    backend: BackendClient,
    bootstrapper: SessionBootstrapper,
    state: StateStore,
    tiles: SharedTiles,
    emitter: EventEmitter,
    session: Mutex<Option<ActiveSession>>,
    created_payload: Mutex<Option<Value>>,
}

impl MeetingClient {
    pub fn new(config: ClientConfig, sdk: Arc<dyn MediaSdk>) -> Result<Self, MeetingError> {
        let backend = BackendClient::new(&config)?;
        let state = StateStore::new(Self::initial_state(&config));
        Ok(Self {
            config,
            backend,
            bootstrapper: SessionBootstrapper::new(sdk),
            state,
            tiles: Arc::new(Mutex::new(TileTracker::new())),
            emitter: EventEmitter::new(),
            session: Mutex::new(None),
            created_payload: Mutex::new(None),
        })
    }

    pub fn with_url_rewriter(mut self, rewriter: UrlRewriter) -> Self {
        self.bootstrapper = self.bootstrapper.with_url_rewriter(rewriter);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Register a listener for meeting events.
    pub fn add_listener(&self, listener: Arc<dyn MeetingEventListener>) {
        self.emitter.add_listener(listener);
    }

    // ── State projection ─────────────────────────────────────────────

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state.snapshot()
    }

    pub fn is_loading(&self) -> bool {
        self.state.snapshot().loading
    }

    pub fn error(&self) -> Option<UiError> {
        self.state.snapshot().error
    }

    pub fn is_video_enabled(&self) -> bool {
        self.state.snapshot().video_enabled
    }

    pub fn is_audio_enabled(&self) -> bool {
        self.state.snapshot().audio_enabled
    }

    pub fn meeting_id(&self) -> Option<String> {
        self.state.snapshot().meeting_id
    }

    pub fn attendees(&self) -> Vec<AttendeeInfo> {
        self.state.snapshot().attendees
    }

    pub fn selected_attendee(&self) -> Option<AttendeeInfo> {
        self.state.snapshot().selected_attendee
    }

    pub fn is_in_session(&self) -> bool {
        self.session_slot().is_some()
    }

    /// Mark an attendee as selected. Returns false if no such attendee is listed.
    pub fn select_attendee(&self, attendee_id: &str) -> bool {
        self.state.update(|s| {
            let found = s
                .attendees
                .iter()
                .find(|a| a.attendee_id == attendee_id)
                .cloned();
            let hit = found.is_some();
            s.selected_attendee = found;
            hit
        })
    }

    pub fn clear_error(&self) {
        self.state.update(|s| s.error = None);
    }

    // ── Meeting entry ────────────────────────────────────────────────

    /// Create a meeting on the backend and record its id.
    pub async fn create_meeting(&self) -> Result<String, MeetingError> {
        self.run(self.create_inner()).await
    }

    /// Join `meeting_id` as `attendee_name` and start the media session.
    pub async fn join_meeting(
        &self,
        meeting_id: &str,
        attendee_name: &str,
    ) -> Result<String, MeetingError> {
        self.run(self.join_inner(meeting_id, attendee_name)).await
    }

    /// Create a meeting and join it straight away.
    pub async fn host_meeting(&self, attendee_name: &str) -> Result<String, MeetingError> {
        self.run(async {
            let meeting_id = self.create_inner().await?;
            self.join_inner(&meeting_id, attendee_name).await?;
            Ok::<_, MeetingError>(meeting_id)
        })
        .await
    }

    async fn create_inner(&self) -> Result<String, MeetingError> {
        let payload = self.backend.create_meeting_payload().await?;
        let meeting_id = mapper::meeting_id(&payload)?;
        tracing::info!("meeting created: {meeting_id}");

        *lock(&self.created_payload) = Some(payload);
        if self.is_in_session() {
            // the projection keeps describing the live session until a join replaces it
            tracing::info!("session active, meeting {meeting_id} recorded for a later join");
        } else {
            self.state.update(|s| {
                s.meeting_id = Some(meeting_id.clone());
                s.attendees.clear();
                s.selected_attendee = None;
            });
        }
        self.emitter.emit(MeetingEvent::MeetingCreated {
            meeting_id: meeting_id.clone(),
        });
        Ok(meeting_id)
    }

    async fn join_inner(
        &self,
        meeting_id: &str,
        attendee_name: &str,
    ) -> Result<String, MeetingError> {
        let payload = self
            .backend
            .join_meeting_payload(meeting_id, attendee_name)
            .await?;
        let attendee = mapper::map_attendee(&payload)?;
        let meeting = self.meeting_for_join(&payload, meeting_id)?;

        let previous = lock(&self.session).take();
        let replaced = previous.is_some();
        if let Some(previous) = previous {
            let previous_id = previous.handle.configuration().meeting_id().to_string();
            tracing::info!("replacing session for meeting {previous_id}");
            if let Err(e) = previous.retire() {
                tracing::warn!("stopping previous session failed: {e}");
            }
            // rejoining the same meeting keeps the attendee list
            if previous_id != meeting.meeting_id {
                self.state.update(|s| {
                    s.attendees.clear();
                    s.selected_attendee = None;
                });
            }
        }
        lock(&self.tiles).clear();

        let attendee_id = attendee.attendee_id.clone();
        let local = AttendeeInfo {
            attendee_id: attendee_id.clone(),
            external_user_id: attendee.external_user_id.clone(),
            name: Some(attendee_name.to_string()),
            is_local: true,
        };
        let live = Arc::new(AtomicBool::new(true));
        let sink = Arc::new(ObserverSink::new(
            self.tiles.clone(),
            self.state.clone(),
            self.emitter.clone(),
            attendee_id.clone(),
            live.clone(),
        ));

        let handle = match self.bootstrapper.initialize(meeting, attendee, sink) {
            Ok(handle) => handle,
            Err(e) => {
                live.store(false, Ordering::SeqCst);
                if replaced {
                    // the old session is already gone
                    self.reset_meeting_state();
                }
                return Err(e);
            }
        };
        let joined_meeting_id = handle.configuration().meeting_id().to_string();
        self.apply_initial_media(handle.facade());
        *lock(&self.session) = Some(ActiveSession { handle, live });

        let dedupe = self.config.dedupe_attendees;
        let attendees = self.state.update(|s| {
            s.meeting_id = Some(joined_meeting_id.clone());
            s.push_attendee(local, dedupe);
            s.attendees.clone()
        });

        tracing::info!("session started: meeting={joined_meeting_id} attendee={attendee_id}");
        self.emitter.emit(MeetingEvent::SessionStarted {
            meeting_id: joined_meeting_id,
            attendee_id: attendee_id.clone(),
        });
        self.emitter.emit(MeetingEvent::AttendeesChanged(attendees));
        Ok(attendee_id)
    }

    /// Meeting descriptor for a join reply: taken from the reply itself, or
    /// from the meeting this client created when the reply only names the attendee.
    fn meeting_for_join(
        &self,
        payload: &Value,
        meeting_id: &str,
    ) -> Result<MeetingDescriptor, MeetingError> {
        if mapper::has_meeting(payload) {
            return mapper::map_meeting(payload);
        }
        let created = lock(&self.created_payload);
        match created.as_ref() {
            Some(created) if mapper::meeting_id(created).is_ok_and(|id| id == meeting_id) => {
                mapper::map_meeting(created)
            }
            _ => Err(MeetingError::missing("Meeting")),
        }
    }

    /// Bring the devices in line with the flags. A failure clears or sets
    /// the flag to match the device and is recorded; the join still succeeds.
    fn apply_initial_media(&self, facade: &dyn AudioVideoFacade) {
        let state = self.state.snapshot();
        if state.video_enabled {
            if let Err(e) = facade.start_local_video() {
                self.state.update(|s| s.video_enabled = false);
                let _ = self.record::<()>(Err(MeetingError::Toggle(format!("video: {e}"))));
            }
        }
        if !state.audio_enabled {
            if let Err(e) = facade.realtime_local_mute() {
                self.state.update(|s| s.audio_enabled = true);
                let _ = self.record::<()>(Err(MeetingError::Toggle(format!("audio: {e}"))));
            }
        }
    }

    // ── Tiles ────────────────────────────────────────────────────────

    pub fn bind_tile(
        &self,
        view: Arc<dyn VideoRenderView>,
        tile: &VideoTileState,
    ) -> Result<(), MeetingError> {
        let result = self.with_facade(|f| {
            f.bind_video_view(view, tile.tile_id)
                .map_err(|e| MeetingError::Bind(e.to_string()))
        });
        self.record(result)
    }

    pub fn unbind_tile(&self, tile: &VideoTileState) -> Result<(), MeetingError> {
        let result = self.with_facade(|f| {
            f.unbind_video_view(tile.tile_id)
                .map_err(|e| MeetingError::Bind(e.to_string()))
        });
        self.record(result)
    }

    /// Tile currently showing `attendee_id`, if any.
    pub fn tile_for_attendee(&self, attendee_id: &str) -> Option<TileRecord> {
        lock(&self.tiles).lookup_for_attendee(attendee_id).cloned()
    }

    pub fn tiles(&self) -> Vec<TileRecord> {
        lock(&self.tiles).tiles()
    }

    // ── Local media ──────────────────────────────────────────────────

    /// Flip the local video flag and start/stop the camera.
    ///
    /// The flag flips before the facade is called. It is only restored on
    /// failure when `rollback_toggle_on_failure` is set.
    pub fn toggle_video(&self) -> Result<bool, MeetingError> {
        let was_enabled = self.state.update(|s| {
            let was = s.video_enabled;
            s.video_enabled = !was;
            was
        });
        let result = self.with_optional_facade(|f| {
            if was_enabled {
                f.stop_local_video()
            } else {
                f.start_local_video()
            }
        });
        self.finish_toggle(result, was_enabled, |s, v| s.video_enabled = v, "video")
    }

    /// Flip the local audio flag and mute/unmute the microphone.
    pub fn toggle_audio(&self) -> Result<bool, MeetingError> {
        let was_enabled = self.state.update(|s| {
            let was = s.audio_enabled;
            s.audio_enabled = !was;
            was
        });
        let result = self.with_optional_facade(|f| {
            if was_enabled {
                f.realtime_local_mute()
            } else {
                f.realtime_local_unmute()
            }
        });
        self.finish_toggle(result, was_enabled, |s, v| s.audio_enabled = v, "audio")
    }

    fn finish_toggle(
        &self,
        result: Result<(), SdkError>,
        was_enabled: bool,
        set: impl FnOnce(&mut SessionState, bool),
        what: &str,
    ) -> Result<bool, MeetingError> {
        match result {
            Ok(()) => {
                tracing::info!("{what} enabled: {}", !was_enabled);
                Ok(!was_enabled)
            }
            Err(e) => {
                if self.config.rollback_toggle_on_failure {
                    self.state.update(|s| set(s, was_enabled));
                }
                self.record(Err(MeetingError::Toggle(format!("{what}: {e}"))))
            }
        }
    }

    // ── Teardown ─────────────────────────────────────────────────────

    /// Stop the active session and reset all meeting state.
    ///
    /// A no-op without an active session.
    pub fn end_call(&self) -> Result<(), MeetingError> {
        let Some(active) = lock(&self.session).take() else {
            return Ok(());
        };
        let stopped = active.retire();

        lock(&self.created_payload).take();
        self.reset_meeting_state();

        self.record(stopped.map_err(|e| MeetingError::Teardown(e.to_string())))
    }

    /// Drop tiles and replace the state with a fresh one, keeping the
    /// loading flag of an operation still in flight.
    fn reset_meeting_state(&self) {
        lock(&self.tiles).clear();
        let mut fresh = Self::initial_state(&self.config);
        fresh.loading = self.state.snapshot().loading;
        self.state.replace(fresh);
        self.emitter.emit(MeetingEvent::SessionEnded);
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn initial_state(config: &ClientConfig) -> SessionState {
        SessionState::new(config.video_enabled_on_join, config.audio_enabled_on_join)
    }

    fn session_slot(&self) -> std::sync::MutexGuard<'_, Option<ActiveSession>> {
        lock(&self.session)
    }

    /// Facade of the live session. The slot lock is released on return, so
    /// callbacks fired during a facade call may re-enter the client.
    fn current_facade(&self) -> Option<Arc<dyn AudioVideoFacade>> {
        self.session_slot()
            .as_ref()
            .map(|active| active.handle.shared_facade())
    }

    fn with_facade<T>(
        &self,
        f: impl FnOnce(&dyn AudioVideoFacade) -> Result<T, MeetingError>,
    ) -> Result<T, MeetingError> {
        let facade = self.current_facade().ok_or(MeetingError::NoActiveSession)?;
        f(facade.as_ref())
    }

    /// Without a session the call is skipped and counts as success.
    fn with_optional_facade(
        &self,
        f: impl FnOnce(&dyn AudioVideoFacade) -> Result<(), SdkError>,
    ) -> Result<(), SdkError> {
        match self.current_facade() {
            Some(facade) => f(facade.as_ref()),
            None => Ok(()),
        }
    }

    /// Toggle the loading flag around `op` and record its failure.
    async fn run<T>(
        &self,
        op: impl Future<Output = Result<T, MeetingError>>,
    ) -> Result<T, MeetingError> {
        self.state.update(|s| {
            s.loading = true;
            s.error = None;
        });
        let result = op.await;
        self.state.update(|s| s.loading = false);
        self.record(result)
    }

    fn record<T>(&self, result: Result<T, MeetingError>) -> Result<T, MeetingError> {
        if let Err(e) = &result {
            tracing::warn!("{e}");
            let ui = UiError::from(e);
            self.state.update(|s| s.error = Some(ui.clone()));
            self.emitter.emit(MeetingEvent::ErrorRaised(ui));
        }
        result
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
