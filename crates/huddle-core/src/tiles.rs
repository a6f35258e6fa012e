use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::events::{EventEmitter, MeetingEvent};
use crate::models::AttendeeInfo;
use crate::sdk::{AttendeeRef, RealtimeObserver, VideoTileObserver, VideoTileState};
use crate::state::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileStatus {
    Active,
    Paused,
}

/// Last-known state of a video tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRecord {
    pub state: VideoTileState,
    pub status: TileStatus,
}

impl TileRecord {
    pub fn tile_id(&self) -> i32 {
        self.state.tile_id
    }

    pub fn attendee_id(&self) -> &str {
        &self.state.attendee_id
    }

    pub fn size(&self) -> (u32, u32) {
        (
            self.state.video_stream_content_width,
            self.state.video_stream_content_height,
        )
    }
}

/// Tile records keyed by SDK tile id.
///
/// Only mirrors what the SDK reports; it never transitions a tile itself.
#[derive(Debug, Clone, Default)]
pub struct TileTracker {
    tiles: HashMap<i32, TileRecord>,
}

impl TileTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_added(&mut self, state: VideoTileState) -> TileRecord {
        let status = if state.is_paused() {
            TileStatus::Paused
        } else {
            TileStatus::Active
        };
        self.upsert(state, status)
    }

    pub fn on_paused(&mut self, state: VideoTileState) -> TileRecord {
        self.upsert(state, TileStatus::Paused)
    }

    pub fn on_resumed(&mut self, state: VideoTileState) -> TileRecord {
        self.upsert(state, TileStatus::Active)
    }

    /// Size changes keep the status already recorded for the tile.
    pub fn on_size_changed(&mut self, state: VideoTileState) -> TileRecord {
        let status = match self.tiles.get(&state.tile_id) {
            Some(existing) => existing.status,
            None if state.is_paused() => TileStatus::Paused,
            None => TileStatus::Active,
        };
        self.upsert(state, status)
    }

    pub fn on_removed(&mut self, state: &VideoTileState) -> Option<TileRecord> {
        self.tiles.remove(&state.tile_id)
    }

    pub fn tile(&self, tile_id: i32) -> Option<&TileRecord> {
        self.tiles.get(&tile_id)
    }

    /// Records ordered by tile id.
    pub fn tiles(&self) -> Vec<TileRecord> {
        let mut tiles: Vec<TileRecord> = self.tiles.values().cloned().collect();
        tiles.sort_by_key(TileRecord::tile_id);
        tiles
    }

    /// First tile showing `attendee_id`, scanning in tile-id order.
    pub fn lookup_for_attendee(&self, attendee_id: &str) -> Option<&TileRecord> {
        self.tiles
            .values()
            .filter(|t| t.state.attendee_id == attendee_id)
            .min_by_key(|t| t.state.tile_id)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn clear(&mut self) {
        self.tiles.clear();
    }

    fn upsert(&mut self, state: VideoTileState, status: TileStatus) -> TileRecord {
        let record = TileRecord { state, status };
        self.tiles.insert(record.state.tile_id, record.clone());
        record
    }
}

pub(crate) type SharedTiles = Arc<Mutex<TileTracker>>;

/// Observer registered on the facade.
///
/// SDK callbacks arrive on arbitrary threads; each one is applied to the
/// shared tracker under its lock and then forwarded to listeners. Once
/// `live` is cleared the sink is detached and drops every callback.
pub(crate) struct ObserverSink {
    tiles: SharedTiles,
    state: StateStore,
    emitter: EventEmitter,
    // listed by the join itself, skipped in presence callbacks
    local_attendee_id: String,
    live: Arc<AtomicBool>,
}

impl ObserverSink {
    pub fn new(
        tiles: SharedTiles,
        state: StateStore,
        emitter: EventEmitter,
        local_attendee_id: impl Into<String>,
        live: Arc<AtomicBool>,
    ) -> Self {
        Self {
            tiles,
            state,
            emitter,
            local_attendee_id: local_attendee_id.into(),
            live,
        }
    }

    // checked under the tiles or state lock so a retire-then-reset never
    // interleaves with a write
    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn apply(&self, f: impl FnOnce(&mut TileTracker) -> TileRecord, added: bool) {
        let record = {
            let mut tiles = self.tiles.lock().unwrap_or_else(|e| e.into_inner());
            if !self.is_live() {
                tracing::debug!("dropping tile callback from a retired session");
                return;
            }
            f(&mut tiles)
        };
        tracing::debug!(
            "tile {} attendee={} status={:?}",
            record.tile_id(),
            record.attendee_id(),
            record.status
        );
        if added {
            self.emitter.emit(MeetingEvent::TileAdded(record));
        } else {
            self.emitter.emit(MeetingEvent::TileUpdated(record));
        }
    }
}

impl VideoTileObserver for ObserverSink {
    fn on_video_tile_added(&self, tile: VideoTileState) {
        self.apply(|t| t.on_added(tile), true);
    }

    fn on_video_tile_removed(&self, tile: VideoTileState) {
        {
            let mut tiles = self.tiles.lock().unwrap_or_else(|e| e.into_inner());
            if !self.is_live() {
                return;
            }
            if tiles.on_removed(&tile).is_some() {
                tracing::debug!("tile {} removed", tile.tile_id);
            }
        }
        self.emitter.emit(MeetingEvent::TileRemoved(tile.tile_id));
    }

    fn on_video_tile_paused(&self, tile: VideoTileState) {
        self.apply(|t| t.on_paused(tile), false);
    }

    fn on_video_tile_resumed(&self, tile: VideoTileState) {
        self.apply(|t| t.on_resumed(tile), false);
    }

    fn on_video_tile_size_changed(&self, tile: VideoTileState) {
        self.apply(|t| t.on_size_changed(tile), false);
    }
}

impl RealtimeObserver for ObserverSink {
    fn on_attendees_joined(&self, attendees: Vec<AttendeeRef>) {
        let list = self.state.update(|s| {
            if !self.is_live() {
                return None;
            }
            for a in &attendees {
                if a.attendee_id != self.local_attendee_id && !s.has_attendee(&a.attendee_id) {
                    s.push_attendee(
                        AttendeeInfo::remote(&a.attendee_id, &a.external_user_id),
                        false,
                    );
                }
            }
            Some(s.attendees.clone())
        });
        if let Some(list) = list {
            tracing::info!("{} attendee(s) joined", attendees.len());
            self.emitter.emit(MeetingEvent::AttendeesChanged(list));
        }
    }

    fn on_attendees_left(&self, attendees: Vec<AttendeeRef>) {
        let list = self.state.update(|s| {
            if !self.is_live() {
                return None;
            }
            for a in attendees.iter().filter(|a| a.attendee_id != self.local_attendee_id) {
                s.remove_attendee(&a.attendee_id);
            }
            Some(s.attendees.clone())
        });
        if let Some(list) = list {
            tracing::info!("{} attendee(s) left", attendees.len());
            self.emitter.emit(MeetingEvent::AttendeesChanged(list));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::VideoPauseState;
    use crate::state::SessionState;

    fn tile(id: i32, attendee: &str) -> VideoTileState {
        VideoTileState {
            tile_id: id,
            attendee_id: attendee.to_string(),
            pause_state: VideoPauseState::Unpaused,
            is_local_tile: false,
            is_content: false,
            video_stream_content_width: 640,
            video_stream_content_height: 480,
        }
    }

    #[test]
    fn added_then_removed_leaves_no_record() {
        let mut tracker = TileTracker::new();
        tracker.on_added(tile(5, "a1"));
        assert!(tracker.tile(5).is_some());

        tracker.on_removed(&tile(5, "a1"));
        assert!(tracker.tile(5).is_none());
        assert!(tracker.lookup_for_attendee("a1").is_none());
    }

    #[test]
    fn repeated_pause_keeps_single_latest_record() {
        let mut tracker = TileTracker::new();
        let mut first = tile(3, "a1");
        first.pause_state = VideoPauseState::PausedByUserRequest;
        tracker.on_paused(first);

        let mut second = tile(3, "a1");
        second.pause_state = VideoPauseState::PausedForPoorConnection;
        second.video_stream_content_width = 320;
        tracker.on_paused(second.clone());

        assert_eq!(tracker.len(), 1);
        let record = tracker.tile(3).unwrap();
        assert_eq!(record.state, second);
        assert_eq!(record.status, TileStatus::Paused);
    }

    #[test]
    fn resume_marks_tile_active() {
        let mut tracker = TileTracker::new();
        tracker.on_paused(tile(1, "a1"));
        tracker.on_resumed(tile(1, "a1"));
        assert_eq!(tracker.tile(1).unwrap().status, TileStatus::Active);
    }

    #[test]
    fn size_change_keeps_status_and_updates_size() {
        let mut tracker = TileTracker::new();
        tracker.on_paused(tile(2, "a1"));
        let mut resized = tile(2, "a1");
        resized.video_stream_content_width = 1280;
        resized.video_stream_content_height = 720;
        tracker.on_size_changed(resized);

        let record = tracker.tile(2).unwrap();
        assert_eq!(record.status, TileStatus::Paused);
        assert_eq!(record.size(), (1280, 720));
    }

    #[test]
    fn lookup_follows_reassigned_attendee() {
        let mut tracker = TileTracker::new();
        tracker.on_added(tile(1, "a1"));
        tracker.on_added(tile(2, "a2"));
        // SDK reassigns tile 1 to another attendee on resume
        tracker.on_resumed(tile(1, "a3"));

        assert!(tracker.lookup_for_attendee("a1").is_none());
        assert_eq!(tracker.lookup_for_attendee("a3").unwrap().tile_id(), 1);
        assert_eq!(tracker.lookup_for_attendee("a2").unwrap().tile_id(), 2);
    }

    #[test]
    fn lookup_returns_lowest_tile_for_attendee() {
        let mut tracker = TileTracker::new();
        tracker.on_added(tile(9, "a1"));
        tracker.on_added(tile(4, "a1"));
        assert_eq!(tracker.lookup_for_attendee("a1").unwrap().tile_id(), 4);
    }

    #[test]
    fn removing_unknown_tile_is_noop() {
        let mut tracker = TileTracker::new();
        tracker.on_added(tile(1, "a1"));
        assert!(tracker.on_removed(&tile(77, "a1")).is_none());
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn sink_applies_events_from_other_threads() {
        let tiles: SharedTiles = Arc::new(Mutex::new(TileTracker::new()));
        let sink = Arc::new(ObserverSink::new(
            tiles.clone(),
            StateStore::new(SessionState::default()),
            EventEmitter::new(),
            "local",
            Arc::new(AtomicBool::new(true)),
        ));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    sink.on_video_tile_added(tile(i, &format!("a{i}")));
                    if i % 2 == 0 {
                        sink.on_video_tile_removed(tile(i, &format!("a{i}")));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let tracker = tiles.lock().unwrap();
        assert_eq!(tracker.len(), 4);
        assert!(tracker.tiles().iter().all(|t| t.tile_id() % 2 == 1));
    }

    #[test]
    fn sink_tracks_attendee_presence() {
        let state = StateStore::new(SessionState::default());
        let sink = ObserverSink::new(
            Arc::new(Mutex::new(TileTracker::new())),
            state.clone(),
            EventEmitter::new(),
            "local",
            Arc::new(AtomicBool::new(true)),
        );
        let alice = AttendeeRef {
            attendee_id: "a1".into(),
            external_user_id: "alice".into(),
        };

        sink.on_attendees_joined(vec![alice.clone()]);
        sink.on_attendees_joined(vec![alice.clone()]);
        assert_eq!(state.snapshot().attendees.len(), 1);

        let me = AttendeeRef {
            attendee_id: "local".into(),
            external_user_id: "me".into(),
        };
        sink.on_attendees_joined(vec![me]);
        assert_eq!(state.snapshot().attendees.len(), 1);

        sink.on_attendees_left(vec![alice]);
        assert!(state.snapshot().attendees.is_empty());
    }

    #[test]
    fn retired_sink_drops_callbacks() {
        let tiles: SharedTiles = Arc::new(Mutex::new(TileTracker::new()));
        let state = StateStore::new(SessionState::default());
        let live = Arc::new(AtomicBool::new(true));
        let sink = ObserverSink::new(
            tiles.clone(),
            state.clone(),
            EventEmitter::new(),
            "local",
            live.clone(),
        );
        sink.on_video_tile_added(tile(1, "a1"));

        live.store(false, Ordering::SeqCst);
        sink.on_video_tile_added(tile(2, "a2"));
        sink.on_video_tile_removed(tile(1, "a1"));
        sink.on_attendees_joined(vec![AttendeeRef {
            attendee_id: "a2".into(),
            external_user_id: "bob".into(),
        }]);

        let tracker = tiles.lock().unwrap();
        assert_eq!(tracker.len(), 1);
        assert!(tracker.tile(1).is_some());
        assert!(state.snapshot().attendees.is_empty());
    }
}
