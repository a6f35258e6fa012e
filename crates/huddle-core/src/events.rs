use std::sync::{Arc, RwLock};

use crate::errors::UiError;
use crate::models::AttendeeInfo;
use crate::tiles::TileRecord;

/// Events emitted by the core to native UI listeners.
#[derive(Debug, Clone)]
pub enum MeetingEvent {
    MeetingCreated { meeting_id: String },
    SessionStarted { meeting_id: String, attendee_id: String },
    SessionEnded,
    TileAdded(TileRecord),
    TileUpdated(TileRecord),
    TileRemoved(i32), // tile id
    AttendeesChanged(Vec<AttendeeInfo>),
    ErrorRaised(UiError),
}

/// Trait for receiving events from the core.
/// Implementations must be Send + Sync (called from SDK threads).
pub trait MeetingEventListener: Send + Sync {
    fn on_event(&self, event: MeetingEvent);
}

/// Dispatches events to every registered listener.
#[derive(Clone, Default)]
pub struct EventEmitter {
    listeners: Arc<RwLock<Vec<Arc<dyn MeetingEventListener>>>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: Arc<dyn MeetingEventListener>) {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(listener);
    }

    pub fn emit(&self, event: MeetingEvent) {
        let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
        for listener in listeners.iter() {
            listener.on_event(event.clone());
        }
    }
}
