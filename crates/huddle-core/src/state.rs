use std::sync::Arc;

use tokio::sync::watch;

use crate::errors::UiError;
use crate::models::AttendeeInfo;

/// Observable state of the meeting screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub loading: bool,
    pub error: Option<UiError>,
    pub video_enabled: bool,
    pub audio_enabled: bool,
    pub meeting_id: Option<String>,
    pub attendees: Vec<AttendeeInfo>,
    pub selected_attendee: Option<AttendeeInfo>,
}

impl SessionState {
    pub fn new(video_enabled: bool, audio_enabled: bool) -> Self {
        Self {
            loading: false,
            error: None,
            video_enabled,
            audio_enabled,
            meeting_id: None,
            attendees: Vec::new(),
            selected_attendee: None,
        }
    }

    /// Append an attendee. With `dedupe` set, an attendee already listed
    /// under the same id is replaced instead of duplicated.
    pub fn push_attendee(&mut self, info: AttendeeInfo, dedupe: bool) {
        if dedupe {
            if let Some(existing) = self
                .attendees
                .iter_mut()
                .find(|a| a.attendee_id == info.attendee_id)
            {
                *existing = info;
                return;
            }
        }
        self.attendees.push(info);
    }

    pub fn remove_attendee(&mut self, attendee_id: &str) {
        self.attendees.retain(|a| a.attendee_id != attendee_id);
        if self
            .selected_attendee
            .as_ref()
            .is_some_and(|a| a.attendee_id == attendee_id)
        {
            self.selected_attendee = None;
        }
    }

    pub fn has_attendee(&self, attendee_id: &str) -> bool {
        self.attendees.iter().any(|a| a.attendee_id == attendee_id)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(true, true)
    }
}

/// Single writer for [`SessionState`]; readers subscribe to changes.
#[derive(Clone)]
pub(crate) struct StateStore {
    tx: Arc<watch::Sender<SessionState>>,
}

impl StateStore {
    pub fn new(initial: SessionState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    pub fn update<R: Default>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut out = R::default();
        self.tx.send_modify(|state| out = f(state));
        out
    }

    pub fn replace(&self, state: SessionState) {
        self.tx.send_replace(state);
    }
}
