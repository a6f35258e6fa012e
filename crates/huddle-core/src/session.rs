use std::fmt;
use std::sync::Arc;

use crate::errors::{MeetingError, SdkError};
use crate::models::{AttendeeDescriptor, MeetingDescriptor};
use crate::sdk::{AudioVideoFacade, MediaSdk, RealtimeObserver, VideoTileObserver};

/// Hook applied to every media URL before the session is created.
pub type UrlRewriter = Arc<dyn Fn(&str) -> String + Send + Sync>;

pub fn identity_rewriter() -> UrlRewriter {
    Arc::new(|url: &str| url.to_string())
}

/// Everything the media SDK needs to open a session.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionConfiguration {
    pub meeting: MeetingDescriptor,
    pub attendee: AttendeeDescriptor,
}

impl SessionConfiguration {
    pub fn new(
        meeting: MeetingDescriptor,
        attendee: AttendeeDescriptor,
        rewriter: &UrlRewriter,
    ) -> Self {
        let media_placement = meeting.media_placement.map_urls(|u| rewriter(u));
        Self {
            meeting: MeetingDescriptor {
                media_placement,
                ..meeting
            },
            attendee,
        }
    }

    pub fn meeting_id(&self) -> &str {
        &self.meeting.meeting_id
    }

    pub fn attendee_id(&self) -> &str {
        &self.attendee.attendee_id
    }
}

impl fmt::Debug for SessionConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfiguration")
            .field("meeting_id", &self.meeting.meeting_id)
            .field("media_region", &self.meeting.media_region)
            .field("attendee_id", &self.attendee.attendee_id)
            .finish_non_exhaustive()
    }
}

/// A live session. Dropping it does not stop the SDK; call [`SessionHandle::stop`].
pub struct SessionHandle {
    facade: Arc<dyn AudioVideoFacade>,
    configuration: SessionConfiguration,
}

impl SessionHandle {
    pub fn facade(&self) -> &dyn AudioVideoFacade {
        self.facade.as_ref()
    }

    /// Owned facade, for calls made after the session slot is released.
    pub fn shared_facade(&self) -> Arc<dyn AudioVideoFacade> {
        self.facade.clone()
    }

    pub fn configuration(&self) -> &SessionConfiguration {
        &self.configuration
    }

    /// Stop the session. The handle is consumed either way.
    pub fn stop(self) -> Result<(), SdkError> {
        tracing::info!("stopping session for meeting {}", self.configuration.meeting_id());
        self.facade.stop()
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("configuration", &self.configuration)
            .finish_non_exhaustive()
    }
}

/// Observer registered on every new facade.
pub trait SessionObserver: VideoTileObserver + RealtimeObserver {}

impl<T: VideoTileObserver + RealtimeObserver> SessionObserver for T {}

/// Turns mapped descriptors into a started [`SessionHandle`].
pub struct SessionBootstrapper {
    sdk: Arc<dyn MediaSdk>,
    rewriter: UrlRewriter,
}

impl SessionBootstrapper {
    pub fn new(sdk: Arc<dyn MediaSdk>) -> Self {
        Self {
            sdk,
            rewriter: identity_rewriter(),
        }
    }

    pub fn with_url_rewriter(mut self, rewriter: UrlRewriter) -> Self {
        self.rewriter = rewriter;
        self
    }

    /// Create the session, register `observer` and start audio/video.
    ///
    /// On failure no handle escapes; a facade that was created but failed to
    /// start is stopped before returning.
    pub fn initialize<O: SessionObserver + 'static>(
        &self,
        meeting: MeetingDescriptor,
        attendee: AttendeeDescriptor,
        observer: Arc<O>,
    ) -> Result<SessionHandle, MeetingError> {
        let configuration = SessionConfiguration::new(meeting, attendee, &self.rewriter);
        tracing::info!("creating session: {configuration:?}");

        let facade = self
            .sdk
            .create_session(configuration.clone())
            .map_err(|e| MeetingError::SessionInit(e.to_string()))?;

        facade.add_video_tile_observer(observer.clone());
        facade.add_realtime_observer(observer);

        if let Err(e) = facade.start() {
            tracing::warn!("session start failed: {e}");
            if let Err(stop_err) = facade.stop() {
                tracing::warn!("stopping half-started session failed: {stop_err}");
            }
            return Err(MeetingError::SessionInit(e.to_string()));
        }

        Ok(SessionHandle {
            facade,
            configuration,
        })
    }
}
