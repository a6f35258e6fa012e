use thiserror::Error;

#[derive(Debug, Error)]
pub enum MeetingError {
    #[error("network error: {0}")]
    Network(String),
    #[error("received an empty response from the backend")]
    EmptyResponse,
    #[error("invalid response at `{path}`: {reason}")]
    Parse { path: String, reason: String },
    #[error("failed to initialize meeting session: {0}")]
    SessionInit(String),
    #[error("failed to bind video tile: {0}")]
    Bind(String),
    #[error("failed to toggle media: {0}")]
    Toggle(String),
    #[error("failed to end call: {0}")]
    Teardown(String),
    #[error("no active meeting session")]
    NoActiveSession,
    #[error("configuration error: {0}")]
    Config(String),
}

impl MeetingError {
    pub(crate) fn missing(path: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            reason: "field is missing".into(),
        }
    }

    pub(crate) fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Network,
            Self::EmptyResponse => ErrorKind::EmptyResponse,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::SessionInit(_) => ErrorKind::SessionInit,
            Self::Bind(_) => ErrorKind::Bind,
            Self::Toggle(_) => ErrorKind::Toggle,
            Self::Teardown(_) => ErrorKind::Teardown,
            Self::NoActiveSession => ErrorKind::NoActiveSession,
            Self::Config(_) => ErrorKind::Config,
        }
    }
}

impl From<reqwest::Error> for MeetingError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}

/// Category of a failure, kept alongside the message in the error slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    EmptyResponse,
    Parse,
    SessionInit,
    Bind,
    Toggle,
    Teardown,
    NoActiveSession,
    Config,
}

/// What the UI error slot holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&MeetingError> for UiError {
    fn from(e: &MeetingError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

/// Failure reported by the media SDK.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct SdkError(pub String);

impl SdkError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}
