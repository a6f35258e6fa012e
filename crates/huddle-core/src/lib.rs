//! Huddle meeting core.
//!
//! Pure Rust crate with no platform dependencies. Creates and joins meetings
//! through the backend, bootstraps the media SDK session and keeps the
//! observable meeting state native UI shells render.

pub mod backend;
pub mod client;
pub mod config;
pub mod errors;
pub mod events;
pub mod logging;
pub mod mapper;
pub mod models;
pub mod sdk;
pub mod session;
pub mod state;
pub mod tiles;

pub use backend::BackendClient;
pub use client::MeetingClient;
pub use config::{ClientConfig, ConfigStore};
pub use errors::{ErrorKind, MeetingError, SdkError, UiError};
pub use events::{MeetingEvent, MeetingEventListener};
pub use state::SessionState;
