use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::MeetingError;

pub const DEFAULT_BACKEND_URL: &str = "https://chimebackend-c74fc39330b2.herokuapp.com";
const CONFIG_FILE: &str = "config.json";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ClientConfig {
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_true")]
    pub video_enabled_on_join: bool,
    #[serde(default = "default_true")]
    pub audio_enabled_on_join: bool,
    /// Replace instead of append when the same attendee joins twice.
    #[serde(default)]
    pub dedupe_attendees: bool,
    /// Restore a media flag when the facade rejects the toggle.
    #[serde(default)]
    pub rollback_toggle_on_failure: bool,
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            request_timeout_secs: default_timeout_secs(),
            video_enabled_on_join: true,
            audio_enabled_on_join: true,
            dedupe_attendees: false,
            rollback_toggle_on_failure: false,
        }
    }
}

impl ClientConfig {
    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = url.into();
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Backend base URL without a trailing slash, checked to be http(s).
    pub fn validated_backend_url(&self) -> Result<String, MeetingError> {
        let parsed = url::Url::parse(&self.backend_url).map_err(|e| {
            MeetingError::Config(format!("invalid backend url '{}': {e}", self.backend_url))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(MeetingError::Config(format!(
                "backend url must be http or https, got '{}'",
                parsed.scheme()
            )));
        }
        Ok(self.backend_url.trim_end_matches('/').to_string())
    }
}

/// Persists [`ClientConfig`] as JSON in the app data directory.
pub struct ConfigStore {
    config: Mutex<ClientConfig>,
    file_path: PathBuf,
}

impl ConfigStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let file_path = data_dir.as_ref().join(CONFIG_FILE);
        let config = Self::load(&file_path);
        Self {
            config: Mutex::new(config),
            file_path,
        }
    }

    pub fn get(&self) -> ClientConfig {
        self.lock().clone()
    }

    pub fn set_backend_url(&self, url: String) -> Result<(), MeetingError> {
        let candidate = ClientConfig {
            backend_url: url,
            ..self.get()
        };
        candidate.validated_backend_url()?;
        self.lock().backend_url = candidate.backend_url;
        self.save();
        Ok(())
    }

    pub fn set_request_timeout_secs(&self, secs: u64) {
        self.lock().request_timeout_secs = secs;
        self.save();
    }

    pub fn set_video_enabled_on_join(&self, enabled: bool) {
        self.lock().video_enabled_on_join = enabled;
        self.save();
    }

    pub fn set_audio_enabled_on_join(&self, enabled: bool) {
        self.lock().audio_enabled_on_join = enabled;
        self.save();
    }

    pub fn set_dedupe_attendees(&self, enabled: bool) {
        self.lock().dedupe_attendees = enabled;
        self.save();
    }

    pub fn set_rollback_toggle_on_failure(&self, enabled: bool) {
        self.lock().rollback_toggle_on_failure = enabled;
        self.save();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ClientConfig> {
        self.config.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn save(&self) {
        let config = self.get();
        if let Some(parent) = self.file_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(&config) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.file_path, json) {
                    tracing::warn!("failed to write {}: {e}", self.file_path.display());
                }
            }
            Err(e) => tracing::warn!("failed to serialize config: {e}"),
        }
    }

    fn load(path: &Path) -> ClientConfig {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("ignoring unreadable config {}: {e}", path.display());
                ClientConfig::default()
            }),
            Err(_) => ClientConfig::default(),
        }
    }
}
