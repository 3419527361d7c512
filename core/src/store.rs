mod local;
mod remote;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::media::is_valid_video_link;
use crate::{Error, Result};

pub use local::{KeyValueFile, LocalStore, LOOP_KEY, SOURCE_KEY, VIDEOS_KEY};
pub use remote::RemoteStore;

/// A configured video, as stored by either backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    /// Raw link or embed code exactly as the operator entered it
    pub url: String,
    #[serde(rename = "loop", default)]
    pub loop_enabled: bool,
    /// Set by the hosted store, used for ordering only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Operator input for creating or editing a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDraft {
    pub title: String,
    pub url: String,
    pub loop_enabled: bool,
}

impl VideoDraft {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            loop_enabled: true,
        }
    }

    /// Trim fields and reject anything the resolver could not play
    pub fn validated(&self) -> Result<VideoDraft> {
        let title = self.title.trim();
        let url = self.url.trim();
        if title.is_empty() {
            return Err(Error::MissingField("title"));
        }
        if url.is_empty() {
            return Err(Error::MissingField("video link"));
        }
        if !is_valid_video_link(url) {
            return Err(Error::InvalidLink);
        }
        Ok(VideoDraft {
            title: title.to_string(),
            url: url.to_string(),
            loop_enabled: self.loop_enabled,
        })
    }

    pub(crate) fn into_record(self, id: String) -> VideoRecord {
        VideoRecord {
            id,
            title: self.title,
            url: self.url,
            loop_enabled: self.loop_enabled,
            created_at: None,
        }
    }
}

/// The single-source kiosk settings
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Settings {
    pub video_url: String,
    pub loop_enabled: bool,
}

impl Settings {
    pub fn validated(&self) -> Result<Settings> {
        let url = self.video_url.trim();
        if url.is_empty() {
            return Err(Error::MissingField("video link"));
        }
        if !is_valid_video_link(url) {
            return Err(Error::InvalidLink);
        }
        Ok(Settings {
            video_url: url.to_string(),
            loop_enabled: self.loop_enabled,
        })
    }
}

/// Persistence capability shared by the local and hosted backends. The
/// resolver and the player never know which one is behind it.
pub trait VideoStore {
    /// Short description for the admin header
    fn describe(&self) -> String;

    /// Whether mutations need a signed-in session
    fn requires_auth(&self) -> bool {
        false
    }

    fn is_authenticated(&self) -> bool {
        true
    }

    fn authenticate(&mut self, _email: &str, _password: &str) -> Result<()> {
        Ok(())
    }

    fn sign_out(&mut self) -> Result<()> {
        Ok(())
    }

    /// All records, oldest first
    fn list(&self) -> Result<Vec<VideoRecord>>;

    fn create(&mut self, draft: &VideoDraft) -> Result<VideoRecord>;

    fn update(&mut self, id: &str, draft: &VideoDraft) -> Result<()>;

    fn delete(&mut self, id: &str) -> Result<()>;

    fn settings(&self) -> Result<Settings>;

    fn save_settings(&mut self, settings: &Settings) -> Result<()>;
}

/// Ids follow the hosted data: `vid_<unix millis>`
pub fn new_record_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("vid_{millis}")
}
