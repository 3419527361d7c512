use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info};

use super::{Settings, VideoDraft, VideoRecord, VideoStore, new_record_id};
use crate::{Error, Result};

/// Key holding the single-source video link
pub const SOURCE_KEY: &str = "cloudinary_cinema_source";
/// Key holding the loop flag as `"true"`/`"false"`
pub const LOOP_KEY: &str = "cloudinary_cinema_loop";
/// Key holding the channel list as a JSON array
pub const VIDEOS_KEY: &str = "signage_videos";

/// String key-value pairs persisted as one JSON object on disk.
///
/// Read once when opened; every `set`/`remove` writes the whole file back.
#[derive(Debug)]
pub struct KeyValueFile {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl KeyValueFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            if text.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&text)?
            }
        } else {
            BTreeMap::new()
        };
        debug!("Opened key-value file {} ({} keys)", path.display(), values.len());
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        self.values.insert(key.to_string(), value.into());
        self.flush()
    }

    pub fn remove(&mut self, key: &str) -> Result<()> {
        if self.values.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}

/// Store backed by a [`KeyValueFile`] on this machine
#[derive(Debug)]
pub struct LocalStore {
    kv: KeyValueFile,
}

impl LocalStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let kv = KeyValueFile::open(path)?;
        info!("Using local store at {}", kv.path().display());
        Ok(Self { kv })
    }

    fn records(&self) -> Result<Vec<VideoRecord>> {
        match self.kv.get(VIDEOS_KEY) {
            Some(json) => Ok(serde_json::from_str(json)?),
            None => Ok(Vec::new()),
        }
    }

    fn write_records(&mut self, records: &[VideoRecord]) -> Result<()> {
        let json = serde_json::to_string(records)?;
        self.kv.set(VIDEOS_KEY, json)
    }
}

impl VideoStore for LocalStore {
    fn describe(&self) -> String {
        format!("local: {}", self.kv.path().display())
    }

    fn list(&self) -> Result<Vec<VideoRecord>> {
        self.records()
    }

    fn create(&mut self, draft: &VideoDraft) -> Result<VideoRecord> {
        let draft = draft.validated()?;
        let mut records = self.records()?;
        let mut id = new_record_id();
        // Two creates in the same millisecond
        while records.iter().any(|r| r.id == id) {
            id.push('_');
        }
        let record = draft.into_record(id);
        records.push(record.clone());
        self.write_records(&records)?;
        debug!("Created local record {}", record.id);
        Ok(record)
    }

    fn update(&mut self, id: &str, draft: &VideoDraft) -> Result<()> {
        let draft = draft.validated()?;
        let mut records = self.records()?;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        record.title = draft.title;
        record.url = draft.url;
        record.loop_enabled = draft.loop_enabled;
        self.write_records(&records)
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        let mut records = self.records()?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(Error::NotFound(id.to_string()));
        }
        self.write_records(&records)
    }

    fn settings(&self) -> Result<Settings> {
        Ok(Settings {
            video_url: self.kv.get(SOURCE_KEY).unwrap_or_default().to_string(),
            // Signage loops unless told otherwise
            loop_enabled: self.kv.get(LOOP_KEY) != Some("false"),
        })
    }

    fn save_settings(&mut self, settings: &Settings) -> Result<()> {
        let settings = settings.validated()?;
        self.kv.set(SOURCE_KEY, settings.video_url)?;
        self.kv.set(LOOP_KEY, settings.loop_enabled.to_string())
    }
}
