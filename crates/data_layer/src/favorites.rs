//! Saved daily images, persisted as a JSON list in a local file.
//!
//! Storage problems never surface as errors: an unreadable or corrupt file
//! reads as an empty list and a failed write leaves the old file in place.

use chrono::{SecondsFormat, Utc};
use common::config::FavoritesConfig;
use common::{ApodImage, FavoriteRecord};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct FavoritesStore {
    path: PathBuf,
}

impl FavoritesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(cfg: &FavoritesConfig) -> Self {
        Self::new(&cfg.path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> Vec<FavoriteRecord> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("Failed to read favorites {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(records) => records,
            Err(e) => {
                warn!("Ignoring corrupt favorites {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    /// Save `image`. No-op if its date is already saved.
    pub fn add(&self, image: &ApodImage) -> Vec<FavoriteRecord> {
        let mut records = self.get();
        if records.iter().any(|r| r.date == image.date) {
            debug!("{} already in favorites", image.date);
            return records;
        }

        records.push(FavoriteRecord {
            date: image.date.clone(),
            title: image.title.clone(),
            url: image.url.clone(),
            added_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        });
        if self.save(&records) {
            records
        } else {
            self.get()
        }
    }

    pub fn remove(&self, date: &str) -> Vec<FavoriteRecord> {
        let mut records = self.get();
        let before = records.len();
        records.retain(|r| r.date != date);
        if records.len() != before && !self.save(&records) {
            return self.get();
        }
        records
    }

    pub fn has(&self, date: &str) -> bool {
        self.get().iter().any(|r| r.date == date)
    }

    /// Write `records`. False if the file was left as it was.
    fn save(&self, records: &[FavoriteRecord]) -> bool {
        let result = (|| -> std::io::Result<()> {
            if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)?;
            }
            let json = serde_json::to_string_pretty(records)?;
            fs::write(&self.path, json)
        })();

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to save favorites {}: {}", self.path.display(), e);
                false
            }
        }
    }
}
