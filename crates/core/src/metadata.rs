//! Metadata records and their on-disk form.
//!
//! A populated slot holds:
//!
//! - `metadata.json`: urls, fetch timestamp and the info map (always)
//! - `summary.html` / `summary.txt`: readability summaries (optional)
//! - `subtitles.srt`: caption track (optional)
//!
//! A missing optional file means the data was absent at fetch time.
//! `metadata.json` is written last and atomically, so its presence marks a
//! complete entry.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::srt::{self, SubtitleCue};
use crate::{Error, Result};

pub const METADATA_FILE: &str = "metadata.json";
pub const SUMMARY_HTML_FILE: &str = "summary.html";
pub const SUMMARY_TEXT_FILE: &str = "summary.txt";
pub const SUBTITLES_FILE: &str = "subtitles.srt";

/// Generic info mapping: title, images, description and site-specific fields.
pub type Info = Map<String, Value>;

/// Result of fetching one URL.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    /// URL as given by the caller.
    pub url: String,
    /// Cache key the record is stored under.
    pub normalized_url: String,
    pub timestamp: DateTime<Utc>,
    pub info: Info,
    pub html_summary: Option<String>,
    pub text_summary: Option<String>,
    pub subtitles: Option<Vec<SubtitleCue>>,
}

/// Contents of `metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredData {
    pub url: String,
    pub normalized_url: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub info: Info,
}

impl StructuredData {
    pub fn dump(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn load(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl Metadata {
    pub fn title(&self) -> Option<&str> {
        self.info.get("title").and_then(Value::as_str)
    }

    /// Entries of `info.images`, empty if absent.
    pub fn images(&self) -> &[Value] {
        self.info.get("images").and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default()
    }

    /// Subtitle track rendered as SubRip text.
    pub fn subtitles_srt(&self) -> Option<String> {
        self.subtitles.as_deref().map(srt::compose)
    }

    fn structured(&self) -> StructuredData {
        StructuredData {
            url: self.url.clone(),
            normalized_url: self.normalized_url.clone(),
            timestamp: self.timestamp,
            info: self.info.clone(),
        }
    }

    /// Export form used by the CLI.
    pub fn to_json(&self) -> Value {
        json!({
            "url": self.url,
            "normalized_url": self.normalized_url,
            "timestamp": self.timestamp.to_rfc3339(),
            "info": self.info,
            "html_summary": self.html_summary,
            "text_summary": self.text_summary,
            "subtitles": self.subtitles_srt(),
        })
    }

    /// Persist the record into a slot directory.
    ///
    /// Optional files are written only when the data is present, and any left
    /// over from an earlier aborted attempt are removed first.
    pub fn save(&self, dir: &Path) -> Result<()> {
        write_optional(dir, SUMMARY_HTML_FILE, self.html_summary.as_deref())?;
        write_optional(dir, SUMMARY_TEXT_FILE, self.text_summary.as_deref())?;
        write_optional(dir, SUBTITLES_FILE, self.subtitles_srt().as_deref())?;

        let json = self.structured().dump().map_err(|e| Error::InvalidInput(format!("unserializable info: {e}")))?;
        write_atomic(&dir.join(METADATA_FILE), json.as_bytes())
    }

    /// Load a record from a slot directory.
    ///
    /// Returns `None` when the slot has not been populated yet.
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let metadata_path = dir.join(METADATA_FILE);
        let Some(raw) = read_optional(&metadata_path)? else {
            return Ok(None);
        };

        let data = StructuredData::load(&raw)
            .map_err(|e| Error::CacheCorruption { path: metadata_path.clone(), reason: e.to_string() })?;

        let html_summary = read_optional(&dir.join(SUMMARY_HTML_FILE))?;
        let text_summary = read_optional(&dir.join(SUMMARY_TEXT_FILE))?;

        let subtitles_path = dir.join(SUBTITLES_FILE);
        let subtitles = match read_optional(&subtitles_path)? {
            Some(text) => Some(
                srt::parse(&text)
                    .map_err(|e| Error::CacheCorruption { path: subtitles_path, reason: e.to_string() })?,
            ),
            None => None,
        };

        Ok(Some(Metadata {
            url: data.url,
            normalized_url: data.normalized_url,
            timestamp: data.timestamp,
            info: data.info,
            html_summary,
            text_summary,
            subtitles,
        }))
    }
}

/// Whether a slot directory holds a complete record.
pub fn is_populated(dir: &Path) -> bool {
    dir.join(METADATA_FILE).is_file()
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}

fn write_optional(dir: &Path, name: &str, contents: Option<&str>) -> Result<()> {
    let path = dir.join(name);
    match contents {
        Some(contents) => write_atomic(&path, contents.as_bytes()),
        None => match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "removed stale cache file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(path, e)),
        },
    }
}

/// Write through a temp file in the same directory, then rename over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::InvalidInput(format!("{} has no parent directory", path.display())))?;
    let tmp = parent.join(format!(
        ".{}.tmp.{}",
        path.file_name().and_then(|s| s.to_str()).unwrap_or("file"),
        std::process::id()
    ));

    let written = fs::File::create(&tmp)
        .and_then(|mut f| {
            f.write_all(bytes)?;
            f.sync_all()
        })
        .map_err(|e| Error::io(&tmp, e))
        .and_then(|()| fs::rename(&tmp, path).map_err(|e| Error::io(path, e)));

    if written.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    written
}
