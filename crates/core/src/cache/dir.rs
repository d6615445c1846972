//! Sharded directory cache.
//!
//! Each key owns one slot directory under its hash group:
//!
//! ```text
//! <root>/data/a/5/8/cb32…6136/000/key
//!                            /001/key
//! ```
//!
//! The `key` file holds the exact key a slot was created for. Lookups walk
//! slots from `000` upward and stop at the first slot that is either vacant
//! or holds the same key, so hash collisions get consecutive slots.
//!
//! Slots are never renumbered or reclaimed. If a slot directory is deleted
//! externally, the next lookup stops at that gap: holes are not compacted and
//! a key whose non-zero slot was removed is reallocated into the first gap.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use walkdir::WalkDir;

use super::hash::{ShardLayout, Sharder, slot_name};
use crate::{Error, Result};

/// Name of the file holding a slot's key.
pub const KEY_FILE: &str = "key";

/// Subdirectory of the cache root that holds all shards.
pub const DATA_DIR: &str = "data";

/// Re-reads of a key file observed empty, i.e. still being written by another process.
const EMPTY_KEY_RETRIES: usize = 5;
const EMPTY_KEY_PAUSE: Duration = Duration::from_millis(20);

/// A populated or allocated slot found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Key stored in the slot's key file.
    pub key: String,
    /// Slot directory.
    pub path: PathBuf,
}

enum SlotState {
    Vacant,
    Matches,
    Taken,
}

/// On-disk cache of slot directories addressed by key.
#[derive(Debug, Clone)]
pub struct DirCache {
    root: PathBuf,
    sharder: Sharder,
}

impl DirCache {
    /// Cache rooted at `root`, with the default three level layout.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_layout(root, ShardLayout::default())
    }

    pub fn with_layout(root: impl Into<PathBuf>, layout: ShardLayout) -> Self {
        let root = root.into();
        let sharder = Sharder::new(root.join(DATA_DIR), layout);
        Self { root, sharder }
    }

    /// Cache root, the parent of `data/`.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> &Path {
        self.sharder.data_root()
    }

    /// Return the slot for `key`, allocating one if none exists.
    ///
    /// The key file is created with `create_new`, so two processes racing for
    /// the same vacant slot cannot both claim it: the loser re-reads the key
    /// file and either shares the slot (same key) or moves on to the next.
    pub fn locate_or_create(&self, key: &str) -> Result<PathBuf> {
        ensure_key(key)?;
        let group = self.sharder.shard_dir(key);

        let mut slot = 0;
        loop {
            let slot_dir = group.join(slot_name(slot));
            match read_slot(&slot_dir, key)? {
                SlotState::Matches => return Ok(slot_dir),
                SlotState::Taken => {}
                SlotState::Vacant => {
                    fs::create_dir_all(&slot_dir).map_err(|e| Error::io(&slot_dir, e))?;
                    match claim_slot(&slot_dir, key) {
                        Ok(()) => {
                            tracing::debug!(key, slot = %slot_dir.display(), "allocated cache slot");
                            return Ok(slot_dir);
                        }
                        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                            tracing::debug!(key, slot = %slot_dir.display(), "lost race for cache slot");
                            if let SlotState::Matches = read_slot(&slot_dir, key)? {
                                return Ok(slot_dir);
                            }
                        }
                        Err(e) => return Err(Error::io(slot_dir.join(KEY_FILE), e)),
                    }
                }
            }
            slot += 1;
        }
    }

    /// Read-only lookup; never creates directories or key files.
    pub fn find(&self, key: &str) -> Result<Option<PathBuf>> {
        if key.is_empty() {
            return Ok(None);
        }
        let group = self.sharder.shard_dir(key);

        let mut slot = 0;
        loop {
            let slot_dir = group.join(slot_name(slot));
            match read_slot(&slot_dir, key)? {
                SlotState::Matches => return Ok(Some(slot_dir)),
                SlotState::Vacant => return Ok(None),
                SlotState::Taken => slot += 1,
            }
        }
    }

    /// Whether a slot holding exactly `key` exists.
    pub fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.find(key)?.is_some())
    }

    /// Every key file under the data directory, in filesystem order.
    pub fn enumerate(&self) -> Result<Vec<CacheEntry>> {
        let data_dir = self.data_dir();
        if !data_dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(data_dir) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(data_dir).to_path_buf();
                Error::io(path, std::io::Error::from(e))
            })?;

            if !entry.file_type().is_file() || entry.file_name() != KEY_FILE {
                continue;
            }

            let key = fs::read_to_string(entry.path()).map_err(|e| Error::io(entry.path(), e))?;
            if key.is_empty() {
                continue;
            }

            if let Some(parent) = entry.path().parent() {
                entries.push(CacheEntry { key, path: parent.to_path_buf() });
            }
        }

        Ok(entries)
    }
}

fn ensure_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidInput("cache key cannot be empty".into()));
    }
    Ok(())
}

fn read_slot(slot_dir: &Path, key: &str) -> Result<SlotState> {
    let key_path = slot_dir.join(KEY_FILE);

    for attempt in 0..=EMPTY_KEY_RETRIES {
        match fs::read_to_string(&key_path) {
            Ok(stored) if stored.is_empty() => {
                if attempt < EMPTY_KEY_RETRIES {
                    std::thread::sleep(EMPTY_KEY_PAUSE);
                }
            }
            Ok(stored) if stored == key => return Ok(SlotState::Matches),
            Ok(_) => return Ok(SlotState::Taken),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(SlotState::Vacant),
            Err(e) => return Err(Error::io(key_path, e)),
        }
    }

    tracing::warn!(slot = %slot_dir.display(), "key file stayed empty; skipping slot");
    Ok(SlotState::Taken)
}

fn claim_slot(slot_dir: &Path, key: &str) -> std::io::Result<()> {
    let key_path = slot_dir.join(KEY_FILE);
    let mut file = OpenOptions::new().write(true).create_new(true).open(&key_path)?;

    let written = file.write_all(key.as_bytes()).and_then(|()| file.sync_all());
    if let Err(e) = written {
        let _ = fs::remove_file(&key_path);
        return Err(e);
    }
    Ok(())
}
