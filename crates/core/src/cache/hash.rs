//! Content-addressed shard paths.
//!
//! A key is hashed with SHA-256; the leading hex characters become one
//! directory level each and the rest of the digest names the group
//! directory that holds the numbered slots.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Compute the hex digest used to place a key on disk.
pub fn compute_key_hash(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Directory fan-out for shard groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardLayout {
    /// Number of single hex character directory levels (16 children each).
    pub levels: usize,
    /// Whether the remaining digest characters form one more directory.
    pub include_remainder: bool,
}

impl Default for ShardLayout {
    fn default() -> Self {
        Self { levels: 3, include_remainder: true }
    }
}

/// Maps keys to their group directory under a data root.
#[derive(Debug, Clone)]
pub struct Sharder {
    data_root: PathBuf,
    layout: ShardLayout,
}

impl Sharder {
    pub fn new(data_root: impl Into<PathBuf>, layout: ShardLayout) -> Self {
        Self { data_root: data_root.into(), layout }
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Group directory for `key`; slots are created beneath it.
    pub fn shard_dir(&self, key: &str) -> PathBuf {
        let digest = compute_key_hash(key);
        let levels = self.layout.levels.min(digest.len());

        let mut dir = self.data_root.clone();
        for c in digest[..levels].chars() {
            dir.push(c.to_string());
        }
        if self.layout.include_remainder && levels < digest.len() {
            dir.push(&digest[levels..]);
        }
        dir
    }
}

/// Directory name for a slot number.
pub fn slot_name(slot: usize) -> String {
    format!("{slot:03}")
}
