//! Content-addressed directory cache.
//!
//! This module provides the on-disk half of the cache:
//!
//! - SHA-256 sharding of keys into fixed-width hex directory levels
//! - Numbered collision slots verified by a stored key file
//! - Exclusive key file creation so concurrent processes never share a slot
//! - Enumeration of every allocated slot

pub mod dir;
pub mod hash;

pub use dir::{CacheEntry, DATA_DIR, DirCache, KEY_FILE};
pub use hash::{ShardLayout, Sharder, compute_key_hash};
