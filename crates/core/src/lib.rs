//! Core types and shared functionality for url-metadata.
//!
//! This crate provides:
//! - Sharded directory cache with collision slots
//! - URL normalization and site families
//! - Metadata records and their on-disk files
//! - Fetch orchestration with throttling and retries
//! - Collaborator interfaces implemented by `urlmeta-client`
//! - Unified error types and layered configuration

pub mod cache;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod metadata;
pub mod normalize;
pub mod orchestrator;
pub mod retry;
pub mod srt;

pub use cache::{CacheEntry, DirCache, ShardLayout};
pub use collaborators::{
    Collaborators, Extracted, MetadataExtractor, Page, Summarizer, Summary, SubtitleSource, Transport,
};
pub use config::{AppConfig, ConfigError};
pub use error::{Error, Result};
pub use metadata::{Info, Metadata};
pub use normalize::{SiteFamily, normalize};
pub use orchestrator::MetadataCache;
pub use retry::{RetryPolicy, Throttle};
pub use srt::SubtitleCue;
