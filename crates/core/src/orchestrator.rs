//! Fetch-once, cache-forever orchestration.
//!
//! [`MetadataCache::get`] normalizes a URL, finds or allocates its slot, and
//! either loads the stored record or runs the collaborators and persists what
//! they produced. Every physical request passes through the throttle and the
//! retry policy; cache hits never touch the network.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;

use crate::cache::DirCache;
use crate::collaborators::{Collaborators, Page, Summary, Transport};
use crate::config::AppConfig;
use crate::metadata::{self, Metadata};
use crate::normalize::{SiteFamily, normalize};
use crate::retry::{RetryPolicy, Throttle};
use crate::srt::SubtitleCue;
use crate::{Error, Result};

/// Transport wrapper applying throttle and retries to each physical request.
struct Gate<'a> {
    inner: &'a dyn Transport,
    throttle: &'a Throttle,
    policy: &'a RetryPolicy,
}

#[async_trait]
impl Transport for Gate<'_> {
    async fn get(&self, url: &str) -> Result<Page> {
        self.policy.run(url, |_| self.throttle.run(self.inner.get(url))).await
    }
}

/// Cache of URL metadata backed by a [`DirCache`].
pub struct MetadataCache {
    config: AppConfig,
    dir_cache: DirCache,
    collaborators: Collaborators,
    throttle: Throttle,
    retry: RetryPolicy,
}

impl MetadataCache {
    pub fn new(config: AppConfig, collaborators: Collaborators) -> Self {
        let dir_cache = DirCache::new(&config.cache_dir);
        let throttle = Throttle::new(config.sleep_interval());
        let retry = config.retry_policy();
        Self { config, dir_cache, collaborators, throttle, retry }
    }

    /// Replace the retry policy derived from the configuration.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn cache_dir(&self) -> &Path {
        self.dir_cache.root()
    }

    pub fn dir_cache(&self) -> &DirCache {
        &self.dir_cache
    }

    pub fn set_skip_subtitles(&mut self, skip: bool) {
        self.config.skip_subtitles = skip;
    }

    /// Slot directory for a URL, if one has been allocated.
    pub fn shard_path(&self, url: &str) -> Result<Option<PathBuf>> {
        self.dir_cache.find(&normalize(url))
    }

    /// Whether a complete record for `url` is on disk.
    ///
    /// A slot holding only its key file (an aborted fetch) does not count.
    pub fn in_cache(&self, url: &str) -> Result<bool> {
        Ok(self.shard_path(url)?.is_some_and(|slot| metadata::is_populated(&slot)))
    }

    /// Return the record for `url`, fetching it on a cache miss.
    ///
    /// # Errors
    ///
    /// - `Error::Fetch` when a collaborator request keeps failing or fails permanently.
    ///   Nothing but the slot's key file is left on disk, so a later call retries cleanly.
    /// - `Error::CacheCorruption` when a stored record cannot be parsed.
    pub async fn get(&self, url: &str) -> Result<Metadata> {
        let key = normalize(url);
        if key.is_empty() {
            return Err(Error::InvalidInput("url cannot be empty".into()));
        }

        let slot = self.dir_cache.locate_or_create(&key)?;
        if let Some(record) = Metadata::load(&slot)? {
            tracing::debug!(url = %key, "cache hit");
            return Ok(record);
        }

        tracing::debug!(url = %key, slot = %slot.display(), "cache miss, fetching");
        let record = self.fetch(url.trim(), &key).await?;
        record.save(&slot)?;
        tracing::info!(url = %key, "cached");

        Ok(record)
    }

    /// Fetch several URLs in order; one failure does not stop the rest.
    pub async fn get_many<S: AsRef<str>>(&self, urls: &[S]) -> Vec<(String, Result<Metadata>)> {
        let mut results = Vec::with_capacity(urls.len());
        for url in urls {
            let url = url.as_ref();
            let result = self.get(url).await;
            if let Err(e) = &result {
                tracing::warn!(url, error = %e, "failed to get metadata");
            }
            results.push((url.to_string(), result));
        }
        results
    }

    /// Load every populated record in the cache. No network access.
    pub fn export(&self) -> Result<Vec<Metadata>> {
        let mut records = Vec::new();
        for entry in self.dir_cache.enumerate()? {
            match Metadata::load(&entry.path)? {
                Some(record) => records.push(record),
                None => tracing::debug!(key = %entry.key, "skipping unpopulated slot"),
            }
        }
        Ok(records)
    }

    async fn fetch(&self, url: &str, key: &str) -> Result<Metadata> {
        let family = SiteFamily::detect(key);
        let gate = Gate { inner: self.collaborators.transport.as_ref(), throttle: &self.throttle, policy: &self.retry };

        let extracted = self
            .collaborators
            .extractor
            .extract(&gate, key)
            .await
            .map_err(|e| fetch_error(key, e))?;

        let summary = match extracted.html.as_deref() {
            Some(html) if family.wants_summary() => self.summarize(html, key),
            _ => None,
        };

        let subtitles = self.subtitles(&gate, key, family).await?;

        let (html_summary, text_summary) = match summary {
            Some(Summary { html, text }) => (Some(html), Some(text).filter(|t| !t.is_empty())),
            None => (None, None),
        };

        Ok(Metadata {
            url: url.to_string(),
            normalized_url: key.to_string(),
            timestamp: Utc::now(),
            info: extracted.info,
            html_summary,
            text_summary,
            subtitles,
        })
    }

    fn summarize(&self, html: &str, key: &str) -> Option<Summary> {
        match self.collaborators.summarizer.summarize(html, key) {
            Ok(summary) => summary.filter(|s| !s.html.trim().is_empty()),
            Err(e) => {
                tracing::warn!(url = key, error = %e, "summarizer failed; storing without summary");
                None
            }
        }
    }

    async fn subtitles(&self, gate: &Gate<'_>, key: &str, family: SiteFamily) -> Result<Option<Vec<SubtitleCue>>> {
        if !family.supports_subtitles() || self.config.skip_subtitles {
            return Ok(None);
        }
        let source = self.collaborators.subtitles.as_ref();
        if !source.is_supported(key) {
            return Ok(None);
        }

        match source.fetch(gate, key, &self.config.subtitle_language).await {
            Ok(cues) => Ok(cues.filter(|c| !c.is_empty())),
            Err(Error::NotSupported(reason)) => {
                tracing::debug!(url = key, %reason, "subtitles not supported");
                Ok(None)
            }
            Err(e) => Err(fetch_error(key, e)),
        }
    }
}

fn fetch_error(url: &str, cause: Error) -> Error {
    match cause {
        Error::Fetch { .. } => cause,
        cause => Error::Fetch { url: url.to_string(), cause: Box::new(cause) },
    }
}
