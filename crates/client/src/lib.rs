//! Client code for url-metadata.
//!
//! This crate provides the network-facing collaborators used by the
//! orchestrator in `urlmeta-core`: the reqwest transport, page metadata
//! extraction, readability summaries and YouTube captions.

pub mod extract;
pub mod fetch;
pub mod subtitles;

pub use extract::{HttpMetadataExtractor, Image, ImageKind, ReadabilitySummarizer, extract_page, html_info};
pub use fetch::{FetchConfig, HttpClient};
pub use subtitles::YoutubeSubtitles;

use urlmeta_core::{AppConfig, Collaborators, MetadataCache, Result};

/// Build the default collaborator set for a configuration.
pub fn collaborators(config: &AppConfig) -> Result<Collaborators> {
    Ok(Collaborators {
        transport: Box::new(HttpClient::new(FetchConfig::from(config))?),
        extractor: Box::new(HttpMetadataExtractor::new()),
        summarizer: Box::new(ReadabilitySummarizer::new()),
        subtitles: Box::new(YoutubeSubtitles::new()),
    })
}

/// Open a metadata cache wired to the default collaborators.
pub fn open_cache(config: AppConfig) -> Result<MetadataCache> {
    let collaborators = collaborators(&config)?;
    Ok(MetadataCache::new(config, collaborators))
}
