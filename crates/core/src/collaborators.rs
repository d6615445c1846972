//! Interfaces to the network and to the content collaborators.
//!
//! The orchestrator owns rate limiting and retries. Collaborators never talk
//! to the network directly: every physical request goes through the
//! [`Transport`] they are handed, which the orchestrator gates with its
//! throttle and retry policy.

use async_trait::async_trait;

use crate::Result;
use crate::metadata::Info;
use crate::srt::SubtitleCue;

/// A fetched HTTP resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// URL requested.
    pub url: String,
    /// URL after redirects.
    pub final_url: String,
    pub status: u16,
    /// Raw Content-Type header.
    pub content_type: Option<String>,
    /// Decoded body. Left empty for content types that are not text.
    pub body: String,
}

impl Page {
    /// Media type without parameters, lowercased (`text/html`).
    pub fn mime(&self) -> Option<String> {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|m| m.trim().to_ascii_lowercase())
            .filter(|m| !m.is_empty())
    }

    pub fn is_html(&self) -> bool {
        matches!(self.mime().as_deref(), Some("text/html" | "application/xhtml+xml"))
    }

    pub fn is_image(&self) -> bool {
        self.mime().is_some_and(|m| m.starts_with("image/"))
    }
}

/// Performs one physical GET request.
///
/// Non-success statuses are returned as `Error::HttpStatus`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<Page>;
}

/// What the metadata extractor learned about a URL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extracted {
    /// Title, images, description and site-specific fields.
    pub info: Info,
    pub content_type: Option<String>,
    /// Page HTML, present only for HTML content.
    pub html: Option<String>,
}

/// Readability output for an HTML page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub html: String,
    pub text: String,
}

/// Extracts title, images and other page metadata.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    async fn extract(&self, http: &dyn Transport, url: &str) -> Result<Extracted>;
}

/// Produces readable HTML and text summaries from page HTML.
///
/// Pure computation; no network access.
pub trait Summarizer: Send + Sync {
    /// `Ok(None)` when the page has no readable content.
    fn summarize(&self, html: &str, base_url: &str) -> Result<Option<Summary>>;
}

/// Downloads caption tracks.
#[async_trait]
pub trait SubtitleSource: Send + Sync {
    fn is_supported(&self, url: &str) -> bool;

    /// `Ok(None)` when the video has no captions in `language`.
    async fn fetch(&self, http: &dyn Transport, url: &str, language: &str) -> Result<Option<Vec<SubtitleCue>>>;
}

/// The collaborators an orchestrator works with.
pub struct Collaborators {
    pub transport: Box<dyn Transport>,
    pub extractor: Box<dyn MetadataExtractor>,
    pub summarizer: Box<dyn Summarizer>,
    pub subtitles: Box<dyn SubtitleSource>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(content_type: Option<&str>) -> Page {
        Page { content_type: content_type.map(str::to_string), ..Default::default() }
    }

    #[test]
    fn test_mime_strips_parameters() {
        assert_eq!(page(Some("Text/HTML; charset=utf-8")).mime().as_deref(), Some("text/html"));
        assert_eq!(page(Some("")).mime(), None);
        assert_eq!(page(None).mime(), None);
    }

    #[test]
    fn test_content_classes() {
        assert!(page(Some("text/html; charset=utf-8")).is_html());
        assert!(page(Some("application/xhtml+xml")).is_html());
        assert!(!page(Some("text/plain")).is_html());
        assert!(page(Some("image/jpeg")).is_image());
        assert!(!page(Some("application/pdf")).is_image());
        assert!(!page(None).is_image());
    }
}
