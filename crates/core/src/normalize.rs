//! URL normalization and site families.
//!
//! Distinct textual forms of the same resource (short links, embeds, mobile
//! hosts) must hash to the same cache entry, so every URL goes through
//! [`normalize`] before it is hashed or looked up.
//!
//! Normalization never fails: anything unrecognized or unparseable passes
//! through unchanged apart from surrounding whitespace.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Canonical watch URL prefix for YouTube videos.
const YOUTUBE_WATCH: &str = "https://www.youtube.com/watch?v=";

static YOUTUBE_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("valid regex"));

/// Site families with their own normalization and capture rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteFamily {
    Youtube,
    Generic,
}

impl SiteFamily {
    /// Pick the family for a URL by host.
    pub fn detect(url: &str) -> Self {
        let Ok(parsed) = Url::parse(url.trim()) else {
            return SiteFamily::Generic;
        };

        match parsed.host_str().map(|h| h.to_ascii_lowercase()) {
            Some(host) if is_youtube_host(&host) => SiteFamily::Youtube,
            _ => SiteFamily::Generic,
        }
    }

    /// Rewrite a URL into this family's canonical form.
    pub fn canonicalize(self, url: &str) -> Option<String> {
        match self {
            SiteFamily::Youtube => youtube_video_id(url).map(|id| format!("{YOUTUBE_WATCH}{id}")),
            SiteFamily::Generic => None,
        }
    }

    /// Whether pages of this family can carry caption tracks.
    pub fn supports_subtitles(self) -> bool {
        matches!(self, SiteFamily::Youtube)
    }

    /// Whether a readability summary is worth keeping for this family.
    ///
    /// Video pages summarize to player chrome and boilerplate.
    pub fn wants_summary(self) -> bool {
        matches!(self, SiteFamily::Generic)
    }
}

fn is_youtube_host(host: &str) -> bool {
    matches!(
        host,
        "youtube.com"
            | "www.youtube.com"
            | "m.youtube.com"
            | "music.youtube.com"
            | "youtube-nocookie.com"
            | "www.youtube-nocookie.com"
            | "youtu.be"
            | "www.youtu.be"
    )
}

/// Extract the 11 character video ID from any YouTube URL form.
///
/// Recognizes `watch?v=`, `youtu.be/<id>`, `/embed/<id>`, `/shorts/<id>`,
/// `/v/<id>` and `/live/<id>`.
pub fn youtube_video_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    if !is_youtube_host(&host) {
        return None;
    }

    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());

    let candidate = if host.ends_with("youtu.be") {
        segments.next().map(str::to_string)
    } else {
        match segments.next() {
            Some("watch") => parsed.query_pairs().find(|(k, _)| k == "v").map(|(_, v)| v.into_owned()),
            Some("embed" | "shorts" | "v" | "live") => segments.next().map(str::to_string),
            _ => None,
        }
    };

    candidate.filter(|id| YOUTUBE_ID.is_match(id))
}

/// Canonicalize a URL for use as a cache key.
///
/// Pure and idempotent: `normalize(&normalize(u)) == normalize(u)`.
pub fn normalize(url: &str) -> String {
    let trimmed = url.trim();
    let family = SiteFamily::detect(trimmed);

    match family.canonicalize(trimmed) {
        Some(canonical) => {
            if canonical != trimmed {
                tracing::debug!(from = trimmed, to = %canonical, "normalized url");
            }
            canonical
        }
        None => trimmed.to_string(),
    }
}
