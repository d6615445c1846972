//! YouTube caption tracks.
//!
//! The watch page embeds the player response, whose `captionTracks` array
//! lists every available track with a `baseUrl` pointing at a timed-text
//! document:
//!
//! ```xml
//! <transcript>
//!   <text start="0.5" dur="2.16">a trade-off between space</text>
//! </transcript>
//! ```

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;
use urlmeta_core::normalize::youtube_video_id;
use urlmeta_core::{Error, Result, SubtitleCue, SubtitleSource, Transport};

static CAPTION_TRACKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""captionTracks"\s*:\s*"#).expect("invalid regex"));
static TEXT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("text").expect("invalid selector"));

/// One entry of the player response's `captionTracks`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    /// `"asr"` for auto-generated tracks.
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

/// [`SubtitleSource`] for YouTube videos.
#[derive(Debug, Clone, Default)]
pub struct YoutubeSubtitles;

impl YoutubeSubtitles {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SubtitleSource for YoutubeSubtitles {
    fn is_supported(&self, url: &str) -> bool {
        youtube_video_id(url).is_some()
    }

    async fn fetch(&self, http: &dyn Transport, url: &str, language: &str) -> Result<Option<Vec<SubtitleCue>>> {
        let Some(id) = youtube_video_id(url) else {
            return Err(Error::NotSupported(format!("no video id in {url}")));
        };

        let page = http.get(url).await?;
        let tracks = caption_tracks(&page.body)?;
        let Some(track) = choose_track(&tracks, language) else {
            tracing::debug!(video = %id, language, available = tracks.len(), "no caption track");
            return Ok(None);
        };

        tracing::debug!(video = %id, language = %track.language_code, generated = track.is_generated(), "downloading captions");
        let timedtext = http.get(&track.base_url).await?;
        let cues = parse_timedtext(&timedtext.body)?;

        Ok(Some(cues).filter(|c| !c.is_empty()))
    }
}

/// Pull the `captionTracks` array out of a watch page.
///
/// A page without the key has no captions and yields an empty list.
pub fn caption_tracks(page: &str) -> Result<Vec<CaptionTrack>> {
    let Some(found) = CAPTION_TRACKS.find(page) else {
        return Ok(Vec::new());
    };

    let mut stream = serde_json::Deserializer::from_str(&page[found.end()..]).into_iter::<Vec<CaptionTrack>>();
    match stream.next() {
        Some(Ok(tracks)) => Ok(tracks),
        Some(Err(e)) => Err(Error::ExtractFailed(format!("malformed captionTracks: {e}"))),
        None => Err(Error::ExtractFailed("truncated captionTracks".into())),
    }
}

/// Pick the track for `language`: exact code before regional variants,
/// uploaded before auto-generated.
pub fn choose_track<'a>(tracks: &'a [CaptionTrack], language: &str) -> Option<&'a CaptionTrack> {
    let regional = format!("{language}-");
    let rank = |t: &CaptionTrack| {
        let code = t.language_code.as_str();
        let lang_rank = if code.eq_ignore_ascii_case(language) {
            0
        } else if code.to_ascii_lowercase().starts_with(&regional.to_ascii_lowercase()) {
            1
        } else {
            return None;
        };
        Some((lang_rank, t.is_generated()))
    };

    tracks
        .iter()
        .filter_map(|t| rank(t).map(|r| (r, t)))
        .min_by_key(|(r, _)| *r)
        .map(|(_, t)| t)
}

/// Parse a timed-text document into cues numbered from 1.
///
/// Text is entity-decoded twice since YouTube escapes it before embedding it
/// in XML. Entries with no text are skipped.
pub fn parse_timedtext(xml: &str) -> Result<Vec<SubtitleCue>> {
    let document = Html::parse_fragment(xml);
    let mut cues = Vec::new();

    for element in document.select(&TEXT) {
        let el = element.value();
        let start = seconds(el.attr("start"))
            .ok_or_else(|| Error::ExtractFailed(format!("bad start attribute: {:?}", el.attr("start"))))?;
        let dur = match el.attr("dur") {
            Some(raw) => seconds(Some(raw)).ok_or_else(|| Error::ExtractFailed(format!("bad dur attribute: {raw:?}")))?,
            None => Duration::ZERO,
        };

        let raw: String = element.text().collect();
        let text = decode_entities(&raw);
        if text.trim().is_empty() {
            continue;
        }

        let end = start
            .checked_add(dur)
            .ok_or_else(|| Error::ExtractFailed(format!("cue end out of range: {start:?} + {dur:?}")))?;
        cues.push(SubtitleCue::new(cues.len() + 1, start, end, text.trim()));
    }

    Ok(cues)
}

fn seconds(value: Option<&str>) -> Option<Duration> {
    let secs: f64 = value?.trim().parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    Html::parse_fragment(text).root_element().text().collect()
}
