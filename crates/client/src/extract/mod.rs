//! Page metadata extraction.
//!
//! ### Classification
//! - HTML: title, description, keywords, canonical link, Open Graph and
//!   Twitter card properties, and images
//! - Images: a single `body_image` pointing at the URL itself
//! - Anything else: `url` and `content_type` only
//!
//! ### Images
//! - Types are `og:image`, `twitter:image`, `favicon` and `body_image`
//! - Sources are resolved to absolute URLs against the final URL

pub mod images;
pub mod summary;

pub use images::{Image, ImageKind, collect_images};
pub use summary::ReadabilitySummarizer;

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::{Map, Value, json};
use std::sync::LazyLock;
use url::Url;
use urlmeta_core::normalize::youtube_video_id;
use urlmeta_core::{Error, Extracted, Info, MetadataExtractor, Page, Result, SiteFamily, Transport};

static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("head title, title").expect("invalid selector"));
static META: LazyLock<Selector> = LazyLock::new(|| Selector::parse("meta[content]").expect("invalid selector"));
static CANONICAL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"link[rel="canonical"][href]"#).expect("invalid selector"));

/// [`MetadataExtractor`] that fetches the page and parses it with scraper.
#[derive(Debug, Clone, Default)]
pub struct HttpMetadataExtractor;

impl HttpMetadataExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetadataExtractor for HttpMetadataExtractor {
    async fn extract(&self, http: &dyn Transport, url: &str) -> Result<Extracted> {
        let page = http.get(url).await?;
        extract_page(&page)
    }
}

/// Build the info mapping for a fetched page.
pub fn extract_page(page: &Page) -> Result<Extracted> {
    let base = Url::parse(&page.final_url)
        .or_else(|_| Url::parse(&page.url))
        .map_err(|e| Error::InvalidUrl(format!("{}: {}", page.url, e)))?;

    let mut info = Info::new();
    info.insert("url".into(), json!(base.as_str()));
    if let Some(ct) = &page.content_type {
        info.insert("content_type".into(), json!(ct));
    }

    let html = if page.is_image() {
        let image = Image::new(ImageKind::Body, page.url.as_str());
        info.insert("images".into(), json!([image]));
        None
    } else if page.is_html() || (page.content_type.is_none() && looks_like_html(&page.body)) {
        info.extend(html_info(&page.body, &base));
        Some(page.body.clone())
    } else {
        tracing::debug!(url = %page.url, content_type = ?page.content_type, "no extractor for content type");
        None
    };

    if SiteFamily::detect(&page.url) == SiteFamily::Youtube
        && let Some(id) = youtube_video_id(&page.url)
    {
        info.insert("video_id".into(), json!(id));
    }

    Ok(Extracted { info, content_type: page.content_type.clone(), html })
}

/// Parse title, descriptive meta tags and images out of an HTML document.
pub fn html_info(html: &str, base_url: &Url) -> Info {
    let document = Html::parse_document(html);
    let mut opengraph = Map::new();
    let mut twitter = Map::new();
    let mut description = None;
    let mut keywords = None;

    for element in document.select(&META) {
        let el = element.value();
        let Some(content) = el.attr("content").map(str::trim).filter(|c| !c.is_empty()) else {
            continue;
        };
        let Some(name) = el.attr("property").or_else(|| el.attr("name")) else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();

        if let Some(key) = name.strip_prefix("og:") {
            opengraph.entry(key).or_insert_with(|| json!(content));
        } else if let Some(key) = name.strip_prefix("twitter:") {
            twitter.entry(key).or_insert_with(|| json!(content));
        } else if name == "description" {
            description.get_or_insert_with(|| content.to_string());
        } else if name == "keywords" {
            keywords.get_or_insert_with(|| {
                content
                    .split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            });
        }
    }

    let mut info = Info::new();

    let title = document
        .select(&TITLE)
        .next()
        .map(|t| t.text().collect::<Vec<_>>().join(" "))
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
        .or_else(|| meta_str(&opengraph, "title"))
        .or_else(|| meta_str(&twitter, "title"));
    if let Some(title) = title {
        info.insert("title".into(), json!(title));
    }

    if let Some(description) = description.or_else(|| meta_str(&opengraph, "description")) {
        info.insert("description".into(), json!(description));
    }
    if let Some(keywords) = keywords.filter(|k| !k.is_empty()) {
        info.insert("keywords".into(), json!(keywords));
    }
    if let Some(canonical) = document
        .select(&CANONICAL)
        .next()
        .and_then(|l| l.value().attr("href"))
        .and_then(|href| base_url.join(href.trim()).ok())
    {
        info.insert("canonical".into(), json!(canonical.as_str()));
    }
    if let Some(site_name) = meta_str(&opengraph, "site_name") {
        info.insert("site_name".into(), json!(site_name));
    }

    let images = collect_images(&document, base_url, &opengraph, &twitter);
    info.insert("images".into(), json!(images));

    if !opengraph.is_empty() {
        info.insert("opengraph".into(), Value::Object(opengraph));
    }
    if !twitter.is_empty() {
        info.insert("twitter".into(), Value::Object(twitter));
    }

    info
}

fn meta_str(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

fn looks_like_html(body: &str) -> bool {
    let head = body.trim_start().get(..64).unwrap_or(body.trim_start()).to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}
