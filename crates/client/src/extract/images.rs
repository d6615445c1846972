//! Image harvesting from HTML documents.

use scraper::{Html, Selector};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

static ICON_LINKS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("link[rel][href]").expect("invalid selector"));
static BODY_IMAGES: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body img[src]").expect("invalid selector"));

/// Where an image was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ImageKind {
    #[serde(rename = "og:image")]
    OpenGraph,
    #[serde(rename = "twitter:image")]
    Twitter,
    #[serde(rename = "favicon")]
    Favicon,
    #[serde(rename = "body_image")]
    Body,
}

/// A harvested image with a resolved absolute source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    #[serde(rename = "type")]
    pub kind: ImageKind,
    pub src: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl Image {
    pub fn new(kind: ImageKind, src: impl Into<String>) -> Self {
        Self { kind, src: src.into(), alt: None, width: None, height: None }
    }
}

/// Collect images from meta properties, icon links and the document body.
///
/// Order is og:image, twitter:image, favicons, then body images in document
/// order. Relative sources are resolved against `base_url`; inline `data:`
/// sources are skipped and duplicates of the same kind and source removed.
pub fn collect_images(
    document: &Html, base_url: &Url, opengraph: &Map<String, Value>, twitter: &Map<String, Value>,
) -> Vec<Image> {
    let mut seen = HashSet::new();
    let mut images = Vec::new();
    let mut push = |image: Image| {
        if seen.insert((image.kind, image.src.clone())) {
            images.push(image);
        }
    };

    if let Some(src) = first_str(opengraph, &["image", "image:url", "image:secure_url"]).and_then(|s| resolve(base_url, s))
    {
        let mut image = Image::new(ImageKind::OpenGraph, src);
        image.alt = first_str(opengraph, &["image:alt"]).map(str::to_string);
        image.width = first_str(opengraph, &["image:width"]).and_then(|w| w.parse().ok());
        image.height = first_str(opengraph, &["image:height"]).and_then(|h| h.parse().ok());
        push(image);
    }

    if let Some(src) = first_str(twitter, &["image", "image:src"]).and_then(|s| resolve(base_url, s)) {
        let mut image = Image::new(ImageKind::Twitter, src);
        image.alt = first_str(twitter, &["image:alt"]).map(str::to_string);
        push(image);
    }

    for element in document.select(&ICON_LINKS) {
        let el = element.value();
        let is_icon = el.attr("rel").is_some_and(|rel| {
            rel.split_whitespace()
                .any(|t| t.eq_ignore_ascii_case("icon") || t.eq_ignore_ascii_case("apple-touch-icon"))
        });
        if !is_icon {
            continue;
        }
        if let Some(src) = el.attr("href").and_then(|h| resolve(base_url, h)) {
            push(Image::new(ImageKind::Favicon, src));
        }
    }

    for element in document.select(&BODY_IMAGES) {
        let el = element.value();
        let Some(src) = el.attr("src").and_then(|s| resolve(base_url, s)) else {
            continue;
        };
        push(Image {
            kind: ImageKind::Body,
            src,
            alt: el.attr("alt").map(str::trim).filter(|a| !a.is_empty()).map(str::to_string),
            width: el.attr("width").and_then(|w| w.trim().parse().ok()),
            height: el.attr("height").and_then(|h| h.trim().parse().ok()),
        });
    }

    images
}

fn first_str<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| map.get(*k).and_then(Value::as_str))
}

fn resolve(base_url: &Url, src: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() || src.starts_with("data:") {
        return None;
    }
    base_url.join(src).ok().map(|u| u.to_string())
}
