//! Readability summaries using Lectito.
//!
//! Uses Lectito's extraction pipeline (Readability.js-inspired): preprocessing,
//! scoring, best-candidate selection and cleanup. The cleaned article HTML is
//! the HTML summary; its plain text with whitespace collapsed is the text
//! summary.

use lectito_core::{Readability, ReadabilityConfig};
use urlmeta_core::{Result, Summarizer, Summary};

/// Lectito-backed [`Summarizer`].
#[derive(Debug, Clone)]
pub struct ReadabilitySummarizer {
    /// Minimum character count for an article (default: 200)
    char_threshold: usize,
}

impl ReadabilitySummarizer {
    pub fn new() -> Self {
        Self { char_threshold: 200 }
    }
}

impl Default for ReadabilitySummarizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Summarizer for ReadabilitySummarizer {
    fn summarize(&self, html: &str, base_url: &str) -> Result<Option<Summary>> {
        if html.trim().is_empty() {
            return Ok(None);
        }

        let config = ReadabilityConfig::builder().char_threshold(self.char_threshold).build();
        let article = match Readability::with_config(config).parse_with_url(html, base_url) {
            Ok(article) => article,
            Err(e) => {
                tracing::debug!(url = base_url, "no readable content: {}", e);
                return Ok(None);
            }
        };

        let html = article.content.to_string();
        if html.trim().is_empty() {
            return Ok(None);
        }
        let text = collapse_whitespace(&article.to_text());

        Ok(Some(Summary { html, text }))
    }
}

/// Collapse runs of spaces within lines and drop blank lines.
fn collapse_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE_HTML: &str = r#"
        <!DOCTYPE html>
        <html>
        <head><title>Test Page</title></head>
        <body>
            <nav><a href="/">Home</a></nav>
            <article>
                <h1>Main Content</h1>
                <p>This is a substantial paragraph with plenty of content to ensure we meet
                the character threshold for extraction. We need multiple paragraphs with
                meaningful content to pass the extraction algorithm's requirements.</p>
                <p>Here is another paragraph with even more content to ensure that the
                extraction will succeed. This paragraph adds more text and increases the
                overall character count significantly.</p>
                <p>A third paragraph providing additional content that helps ensure the
                document is substantial enough for successful extraction. The readability
                algorithm requires a minimum amount of content to identify the main article.</p>
            </article>
        </body>
        </html>
    "#;

    #[test]
    fn test_summarize_article() {
        let summary = ReadabilitySummarizer::new()
            .summarize(ARTICLE_HTML, "https://example.com/post")
            .unwrap()
            .unwrap();

        assert!(summary.html.contains("substantial paragraph"));
        assert!(summary.text.contains("substantial paragraph with plenty of content"));
        assert!(!summary.text.contains("  "));
    }

    #[test]
    fn test_summarize_empty_html() {
        let summary = ReadabilitySummarizer::new().summarize("  ", "https://example.com").unwrap();
        assert!(summary.is_none());
    }

    #[test]
    fn test_summarize_thin_page() {
        let summary = ReadabilitySummarizer::new().summarize("not really html", "https://example.com").unwrap();
        assert!(summary.is_none());
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a   b \n\n\t c\n"), "a b\nc");
        assert_eq!(collapse_whitespace(""), "");
    }
}
