//! Subcommand implementations.
//!
//! Each command writes its output to the given writer; stdout in the binary.
//! Logs never go there.

use std::io::Write;

use anyhow::{Context, Result};
use serde_json::Value;
use urlmeta_core::MetadataCache;
use urlmeta_core::metadata::is_populated;

/// Fetch each URL in order and print the successful records as a JSON array.
///
/// Failures are logged and left out. Returns the number of URLs that failed.
pub async fn get(cache: &MetadataCache, urls: &[String], quiet: bool, out: &mut impl Write) -> Result<usize> {
    let mut records = Vec::with_capacity(urls.len());
    let mut failed = 0;

    for (url, result) in cache.get_many(urls).await {
        match result {
            Ok(record) => records.push(record.to_json()),
            Err(e) => {
                tracing::error!(url = %url, error = %e, "could not get metadata");
                failed += 1;
            }
        }
    }

    if !quiet {
        print_json(&Value::Array(records), out)?;
    }
    Ok(failed)
}

/// Print cached URLs, or their slot directories with `location`.
pub fn list(cache: &MetadataCache, json: bool, location: bool, out: &mut impl Write) -> Result<()> {
    let entries = cache.dir_cache().enumerate().context("failed to enumerate cache")?;
    let items: Vec<String> = entries
        .into_iter()
        .filter(|e| is_populated(&e.path))
        .map(|e| if location { e.path.display().to_string() } else { e.key })
        .collect();

    if json {
        print_json(&serde_json::json!(items), out)
    } else {
        for item in items {
            writeln!(out, "{item}")?;
        }
        Ok(())
    }
}

/// Print every cached record as a JSON array.
pub fn export(cache: &MetadataCache, out: &mut impl Write) -> Result<()> {
    let records: Vec<Value> = cache.export().context("failed to export cache")?.iter().map(|m| m.to_json()).collect();
    print_json(&Value::Array(records), out)
}

pub fn cachedir(cache: &MetadataCache, out: &mut impl Write) -> Result<()> {
    writeln!(out, "{}", cache.cache_dir().display())?;
    Ok(())
}

fn print_json(value: &Value, out: &mut impl Write) -> Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use tempfile::TempDir;
    use urlmeta_core::{AppConfig, Info, Metadata, MetadataCache};

    fn cache(dir: &TempDir) -> MetadataCache {
        let config = AppConfig { cache_dir: dir.path().to_path_buf(), sleep_time: 0, ..Default::default() };
        urlmeta_client::open_cache(config).unwrap()
    }

    fn seed(cache: &MetadataCache, url: &str, title: &str) {
        let slot = cache.dir_cache().locate_or_create(url).unwrap();
        let mut info = Info::new();
        info.insert("title".into(), json!(title));
        let record = Metadata {
            url: url.into(),
            normalized_url: url.into(),
            timestamp: Utc::now(),
            info,
            html_summary: None,
            text_summary: None,
            subtitles: None,
        };
        record.save(&slot).unwrap();
    }

    fn output(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_list_plain_and_json() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        seed(&cache, "https://github.com", "GitHub");
        cache.dir_cache().locate_or_create("https://example.com/unfetched").unwrap();

        let plain = output(|out| list(&cache, false, false, out));
        assert_eq!(plain, "https://github.com\n");

        let json: Vec<String> = serde_json::from_str(&output(|out| list(&cache, true, false, out))).unwrap();
        assert_eq!(json, vec!["https://github.com".to_string()]);

        let located = output(|out| list(&cache, false, true, out));
        let slot = cache.shard_path("https://github.com").unwrap().unwrap();
        assert_eq!(located.trim_end(), slot.display().to_string());
    }

    #[test]
    fn test_export() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        seed(&cache, "https://github.com", "GitHub");
        seed(&cache, "https://www.rust-lang.org", "Rust");

        let exported: Value = serde_json::from_str(&output(|out| export(&cache, out))).unwrap();
        let mut titles: Vec<_> =
            exported.as_array().unwrap().iter().map(|r| r["info"]["title"].as_str().unwrap().to_string()).collect();
        titles.sort();
        assert_eq!(titles, vec!["GitHub", "Rust"]);
    }

    #[test]
    fn test_export_empty_cache() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        assert_eq!(output(|out| export(&cache, out)), "[]\n");
    }

    #[test]
    fn test_cachedir() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        assert_eq!(output(|out| cachedir(&cache, out)).trim_end(), dir.path().display().to_string());
    }

    #[tokio::test]
    async fn test_get_cached_and_failed() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        seed(&cache, "https://github.com", "GitHub");

        let urls = vec!["https://github.com".to_string(), "   ".to_string()];
        let mut buf = Vec::new();
        let failed = get(&cache, &urls, false, &mut buf).await.unwrap();
        assert_eq!(failed, 1);

        let printed: Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(printed.as_array().unwrap().len(), 1);
        assert_eq!(printed[0]["info"]["title"], "GitHub");

        let mut quiet = Vec::new();
        assert_eq!(get(&cache, &urls[..1], true, &mut quiet).await.unwrap(), 0);
        assert!(quiet.is_empty());
    }
}
