//! HTTP transport backed by reqwest.
//!
//! ### Request URLs
//! - Trim whitespace, require an `http` or `https` scheme
//! - Remove fragments; they never reach the server
//!
//! ### Error mapping
//! - Timeouts become `FetchTimeout`, connection failures `Network`
//! - 429 becomes `RateLimited`, other non-success statuses `HttpStatus`
//! - `RateLimited` and 5xx are retried upstream
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)
//!
//! Bodies are read only for text-like content types. Images and other
//! binary payloads are classified by their headers alone.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url, header};
use std::time::{Duration, Instant};

use urlmeta_core::{AppConfig, Error, Page, Result, Transport};

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "url-metadata/<version>")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: 5 * 1024 * 1024,
            timeout: config.timeout(),
            max_redirects: 5,
        }
    }
}

/// reqwest-backed [`Transport`].
pub struct HttpClient {
    http: Client,
    config: FetchConfig,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn get(&self, url_str: &str) -> Result<Page> {
        let start = Instant::now();
        let url = request_url(url_str)?;

        let response = self
            .http
            .get(url.as_str())
            .header(
                header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/*;q=0.8,*/*;q=0.5",
            )
            .send()
            .await
            .map_err(|e| map_reqwest_error(url.as_str(), &e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response.headers().get(header::RETRY_AFTER).and_then(|v| v.to_str().ok());
            return Err(Error::RateLimited(match retry_after {
                Some(after) => format!("{url} (retry after {after})"),
                None => url.to_string(),
            }));
        }
        if !status.is_success() {
            return Err(Error::HttpStatus { url: url.to_string(), status: status.as_u16() });
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
            && is_textual(content_type.as_deref())
        {
            return Err(Error::ExtractFailed(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let body = if is_textual(content_type.as_deref()) {
            let bytes = response.bytes().await.map_err(|e| map_reqwest_error(url.as_str(), &e))?;
            if bytes.len() > self.config.max_bytes {
                return Err(Error::ExtractFailed(format!(
                    "{} bytes exceeds {}",
                    bytes.len(),
                    self.config.max_bytes
                )));
            }
            String::from_utf8_lossy(&bytes).into_owned()
        } else {
            String::new()
        };

        tracing::debug!(
            "fetched {} -> {} in {}ms ({} bytes)",
            url,
            final_url,
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(Page { url: url.to_string(), final_url, status: status.as_u16(), content_type, body })
    }
}

/// Parse and clean a URL before it is requested.
fn request_url(input: &str) -> Result<Url> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidUrl("empty URL".into()));
    }

    let mut parsed = Url::parse(trimmed).map_err(|e| Error::InvalidUrl(format!("{trimmed}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(Error::InvalidUrl(format!("unsupported scheme: {scheme}"))),
    }
    parsed.set_fragment(None);

    Ok(parsed)
}

/// Whether a body of this content type is worth reading as text.
///
/// A missing header is treated as text; servers that omit it usually serve HTML.
fn is_textual(content_type: Option<&str>) -> bool {
    let Some(ct) = content_type else {
        return true;
    };
    let mime = ct.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();

    mime.starts_with("text/")
        || mime.ends_with("+xml")
        || mime.ends_with("+json")
        || matches!(mime.as_str(), "application/xml" | "application/json" | "application/javascript" | "")
}

fn map_reqwest_error(url: &str, e: &reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::FetchTimeout(format!("{url}: {e}"))
    } else if let Some(status) = e.status() {
        Error::HttpStatus { url: url.to_string(), status: status.as_u16() }
    } else if e.is_builder() {
        Error::InvalidUrl(format!("{url}: {e}"))
    } else {
        Error::Network(format!("{url}: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a local port.
    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let mut read = 0;
            while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf[read..]).await.unwrap();
                if n == 0 {
                    break;
                }
                read += n;
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{addr}/page#frag")
    }

    fn client(timeout: Duration) -> HttpClient {
        HttpClient::new(FetchConfig { timeout, ..FetchConfig::default() }).unwrap()
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert!(config.user_agent.starts_with("url-metadata/"));
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_request_url() {
        let url = request_url("  https://example.com/a?b=1#section ").unwrap();
        assert_eq!(url.as_str(), "https://example.com/a?b=1");

        assert!(matches!(request_url(""), Err(Error::InvalidUrl(_))));
        assert!(matches!(request_url("ftp://example.com"), Err(Error::InvalidUrl(_))));
        assert!(matches!(request_url("example.com"), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_is_textual() {
        assert!(is_textual(Some("text/html; charset=utf-8")));
        assert!(is_textual(Some("application/xhtml+xml")));
        assert!(is_textual(Some("text/xml")));
        assert!(is_textual(None));
        assert!(!is_textual(Some("image/jpeg")));
        assert!(!is_textual(Some("application/pdf")));
    }

    #[tokio::test]
    async fn test_get_html() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: 28\r\nConnection: close\r\n\r\n<title>Hello</title><p>x</p>",
        )
        .await;

        let page = client(Duration::from_secs(5)).get(&url).await.unwrap();
        assert_eq!(page.status, 200);
        assert!(page.is_html());
        assert!(page.body.starts_with("<title>Hello</title>"));
        assert!(!page.url.contains('#'));
    }

    #[tokio::test]
    async fn test_get_image_skips_body() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nContent-Length: 4\r\nConnection: close\r\n\r\nJFIF",
        )
        .await;

        let page = client(Duration::from_secs(5)).get(&url).await.unwrap();
        assert!(page.is_image());
        assert!(page.body.is_empty());
    }

    #[tokio::test]
    async fn test_status_errors() {
        let url = serve_once("HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").await;
        let err = client(Duration::from_secs(5)).get(&url).await.unwrap_err();
        assert!(matches!(err, Error::HttpStatus { status: 503, .. }));
        assert!(err.is_transient());

        let url = serve_once("HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").await;
        let err = client(Duration::from_secs(5)).get(&url).await.unwrap_err();
        assert!(matches!(err, Error::HttpStatus { status: 404, .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_too_many_requests() {
        let url = serve_once(
            "HTTP/1.1 429 Too Many Requests\r\nRetry-After: 30\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let err = client(Duration::from_secs(5)).get(&url).await.unwrap_err();
        assert!(matches!(&err, Error::RateLimited(msg) if msg.contains("retry after 30")), "{err}");
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let err = client(Duration::from_millis(200)).get(&format!("http://{addr}/")).await.unwrap_err();
        assert!(matches!(err, Error::FetchTimeout(_)), "{err}");
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(Duration::from_secs(5)).get(&format!("http://{addr}/")).await.unwrap_err();
        assert!(matches!(err, Error::Network(_)), "{err}");
    }
}
