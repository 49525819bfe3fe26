//! HTTP transport that records every redirect it follows.
//!
//! reqwest's own redirect policy hides the intermediate responses, so the
//! client is built with redirects disabled and [`HttpTransport`] follows
//! `Location` headers itself, one request per hop:
//!
//! - The first exchange keeps the URL exactly as the caller passed it, so
//!   the cache key matches the lookup key.
//! - Relative `Location` values are joined onto the current URL.
//! - After `max_redirects` hops the last redirect response is returned as
//!   the terminal response.
//! - Bodies larger than `max_bytes` are rejected.

mod error;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use httpcache_core::{AppConfig, Exchange, Fetched, ResponseHeaders, TerminalResponse, Transport, TransportFailure};
use reqwest::{Client, header};
use url::Url;

pub use error::TransportError;

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 50MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 30)
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
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
        }
    }
}

/// reqwest-backed [`Transport`].
pub struct HttpTransport {
    http: Client,
    config: FetchConfig,
}

impl HttpTransport {
    /// Create a new transport with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, TransportError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()?;

        Ok(Self { http, config })
    }

    /// GET `url`, following redirects hop by hop.
    pub async fn fetch(&self, url: &str) -> Result<Fetched, TransportError> {
        let start = Instant::now();
        let mut current = Url::parse(url.trim())?;
        let mut reported = url.to_string();
        let mut history = Vec::new();

        loop {
            let response = self
                .http
                .get(current.clone())
                .header(header::ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
                .send()
                .await?;

            let status = response.status();
            let headers = response_headers(response.headers());

            if status.is_redirection()
                && let Some(location) = headers.location.as_deref()
            {
                if history.len() < self.config.max_redirects {
                    let next = current.join(location)?;
                    tracing::debug!("{} {} -> {}", status.as_u16(), reported, next);
                    history.push(Exchange { url: reported, status: status.as_u16(), headers });
                    reported = next.to_string();
                    current = next;
                    continue;
                }
                tracing::warn!("stopped following redirects at {reported} after {} hops", history.len());
            }

            if let Some(len) = response.content_length()
                && len as usize > self.config.max_bytes
            {
                return Err(TransportError::TooLarge { size: len as usize, limit: self.config.max_bytes });
            }

            let bytes = response.bytes().await?;
            if bytes.len() > self.config.max_bytes {
                return Err(TransportError::TooLarge { size: bytes.len(), limit: self.config.max_bytes });
            }

            tracing::debug!(
                "fetched {} -> {} in {}ms ({} bytes)",
                url,
                reported,
                start.elapsed().as_millis(),
                bytes.len()
            );

            return Ok(Fetched {
                history,
                terminal: TerminalResponse {
                    exchange: Exchange { url: reported, status: status.as_u16(), headers },
                    body: bytes.to_vec(),
                },
            });
        }
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<Fetched, TransportFailure> {
        self.fetch(url).await.map_err(TransportFailure::from)
    }
}

fn response_headers(headers: &header::HeaderMap) -> ResponseHeaders {
    ResponseHeaders::from_pairs(
        headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn redirect(status: &str, location: &str) -> Vec<u8> {
        format!("HTTP/1.1 {status}\r\nLocation: {location}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").into_bytes()
    }

    fn ok(content_type: &str, body: &[u8]) -> Vec<u8> {
        let mut response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        )
        .into_bytes();
        response.extend_from_slice(body);
        response
    }

    /// Serve canned responses by request path until the test ends.
    async fn serve(routes: HashMap<&'static str, Vec<u8>>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let routes = routes.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]).to_string();
                    let path = request.split_whitespace().nth(1).unwrap_or("/");
                    let response = routes
                        .get(path)
                        .cloned()
                        .unwrap_or_else(|| b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_vec());
                    let _ = socket.write_all(&response).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        addr
    }

    async fn chain_server() -> SocketAddr {
        let mut routes = HashMap::new();
        routes.insert("/a", redirect("301 Moved Permanently", "/b"));
        routes.insert("/b", redirect("302 Found", "c"));
        routes.insert("/c", ok("text/html; charset=utf-8", b"<p>hello</p>"));
        serve(routes).await
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { max_redirects: 3, timeout_ms: 1_000, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.max_redirects, 3);
        assert_eq!(config.timeout, Duration::from_secs(1));
        assert_eq!(config.user_agent, app.user_agent);
    }

    #[tokio::test]
    async fn test_transport_new() {
        assert!(HttpTransport::new(FetchConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_follows_redirects_hop_by_hop() {
        let addr = chain_server().await;
        let transport = HttpTransport::new(FetchConfig::default()).unwrap();

        let fetched = transport.fetch(&format!("http://{addr}/a")).await.unwrap();

        let urls: Vec<&str> = fetched.history.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, [format!("http://{addr}/a"), format!("http://{addr}/b")]);
        assert_eq!(fetched.history[0].status, 301);
        assert_eq!(fetched.history[0].headers.location.as_deref(), Some("/b"));
        assert_eq!(fetched.history[1].status, 302);

        assert_eq!(fetched.terminal.exchange.url, format!("http://{addr}/c"));
        assert_eq!(fetched.terminal.exchange.status, 200);
        assert_eq!(fetched.terminal.exchange.headers.content_type.as_deref(), Some("text/html; charset=utf-8"));
        assert_eq!(fetched.terminal.body, b"<p>hello</p>");
    }

    #[tokio::test]
    async fn test_redirect_limit_returns_last_redirect() {
        let addr = chain_server().await;
        let config = FetchConfig { max_redirects: 1, ..Default::default() };
        let transport = HttpTransport::new(config).unwrap();

        let fetched = transport.fetch(&format!("http://{addr}/a")).await.unwrap();

        assert_eq!(fetched.history.len(), 1);
        assert_eq!(fetched.terminal.exchange.url, format!("http://{addr}/b"));
        assert_eq!(fetched.terminal.exchange.status, 302);
    }

    #[tokio::test]
    async fn test_binary_body_intact() {
        let body = [0x25, 0x50, 0x44, 0x46, 0x00, 0xff, 0xfe];
        let mut routes = HashMap::new();
        routes.insert("/paper.pdf", ok("application/pdf", &body));
        let addr = serve(routes).await;
        let transport = HttpTransport::new(FetchConfig::default()).unwrap();

        let fetched = transport.fetch(&format!("http://{addr}/paper.pdf")).await.unwrap();

        assert!(fetched.history.is_empty());
        assert_eq!(fetched.terminal.body, body);
    }

    #[tokio::test]
    async fn test_body_too_large() {
        let mut routes = HashMap::new();
        routes.insert("/big", ok("text/plain", b"hello world"));
        let addr = serve(routes).await;
        let transport = HttpTransport::new(FetchConfig { max_bytes: 4, ..Default::default() }).unwrap();

        let result = transport.fetch(&format!("http://{addr}/big")).await;
        assert!(matches!(result, Err(TransportError::TooLarge { limit: 4, .. })));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let transport = HttpTransport::new(FetchConfig::default()).unwrap();

        let result = Transport::get(&transport, &format!("http://{addr}/")).await;
        assert!(matches!(result, Err(TransportFailure::Unreachable(_))));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let transport = HttpTransport::new(FetchConfig::default()).unwrap();
        let result = transport.fetch("not a url").await;
        assert!(matches!(result, Err(TransportError::InvalidUrl(_))));

        let result = Transport::get(&transport, "not a url").await;
        assert!(matches!(result, Err(TransportFailure::Rejected(_))));
    }

    #[tokio::test]
    async fn test_body_too_large_is_rejected_not_unreachable() {
        let mut routes = HashMap::new();
        routes.insert("/big", ok("text/plain", b"hello world"));
        let addr = serve(routes).await;
        let transport = HttpTransport::new(FetchConfig { max_bytes: 4, ..Default::default() }).unwrap();

        let result = Transport::get(&transport, &format!("http://{addr}/big")).await;
        assert!(matches!(result, Err(TransportFailure::Rejected(_))));
    }
}
