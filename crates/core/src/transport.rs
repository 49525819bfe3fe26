//! The network capability the cache consumes.
//!
//! A [`Transport`] performs one GET and reports every response it saw on the
//! way: intermediate redirect responses oldest first, then the terminal
//! response with its body. The reqwest implementation lives in
//! `httpcache-client`; tests substitute scripted fakes.

use async_trait::async_trait;

/// The response headers the cache looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    pub content_type: Option<String>,
    pub location: Option<String>,
    pub content_disposition: Option<String>,
}

impl ResponseHeaders {
    /// Build from `(name, value)` pairs, matching names case-insensitively.
    /// The first occurrence of each header wins.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut headers = Self::default();
        for (name, value) in pairs {
            let slot = if name.eq_ignore_ascii_case("content-type") {
                &mut headers.content_type
            } else if name.eq_ignore_ascii_case("location") {
                &mut headers.location
            } else if name.eq_ignore_ascii_case("content-disposition") {
                &mut headers.content_disposition
            } else {
                continue;
            };
            if slot.is_none() {
                *slot = Some(value.to_string());
            }
        }
        headers
    }
}

/// One response observed by the transport, without its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub url: String,
    pub status: u16,
    pub headers: ResponseHeaders,
}

/// The final response of a GET, after all redirects were followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalResponse {
    pub exchange: Exchange,
    pub body: Vec<u8>,
}

/// Everything one GET produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    /// Intermediate redirect responses, oldest first.
    pub history: Vec<Exchange>,
    pub terminal: TerminalResponse,
}

/// Why a GET produced no usable [`Fetched`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportFailure {
    /// No response was obtained (connect failure, timeout, reset).
    #[error("{0}")]
    Unreachable(String),

    /// The request could not be made or its response was refused, e.g. an
    /// unparseable URL or a body over the size limit.
    #[error("{0}")]
    Rejected(String),
}

impl TransportFailure {
    pub fn reason(&self) -> &str {
        match self {
            TransportFailure::Unreachable(reason) | TransportFailure::Rejected(reason) => reason,
        }
    }
}

/// Capability to perform one HTTP GET.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<Fetched, TransportFailure>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for &T {
    async fn get(&self, url: &str) -> Result<Fetched, TransportFailure> {
        (**self).get(url).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn get(&self, url: &str) -> Result<Fetched, TransportFailure> {
        (**self).get(url).await
    }
}
