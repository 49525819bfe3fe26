//! Decomposition of a transport result into per-hop records.
//!
//! Redirect chains are common for DOIs and link shorteners:
//!
//! ```text
//! dx.doi.org/<doi>            301
//!   -> doi.acm.org/<doi>      302
//!     -> dl.acm.org/<id>      200
//! ```
//!
//! Each step is cached on its own so that a later request entering the
//! chain at any point resolves locally instead of going to the network.

use std::collections::HashSet;

use url::Url;

use crate::Error;
use crate::record::{Content, UNREACHABLE_STATUS, is_redirect};
use crate::transport::{Exchange, Fetched, Transport, TransportFailure};

/// What a hop carries besides its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HopPayload {
    /// An intermediate response; the target comes from `Location`.
    Redirect { target: Option<String> },
    /// The terminal response body.
    Body(Content),
}

impl HopPayload {
    /// Content as it is written to the record store.
    pub fn into_content(self) -> Content {
        match self {
            HopPayload::Redirect { target } => Content::Text(target.unwrap_or_default()),
            HopPayload::Body(content) => content,
        }
    }
}

/// One step of a redirect chain, including the terminal response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub payload: HopPayload,
}

impl Hop {
    /// Synthetic terminal hop for a URL the transport could not reach.
    pub fn unreachable(url: &str) -> Self {
        Self {
            url: url.to_string(),
            status_code: UNREACHABLE_STATUS,
            content_type: None,
            content_disposition: None,
            payload: HopPayload::Body(Content::default()),
        }
    }
}

/// The hops of one GET: redirects oldest first, then the terminal response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopChain {
    pub redirects: Vec<Hop>,
    pub terminal: Hop,
}

impl HopChain {
    /// Chain of a single terminal hop.
    pub fn terminal(hop: Hop) -> Self {
        Self { redirects: Vec::new(), terminal: hop }
    }

    /// All hops in order.
    pub fn iter(&self) -> impl Iterator<Item = &Hop> {
        self.redirects.iter().chain(std::iter::once(&self.terminal))
    }

    pub fn hop_count(&self) -> usize {
        self.redirects.len() + 1
    }
}

/// How a transport failure is represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnreachablePolicy {
    /// Emit a single [`UNREACHABLE_STATUS`] hop, which is then cached.
    Cache,
    /// Fail with [`Error::Unreachable`]; nothing is cached.
    Fail,
}

/// GET `url` and return its hops, intermediate redirects first.
///
/// # Errors
///
/// Returns [`Error::RedirectLoop`] if the same URL appears twice in the
/// chain, [`Error::Unreachable`] when no response was obtained under
/// [`UnreachablePolicy::Fail`], and [`Error::FetchRejected`] when the
/// transport refused the request or its response.
pub async fn follow<T: Transport + ?Sized>(
    transport: &T, url: &str, policy: UnreachablePolicy,
) -> Result<HopChain, Error> {
    tracing::info!("retrieving {url}");
    let fetched = match transport.get(url).await {
        Ok(fetched) => fetched,
        Err(TransportFailure::Unreachable(reason)) => {
            tracing::warn!("{url} unreachable: {reason}");
            return match policy {
                UnreachablePolicy::Cache => Ok(HopChain::terminal(Hop::unreachable(url))),
                UnreachablePolicy::Fail => Err(Error::Unreachable { url: url.to_string(), reason }),
            };
        }
        Err(TransportFailure::Rejected(reason)) => {
            tracing::warn!("{url} rejected: {reason}");
            return Err(Error::FetchRejected { url: url.to_string(), reason });
        }
    };

    if !fetched.history.is_empty() {
        tracing::info!("{url} redirected {} times", fetched.history.len());
    }

    let chain = extract(fetched);

    let mut seen = HashSet::new();
    if let Some(hop) = chain.iter().find(|hop| !seen.insert(hop.url.as_str())) {
        return Err(Error::RedirectLoop { url: hop.url.clone(), hops: chain.hop_count() });
    }

    Ok(chain)
}

/// Split a transport result into hops, intermediate redirects first.
///
/// A terminal response with a redirect status and a `Location` (the
/// transport stopped following) is kept as a redirect hop, so resolution
/// can continue from its target. Without `Location` its body is kept.
pub fn extract(fetched: Fetched) -> HopChain {
    let Fetched { history, terminal } = fetched;
    let redirects = history.into_iter().map(redirect_hop).collect();

    let exchange = terminal.exchange;
    if is_redirect(exchange.status) && exchange.headers.location.is_some() {
        return HopChain { redirects, terminal: redirect_hop(exchange) };
    }

    let Exchange { url, status, headers } = exchange;
    HopChain {
        redirects,
        terminal: Hop {
            url,
            status_code: status,
            content_type: trimmed(headers.content_type),
            content_disposition: headers.content_disposition,
            payload: HopPayload::Body(Content::decode(terminal.body)),
        },
    }
}

fn redirect_hop(exchange: Exchange) -> Hop {
    let target = exchange
        .headers
        .location
        .as_deref()
        .and_then(|location| resolve_location(&exchange.url, location));

    Hop {
        url: exchange.url,
        status_code: exchange.status,
        content_type: trimmed(exchange.headers.content_type),
        content_disposition: exchange.headers.content_disposition,
        payload: HopPayload::Redirect { target },
    }
}

/// Resolve a possibly relative `Location` against the URL that sent it.
/// `None` if no absolute URL comes out.
fn resolve_location(base: &str, location: &str) -> Option<String> {
    Url::parse(base)
        .and_then(|base| base.join(location))
        .or_else(|_| Url::parse(location))
        .ok()
        .map(String::from)
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
