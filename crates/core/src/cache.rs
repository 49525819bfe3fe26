//! Lookup, fetch-on-miss and redirect-chain resolution.
//!
//! [`Cache::get`] answers from the record store when it can and goes to the
//! network otherwise. Every hop of a fetched redirect chain is stored, so a
//! later request that enters the chain anywhere resolves locally.
//!
//! Two requests can reach the same hop URL through different chains. When
//! inserting a hop finds it already stored, the stored row wins: the fetch
//! is abandoned and the requested URL is resolved again from the store.

use std::collections::HashSet;
use std::path::Path;

use crate::Error;
use crate::blob::BlobStore;
use crate::hops::{self, Hop, HopPayload, UnreachablePolicy};
use crate::record::{Content, ListEntry, Record, timestamp};
use crate::slug::slug;
use crate::store::{InsertOutcome, RecordStore};
use crate::transport::Transport;

/// Behavior knobs for [`Cache`].
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// MIME types whose bodies go to the blob store instead of the record.
    pub external_content_types: Vec<String>,
    /// Also route bodies served with `Content-Disposition: attachment`.
    pub store_attachments: bool,
    pub unreachable: UnreachablePolicy,
    /// Maximum redirect records followed while resolving one request.
    pub max_chain_depth: usize,
    /// Maximum number of times a request is resolved again after an
    /// insert conflict.
    pub max_restarts: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            external_content_types: vec!["application/pdf".to_string()],
            store_attachments: false,
            unreachable: UnreachablePolicy::Cache,
            max_chain_depth: 32,
            max_restarts: 3,
        }
    }
}

impl CacheOptions {
    /// Whether a body with these headers is stored in the blob store.
    pub fn stores_externally(&self, content_type: Option<&str>, content_disposition: Option<&str>) -> bool {
        let by_type = content_type.is_some_and(|ct| {
            let essence = ct.split(';').next().unwrap_or_default().trim();
            self.external_content_types.iter().any(|t| t.eq_ignore_ascii_case(essence))
        });
        let by_disposition = self.store_attachments
            && content_disposition.is_some_and(|cd| {
                cd.trim_start()
                    .get(..10)
                    .is_some_and(|kind| kind.eq_ignore_ascii_case("attachment"))
            });
        by_type || by_disposition
    }
}

/// Outcome of one resolution attempt.
enum Resolution {
    Found(Record),
    /// A hop was already stored by an earlier write.
    Conflict { hop_url: String },
}

/// Persistent fetch cache.
pub struct Cache<T> {
    store: RecordStore,
    blobs: BlobStore,
    transport: T,
    options: CacheOptions,
}

impl<T: Transport> Cache<T> {
    pub fn new(store: RecordStore, blobs: BlobStore, transport: T, options: CacheOptions) -> Self {
        Self { store, blobs, transport, options }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    /// Return the record for `url`, fetching and storing it on a miss.
    ///
    /// Redirect records are followed until a non-redirect record is found.
    ///
    /// # Errors
    ///
    /// - [`Error::RedirectLoop`] if resolution revisits a URL or exceeds
    ///   `max_chain_depth`
    /// - [`Error::RaceUnresolved`] if insert conflicts persist past
    ///   `max_restarts`
    /// - [`Error::Unreachable`] under [`UnreachablePolicy::Fail`]
    /// - [`Error::FetchRejected`] if the transport refused the request
    pub async fn get(&self, url: &str) -> Result<Record, Error> {
        if url.trim().is_empty() {
            return Err(Error::InvalidInput("url cannot be empty".into()));
        }

        let attempts = self.options.max_restarts + 1;
        for attempt in 1..=attempts {
            match self.resolve(url).await? {
                Resolution::Found(record) => return Ok(record),
                Resolution::Conflict { hop_url } => {
                    tracing::warn!(attempt, "{hop_url} already cached, resolving {url} again");
                }
            }
        }

        Err(Error::RaceUnresolved { url: url.to_string(), attempts })
    }

    async fn resolve(&self, url: &str) -> Result<Resolution, Error> {
        let mut visited = HashSet::new();
        let mut current = url.to_string();

        loop {
            if visited.len() > self.options.max_chain_depth || visited.contains(&current) {
                return Err(Error::RedirectLoop { url: current, hops: visited.len() });
            }
            visited.insert(current.clone());

            let record = match self.store.lookup(&current).await? {
                Some(record) => {
                    tracing::debug!("cache hit for {current}");
                    record
                }
                None => match self.fetch(&current).await? {
                    Resolution::Found(record) => record,
                    conflict @ Resolution::Conflict { .. } => return Ok(conflict),
                },
            };

            match record.redirect_target() {
                Some(target) => {
                    tracing::debug!("{current} redirects to {target}");
                    current = target.to_string();
                }
                None => return Ok(Resolution::Found(record)),
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<Resolution, Error> {
        let chain = hops::follow(&self.transport, url, self.options.unreachable).await?;
        let retrieved_at = timestamp();

        for hop in chain.redirects {
            let record = self.to_record(hop, &retrieved_at).await?;
            if let InsertOutcome::Conflict = self.store.insert(&record).await? {
                return Ok(Resolution::Conflict { hop_url: record.url });
            }
            tracing::debug!("cached {} -> {}", record.url, record.status_code);
        }

        let record = self.to_record(chain.terminal, &retrieved_at).await?;
        match self.store.insert(&record).await? {
            InsertOutcome::Inserted => {
                tracing::debug!("cached {} -> {}", record.url, record.status_code);
                Ok(Resolution::Found(record))
            }
            InsertOutcome::Conflict => Ok(Resolution::Conflict { hop_url: record.url }),
        }
    }

    /// Build the stored record for a hop, writing its body to the blob
    /// store when the options say so.
    async fn to_record(&self, hop: Hop, retrieved_at: &str) -> Result<Record, Error> {
        let Hop { url, status_code, content_type, content_disposition, payload } = hop;

        let external = matches!(payload, HopPayload::Body(_))
            && self
                .options
                .stores_externally(content_type.as_deref(), content_disposition.as_deref());

        let mut content = payload.into_content();
        if external {
            let relative = slug(&url);
            self.blobs.store(&relative, content.as_bytes()).await?;
            content = Content::Text(relative.to_string_lossy().into_owned());
        }

        Ok(Record { url, status_code, content_type, content, retrieved_at: retrieved_at.to_string() })
    }

    /// Read the blob a record's content points at.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BlobNotFound`] if nothing is stored at that path.
    pub async fn read_blob(&self, record: &Record) -> Result<Vec<u8>, Error> {
        let relative = record
            .content
            .as_text()
            .filter(|path| !path.is_empty())
            .ok_or_else(|| Error::InvalidInput(format!("{} has no blob path", record.url)))?;
        self.blobs.read(Path::new(relative)).await
    }

    /// Delete the record for `url`; absent URLs are ignored.
    pub async fn remove(&self, url: &str) -> Result<(), Error> {
        let deleted = self.store.remove(url).await?;
        tracing::debug!("removed {deleted} record(s) for {url}");
        Ok(())
    }

    /// Delete every record.
    pub async fn clear(&self) -> Result<(), Error> {
        let deleted = self.store.clear().await?;
        tracing::debug!("cleared {deleted} record(s)");
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<ListEntry>, Error> {
        self.store.list().await
    }
}
