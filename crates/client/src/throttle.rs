//! Request pacing.
//!
//! Some sites lock a client out when it requests too often. [`Throttle`]
//! waits before every network request it forwards; cache hits never reach
//! the transport and are not delayed.

use std::time::Duration;

use async_trait::async_trait;
use httpcache_core::{Fetched, Transport, TransportFailure};

/// Transport decorator that pauses before each request.
pub struct Throttle<T> {
    inner: T,
    pause: Duration,
}

impl<T> Throttle<T> {
    pub fn new(inner: T, pause: Duration) -> Self {
        Self { inner, pause }
    }

    pub fn pause(&self) -> Duration {
        self.pause
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[async_trait]
impl<T: Transport> Transport for Throttle<T> {
    async fn get(&self, url: &str) -> Result<Fetched, TransportFailure> {
        if !self.pause.is_zero() {
            tracing::debug!("pausing {}ms before {url}", self.pause.as_millis());
            tokio::time::sleep(self.pause).await;
        }
        self.inner.get(url).await
    }
}
