//! Remote spatial lookups behind a tiered cache.
//!
//! [`Gateway`] is the raw transport. [`CachedGateway`] adds the cache tiers
//! and bounded retry on top of any transport, and [`OverpassContext`] turns
//! typed question lookups into queries against it.

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use crate::{config::RetryPolicy, error::GatewayError};

pub mod cache;
pub mod context;
pub mod memory;
pub mod osm;
pub mod overpass;
pub mod query;

pub use cache::{CacheEntry, CacheTier, TieredCache};
pub use context::OverpassContext;
pub use memory::MemoryContext;
pub use osm::OverpassResponse;
pub use overpass::OverpassGateway;

/// Send one query to the spatial-data service and return the raw body.
pub trait Gateway: Send + Sync {
    fn fetch<'a>(
        &'a self,
        query: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, GatewayError>> + Send + 'a>>;
}

/// Transport plus cache plus retry.
pub struct CachedGateway {
    transport: Arc<dyn Gateway>,
    cache: Arc<TieredCache>,
    retry: RetryPolicy,
}

impl CachedGateway {
    pub fn new(transport: Arc<dyn Gateway>, cache: Arc<TieredCache>, retry: RetryPolicy) -> Self {
        CachedGateway {
            transport,
            cache,
            retry,
        }
    }

    pub fn cache(&self) -> &Arc<TieredCache> {
        &self.cache
    }

    /// Run `query`, answering from `tier` when possible.
    ///
    /// A failed fetch is recorded in the tier so the next hit evicts it and
    /// goes back to the network.
    pub async fn fetch(&self, query: &str, tier: CacheTier) -> Result<OverpassResponse, GatewayError> {
        if let Some(entry) = self.cache.get(tier, query).await? {
            tracing::trace!(%tier, "cache hit");
            return Ok(serde_json::from_str(&entry.body)?);
        }

        match self.fetch_with_retry(query).await {
            Ok(body) => {
                let parsed: OverpassResponse = serde_json::from_str(&body)?;
                self.cache.put(tier, query, CacheEntry::success(body)).await?;
                Ok(parsed)
            }
            Err(err) => {
                self.cache
                    .put(tier, query, CacheEntry::failure(err.to_string()))
                    .await?;
                Err(err)
            }
        }
    }

    async fn fetch_with_retry(&self, query: &str) -> Result<String, GatewayError> {
        let attempts = self.retry.max_attempts.max(1);
        let mut last = String::new();

        for attempt in 1..=attempts {
            match self.transport.fetch(query).await {
                Ok(body) => return Ok(body),
                Err(err) => {
                    last = err.to_string();
                    if attempt < attempts {
                        let jitter = rand::random_range(0..=self.retry.base_delay_ms / 4);
                        let delay = self.retry.delay(attempt) + Duration::from_millis(jitter);
                        tracing::warn!(attempt, ?delay, error = %err, "lookup failed, retrying");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(GatewayError::RetriesExhausted { attempts, last })
    }
}
