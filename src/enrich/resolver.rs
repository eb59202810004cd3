//! Cache-aside resolution of platform objects

use crate::cache::MetadataCache;
use crate::error::{CfEnricherError, Result};
use crate::platform::{ObjectKind, PlatformApi, PlatformObject};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Resolves platform objects by kind and id, consulting the cache first
/// and falling back to the API on a miss.
///
/// Platform objects change rarely relative to telemetry volume and the
/// API is the throughput bottleneck, so the TTL bounds staleness without
/// push-based invalidation. Cache writes are best-effort: an entry that
/// fails to encode is skipped and the resolve still succeeds.
pub struct ObjectResolver<C> {
    client: Arc<C>,
    cache: Arc<MetadataCache>,
}

impl<C: PlatformApi> ObjectResolver<C> {
    pub fn new(client: Arc<C>, cache: Arc<MetadataCache>) -> Self {
        Self { client, cache }
    }

    pub async fn resolve(
        &self,
        kind: ObjectKind,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<PlatformObject> {
        let key = kind.cache_key(id);

        if let Some(payload) = self.cache.get(&key) {
            match serde_json::from_slice::<PlatformObject>(&payload) {
                Ok(object) => return Ok(object),
                Err(e) => {
                    // An undecodable entry is a miss; the refetch below
                    // supersedes it.
                    tracing::warn!(
                        key = %key,
                        error = %CfEnricherError::Encoding(e),
                        "Could not decode cached object, refetching"
                    );
                }
            }
        }

        tracing::debug!(key = %key, "Cache miss, fetching from Cloud Foundry API");
        let object = self.client.fetch(kind, id, cancel).await?;

        match serde_json::to_vec(&object) {
            Ok(payload) => self.cache.put(key, payload),
            Err(e) => {
                tracing::warn!(
                    key = %key,
                    error = %CfEnricherError::Encoding(e),
                    "Could not encode object for cache, skipping cache write"
                );
            }
        }

        Ok(object)
    }
}
