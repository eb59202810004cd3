//! Engine lifecycle: owns the client, the cache and the cleanup sweep

use crate::cache::MetadataCache;
use crate::config::{FailureMode, Settings};
use crate::enrich::{ObjectResolver, ResourceAttributes, ResourceEnricher};
use crate::error::{CfEnricherError, Result};
use crate::logging::{Timer, log_error};
use crate::platform::{PlatformApi, PlatformClient};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Adds Cloud Foundry metadata attributes to telemetry resources.
///
/// Created once per pipeline component. Owns the metadata cache and its
/// cleanup sweep; [`shutdown`](Self::shutdown) cancels in-flight fetches
/// and stops the sweep. Batches may be processed concurrently from
/// several pipeline stages; all shared state is internally synchronized.
pub struct CfAttributesProcessor<C = PlatformClient> {
    enricher: ResourceEnricher<C>,
    cache: Arc<MetadataCache>,
    failure_mode: FailureMode,
    shutdown: CancellationToken,
}

impl CfAttributesProcessor<PlatformClient> {
    /// Authenticate against the platform and start the engine.
    pub async fn start(settings: &Settings) -> Result<Self> {
        let client = PlatformClient::connect(&settings.cloud_foundry).await?;
        Ok(Self::with_client(client, settings))
    }
}

impl<C: PlatformApi> CfAttributesProcessor<C> {
    /// Build the engine around an already-constructed client.
    pub fn with_client(client: C, settings: &Settings) -> Self {
        let cache = Arc::new(MetadataCache::new(settings.cache.ttl));
        let shutdown = CancellationToken::new();

        spawn_cleanup_sweep(
            cache.clone(),
            settings.cache.cleanup_interval,
            shutdown.clone(),
        );

        let resolver = ObjectResolver::new(Arc::new(client), cache.clone());
        let enricher = ResourceEnricher::new(resolver, settings.extract.clone());

        tracing::info!(
            failure_mode = ?settings.failure_mode,
            cache_ttl_secs = settings.cache.ttl.as_secs(),
            "CF attributes processor started"
        );

        Self {
            enricher,
            cache,
            failure_mode: settings.failure_mode,
            shutdown,
        }
    }

    /// Enrich every resource in a batch.
    ///
    /// Under [`FailureMode::AbortBatch`] the first resolution failure
    /// fails the whole batch; under [`FailureMode::SkipResource`] failed
    /// resources are logged and the rest proceed. Shutdown aborts the
    /// batch with [`CfEnricherError::Canceled`].
    pub async fn process_batch<R: ResourceAttributes>(
        &self,
        resources: &mut [R],
        cancel: &CancellationToken,
    ) -> Result<()> {
        let _timer = Timer::new("process_batch");

        tokio::select! {
            // Shutdown wins over a batch that could still make progress
            biased;
            _ = self.shutdown.cancelled() => Err(CfEnricherError::Canceled),
            result = self.run_batch(resources, cancel) => result,
        }
    }

    async fn run_batch<R: ResourceAttributes>(
        &self,
        resources: &mut [R],
        cancel: &CancellationToken,
    ) -> Result<()> {
        match self.failure_mode {
            FailureMode::AbortBatch => {
                futures::future::try_join_all(
                    resources
                        .iter_mut()
                        .map(|resource| self.enricher.enrich(resource, cancel)),
                )
                .await?;
            }
            FailureMode::SkipResource => {
                let results = futures::future::join_all(
                    resources
                        .iter_mut()
                        .map(|resource| self.enricher.enrich(resource, cancel)),
                )
                .await;

                for err in results.into_iter().filter_map(Result::err) {
                    log_error("enrich_resource", &err);
                }
            }
        }
        Ok(())
    }

    /// Enrich a single resource under a caller-supplied cancellation
    /// context, for pipelines that drive resources themselves.
    pub async fn enrich_resource<R: ResourceAttributes>(
        &self,
        resource: &mut R,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.enricher.enrich(resource, cancel).await
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    /// Cancel in-flight work and stop the cleanup sweep. Idempotent.
    pub fn shutdown(&self) {
        tracing::info!("Shutting down CF attributes processor");
        self.cache.log_stats();
        self.shutdown.cancel();
    }
}

fn spawn_cleanup_sweep(
    cache: Arc<MetadataCache>,
    cleanup_interval: Duration,
    shutdown: CancellationToken,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cleanup_interval);
        // The first tick fires immediately; skip it
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!("Cache cleanup sweep stopped");
                    break;
                }
                _ = ticker.tick() => {
                    cache.purge_expired();
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheConfig, CfAuth, CfConfig, ExtractionPolicy};
    use crate::platform::{Application, ObjectKind, PlatformObject};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockPlatform {
        app: Option<Application>,
        calls: AtomicUsize,
    }

    impl PlatformApi for MockPlatform {
        async fn fetch(
            &self,
            kind: ObjectKind,
            id: &str,
            cancel: &CancellationToken,
        ) -> Result<PlatformObject> {
            if cancel.is_cancelled() {
                return Err(CfEnricherError::Canceled);
            }
            self.calls.fetch_add(1, Ordering::SeqCst);
            match (kind, &self.app) {
                (ObjectKind::Application, Some(app)) => {
                    Ok(PlatformObject::Application(app.clone()))
                }
                _ => Err(CfEnricherError::Fetch {
                    kind,
                    id: id.to_string(),
                    message: "not found".to_string(),
                }),
            }
        }
    }

    fn test_app() -> Application {
        Application {
            id: "A1".to_string(),
            name: "svc".to_string(),
            state: "STARTED".to_string(),
            lifecycle_type: "buildpack".to_string(),
            buildpacks: vec![],
            stack: "cflinuxfs4".to_string(),
            created_at: "2024-03-01T10:00:00Z".parse().unwrap(),
            updated_at: "2024-03-01T10:00:00Z".parse().unwrap(),
            space_id: "S1".to_string(),
            labels: HashMap::new(),
            annotations: HashMap::new(),
        }
    }

    fn test_settings(failure_mode: FailureMode) -> Settings {
        Settings {
            cloud_foundry: CfConfig {
                endpoint: "https://api.cf.example.com".to_string(),
                auth: CfAuth::user_password("admin", "secret"),
            },
            cache: CacheConfig::default(),
            extract: ExtractionPolicy::default(),
            failure_mode,
        }
    }

    fn batch(ids: &[&str]) -> Vec<HashMap<String, String>> {
        ids.iter()
            .map(|id| HashMap::from([("app_id".to_string(), id.to_string())]))
            .collect()
    }

    #[tokio::test]
    async fn test_process_batch_enriches_every_resource() {
        let processor = CfAttributesProcessor::with_client(
            MockPlatform {
                app: Some(test_app()),
                calls: AtomicUsize::new(0),
            },
            &test_settings(FailureMode::AbortBatch),
        );
        let cancel = CancellationToken::new();
        let mut resources = batch(&["A1", "A1", "A1"]);

        processor
            .process_batch(&mut resources, &cancel)
            .await
            .unwrap();

        for resource in &resources {
            assert_eq!(resource["cloudfoundry.app.name"], "svc");
        }
    }

    #[tokio::test]
    async fn test_abort_batch_fails_on_first_error() {
        let processor = CfAttributesProcessor::with_client(
            MockPlatform {
                app: None,
                calls: AtomicUsize::new(0),
            },
            &test_settings(FailureMode::AbortBatch),
        );
        let cancel = CancellationToken::new();
        let mut resources = batch(&["A1", "A2"]);

        let err = processor
            .process_batch(&mut resources, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, CfEnricherError::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_skip_resource_continues_past_errors() {
        let processor = CfAttributesProcessor::with_client(
            MockPlatform {
                app: None,
                calls: AtomicUsize::new(0),
            },
            &test_settings(FailureMode::SkipResource),
        );
        let cancel = CancellationToken::new();
        let mut resources = batch(&["A1", "A2"]);

        processor
            .process_batch(&mut resources, &cancel)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_cancels_batches() {
        let processor = CfAttributesProcessor::with_client(
            MockPlatform {
                app: Some(test_app()),
                calls: AtomicUsize::new(0),
            },
            &test_settings(FailureMode::AbortBatch),
        );
        let cancel = CancellationToken::new();

        processor.shutdown();

        let mut resources = batch(&["A1"]);
        let err = processor
            .process_batch(&mut resources, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, CfEnricherError::Canceled));
    }

    #[tokio::test]
    async fn test_cleanup_sweep_reclaims_expired_entries() {
        let mut settings = test_settings(FailureMode::AbortBatch);
        settings.cache = CacheConfig {
            ttl: Duration::from_millis(10),
            cleanup_interval: Duration::from_millis(20),
        };

        let processor = CfAttributesProcessor::with_client(
            MockPlatform {
                app: Some(test_app()),
                calls: AtomicUsize::new(0),
            },
            &settings,
        );
        let cancel = CancellationToken::new();

        let mut resources = batch(&["A1"]);
        processor
            .process_batch(&mut resources, &cancel)
            .await
            .unwrap();
        assert_eq!(processor.cache().len(), 1);

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(processor.cache().is_empty());
        processor.shutdown();
    }
}
