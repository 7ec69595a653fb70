//! Point Forecast Resolver: cache first, then a single shared upstream fetch.

use crate::cache::adapter::CacheStore;
use crate::cache::key::{CacheKey, GeocellIndexer};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::forecast::error::{ForecastUnavailable, UnavailableReason};
use crate::forecast::provider::ForecastProvider;
use crate::forecast::singleflight::Singleflight;
use crate::types::coordinate::Coordinate;
use crate::types::forecast::{ForecastDocument, ForecastPeriod};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

pub struct PointForecastResolver {
    cache: CacheStore,
    provider: Arc<dyn ForecastProvider>,
    in_flight: Singleflight<CacheKey, Arc<ForecastDocument>, UnavailableReason>,
    indexer: GeocellIndexer,
    clock: Arc<dyn Clock>,
    cache_ttl: Duration,
    fetch_timeout: Duration,
}

impl PointForecastResolver {
    pub fn new(
        cache: CacheStore,
        provider: Arc<dyn ForecastProvider>,
        clock: Arc<dyn Clock>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            cache,
            provider,
            in_flight: Singleflight::new(),
            indexer: GeocellIndexer::from_config(config),
            clock,
            cache_ttl: config.cache_ttl,
            fetch_timeout: config.fetch_timeout,
        }
    }

    /// Returns the forecast period for `coordinate` at `target`.
    ///
    /// A valid cache entry (`now < stored_at + ttl`) is used directly.
    /// Otherwise the provider is asked through the in-flight registry, so
    /// concurrent misses on the same key cost one upstream call. A successful
    /// document is written back under the geocell/time-bucket key; a failure
    /// is returned to every waiter and never cached. Store failures degrade
    /// to a live fetch.
    pub async fn resolve(
        &self,
        coordinate: Coordinate,
        target: DateTime<Utc>,
    ) -> Result<ForecastPeriod, ForecastUnavailable> {
        let key = self.indexer.key(&coordinate, target);

        match self.cache.get(&key).await {
            Ok(Some(entry)) if entry.is_valid_at(self.clock.now()) => {
                debug!("Cache hit for {}", key);
                return Self::select(&entry.forecast, coordinate, target);
            }
            Ok(Some(_)) => debug!("Cache entry for {} expired", key),
            Ok(None) => debug!("Cache miss for {}", key),
            Err(e) => warn!("Cache store unavailable for {}, fetching live: {}", key, e),
        }

        let document = self
            .in_flight
            .resolve(key.clone(), || self.fetch_and_store(key, coordinate))
            .await
            .map_err(|reason| ForecastUnavailable::new(coordinate, reason))?;

        Self::select(&document, coordinate, target)
    }

    /// Drops every in-flight record.
    pub fn drain(&self) {
        self.in_flight.clear();
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn indexer(&self) -> &GeocellIndexer {
        &self.indexer
    }

    /// Builds the fetch shared by every waiter on `key`. It owns everything it
    /// touches so it can outlive the caller that started it.
    fn fetch_and_store(
        &self,
        key: CacheKey,
        coordinate: Coordinate,
    ) -> impl std::future::Future<Output = Result<Arc<ForecastDocument>, UnavailableReason>>
           + Send
           + 'static {
        let provider = self.provider.clone();
        let cache = self.cache.clone();
        let clock = self.clock.clone();
        let ttl = self.cache_ttl;
        let timeout = self.fetch_timeout;

        async move {
            info!("Fetching forecast for {} ({})", coordinate, key);
            let document = match tokio::time::timeout(timeout, provider.fetch(coordinate)).await {
                Ok(Ok(document)) => document,
                Ok(Err(e)) => {
                    warn!("Forecast provider failed for {}: {}", coordinate, e);
                    return Err(UnavailableReason::Provider(Arc::new(e)));
                }
                Err(_) => {
                    warn!("Forecast fetch for {} timed out after {:?}", coordinate, timeout);
                    return Err(UnavailableReason::Timeout(timeout));
                }
            };

            match cache.put(&key, &document, clock.now(), ttl).await {
                Ok(()) => info!("Cached forecast for {}", key),
                Err(e) => warn!("Failed to cache forecast for {}: {}", key, e),
            }
            Ok(Arc::new(document))
        }
    }

    fn select(
        document: &ForecastDocument,
        coordinate: Coordinate,
        target: DateTime<Utc>,
    ) -> Result<ForecastPeriod, ForecastUnavailable> {
        document.period_at(target).cloned().ok_or_else(|| {
            ForecastUnavailable::new(coordinate, UnavailableReason::NoMatchingPeriod(target))
        })
    }
}
