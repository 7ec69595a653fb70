//! Route Aggregator: bounded fan-out of point lookups, reduced to one summary.

use crate::config::EngineConfig;
use crate::forecast::error::{ForecastUnavailable, UnavailableReason};
use crate::forecast::resolver::PointForecastResolver;
use crate::route::reducer::{RouteReducer, ThresholdReducer};
use crate::types::forecast::ForecastPeriod;
use crate::types::route::RouteSample;
use crate::types::summary::{RouteWeatherSummary, SampleForecast};
use futures_util::future::join_all;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;

pub struct RouteAggregator {
    resolver: Arc<PointForecastResolver>,
    limiter: Arc<Semaphore>,
    flags: ThresholdReducer,
    min_completeness_ratio: f64,
    route_timeout: Option<Duration>,
}

impl RouteAggregator {
    pub fn new(resolver: Arc<PointForecastResolver>, config: &EngineConfig) -> Self {
        Self {
            resolver,
            limiter: Arc::new(Semaphore::new(config.max_concurrent_fetches)),
            flags: ThresholdReducer {
                precipitation_threshold_pct: config.precipitation_threshold_pct,
            },
            min_completeness_ratio: config.min_completeness_ratio,
            route_timeout: config.route_timeout,
        }
    }

    /// Resolves every sample and reduces the outcomes.
    ///
    /// At most `max_concurrent_fetches` lookups run at once; the rest wait for
    /// a slot. A failing sample never stops the others. When a route timeout is
    /// configured, samples still pending at the deadline are recorded as
    /// failures. The summary keeps the input order.
    pub async fn aggregate(&self, samples: &[RouteSample]) -> RouteWeatherSummary {
        // A timeout past the clock's range leaves the route without a deadline.
        let deadline = self
            .route_timeout
            .and_then(|t| Instant::now().checked_add(t));

        let outcomes =
            join_all(samples.iter().map(|sample| self.resolve_sample(*sample, deadline))).await;
        let results: Vec<SampleForecast> = samples
            .iter()
            .zip(outcomes)
            .map(|(sample, outcome)| SampleForecast {
                sample: *sample,
                outcome,
            })
            .collect();

        let total = results.len();
        let successes = results.iter().filter(|r| r.outcome.is_ok()).count();
        let completeness = if total == 0 {
            0.0
        } else {
            successes as f64 / total as f64
        };
        let degraded = total == 0 || completeness < self.min_completeness_ratio;
        if degraded {
            warn!(
                "Route summary degraded: {}/{} samples resolved (minimum ratio {})",
                successes, total, self.min_completeness_ratio
            );
        } else {
            debug!("Route summary complete: {}/{} samples resolved", successes, total);
        }

        RouteWeatherSummary {
            flags: self.flags.reduce(&results),
            samples: results,
            completeness,
            degraded,
        }
    }

    async fn resolve_sample(
        &self,
        sample: RouteSample,
        deadline: Option<Instant>,
    ) -> Result<ForecastPeriod, ForecastUnavailable> {
        let lookup = async {
            // The semaphore is never closed.
            let _permit = self.limiter.acquire().await.map_err(|_| {
                ForecastUnavailable::new(sample.coordinate, UnavailableReason::RouteDeadline)
            })?;
            self.resolver.resolve(sample.coordinate, sample.arrival).await
        };

        match deadline {
            None => lookup.await,
            Some(deadline) => tokio::time::timeout_at(deadline, lookup)
                .await
                .unwrap_or_else(|_| {
                    Err(ForecastUnavailable::new(
                        sample.coordinate,
                        UnavailableReason::RouteDeadline,
                    ))
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::adapter::CacheStore;
    use crate::cache::store::MemoryStore;
    use crate::clock::ManualClock;
    use crate::testing::{equator_route, CountingProvider};
    use crate::types::coordinate::Coordinate;
    use crate::types::forecast::ForecastDocument;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    /// Five samples far enough apart that each has its own geocell.
    fn five_samples() -> Vec<RouteSample> {
        equator_route(5)
            .polyline()
            .iter()
            .enumerate()
            .map(|(index, coordinate)| RouteSample {
                index,
                coordinate: *coordinate,
                arrival: t0() + chrono::Duration::minutes(index as i64),
            })
            .collect()
    }

    fn aggregator(provider: Arc<CountingProvider>, config: &EngineConfig) -> RouteAggregator {
        let resolver = Arc::new(PointForecastResolver::new(
            CacheStore::new(Arc::new(MemoryStore::new())),
            provider,
            Arc::new(ManualClock::new(t0())),
            config,
        ));
        RouteAggregator::new(resolver, config)
    }

    fn timeout_config(limit: usize, min_ratio: f64) -> EngineConfig {
        EngineConfig::builder()
            .max_concurrent_fetches(limit)
            .fetch_timeout(Duration::from_secs(5))
            .min_completeness_ratio(min_ratio)
            .build()
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_timeout_out_of_five() {
        let samples = five_samples();
        for (min_ratio, expect_degraded) in [(0.9, true), (0.5, false)] {
            let provider = Arc::new(CountingProvider::six_hour_period(t0(), 15.0));
            provider.hang_at(samples[3].coordinate);
            let summary = aggregator(provider.clone(), &timeout_config(2, min_ratio))
                .aggregate(&samples)
                .await;

            assert_eq!(summary.samples.len(), 5);
            assert_eq!(summary.successes(), 4);
            let failed: Vec<usize> = summary.failures().map(|f| f.sample.index).collect();
            assert_eq!(failed, vec![3]);
            assert!(matches!(
                summary.samples[3].outcome,
                Err(ForecastUnavailable {
                    reason: UnavailableReason::Timeout(_),
                    ..
                })
            ));
            assert_eq!(summary.completeness, 0.8);
            assert_eq!(summary.degraded, expect_degraded);
            assert_eq!(provider.calls(), 5);
        }
    }

    #[tokio::test]
    async fn test_order_is_preserved() {
        let samples = five_samples();
        let mut provider = CountingProvider::six_hour_period(t0(), 0.0);
        for sample in &samples {
            let temp = sample.index as f64 * 10.0;
            provider = provider.with_document_at(
                sample.coordinate,
                ForecastDocument::new(vec![crate::testing::period(t0(), 6, temp, 0.0, 5.0, "Sunny")]),
            );
        }
        let summary = aggregator(Arc::new(provider), &EngineConfig::default())
            .aggregate(&samples)
            .await;

        let temps: Vec<f64> = summary
            .samples
            .iter()
            .map(|s| s.forecast().unwrap().temperature_c)
            .collect();
        assert_eq!(temps, vec![0.0, 10.0, 20.0, 30.0, 40.0]);
        assert_eq!(summary.completeness, 1.0);
        assert!(!summary.degraded);
        assert_eq!(
            summary.flags.temperature_range.map(|r| (r.min_c, r.max_c)),
            Some((0.0, 40.0))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded() {
        struct Gauge {
            inner: CountingProvider,
            current: AtomicUsize,
            peak: AtomicUsize,
        }

        #[async_trait::async_trait]
        impl crate::forecast::provider::ForecastProvider for Gauge {
            async fn fetch(
                &self,
                coordinate: Coordinate,
            ) -> Result<ForecastDocument, crate::forecast::error::ProviderError> {
                let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                let result = self.inner.fetch(coordinate).await;
                self.current.fetch_sub(1, Ordering::SeqCst);
                result
            }
        }

        let gauge = Arc::new(Gauge {
            inner: CountingProvider::six_hour_period(t0(), 15.0)
                .with_delay(Duration::from_millis(100)),
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let config = EngineConfig::builder().max_concurrent_fetches(2).build();
        let resolver = Arc::new(PointForecastResolver::new(
            CacheStore::new(Arc::new(MemoryStore::new())),
            gauge.clone(),
            Arc::new(ManualClock::new(t0())),
            &config,
        ));
        let summary = RouteAggregator::new(resolver, &config)
            .aggregate(&five_samples())
            .await;

        assert_eq!(summary.successes(), 5);
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_route_deadline_marks_pending_samples_failed() {
        let samples = five_samples();
        let provider = Arc::new(CountingProvider::six_hour_period(t0(), 15.0));
        provider.hang_at(samples[1].coordinate);
        provider.hang_at(samples[4].coordinate);
        let config = EngineConfig::builder()
            .fetch_timeout(Duration::from_secs(60))
            .route_timeout(Duration::from_secs(2))
            .build();

        let summary = aggregator(provider, &config).aggregate(&samples).await;

        assert_eq!(summary.successes(), 3);
        for index in [1, 4] {
            assert!(matches!(
                summary.samples[index].outcome,
                Err(ForecastUnavailable {
                    reason: UnavailableReason::RouteDeadline,
                    ..
                })
            ));
        }
        assert_eq!(summary.completeness, 0.6);
        assert!(!summary.degraded);
    }

    #[tokio::test]
    async fn test_unbounded_route_timeout_is_no_deadline() {
        let provider = Arc::new(CountingProvider::six_hour_period(t0(), 15.0));
        let config = EngineConfig::builder().route_timeout(Duration::MAX).build();
        let summary = aggregator(provider, &config)
            .aggregate(&five_samples())
            .await;
        assert_eq!(summary.successes(), 5);
    }

    #[tokio::test]
    async fn test_empty_sample_list_is_degraded() {
        let provider = Arc::new(CountingProvider::six_hour_period(t0(), 15.0));
        let summary = aggregator(provider, &EngineConfig::default())
            .aggregate(&[])
            .await;
        assert_eq!(summary.completeness, 0.0);
        assert!(summary.degraded);
    }
}
