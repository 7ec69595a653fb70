//! Test doubles shared by the unit tests.

use crate::cache::error::StoreError;
use crate::cache::store::KeyValueStore;
use crate::forecast::error::ProviderError;
use crate::forecast::provider::ForecastProvider;
use crate::route::error::RouteProviderError;
use crate::route::provider::RouteProvider;
use crate::types::coordinate::Coordinate;
use crate::types::forecast::{ForecastDocument, ForecastPeriod, Wind};
use crate::types::route::Route;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn sample_document(start: DateTime<Utc>) -> ForecastDocument {
    ForecastDocument::new(vec![period(start, 6, 15.0, 10.0, 12.0, "Sunny")])
}

pub fn period(
    start: DateTime<Utc>,
    hours: i64,
    temperature_c: f64,
    precipitation_probability_pct: f64,
    wind_kph: f64,
    summary: &str,
) -> ForecastPeriod {
    ForecastPeriod {
        valid_from: start,
        valid_to: start + ChronoDuration::hours(hours),
        temperature_c,
        precipitation_probability_pct,
        wind: Wind {
            speed_kph: wind_kph,
            gust_kph: None,
            direction: Some("NW".to_string()),
        },
        summary: summary.to_string(),
    }
}

/// A forecast provider that counts its calls.
///
/// Every coordinate gets the same document unless a per-point override is
/// registered. Points listed with [`CountingProvider::hang_at`] never answer.
pub struct CountingProvider {
    document: ForecastDocument,
    overrides: Mutex<Vec<(Coordinate, ForecastDocument)>>,
    calls: AtomicUsize,
    fail_next: AtomicUsize,
    delay: Duration,
    hang_at: Mutex<HashSet<Coordinate>>,
}

impl CountingProvider {
    pub fn new(document: ForecastDocument) -> Self {
        Self {
            document,
            overrides: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            fail_next: AtomicUsize::new(0),
            delay: Duration::ZERO,
            hang_at: Mutex::new(HashSet::new()),
        }
    }

    /// One period `[start, start + 6h)` at `temperature_c`.
    pub fn six_hour_period(start: DateTime<Utc>, temperature_c: f64) -> Self {
        Self::new(ForecastDocument::new(vec![period(
            start,
            6,
            temperature_c,
            10.0,
            12.0,
            "Sunny",
        )]))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_document_at(self, coordinate: Coordinate, document: ForecastDocument) -> Self {
        self.overrides
            .lock()
            .unwrap()
            .push((coordinate, document));
        self
    }

    pub fn hang_at(&self, coordinate: Coordinate) {
        self.hang_at.lock().unwrap().insert(coordinate);
    }

    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ForecastProvider for CountingProvider {
    async fn fetch(&self, coordinate: Coordinate) -> Result<ForecastDocument, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let hang = self.hang_at.lock().unwrap().contains(&coordinate);
        if hang {
            std::future::pending::<()>().await;
        }
        let failing = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ProviderError::Other("scripted failure".to_string()));
        }
        let document = self
            .overrides
            .lock()
            .unwrap()
            .iter()
            .find(|(c, _)| *c == coordinate)
            .map(|(_, d)| d.clone())
            .unwrap_or_else(|| self.document.clone());
        Ok(document)
    }
}

/// A store whose backend is always down.
pub struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn put(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

/// A route provider that returns a fixed route, or no route at all.
pub struct StaticRouteProvider {
    route: Option<Route>,
}

impl StaticRouteProvider {
    pub fn new(route: Route) -> Self {
        Self { route: Some(route) }
    }

    pub fn no_route() -> Self {
        Self { route: None }
    }
}

#[async_trait]
impl RouteProvider for StaticRouteProvider {
    async fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<Route, RouteProviderError> {
        self.route
            .clone()
            .ok_or(RouteProviderError::NoRoute { origin, destination })
    }
}

/// A straight route along the equator: `n` points 0.2 degrees apart, one
/// minute between neighbours.
pub fn equator_route(n: usize) -> Route {
    let polyline = (0..n)
        .map(|i| Coordinate::new(0.0, i as f64 * 0.2).unwrap())
        .collect();
    let seconds = (0..n).map(|i| i as f64 * 60.0).collect();
    Route::new(polyline, seconds).unwrap()
}
