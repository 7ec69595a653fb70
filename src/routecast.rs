//! This module provides the main entry point of the engine.
//! It resolves forecasts either for a single coordinate or along a route
//! between two coordinates, sharing one cache and one in-flight registry.

use crate::cache::adapter::CacheStore;
use crate::cache::file_store::FileStore;
use crate::cache::store::KeyValueStore;
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::RoutecastError;
use crate::forecast::nws::NwsForecastProvider;
use crate::forecast::provider::ForecastProvider;
use crate::forecast::resolver::PointForecastResolver;
use crate::route::aggregator::RouteAggregator;
use crate::route::provider::RouteProvider;
use crate::route::sampler::RouteSampler;
use crate::types::coordinate::Coordinate;
use crate::types::forecast::ForecastPeriod;
use crate::types::summary::RouteWeatherSummary;
use crate::utils::{ensure_cache_dir_exists, get_cache_dir};
use bon::bon;
use chrono::{DateTime, Utc};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

/// The engine: point and route forecast resolution over a shared cache.
///
/// Create an instance with [`Routecast::new()`] to use weather.gov and a file
/// cache in the default OS cache directory, with
/// [`Routecast::with_cache_folder()`] for a custom cache location, or with
/// [`Routecast::from_parts()`] to plug in your own providers, store and clock.
///
/// Route lookups need a [`RouteProvider`]; the engine does not ship one.
///
/// # Examples
///
/// ```rust,no_run
/// # use routecast::{Routecast, RoutecastError, RouteProvider};
/// # use std::sync::Arc;
/// # async fn run(route_provider: Arc<dyn RouteProvider>) -> Result<(), RoutecastError> {
/// let engine = Routecast::new(route_provider).await?;
/// // Now you can resolve point and route forecasts
/// # Ok(())
/// # }
/// ```
pub struct Routecast {
    resolver: Arc<PointForecastResolver>,
    aggregator: RouteAggregator,
    route_provider: Arc<dyn RouteProvider>,
    sampler: RouteSampler,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

#[bon]
impl Routecast {
    /// Assembles an engine from its parts.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.forecast_provider(Arc<dyn ForecastProvider>)`: **Required.** Upstream point forecasts.
    /// * `.route_provider(Arc<dyn RouteProvider>)`: **Required.** Upstream routes.
    /// * `.store(Arc<dyn KeyValueStore>)`: **Required.** Backing store for cached documents.
    /// * `.config(EngineConfig)`: Optional. Defaults to [`EngineConfig::default()`].
    /// * `.clock(Arc<dyn Clock>)`: Optional. Defaults to [`SystemClock`].
    ///
    /// # Errors
    ///
    /// Returns [`RoutecastError::InvalidInput`] if the configuration fails
    /// [`EngineConfig::validate`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use routecast::{Routecast, RoutecastError, EngineConfig, MemoryStore};
    /// # use routecast::{ForecastProvider, RouteProvider};
    /// # use std::sync::Arc;
    /// # fn run(
    /// #     forecasts: Arc<dyn ForecastProvider>,
    /// #     routes: Arc<dyn RouteProvider>,
    /// # ) -> Result<(), RoutecastError> {
    /// let engine = Routecast::from_parts()
    ///     .forecast_provider(forecasts)
    ///     .route_provider(routes)
    ///     .store(Arc::new(MemoryStore::new()))
    ///     .config(EngineConfig::builder().max_concurrent_fetches(8).build())
    ///     .call()?;
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub fn from_parts(
        forecast_provider: Arc<dyn ForecastProvider>,
        route_provider: Arc<dyn RouteProvider>,
        store: Arc<dyn KeyValueStore>,
        config: Option<EngineConfig>,
        clock: Option<Arc<dyn Clock>>,
    ) -> Result<Self, RoutecastError> {
        let config = config.unwrap_or_default();
        config.validate()?;
        let clock = clock.unwrap_or_else(|| Arc::new(SystemClock));

        let resolver = Arc::new(PointForecastResolver::new(
            CacheStore::new(store),
            forecast_provider,
            clock.clone(),
            &config,
        ));
        Ok(Self {
            aggregator: RouteAggregator::new(resolver.clone(), &config),
            sampler: RouteSampler::new(config.route_spacing),
            resolver,
            route_provider,
            clock,
            config,
        })
    }

    /// Creates an engine backed by weather.gov and a file cache in `cache_folder`.
    ///
    /// # Arguments
    ///
    /// * `cache_folder` - Directory for cached forecast documents. It is created
    ///                    if it doesn't exist.
    /// * `route_provider` - Upstream source of routes.
    ///
    /// # Errors
    ///
    /// Returns [`RoutecastError::CacheDirCreation`] if the directory cannot be created,
    /// [`RoutecastError::CacheStore`] if the store cannot be opened, and
    /// [`RoutecastError::ProviderSetup`] if the HTTP client cannot be built.
    pub async fn with_cache_folder(
        cache_folder: PathBuf,
        route_provider: Arc<dyn RouteProvider>,
    ) -> Result<Self, RoutecastError> {
        ensure_cache_dir_exists(&cache_folder)
            .await
            .map_err(|e| RoutecastError::CacheDirCreation(cache_folder.clone(), e))?;
        let store = FileStore::open(&cache_folder).await?;
        info!("Using forecast cache at {}", cache_folder.display());

        Self::from_parts()
            .forecast_provider(Arc::new(NwsForecastProvider::new()?))
            .route_provider(route_provider)
            .store(Arc::new(store))
            .call()
    }

    /// Creates an engine using the default cache directory
    /// (e.g. `~/.cache/routecast_cache` on Linux).
    ///
    /// # Errors
    ///
    /// Returns [`RoutecastError::CacheDirResolution`] if the default cache directory
    /// cannot be found, plus everything [`Routecast::with_cache_folder`] returns.
    pub async fn new(route_provider: Arc<dyn RouteProvider>) -> Result<Self, RoutecastError> {
        let cache_folder = get_cache_dir().map_err(RoutecastError::CacheDirResolution)?;
        Self::with_cache_folder(cache_folder, route_provider).await
    }

    /// Resolves the forecast period covering a coordinate at a time.
    ///
    /// The cache is consulted first. On a miss, concurrent callers whose
    /// coordinate and time fall in the same geocell and time bucket share one
    /// upstream fetch.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.location(Coordinate)`: **Required.** The point to resolve.
    /// * `.time(DateTime<Utc>)`: Optional. Defaults to now.
    ///
    /// # Errors
    ///
    /// Returns [`RoutecastError::ForecastUnavailable`] if the provider fails,
    /// times out, or has no period covering or following `time`.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use routecast::{Routecast, RoutecastError, Coordinate};
    /// # async fn run(engine: Routecast) -> Result<(), RoutecastError> {
    /// let denver = Coordinate::new(39.7392, -104.9903)?;
    /// let period = engine.resolve_point().location(denver).call().await?;
    /// println!("{}: {:.1}°C, {}", denver, period.temperature_c, period.summary);
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn resolve_point(
        &self,
        location: Coordinate,
        time: Option<DateTime<Utc>>,
    ) -> Result<ForecastPeriod, RoutecastError> {
        let time = time.unwrap_or_else(|| self.clock.now());
        Ok(self.resolver.resolve(location, time).await?)
    }

    /// Resolves weather along the route between two coordinates.
    ///
    /// The route is sampled with the configured spacing policy, every sample
    /// is resolved at its estimated arrival time with bounded concurrency, and
    /// the outcomes are reduced into a [`RouteWeatherSummary`]. Failed samples
    /// do not fail the call; check [`RouteWeatherSummary::degraded`].
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.origin(Coordinate)`: **Required.**
    /// * `.destination(Coordinate)`: **Required.**
    /// * `.departure_time(DateTime<Utc>)`: Optional. Defaults to now.
    ///
    /// # Errors
    ///
    /// Returns [`RoutecastError::RouteUnavailable`] if the route provider fails.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use routecast::{Routecast, RoutecastError, Coordinate};
    /// # async fn run(engine: Routecast) -> Result<(), RoutecastError> {
    /// let summary = engine
    ///     .resolve_route()
    ///     .origin(Coordinate::new(39.7392, -104.9903)?)
    ///     .destination(Coordinate::new(40.0150, -105.2705)?)
    ///     .call()
    ///     .await?;
    /// if summary.flags.precipitation_risk {
    ///     println!("Pack a rain jacket");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn resolve_route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        departure_time: Option<DateTime<Utc>>,
    ) -> Result<RouteWeatherSummary, RoutecastError> {
        let departure_time = departure_time.unwrap_or_else(|| self.clock.now());
        let route = self.route_provider.route(origin, destination).await?;
        let samples = self.sampler.sample(&route, departure_time);
        info!(
            "Resolving {} samples along a {}-point route from {} to {}",
            samples.len(),
            route.len(),
            origin,
            destination
        );
        Ok(self.aggregator.aggregate(&samples).await)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Drops every in-flight fetch record. Callers still awaiting a fetch keep
    /// their result; later callers start a new fetch.
    pub fn shutdown(&self) {
        info!(
            "Shutting down, dropping {} in-flight fetches",
            self.resolver.in_flight_len()
        );
        self.resolver.drain();
    }
}
