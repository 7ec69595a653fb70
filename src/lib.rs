mod cache;
mod clock;
mod config;
mod error;
mod forecast;
mod route;
mod routecast;
mod types;
mod utils;

#[cfg(test)]
mod testing;

pub use error::{InvalidInputError, RoutecastError};
pub use routecast::*;

pub use config::{EngineConfig, MAX_GEOCELL_PRECISION};
pub use clock::{Clock, ManualClock, SystemClock};

pub use types::coordinate::Coordinate;
pub use types::forecast::{ForecastDocument, ForecastPeriod, Wind};
pub use types::route::{Route, RouteSample, RouteStep, SpacingPolicy};
pub use types::summary::{RouteFlags, RouteWeatherSummary, SampleForecast, TemperatureRange};

pub use cache::adapter::{CacheEntry, CacheStore};
pub use cache::error::StoreError;
pub use cache::file_store::FileStore;
pub use cache::key::{CacheKey, GeocellIndexer};
pub use cache::store::{KeyValueStore, MemoryStore};

pub use forecast::error::{ForecastUnavailable, ProviderError, UnavailableReason};
pub use forecast::nws::NwsForecastProvider;
pub use forecast::provider::ForecastProvider;
pub use forecast::resolver::PointForecastResolver;
pub use forecast::singleflight::Singleflight;

pub use route::aggregator::RouteAggregator;
pub use route::error::RouteProviderError;
pub use route::polyline;
pub use route::provider::RouteProvider;
pub use route::reducer::{Gear, GearSuggester, RouteReducer, ThresholdReducer};
pub use route::sampler::RouteSampler;
