//! Route-level weather summaries.

use crate::forecast::error::ForecastUnavailable;
use crate::route::reducer::RouteReducer;
use crate::types::forecast::ForecastPeriod;
use crate::types::route::RouteSample;
use serde::{Deserialize, Serialize};

/// The outcome of the forecast lookup for one route sample.
#[derive(Debug, Clone)]
pub struct SampleForecast {
    pub sample: RouteSample,
    pub outcome: Result<ForecastPeriod, ForecastUnavailable>,
}

impl SampleForecast {
    pub fn forecast(&self) -> Option<&ForecastPeriod> {
        self.outcome.as_ref().ok()
    }
}

/// Inclusive temperature range in degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRange {
    pub min_c: f64,
    pub max_c: f64,
}

/// Aggregate flags computed over the successful samples of a route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteFlags {
    /// Any successful sample has precipitation probability above the threshold.
    pub precipitation_risk: bool,
    /// Highest sustained wind along the route, in km/h.
    pub max_wind_kph: Option<f64>,
    /// Highest gust along the route, in km/h.
    pub max_gust_kph: Option<f64>,
    pub temperature_range: Option<TemperatureRange>,
}

/// Weather along a route, built fresh for each request and never cached as a unit.
///
/// `samples` keeps the sampler's order regardless of the order in which the
/// underlying lookups completed.
#[derive(Debug, Clone)]
pub struct RouteWeatherSummary {
    pub samples: Vec<SampleForecast>,
    pub flags: RouteFlags,
    /// `successes / total`, exactly.
    pub completeness: f64,
    /// Set when `completeness` is below the configured minimum. A degraded
    /// summary is still a successful result.
    pub degraded: bool,
}

impl RouteWeatherSummary {
    pub fn successes(&self) -> usize {
        self.samples.iter().filter(|s| s.outcome.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &SampleForecast> {
        self.samples.iter().filter(|s| s.outcome.is_err())
    }

    /// Runs an additional reduction over the per-sample outcomes.
    pub fn reduce<R: RouteReducer>(&self, reducer: &R) -> R::Output {
        reducer.reduce(&self.samples)
    }
}
