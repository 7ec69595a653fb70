//! Normalized forecast data as handed from a provider adapter to the core.
//!
//! Providers translate their own response shapes into these types once, at the
//! boundary. Everything past that point works with strict, typed periods.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wind conditions for a forecast period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    /// Sustained wind speed in km/h.
    pub speed_kph: f64,
    /// Gust speed in km/h, if the provider reports one.
    pub gust_kph: Option<f64>,
    /// Compass direction the wind blows from (e.g. "NW"), if known.
    pub direction: Option<String>,
}

/// A single forecast interval, `[valid_from, valid_to)`.
///
/// Immutable once constructed from provider data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPeriod {
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    /// Air temperature in degrees Celsius.
    pub temperature_c: f64,
    /// Probability of precipitation, `0.0..=100.0`.
    pub precipitation_probability_pct: f64,
    pub wind: Wind,
    /// Short human-readable description, e.g. "Chance Rain Showers".
    pub summary: String,
}

impl ForecastPeriod {
    /// Whether `time` falls inside `[valid_from, valid_to)`.
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.valid_from <= time && time < self.valid_to
    }
}

/// A full forecast document for one location, as cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDocument {
    /// Periods ordered by `valid_from`.
    pub periods: Vec<ForecastPeriod>,
}

impl ForecastDocument {
    /// Builds a document, sorting periods by start time.
    pub fn new(mut periods: Vec<ForecastPeriod>) -> Self {
        periods.sort_by_key(|p| p.valid_from);
        Self { periods }
    }

    /// Selects the period covering `target`, or the nearest period that starts
    /// after it when none covers it exactly.
    pub fn period_at(&self, target: DateTime<Utc>) -> Option<&ForecastPeriod> {
        self.periods.iter().find(|p| p.contains(target)).or_else(|| {
            self.periods
                .iter()
                .filter(|p| p.valid_from > target)
                .min_by_key(|p| p.valid_from)
        })
    }
}
