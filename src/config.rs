//! Engine configuration.
//!
//! Every option has a documented default. Build in code with
//! [`EngineConfig::builder`] or deserialize from JSON; missing fields fall back
//! to their defaults.
//!
//! ```
//! use routecast::EngineConfig;
//! use std::time::Duration;
//!
//! let config = EngineConfig::builder()
//!     .cache_ttl(Duration::from_secs(30 * 60))
//!     .max_concurrent_fetches(8)
//!     .build();
//! assert!(config.validate().is_ok());
//! assert_eq!(config.geocell_precision, 2);
//! ```

use crate::error::InvalidInputError;
use crate::types::route::SpacingPolicy;
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Finest geocell precision; coordinates themselves are stored in microdegrees.
pub const MAX_GEOCELL_PRECISION: u8 = 6;

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long a cached forecast document stays valid. Defaults to 1 hour,
    /// in line with how often upstream forecasts are refreshed.
    #[builder(default = Duration::from_secs(60 * 60))]
    pub cache_ttl: Duration,

    /// Decimal digits kept when rounding coordinates into a geocell.
    /// Defaults to 2 (about 1.1 km of latitude).
    #[builder(default = 2)]
    pub geocell_precision: u8,

    /// Width of the time bucket that request times are floored to.
    /// Defaults to 1 hour.
    #[builder(default = Duration::from_secs(60 * 60))]
    pub time_bucket_width: Duration,

    #[builder(default)]
    pub route_spacing: SpacingPolicy,

    /// Upper bound on concurrent point lookups for one engine. Defaults to 4.
    #[builder(default = 4)]
    pub max_concurrent_fetches: usize,

    /// Route summaries below this success fraction are flagged degraded.
    /// Defaults to 0.5.
    #[builder(default = 0.5)]
    pub min_completeness_ratio: f64,

    /// Timeout for a single upstream forecast fetch. Defaults to 10 seconds.
    #[builder(default = Duration::from_secs(10))]
    pub fetch_timeout: Duration,

    /// Optional deadline for the whole route fan-out. Samples that have not
    /// completed by then are recorded as failures.
    pub route_timeout: Option<Duration>,

    /// Precipitation probability (percent) above which a route is flagged
    /// as at risk of precipitation. Defaults to 50.
    #[builder(default = 50.0)]
    pub precipitation_threshold_pct: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), InvalidInputError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> InvalidInputError {
            InvalidInputError::Config {
                field,
                reason: reason.into(),
            }
        }

        if self.cache_ttl.is_zero() {
            return Err(invalid("cache_ttl", "must be greater than zero"));
        }
        if self.geocell_precision > MAX_GEOCELL_PRECISION {
            return Err(invalid(
                "geocell_precision",
                format!("must be at most {MAX_GEOCELL_PRECISION}"),
            ));
        }
        if self.time_bucket_width.as_secs() == 0 {
            return Err(invalid("time_bucket_width", "must be at least one second"));
        }
        let spacing = &self.route_spacing;
        if !spacing.max_distance_km.is_finite() || spacing.max_distance_km <= 0.0 {
            return Err(invalid(
                "route_spacing.max_distance_km",
                "must be a positive number",
            ));
        }
        if spacing.max_time_delta.is_zero() {
            return Err(invalid(
                "route_spacing.max_time_delta",
                "must be greater than zero",
            ));
        }
        if self.max_concurrent_fetches == 0 {
            return Err(invalid("max_concurrent_fetches", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.min_completeness_ratio) {
            return Err(invalid("min_completeness_ratio", "must be within 0..=1"));
        }
        if self.fetch_timeout.is_zero() {
            return Err(invalid("fetch_timeout", "must be greater than zero"));
        }
        if self.route_timeout.is_some_and(|t| t.is_zero()) {
            return Err(invalid("route_timeout", "must be greater than zero"));
        }
        if !(0.0..=100.0).contains(&self.precipitation_threshold_pct) {
            return Err(invalid(
                "precipitation_threshold_pct",
                "must be within 0..=100",
            ));
        }
        Ok(())
    }
}
