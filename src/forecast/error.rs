use crate::types::coordinate::Coordinate;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a forecast provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Rate limited by {url} (retry after {retry_after_secs:?}s)")]
    RateLimited {
        url: String,
        retry_after_secs: Option<u64>,
    },

    #[error("Malformed forecast document: {0}")]
    Malformed(String),

    #[error("Forecast provider failed: {0}")]
    Other(String),
}

/// Why a forecast could not be produced for a point.
///
/// Cloneable so that one upstream failure can be handed to every caller that
/// joined the same in-flight fetch.
#[derive(Debug, Clone, Error)]
pub enum UnavailableReason {
    #[error("upstream provider failed")]
    Provider(#[source] Arc<ProviderError>),

    #[error("upstream fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("no forecast period covers or follows {0}")]
    NoMatchingPeriod(DateTime<Utc>),

    #[error("route deadline passed before this point was resolved")]
    RouteDeadline,
}

#[derive(Debug, Clone, Error)]
#[error("Forecast unavailable at {coordinate}")]
pub struct ForecastUnavailable {
    pub coordinate: Coordinate,
    #[source]
    pub reason: UnavailableReason,
}

impl ForecastUnavailable {
    pub fn new(coordinate: Coordinate, reason: UnavailableReason) -> Self {
        Self { coordinate, reason }
    }
}
