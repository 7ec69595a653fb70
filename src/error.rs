use crate::cache::error::StoreError;
use crate::forecast::error::{ForecastUnavailable, ProviderError};
use crate::route::error::RouteProviderError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoutecastError {
    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),

    #[error(transparent)]
    ForecastUnavailable(#[from] ForecastUnavailable),

    #[error("Route unavailable")]
    RouteUnavailable(#[from] RouteProviderError),

    #[error("Failed to set up forecast provider")]
    ProviderSetup(#[from] ProviderError),

    #[error("Failed to open cache store")]
    CacheStore(#[from] StoreError),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine cache directory")]
    CacheDirResolution(#[source] std::io::Error),
}

/// Rejected caller input: coordinates, times or configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInputError {
    #[error("Latitude {0} is outside -90..=90")]
    Latitude(f64),

    #[error("Longitude {0} is outside -180..=180")]
    Longitude(f64),

    #[error("Invalid configuration value for '{field}': {reason}")]
    Config { field: &'static str, reason: String },
}
