use crate::types::coordinate::Coordinate;
use thiserror::Error;

/// Failure reported by a route provider. Fatal for a route request: without a
/// route there are no samples to look up.
#[derive(Debug, Error)]
pub enum RouteProviderError {
    #[error("No route found from {origin} to {destination}")]
    NoRoute {
        origin: Coordinate,
        destination: Coordinate,
    },

    #[error("Route provider network request failed: {0}")]
    Network(String),

    #[error("Malformed route: {0}")]
    Malformed(String),
}
