use crate::route::error::RouteProviderError;
use crate::types::coordinate::Coordinate;
use crate::types::route::Route;
use async_trait::async_trait;

/// An upstream source of routes between two coordinates.
///
/// Implementations typically decode provider polylines with
/// [`crate::route::polyline::decode`] and assemble steps with
/// [`Route::from_steps`].
#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<Route, RouteProviderError>;
}
