use crate::forecast::error::ProviderError;
use crate::types::coordinate::Coordinate;
use crate::types::forecast::ForecastDocument;
use async_trait::async_trait;

/// An upstream source of forecast documents.
///
/// Implementations normalize their response into a [`ForecastDocument`] and
/// reject malformed documents with [`ProviderError::Malformed`] rather than
/// passing loosely-typed data inward.
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    async fn fetch(&self, coordinate: Coordinate) -> Result<ForecastDocument, ProviderError>;
}
