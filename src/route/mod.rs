pub mod aggregator;
pub mod error;
pub mod polyline;
pub mod provider;
pub mod reducer;
pub mod sampler;
