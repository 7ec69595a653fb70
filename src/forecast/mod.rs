pub mod error;
pub mod nws;
pub mod provider;
pub mod resolver;
pub mod singleflight;
