pub mod adapter;
pub mod error;
pub mod file_store;
pub mod key;
pub mod store;
