pub mod coordinate;
pub mod forecast;
pub mod route;
pub mod summary;
