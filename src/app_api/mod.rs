// Local control API over the application context

pub mod models;
pub mod routes;
pub mod services;

pub use routes::AbsPlayerApi;
