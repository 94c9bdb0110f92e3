pub mod home;
pub mod mapping;
pub mod models;
