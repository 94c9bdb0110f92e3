pub mod library;
pub mod player;
pub mod session;
