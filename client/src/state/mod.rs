pub mod admin;
pub mod attendance;
pub mod auth;
pub mod elapsed;
pub mod profile;
