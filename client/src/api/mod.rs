mod admin;
mod attendance;
mod auth;
pub mod client;
mod device;
pub mod types;

pub use client::*;
pub use types::*;

#[cfg(test)]
pub mod test_support;
