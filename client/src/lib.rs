pub mod api;
pub mod biometric;
pub mod config;
pub mod device;
pub mod error;
pub mod location;
pub mod router;
pub mod session;
pub mod state;
pub mod utils;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use error::{ClientError, Notice};
pub use router::Destination;
pub use session::Session;
