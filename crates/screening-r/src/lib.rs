pub mod config;
pub mod server;
pub mod session;

pub use config::{ConfigError, ConfigLoader};
pub use server::{ControlHandle, ControlServer};
pub use session::TransportError;
