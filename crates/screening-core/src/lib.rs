pub mod agent;
pub mod config;
pub mod dispatcher;
pub mod events;
pub mod host;
pub mod memory;
pub mod registry;
pub mod resolution;
pub mod session;
pub mod wait;

#[cfg(not(target_arch = "wasm32"))]
pub mod runtime;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use agent::{Agent, MousePosition};
pub use config::{AgentConfig, LoggingConfig, ScreeningConfig, TransportConfig};
pub use host::{Component, Document, Element, ElementHandle, HostError, Scheduler};
pub use registry::ElementRegistry;
pub use session::{SessionGuard, endpoint_url, initialize, serve};

#[cfg(not(target_arch = "wasm32"))]
pub use runtime::TokioScheduler;
