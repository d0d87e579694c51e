pub mod command;
pub mod error;
pub mod protocol;

pub use command::{Command, PointerAction, Target, TouchAction};
pub use error::{AgentError, ResolutionFailure};
pub use protocol::{ElementId, Request, Response};
