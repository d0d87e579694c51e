//! Host platform abstraction.
//!
//! The agent never talks to a DOM directly. Everything it needs from the page
//! goes through these traits so the same dispatcher runs against a live
//! browser document (`wasm` module) or the in-memory page used by the native
//! runner and tests (`memory` module).

use crate::events::SyntheticEvent;
use async_trait::async_trait;
use screening_common::AgentError;
use serde_json::Value;
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;

/// Live reference to a node owned by the host.
pub type ElementHandle = Rc<dyn Element>;

/// Failures raised by host bindings.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HostError {
    /// The node was removed from its document.
    #[error("node is no longer attached to the document")]
    Detached,

    /// The path query was rejected by the platform.
    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("not supported: {0}")]
    Unsupported(String),

    /// Script evaluation threw.
    #[error("{0}")]
    Script(String),

    #[error("{0}")]
    Platform(String),
}

impl From<HostError> for AgentError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::Script(message) => AgentError::ScriptError(message),
            other => AgentError::Host(other.to_string()),
        }
    }
}

/// The page document plus the window-level state around it.
pub trait Document {
    /// Evaluate a node-set path query, returning matches in document order.
    fn evaluate(&self, selector: &str) -> Result<Vec<ElementHandle>, HostError>;

    /// Hit test at client coordinates, falling back to the document element.
    fn element_at(&self, x: f64, y: f64) -> Result<Option<ElementHandle>, HostError>;

    fn title(&self) -> Result<String, HostError>;

    fn source(&self) -> Result<String, HostError>;

    fn scroll(&self) -> Result<(f64, f64), HostError>;

    fn set_scroll(&self, x: f64, y: f64) -> Result<(), HostError>;

    fn window_size(&self) -> Result<(f64, f64), HostError>;

    fn navigate(&self, url: &str) -> Result<(), HostError>;

    fn reload(&self) -> Result<(), HostError>;

    /// Evaluate arbitrary script text in the page context.
    fn execute_script(&self, script: &str, args: &[Value]) -> Result<Value, HostError>;
}

/// A DOM element as seen by the agent.
pub trait Element {
    fn tag_name(&self) -> Result<String, HostError>;

    fn attribute(&self, name: &str) -> Result<Option<String>, HostError>;

    fn set_attribute(&self, name: &str, value: &str) -> Result<(), HostError>;

    /// Rendered text, or text content where the platform has no rendering.
    fn inner_text(&self) -> Result<String, HostError>;

    fn value(&self) -> Result<String, HostError>;

    fn set_value(&self, value: &str) -> Result<(), HostError>;

    fn scroll(&self) -> Result<(f64, f64), HostError>;

    fn set_scroll(&self, x: f64, y: f64) -> Result<(), HostError>;

    fn selected_index(&self) -> Result<i32, HostError>;

    fn set_selected_index(&self, index: i32) -> Result<(), HostError>;

    /// Values of the control's options, in order.
    fn option_values(&self) -> Result<Vec<String>, HostError>;

    /// One computed property, or the whole declaration as an object.
    fn computed_style(&self, property: Option<&str>) -> Result<Value, HostError>;

    fn is_disabled(&self) -> Result<bool, HostError>;

    fn is_focused(&self) -> Result<bool, HostError>;

    fn focus(&self) -> Result<(), HostError>;

    /// Dispatch a synthetic event; returns false if a listener cancelled it.
    fn dispatch(&self, event: &SyntheticEvent) -> Result<bool, HostError>;

    fn component(&self) -> Result<Option<Rc<dyn Component>>, HostError>;
}

/// Capabilities of a UI component attached to an element.
pub trait Component {
    fn object_name(&self) -> Result<String, HostError>;

    fn module_id(&self) -> Result<String, HostError>;

    fn get_property(&self, name: &str) -> Result<Value, HostError>;

    fn set_property(&self, name: &str, value: Value) -> Result<(), HostError>;

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, HostError>;
}

/// Timer primitives of the page's event loop.
#[async_trait(?Send)]
pub trait Scheduler {
    /// Monotonic time since the scheduler was created.
    fn now(&self) -> Duration;

    /// Yield to the event loop for `duration`.
    async fn sleep(&self, duration: Duration);

    /// Run `task` once after `delay`, without blocking the caller.
    ///
    /// Fails when the event loop cannot take timer work; `task` is then dropped unrun.
    fn defer(&self, delay: Duration, task: Box<dyn FnOnce()>) -> Result<(), HostError>;
}
