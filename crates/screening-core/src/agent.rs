use crate::config::AgentConfig;
use crate::host::{Document, ElementHandle, Scheduler};
use crate::registry::ElementRegistry;
use crate::resolution::SelectorResolver;
use futures::FutureExt;
use screening_common::{AgentError, Command, ElementId, Request, Response, Target};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::panic::AssertUnwindSafe;
use std::rc::Rc;
use tracing::{debug, error};

/// Last pointer location, in client coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MousePosition {
    pub x: f64,
    pub y: f64,
}

/// The in-page agent for one session.
///
/// Owns the element registry and the mouse position. All state lives on the
/// page's single event loop, hence `Rc`/`RefCell` rather than locks. Borrows
/// of the registry are never held across an await point.
pub struct Agent {
    pub(crate) document: Rc<dyn Document>,
    pub(crate) scheduler: Rc<dyn Scheduler>,
    pub(crate) config: AgentConfig,
    registry: RefCell<ElementRegistry>,
    mouse: Cell<MousePosition>,
}

impl Agent {
    pub fn new(document: Rc<dyn Document>, scheduler: Rc<dyn Scheduler>) -> Self {
        Self::with_config(document, scheduler, AgentConfig::default())
    }

    pub fn with_config(
        document: Rc<dyn Document>,
        scheduler: Rc<dyn Scheduler>,
        config: AgentConfig,
    ) -> Self {
        Self {
            document,
            scheduler,
            config,
            registry: RefCell::new(ElementRegistry::new()),
            mouse: Cell::new(MousePosition::default()),
        }
    }

    /// Handle one inbound request, always producing exactly one response.
    ///
    /// Panics raised by host bindings are caught here and reported as host
    /// errors for this request instead of tearing down the page.
    pub async fn handle(&self, request: Request) -> Response {
        let id = request.id;
        let outcome = AssertUnwindSafe(self.dispatch(request))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unexpected host failure".to_string());
                error!(request = id, %message, "command handler panicked");
                Err(AgentError::Host(message))
            });
        Response::from_result(id, outcome)
    }

    async fn dispatch(&self, request: Request) -> Result<Vec<Value>, AgentError> {
        let command = Command::parse(&request.command, request.args)?;
        debug!(request = request.id, command = command.name(), "dispatching");
        self.execute(command).await
    }

    /// Resolve a selector to ids, registering newly matched nodes.
    pub fn resolve(&self, selector: &str) -> Result<Vec<ElementId>, AgentError> {
        let mut registry = self.registry.borrow_mut();
        SelectorResolver::new(&mut registry, self.document.as_ref()).resolve(selector)
    }

    pub fn element(&self, id: ElementId) -> Result<ElementHandle, AgentError> {
        self.registry.borrow().get_element(id)
    }

    /// Look up a command target, resolving the legacy selector form to its first id.
    pub(crate) fn target(&self, target: &Target) -> Result<(ElementId, ElementHandle), AgentError> {
        let id = match target {
            Target::Id(id) => *id,
            Target::Selector(selector) => self
                .resolve(selector)?
                .first()
                .copied()
                .ok_or_else(|| AgentError::no_match(selector.as_str()))?,
        };
        Ok((id, self.element(id)?))
    }

    pub fn mouse_position(&self) -> MousePosition {
        self.mouse.get()
    }

    pub(crate) fn set_mouse_position(&self, x: f64, y: f64) {
        self.mouse.set(MousePosition { x, y });
    }

    pub fn registered_elements(&self) -> usize {
        self.registry.borrow().len()
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}
