//! Selector Resolution
//!
//! Turns a path-query selector into registered element ids. The registry's
//! selector cache is consulted first; only a cache miss evaluates the query
//! against the document.

use crate::host::{Document, HostError};
use crate::registry::ElementRegistry;
use screening_common::{AgentError, ElementId};
use tracing::debug;

/// Resolves selectors against one document, registering what it finds.
pub struct SelectorResolver<'a> {
    registry: &'a mut ElementRegistry,
    document: &'a dyn Document,
}

impl<'a> SelectorResolver<'a> {
    pub fn new(registry: &'a mut ElementRegistry, document: &'a dyn Document) -> Self {
        Self { registry, document }
    }

    /// Returns the ids for `selector` in document order.
    ///
    /// A cache hit returns the previously issued ids without querying the
    /// document, even if the DOM has changed since.
    pub fn resolve(&mut self, selector: &str) -> Result<Vec<ElementId>, AgentError> {
        let cached = self.registry.ids_for_selector(selector);
        if !cached.is_empty() {
            debug!(selector, count = cached.len(), "selector cache hit");
            return Ok(cached.to_vec());
        }

        let nodes = self.document.evaluate(selector).map_err(|e| match e {
            HostError::InvalidSelector(reason) => AgentError::evaluation_failed(selector, reason),
            other => AgentError::evaluation_failed(selector, other.to_string()),
        })?;

        if nodes.is_empty() {
            return Err(AgentError::no_match(selector));
        }

        Ok(nodes
            .into_iter()
            .map(|node| self.registry.add_element(selector, node))
            .collect())
    }
}
