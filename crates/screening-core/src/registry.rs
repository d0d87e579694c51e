use crate::host::ElementHandle;
use screening_common::{AgentError, ElementId};
use std::collections::HashMap;
use tracing::debug;

/// Arena of resolved elements plus the selector cache.
///
/// The arena index is the [`ElementId`]. Entries are never removed, so an id
/// keeps pointing at the node it was issued for even after that node leaves the
/// document. The selector index is append-only and is not invalidated on DOM
/// mutation: a cached selector keeps answering with the ids it produced first.
#[derive(Default)]
pub struct ElementRegistry {
    elements: Vec<ElementHandle>,
    by_selector: HashMap<String, Vec<ElementId>>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `node` under the next unused id and index it under `selector`.
    pub fn add_element(&mut self, selector: &str, node: ElementHandle) -> ElementId {
        let id = ElementId(self.elements.len() as u32);
        self.elements.push(node);
        self.by_selector
            .entry(selector.to_string())
            .or_default()
            .push(id);
        debug!(%id, selector, "registered element");
        id
    }

    pub fn get_element(&self, id: ElementId) -> Result<ElementHandle, AgentError> {
        self.elements
            .get(id.index())
            .cloned()
            .ok_or(AgentError::ElementNotFound { id })
    }

    /// Ids previously produced for this exact selector string.
    pub fn ids_for_selector(&self, selector: &str) -> &[ElementId] {
        self.by_selector
            .get(selector)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
