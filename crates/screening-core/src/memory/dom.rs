use super::component::MemoryComponent;
use super::fixture::{NodeSpec, PageFixture, Rect};
use super::xpath::{self, NodeKey, Tree};
use crate::events::SyntheticEvent;
use crate::host::{Component, Document, Element, ElementHandle, HostError};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

const DOCUMENT: NodeKey = 0;

type ScriptHandler = Rc<dyn Fn(&[Value]) -> Result<Value, String>>;

struct NodeData {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    value: String,
    children: Vec<NodeKey>,
    parent: Option<NodeKey>,
    scroll: (f64, f64),
    selected_index: i32,
    style: BTreeMap<String, String>,
    rect: Option<Rect>,
    component: Option<Rc<MemoryComponent>>,
    events: Vec<SyntheticEvent>,
}

impl NodeData {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            text: String::new(),
            value: String::new(),
            children: Vec::new(),
            parent: None,
            scroll: (0.0, 0.0),
            selected_index: -1,
            style: BTreeMap::new(),
            rect: None,
            component: None,
            events: Vec::new(),
        }
    }
}

struct PageState {
    nodes: Vec<NodeData>,
    title: String,
    url: String,
    scroll: (f64, f64),
    window_size: (f64, f64),
    focused: Option<NodeKey>,
    navigations: Vec<String>,
    reloads: usize,
    scripts: HashMap<String, ScriptHandler>,
}

impl PageState {
    fn is_attached(&self, mut node: NodeKey) -> bool {
        while node != DOCUMENT {
            match self.nodes[node].parent {
                Some(parent) => node = parent,
                None => return false,
            }
        }
        true
    }

    fn attached(&self, node: NodeKey) -> Result<&NodeData, HostError> {
        if self.is_attached(node) {
            Ok(&self.nodes[node])
        } else {
            Err(HostError::Detached)
        }
    }

    fn attached_mut(&mut self, node: NodeKey) -> Result<&mut NodeData, HostError> {
        if self.is_attached(node) {
            Ok(&mut self.nodes[node])
        } else {
            Err(HostError::Detached)
        }
    }

    fn option_values(&self, node: NodeKey) -> Vec<String> {
        self.nodes[node]
            .children
            .iter()
            .filter(|&&child| self.nodes[child].tag == "option")
            .map(|&child| {
                let option = &self.nodes[child];
                option
                    .attributes
                    .get("value")
                    .cloned()
                    .unwrap_or_else(|| option.text.clone())
            })
            .collect()
    }

    fn document_element(&self) -> Option<NodeKey> {
        self.nodes[DOCUMENT].children.first().copied()
    }

    fn write_markup(&self, node: NodeKey, out: &mut String) {
        let data = &self.nodes[node];
        out.push('<');
        out.push_str(&data.tag);
        for (name, value) in &data.attributes {
            out.push_str(&format!(" {}=\"{}\"", name, value.replace('"', "&quot;")));
        }
        out.push('>');
        out.push_str(&data.text);
        for &child in &data.children {
            self.write_markup(child, out);
        }
        out.push_str(&format!("</{}>", data.tag));
    }
}

impl Tree for PageState {
    fn children(&self, node: NodeKey) -> &[NodeKey] {
        &self.nodes[node].children
    }

    fn tag(&self, node: NodeKey) -> &str {
        &self.nodes[node].tag
    }

    fn attribute(&self, node: NodeKey, name: &str) -> Option<&str> {
        self.nodes[node].attributes.get(name).map(String::as_str)
    }

    fn own_text(&self, node: NodeKey) -> &str {
        &self.nodes[node].text
    }

    fn string_value(&self, node: NodeKey) -> String {
        let mut text = self.nodes[node].text.clone();
        for &child in &self.nodes[node].children {
            text.push_str(&self.string_value(child));
        }
        text
    }
}

/// A page held entirely in memory.
///
/// Cloning shares the same page. Every dispatched event is recorded on its
/// target so callers can inspect what the agent produced.
#[derive(Clone)]
pub struct MemoryPage {
    state: Rc<RefCell<PageState>>,
}

impl MemoryPage {
    /// An empty `html > (head, body)` document.
    pub fn new(title: &str) -> Self {
        let page = Self {
            state: Rc::new(RefCell::new(PageState {
                nodes: vec![NodeData::new("#document")],
                title: title.to_string(),
                url: "about:blank".to_string(),
                scroll: (0.0, 0.0),
                window_size: (1024.0, 768.0),
                focused: None,
                navigations: Vec::new(),
                reloads: 0,
                scripts: HashMap::new(),
            })),
        };
        let html = page.insert(DOCUMENT, &NodeSpec::new("html"));
        page.insert(html, &NodeSpec::new("head"));
        page.insert(html, &NodeSpec::new("body"));
        page
    }

    pub fn from_fixture(fixture: &PageFixture) -> Self {
        let page = Self::new(&fixture.title);
        {
            let mut state = page.state.borrow_mut();
            if let Some(url) = &fixture.url {
                state.url = url.clone();
            }
            if let Some((width, height)) = fixture.window {
                state.window_size = (width, height);
            }
        }
        let body = page.body();
        for spec in &fixture.body {
            page.append(body, spec);
        }
        page
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let fixture: PageFixture = serde_json::from_str(json)?;
        Ok(Self::from_fixture(&fixture))
    }

    pub fn body(&self) -> NodeKey {
        let state = self.state.borrow();
        let html = state.document_element().unwrap_or(DOCUMENT);
        state.nodes[html]
            .children
            .iter()
            .copied()
            .find(|&child| state.nodes[child].tag == "body")
            .unwrap_or(html)
    }

    /// Append `spec` (and its children) under `parent`.
    pub fn append(&self, parent: NodeKey, spec: &NodeSpec) -> NodeKey {
        self.insert(parent, spec)
    }

    fn insert(&self, parent: NodeKey, spec: &NodeSpec) -> NodeKey {
        let key = {
            let mut state = self.state.borrow_mut();
            let mut data = NodeData::new(&spec.tag);
            data.attributes = spec.attributes.clone();
            data.text = spec.text.clone();
            data.value = spec
                .value
                .clone()
                .or_else(|| spec.attributes.get("value").cloned())
                .unwrap_or_default();
            data.style = spec.style.clone();
            data.rect = spec.rect;
            data.parent = Some(parent);
            if let Some(component) = &spec.component {
                data.component = Some(Rc::new(MemoryComponent::from_spec(component)));
            }
            let key = state.nodes.len();
            state.nodes.push(data);
            state.nodes[parent].children.push(key);

            let first_option = state.nodes[key].tag == "option"
                && state.nodes[parent].tag == "select"
                && state.nodes[parent].selected_index < 0;
            if first_option {
                state.nodes[parent].selected_index = 0;
            }
            key
        };
        for child in &spec.children {
            self.insert(key, child);
        }
        key
    }

    /// Detach `node` and its subtree from the document.
    pub fn remove(&self, node: NodeKey) {
        let mut state = self.state.borrow_mut();
        if let Some(parent) = state.nodes[node].parent.take() {
            state.nodes[parent].children.retain(|&child| child != node);
        }
        if state.focused.is_some_and(|focused| !state.is_attached(focused)) {
            state.focused = None;
        }
    }

    pub fn attach_component(&self, node: NodeKey, component: MemoryComponent) -> Rc<MemoryComponent> {
        let component = Rc::new(component);
        self.state.borrow_mut().nodes[node].component = Some(component.clone());
        component
    }

    /// Make `source` evaluable through `executeScript`.
    pub fn register_script<F>(&self, source: &str, handler: F)
    where
        F: Fn(&[Value]) -> Result<Value, String> + 'static,
    {
        self.state
            .borrow_mut()
            .scripts
            .insert(source.to_string(), Rc::new(handler));
    }

    pub fn handle(&self, node: NodeKey) -> ElementHandle {
        Rc::new(MemoryElement {
            state: self.state.clone(),
            node,
        })
    }

    /// Events dispatched on `node`, oldest first.
    pub fn events(&self, node: NodeKey) -> Vec<SyntheticEvent> {
        self.state.borrow().nodes[node].events.clone()
    }

    pub fn event_types(&self, node: NodeKey) -> Vec<&'static str> {
        self.state.borrow().nodes[node]
            .events
            .iter()
            .map(SyntheticEvent::event_type)
            .collect()
    }

    pub fn attribute(&self, node: NodeKey, name: &str) -> Option<String> {
        self.state.borrow().nodes[node].attributes.get(name).cloned()
    }

    pub fn set_text(&self, node: NodeKey, text: &str) {
        self.state.borrow_mut().nodes[node].text = text.to_string();
    }

    pub fn selected_index(&self, node: NodeKey) -> i32 {
        self.state.borrow().nodes[node].selected_index
    }

    pub fn focused(&self) -> Option<NodeKey> {
        self.state.borrow().focused
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.borrow().navigations.clone()
    }

    pub fn reloads(&self) -> usize {
        self.state.borrow().reloads
    }

    pub fn url(&self) -> String {
        self.state.borrow().url.clone()
    }
}

impl Document for MemoryPage {
    fn evaluate(&self, selector: &str) -> Result<Vec<ElementHandle>, HostError> {
        let path = xpath::parse(selector).map_err(|e| HostError::InvalidSelector(e.to_string()))?;
        let matches = xpath::evaluate(&*self.state.borrow(), DOCUMENT, &path);
        Ok(matches.into_iter().map(|node| self.handle(node)).collect())
    }

    fn element_at(&self, x: f64, y: f64) -> Result<Option<ElementHandle>, HostError> {
        let hit = {
            let state = self.state.borrow();
            let Some(root) = state.document_element() else {
                return Ok(None);
            };
            // Later nodes in document order paint on top.
            let mut hit = root;
            let mut stack = vec![root];
            while let Some(node) = stack.pop() {
                if state.nodes[node].rect.is_some_and(|rect| rect.contains(x, y)) {
                    hit = node;
                }
                stack.extend(state.nodes[node].children.iter().rev().copied());
            }
            hit
        };
        Ok(Some(self.handle(hit)))
    }

    fn title(&self) -> Result<String, HostError> {
        Ok(self.state.borrow().title.clone())
    }

    fn source(&self) -> Result<String, HostError> {
        let state = self.state.borrow();
        let mut out = String::from("<!DOCTYPE html>");
        if let Some(root) = state.document_element() {
            state.write_markup(root, &mut out);
        }
        Ok(out)
    }

    fn scroll(&self) -> Result<(f64, f64), HostError> {
        Ok(self.state.borrow().scroll)
    }

    fn set_scroll(&self, x: f64, y: f64) -> Result<(), HostError> {
        self.state.borrow_mut().scroll = (x.max(0.0), y.max(0.0));
        Ok(())
    }

    fn window_size(&self) -> Result<(f64, f64), HostError> {
        Ok(self.state.borrow().window_size)
    }

    fn navigate(&self, url: &str) -> Result<(), HostError> {
        let mut state = self.state.borrow_mut();
        state.navigations.push(url.to_string());
        state.url = url.to_string();
        Ok(())
    }

    fn reload(&self) -> Result<(), HostError> {
        self.state.borrow_mut().reloads += 1;
        Ok(())
    }

    fn execute_script(&self, script: &str, args: &[Value]) -> Result<Value, HostError> {
        let handler = self.state.borrow().scripts.get(script).cloned();
        match handler {
            Some(handler) => handler(args).map_err(HostError::Script),
            None => Err(HostError::Script(format!(
                "ReferenceError: no handler registered for script {:?}",
                script
            ))),
        }
    }
}

struct MemoryElement {
    state: Rc<RefCell<PageState>>,
    node: NodeKey,
}

impl MemoryElement {
    fn read<T>(&self, f: impl FnOnce(&NodeData) -> T) -> Result<T, HostError> {
        let state = self.state.borrow();
        Ok(f(state.attached(self.node)?))
    }

    fn write<T>(&self, f: impl FnOnce(&mut NodeData) -> T) -> Result<T, HostError> {
        let mut state = self.state.borrow_mut();
        Ok(f(state.attached_mut(self.node)?))
    }
}

impl Element for MemoryElement {
    fn tag_name(&self) -> Result<String, HostError> {
        self.read(|node| node.tag.to_ascii_uppercase())
    }

    fn attribute(&self, name: &str) -> Result<Option<String>, HostError> {
        self.read(|node| node.attributes.get(name).cloned())
    }

    fn set_attribute(&self, name: &str, value: &str) -> Result<(), HostError> {
        self.write(|node| {
            node.attributes.insert(name.to_string(), value.to_string());
        })
    }

    fn inner_text(&self) -> Result<String, HostError> {
        let state = self.state.borrow();
        state.attached(self.node)?;
        Ok(state.string_value(self.node))
    }

    fn value(&self) -> Result<String, HostError> {
        self.read(|node| node.value.clone())
    }

    fn set_value(&self, value: &str) -> Result<(), HostError> {
        self.write(|node| node.value = value.to_string())
    }

    fn scroll(&self) -> Result<(f64, f64), HostError> {
        self.read(|node| node.scroll)
    }

    fn set_scroll(&self, x: f64, y: f64) -> Result<(), HostError> {
        self.write(|node| node.scroll = (x.max(0.0), y.max(0.0)))
    }

    fn selected_index(&self) -> Result<i32, HostError> {
        self.read(|node| node.selected_index)
    }

    fn set_selected_index(&self, index: i32) -> Result<(), HostError> {
        let mut state = self.state.borrow_mut();
        state.attached(self.node)?;
        let count = state.option_values(self.node).len() as i32;
        // Out-of-range indices deselect, as a select control does.
        state.nodes[self.node].selected_index = if (0..count).contains(&index) { index } else { -1 };
        Ok(())
    }

    fn option_values(&self) -> Result<Vec<String>, HostError> {
        let state = self.state.borrow();
        state.attached(self.node)?;
        Ok(state.option_values(self.node))
    }

    fn computed_style(&self, property: Option<&str>) -> Result<Value, HostError> {
        self.read(|node| match property {
            Some(property) => Value::String(node.style.get(property).cloned().unwrap_or_default()),
            None => Value::Object(
                node.style
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect::<Map<String, Value>>(),
            ),
        })
    }

    fn is_disabled(&self) -> Result<bool, HostError> {
        self.read(|node| node.attributes.contains_key("disabled"))
    }

    fn is_focused(&self) -> Result<bool, HostError> {
        let state = self.state.borrow();
        state.attached(self.node)?;
        Ok(state.focused == Some(self.node))
    }

    fn focus(&self) -> Result<(), HostError> {
        let mut state = self.state.borrow_mut();
        state.attached(self.node)?;
        state.focused = Some(self.node);
        Ok(())
    }

    fn dispatch(&self, event: &SyntheticEvent) -> Result<bool, HostError> {
        self.write(|node| node.events.push(event.clone()))?;
        Ok(true)
    }

    fn component(&self) -> Result<Option<Rc<dyn Component>>, HostError> {
        self.read(|node| {
            node.component
                .clone()
                .map(|component| component as Rc<dyn Component>)
        })
    }
}
