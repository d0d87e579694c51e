use super::fixture::ComponentSpec;
use crate::host::{Component, HostError};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

type MethodHandler = Rc<dyn Fn(&MemoryComponent, &[Value]) -> Result<Value, String>>;

/// A scriptable UI component attached to a [`super::MemoryPage`] node.
pub struct MemoryComponent {
    object_name: String,
    module_id: String,
    properties: RefCell<Map<String, Value>>,
    methods: RefCell<HashMap<String, MethodHandler>>,
    calls: RefCell<Vec<(String, Vec<Value>)>>,
}

impl MemoryComponent {
    pub fn new(object_name: &str, module_id: &str) -> Self {
        Self {
            object_name: object_name.to_string(),
            module_id: module_id.to_string(),
            properties: RefCell::new(Map::new()),
            methods: RefCell::new(HashMap::new()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn from_spec(spec: &ComponentSpec) -> Self {
        let component = Self::new(&spec.object_name, &spec.module_id);
        component
            .properties
            .borrow_mut()
            .extend(spec.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        for (name, result) in &spec.methods {
            let result = result.clone();
            component.define_method(name, move |_, _| Ok(result.clone()));
        }
        component
    }

    pub fn with_property(self, name: &str, value: Value) -> Self {
        self.properties.borrow_mut().insert(name.to_string(), value);
        self
    }

    pub fn with_method<F>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&MemoryComponent, &[Value]) -> Result<Value, String> + 'static,
    {
        self.define_method(name, handler);
        self
    }

    pub fn define_method<F>(&self, name: &str, handler: F)
    where
        F: Fn(&MemoryComponent, &[Value]) -> Result<Value, String> + 'static,
    {
        self.methods
            .borrow_mut()
            .insert(name.to_string(), Rc::new(handler));
    }

    pub fn property(&self, name: &str) -> Option<Value> {
        self.properties.borrow().get(name).cloned()
    }

    /// Method invocations so far, oldest first.
    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.borrow().clone()
    }
}

impl Component for MemoryComponent {
    fn object_name(&self) -> Result<String, HostError> {
        Ok(self.object_name.clone())
    }

    fn module_id(&self) -> Result<String, HostError> {
        Ok(self.module_id.clone())
    }

    fn get_property(&self, name: &str) -> Result<Value, HostError> {
        Ok(self.property(name).unwrap_or(Value::Null))
    }

    fn set_property(&self, name: &str, value: Value) -> Result<(), HostError> {
        self.properties.borrow_mut().insert(name.to_string(), value);
        Ok(())
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, HostError> {
        self.calls
            .borrow_mut()
            .push((method.to_string(), args.to_vec()));
        // Handlers may touch properties or define methods, so release the map first.
        let handler = self.methods.borrow().get(method).cloned();
        match handler {
            Some(handler) => handler(self, args).map_err(HostError::Script),
            None => Err(HostError::Unsupported(format!(
                "{} has no method {}",
                self.object_name, method
            ))),
        }
    }
}
