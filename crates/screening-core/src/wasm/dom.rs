//! `web-sys` bindings for the host traits.

use crate::events::{SyntheticEvent, Touch};
use crate::host::{Component, Document, Element, ElementHandle, HostError};
use js_sys::{Array, Function, Object, Reflect};
use serde::Serialize;
use serde_json::{Map, Value};
use std::rc::Rc;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{HtmlElement, Node, Window};

/// `XPathResult.ORDERED_NODE_SNAPSHOT_TYPE`
const ORDERED_NODE_SNAPSHOT: u16 = 7;

/// Global that holds the arguments of the script being executed.
const SCRIPT_ARGS: &str = "__screeningArgs";

pub(crate) fn js_message(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

fn platform(value: JsValue) -> HostError {
    HostError::Platform(js_message(&value))
}

fn get(target: &JsValue, key: &str) -> Result<JsValue, HostError> {
    Reflect::get(target, &JsValue::from_str(key)).map_err(platform)
}

fn set(target: &JsValue, key: &str, value: &JsValue) -> Result<(), HostError> {
    Reflect::set(target, &JsValue::from_str(key), value)
        .map(|_| ())
        .map_err(platform)
}

fn to_js(value: &Value) -> Result<JsValue, HostError> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| HostError::Platform(e.to_string()))
}

fn from_js(value: JsValue) -> Result<Value, HostError> {
    if value.is_undefined() {
        return Ok(Value::Null);
    }
    serde_wasm_bindgen::from_value(value).map_err(|e| HostError::Platform(e.to_string()))
}

/// The page this agent is loaded in.
pub struct WasmDocument {
    window: Window,
    document: web_sys::Document,
}

impl WasmDocument {
    pub fn current() -> Result<Self, HostError> {
        let window = web_sys::window().ok_or_else(|| HostError::Platform("no window".into()))?;
        let document = window
            .document()
            .ok_or_else(|| HostError::Platform("no document".into()))?;
        Ok(Self { window, document })
    }

    fn handle(&self, element: web_sys::Element) -> ElementHandle {
        Rc::new(WasmElement {
            window: self.window.clone(),
            document: self.document.clone(),
            element,
        })
    }
}

impl Document for WasmDocument {
    fn evaluate(&self, selector: &str) -> Result<Vec<ElementHandle>, HostError> {
        let result = self
            .document
            .evaluate_with_type(selector, &self.document, ORDERED_NODE_SNAPSHOT)
            .map_err(|e| HostError::InvalidSelector(js_message(&e)))?;
        let length = result.snapshot_length().map_err(platform)?;
        let mut handles = Vec::with_capacity(length as usize);
        for index in 0..length {
            // Text and attribute nodes cannot take commands.
            if let Some(node) = result.snapshot_item(index).map_err(platform)?
                && let Ok(element) = node.dyn_into::<web_sys::Element>()
            {
                handles.push(self.handle(element));
            }
        }
        Ok(handles)
    }

    fn element_at(&self, x: f64, y: f64) -> Result<Option<ElementHandle>, HostError> {
        let hit = self
            .document
            .element_from_point(x as f32, y as f32)
            .or_else(|| self.document.document_element());
        Ok(hit.map(|element| self.handle(element)))
    }

    fn title(&self) -> Result<String, HostError> {
        Ok(self.document.title())
    }

    fn source(&self) -> Result<String, HostError> {
        Ok(self
            .document
            .document_element()
            .map(|root| root.outer_html())
            .unwrap_or_default())
    }

    fn scroll(&self) -> Result<(f64, f64), HostError> {
        Ok((
            self.window.scroll_x().map_err(platform)?,
            self.window.scroll_y().map_err(platform)?,
        ))
    }

    fn set_scroll(&self, x: f64, y: f64) -> Result<(), HostError> {
        self.window.scroll_to_with_x_and_y(x, y);
        Ok(())
    }

    fn window_size(&self) -> Result<(f64, f64), HostError> {
        let width = self.window.inner_width().map_err(platform)?;
        let height = self.window.inner_height().map_err(platform)?;
        Ok((width.as_f64().unwrap_or(0.0), height.as_f64().unwrap_or(0.0)))
    }

    fn navigate(&self, url: &str) -> Result<(), HostError> {
        self.window.location().set_href(url).map_err(platform)
    }

    fn reload(&self) -> Result<(), HostError> {
        self.window.location().reload().map_err(platform)
    }

    fn execute_script(&self, script: &str, args: &[Value]) -> Result<Value, HostError> {
        let array = Array::new();
        for arg in args {
            array.push(&to_js(arg)?);
        }
        set(&self.window, SCRIPT_ARGS, &array)?;
        let result = js_sys::eval(script).map_err(|e| HostError::Script(js_message(&e)));
        // Functions and DOM nodes have no JSON form.
        result.and_then(|value| from_js(value).or(Ok(Value::Null)))
    }
}

struct WasmElement {
    window: Window,
    document: web_sys::Document,
    element: web_sys::Element,
}

impl WasmElement {
    fn ensure_attached(&self) -> Result<(), HostError> {
        if self.element.is_connected() {
            Ok(())
        } else {
            Err(HostError::Detached)
        }
    }

    fn property(&self, name: &str) -> Result<JsValue, HostError> {
        self.ensure_attached()?;
        get(&self.element, name)
    }

    fn build_event(&self, event: &SyntheticEvent) -> Result<web_sys::Event, HostError> {
        match event {
            SyntheticEvent::Mouse(init) => {
                let dict = Object::new();
                set(&dict, "bubbles", &init.bubbles.into())?;
                set(&dict, "cancelable", &init.cancelable.into())?;
                set(&dict, "button", &JsValue::from(init.button))?;
                set(&dict, "clientX", &init.client_x.into())?;
                set(&dict, "clientY", &init.client_y.into())?;
                set(&dict, "view", &self.window)?;
                let constructor: Function = get(&self.window, "MouseEvent")?
                    .dyn_into()
                    .map_err(platform)?;
                let args = Array::of2(&JsValue::from_str(init.kind.event_type()), &dict);
                let event = Reflect::construct(&constructor, &args).map_err(platform)?;
                Ok(event.unchecked_into())
            }
            SyntheticEvent::Touch(init) => {
                // A plain event carrying touch lists, so it works where TouchEvent is absent.
                let event = self.plain_event(init.phase.event_type(), init.bubbles, init.cancelable)?;
                set(&event, "touches", &self.touch_list(&init.touches)?)?;
                set(&event, "targetTouches", &self.touch_list(&init.target_touches)?)?;
                set(&event, "changedTouches", &self.touch_list(&init.changed_touches)?)?;
                Ok(event)
            }
            SyntheticEvent::Change => self.plain_event("change", true, false),
        }
    }

    fn plain_event(&self, kind: &str, bubbles: bool, cancelable: bool) -> Result<web_sys::Event, HostError> {
        let event = self.document.create_event("Event").map_err(platform)?;
        event.init_event_with_bubbles_and_cancelable(kind, bubbles, cancelable);
        Ok(event)
    }

    fn touch_list(&self, touches: &[Touch]) -> Result<Array, HostError> {
        let list = Array::new();
        for touch in touches {
            let object = Object::new();
            set(&object, "identifier", &JsValue::from(touch.identifier))?;
            set(&object, "target", &self.element)?;
            set(&object, "screenX", &touch.point.screen_x.into())?;
            set(&object, "screenY", &touch.point.screen_y.into())?;
            set(&object, "clientX", &touch.point.client_x.into())?;
            set(&object, "clientY", &touch.point.client_y.into())?;
            set(&object, "pageX", &touch.point.page_x.into())?;
            set(&object, "pageY", &touch.point.page_y.into())?;
            list.push(&object);
        }
        Ok(list)
    }
}

impl Element for WasmElement {
    fn tag_name(&self) -> Result<String, HostError> {
        self.ensure_attached()?;
        Ok(self.element.tag_name())
    }

    fn attribute(&self, name: &str) -> Result<Option<String>, HostError> {
        self.ensure_attached()?;
        Ok(self.element.get_attribute(name))
    }

    fn set_attribute(&self, name: &str, value: &str) -> Result<(), HostError> {
        self.ensure_attached()?;
        self.element.set_attribute(name, value).map_err(platform)
    }

    fn inner_text(&self) -> Result<String, HostError> {
        self.ensure_attached()?;
        let node: &Node = &self.element;
        Ok(match self.element.dyn_ref::<HtmlElement>() {
            Some(html) => html.inner_text(),
            None => node.text_content().unwrap_or_default(),
        })
    }

    fn value(&self) -> Result<String, HostError> {
        Ok(self.property("value")?.as_string().unwrap_or_default())
    }

    fn set_value(&self, value: &str) -> Result<(), HostError> {
        self.ensure_attached()?;
        set(&self.element, "value", &JsValue::from_str(value))
    }

    fn scroll(&self) -> Result<(f64, f64), HostError> {
        let left = self.property("scrollLeft")?.as_f64().unwrap_or(0.0);
        let top = self.property("scrollTop")?.as_f64().unwrap_or(0.0);
        Ok((left, top))
    }

    fn set_scroll(&self, x: f64, y: f64) -> Result<(), HostError> {
        self.ensure_attached()?;
        set(&self.element, "scrollLeft", &x.into())?;
        set(&self.element, "scrollTop", &y.into())
    }

    fn selected_index(&self) -> Result<i32, HostError> {
        Ok(self
            .property("selectedIndex")?
            .as_f64()
            .map(|index| index as i32)
            .unwrap_or(-1))
    }

    fn set_selected_index(&self, index: i32) -> Result<(), HostError> {
        self.ensure_attached()?;
        set(&self.element, "selectedIndex", &JsValue::from(index))
    }

    fn option_values(&self) -> Result<Vec<String>, HostError> {
        let options = self.property("options")?;
        if options.is_undefined() || options.is_null() {
            return Ok(Vec::new());
        }
        let length = get(&options, "length")?.as_f64().unwrap_or(0.0) as u32;
        let mut values = Vec::with_capacity(length as usize);
        for index in 0..length {
            let option = Reflect::get_u32(&options, index).map_err(platform)?;
            values.push(get(&option, "value")?.as_string().unwrap_or_default());
        }
        Ok(values)
    }

    fn computed_style(&self, property: Option<&str>) -> Result<Value, HostError> {
        self.ensure_attached()?;
        let Some(style) = self
            .window
            .get_computed_style(&self.element)
            .map_err(platform)?
        else {
            return Ok(Value::Null);
        };
        match property {
            Some(property) => Ok(Value::String(
                style.get_property_value(property).map_err(platform)?,
            )),
            None => {
                let mut declaration = Map::new();
                for index in 0..style.length() {
                    let name = style.item(index);
                    let value = style.get_property_value(&name).map_err(platform)?;
                    declaration.insert(name, Value::String(value));
                }
                Ok(Value::Object(declaration))
            }
        }
    }

    fn is_disabled(&self) -> Result<bool, HostError> {
        Ok(self.property("disabled")?.as_bool().unwrap_or(false))
    }

    fn is_focused(&self) -> Result<bool, HostError> {
        self.ensure_attached()?;
        Ok(self
            .document
            .active_element()
            .is_some_and(|active| active.is_same_node(Some(&self.element))))
    }

    fn focus(&self) -> Result<(), HostError> {
        self.ensure_attached()?;
        match self.element.dyn_ref::<HtmlElement>() {
            Some(html) => html.focus().map_err(platform),
            None => Err(HostError::Unsupported(format!(
                "{} cannot take focus",
                self.element.tag_name()
            ))),
        }
    }

    fn dispatch(&self, event: &SyntheticEvent) -> Result<bool, HostError> {
        self.ensure_attached()?;
        let event = self.build_event(event)?;
        self.element.dispatch_event(&event).map_err(platform)
    }

    fn component(&self) -> Result<Option<Rc<dyn Component>>, HostError> {
        let object = self.property("component")?;
        if object.is_undefined() || object.is_null() {
            return Ok(None);
        }
        Ok(Some(Rc::new(WasmComponent { object })))
    }
}

/// A Montage-style component object hung off `element.component`.
struct WasmComponent {
    object: JsValue,
}

impl WasmComponent {
    fn metadata(&self, key: &str) -> Result<String, HostError> {
        let metadata = get(&self.object, "_montage_metadata")?;
        if metadata.is_undefined() || metadata.is_null() {
            return Ok(String::new());
        }
        Ok(get(&metadata, key)?.as_string().unwrap_or_default())
    }
}

impl Component for WasmComponent {
    fn object_name(&self) -> Result<String, HostError> {
        self.metadata("objectName")
    }

    fn module_id(&self) -> Result<String, HostError> {
        self.metadata("moduleId")
    }

    fn get_property(&self, name: &str) -> Result<Value, HostError> {
        from_js(get(&self.object, name)?)
    }

    fn set_property(&self, name: &str, value: Value) -> Result<(), HostError> {
        set(&self.object, name, &to_js(&value)?)
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, HostError> {
        let function: Function = get(&self.object, method)?
            .dyn_into()
            .map_err(|_| HostError::Unsupported(format!("component has no method {}", method)))?;
        let array = Array::new();
        for arg in args {
            array.push(&to_js(arg)?);
        }
        let result = function
            .apply(&self.object, &array)
            .map_err(|e| HostError::Script(js_message(&e)))?;
        from_js(result)
    }
}
