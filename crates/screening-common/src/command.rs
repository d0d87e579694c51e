//! Typed commands decoded from the positional wire form.
//!
//! Every inbound frame carries a command name and a list of JSON arguments.
//! [`Command::parse`] turns that pair into one of the variants below so the
//! dispatcher never touches raw JSON.

use crate::error::AgentError;
use crate::protocol::ElementId;
use serde_json::Value;

/// The element a command acts on.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Id(ElementId),
    /// Legacy selector-addressed form; resolves to the first matching id.
    Selector(String),
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Id(id) => write!(f, "{}", id),
            Target::Selector(selector) => write!(f, "{}", selector),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    Down,
    Up,
    Move,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchAction {
    Down,
    Up,
    Move,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // Navigation / script
    ExecuteScript { script: String, args: Vec<Value> },
    GotoUrl { url: String },
    Refresh,

    // Element resolution
    Element { selector: String },
    Elements { selector: String },
    DoesElementExist { selector: String },
    WaitForElement {
        selector: String,
        timeout_ms: Option<u64>,
    },

    // Element state
    GetAttribute { target: Target, name: String },
    SetAttribute {
        target: Target,
        name: String,
        value: String,
    },
    GetInnerText { target: Target },
    GetElementScroll { target: Target },
    SetElementScroll { target: Target, x: f64, y: f64 },
    GetSelectedIndex { target: Target },
    SetSelectedIndex { target: Target, index: i32 },
    GetSelectedValue { target: Target },
    SetSelectedValue { target: Target, value: String },
    GetText { target: Target },
    GetComputedStyle {
        target: Target,
        property: Option<String>,
    },
    IsEnabled { target: Target },
    IsFocused { target: Target },
    Focus { target: Target },
    SetValue { target: Target, value: Value },

    // Element input synthesis
    ElementPointer {
        target: Target,
        action: PointerAction,
        x: f64,
        y: f64,
    },
    ElementClick {
        target: Target,
        button: i16,
        x: f64,
        y: f64,
    },
    ElementDoubleClick { target: Target, x: f64, y: f64 },
    ElementTouch {
        target: Target,
        action: TouchAction,
        x: f64,
        y: f64,
    },
    TouchClick { target: Target },
    TouchDoubleClick { target: Target },
    TouchLongClick { target: Target },

    // Component introspection
    Component { target: Target },
    GetObjectName { target: Target },
    GetModuleId { target: Target },
    GetProperty { target: Target, name: String },
    SetProperty {
        target: Target,
        name: String,
        value: Value,
    },
    CallMethod {
        target: Target,
        name: String,
        args: Vec<Value>,
    },

    // Page level
    GetTitle,
    GetSource,
    GetPageScroll,
    SetPageScroll { x: f64, y: f64 },
    GetWindowSize,
    PagePointer { action: PointerAction, x: f64, y: f64 },
    PageClick {
        button: i16,
        position: Option<(f64, f64)>,
    },
    PageDoubleClick { button: i16 },
}

impl Command {
    /// Decode a wire command name plus its positional arguments.
    pub fn parse(name: &str, args: Vec<Value>) -> Result<Command, AgentError> {
        let mut a = Args::new(name, args);
        let command = match name {
            "executeScript" => Command::ExecuteScript {
                script: a.string("script")?,
                args: a.optional_array("args")?.unwrap_or_default(),
            },
            "gotoUrl" => Command::GotoUrl {
                url: a.string("url")?,
            },
            "refresh" => Command::Refresh,

            "element" => Command::Element {
                selector: a.string("selector")?,
            },
            "elements" => Command::Elements {
                selector: a.string("selector")?,
            },
            "doesElementExist" => Command::DoesElementExist {
                selector: a.string("selector")?,
            },
            "waitForElement" => Command::WaitForElement {
                selector: a.string("selector")?,
                timeout_ms: a.optional_u64("timeoutMs")?,
            },

            "element::getAttribute" => Command::GetAttribute {
                target: a.target()?,
                name: a.string("attributeName")?,
            },
            "element::setAttribute" => Command::SetAttribute {
                target: a.target()?,
                name: a.string("attributeName")?,
                value: a.text("attributeValue")?,
            },
            "element::getInnerText" => Command::GetInnerText {
                target: a.target()?,
            },
            "element::getScroll" => Command::GetElementScroll {
                target: a.target()?,
            },
            "element::setScroll" => Command::SetElementScroll {
                target: a.target()?,
                x: a.number("x")?,
                y: a.number("y")?,
            },
            "element::getSelectedIndex" => Command::GetSelectedIndex {
                target: a.target()?,
            },
            "element::setSelectedIndex" => Command::SetSelectedIndex {
                target: a.target()?,
                index: a.integer("index")?,
            },
            "element::getSelectedValue" => Command::GetSelectedValue {
                target: a.target()?,
            },
            "element::setSelectedValue" => Command::SetSelectedValue {
                target: a.target()?,
                value: a.text("value")?,
            },
            "element::getText" => Command::GetText {
                target: a.target()?,
            },
            "element::getComputedStyle" => Command::GetComputedStyle {
                target: a.target()?,
                property: a.optional_string("styleProp")?,
            },
            "element::isEnabled" => Command::IsEnabled {
                target: a.target()?,
            },
            "element::isFocused" => Command::IsFocused {
                target: a.target()?,
            },
            "element::focus" => Command::Focus {
                target: a.target()?,
            },
            "element::setValue" => Command::SetValue {
                target: a.target()?,
                value: a.value("value")?,
            },

            "element::mouseDown" => element_pointer(&mut a, PointerAction::Down)?,
            "element::mouseUp" => element_pointer(&mut a, PointerAction::Up)?,
            "element::mouseMove" => element_pointer(&mut a, PointerAction::Move)?,
            "element::click" => Command::ElementClick {
                target: a.target()?,
                button: a.button()?,
                x: a.number("x")?,
                y: a.number("y")?,
            },
            "element::dblclick" => Command::ElementDoubleClick {
                target: a.target()?,
                x: a.number("x")?,
                y: a.number("y")?,
            },
            "element::touchDown" => element_touch(&mut a, TouchAction::Down)?,
            "element::touchUp" => element_touch(&mut a, TouchAction::Up)?,
            "element::touchMove" => element_touch(&mut a, TouchAction::Move)?,
            "element::touchClick" => Command::TouchClick {
                target: a.target()?,
            },
            "element::touchDblClick" => Command::TouchDoubleClick {
                target: a.target()?,
            },
            "element::touchLongClick" => Command::TouchLongClick {
                target: a.target()?,
            },

            "component" => Command::Component {
                target: a.target()?,
            },
            "component::getObjectName" => Command::GetObjectName {
                target: a.target()?,
            },
            "component::getModuleId" => Command::GetModuleId {
                target: a.target()?,
            },
            "component::getProperty" => Command::GetProperty {
                target: a.target()?,
                name: a.string("propertyName")?,
            },
            "component::setProperty" => Command::SetProperty {
                target: a.target()?,
                name: a.string("propertyName")?,
                value: a.value("propertyValue")?,
            },
            "component::callMethod" => Command::CallMethod {
                target: a.target()?,
                name: a.string("methodName")?,
                args: a.optional_array("args")?.unwrap_or_default(),
            },

            "getTitle" => Command::GetTitle,
            "getSource" => Command::GetSource,
            "getScroll" => Command::GetPageScroll,
            "setScroll" => Command::SetPageScroll {
                x: a.number("x")?,
                y: a.number("y")?,
            },
            "getWindowSize" => Command::GetWindowSize,
            "mouseDown" => page_pointer(&mut a, PointerAction::Down)?,
            "mouseUp" => page_pointer(&mut a, PointerAction::Up)?,
            "mouseMove" => page_pointer(&mut a, PointerAction::Move)?,
            "click" => {
                let button = a.optional_button()?.unwrap_or(0);
                let position = match (a.optional_number("x")?, a.optional_number("y")?) {
                    (Some(x), Some(y)) => Some((x, y)),
                    (None, None) => None,
                    _ => {
                        return Err(AgentError::InvalidRequest(
                            "click: x and y must be given together".into(),
                        ));
                    }
                };
                Command::PageClick { button, position }
            }
            "doubleClick" => Command::PageDoubleClick {
                button: a.optional_button()?.unwrap_or(0),
            },

            other => return Err(AgentError::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }

    /// The wire name this command answers to.
    pub fn name(&self) -> &'static str {
        match self {
            Command::ExecuteScript { .. } => "executeScript",
            Command::GotoUrl { .. } => "gotoUrl",
            Command::Refresh => "refresh",
            Command::Element { .. } => "element",
            Command::Elements { .. } => "elements",
            Command::DoesElementExist { .. } => "doesElementExist",
            Command::WaitForElement { .. } => "waitForElement",
            Command::GetAttribute { .. } => "element::getAttribute",
            Command::SetAttribute { .. } => "element::setAttribute",
            Command::GetInnerText { .. } => "element::getInnerText",
            Command::GetElementScroll { .. } => "element::getScroll",
            Command::SetElementScroll { .. } => "element::setScroll",
            Command::GetSelectedIndex { .. } => "element::getSelectedIndex",
            Command::SetSelectedIndex { .. } => "element::setSelectedIndex",
            Command::GetSelectedValue { .. } => "element::getSelectedValue",
            Command::SetSelectedValue { .. } => "element::setSelectedValue",
            Command::GetText { .. } => "element::getText",
            Command::GetComputedStyle { .. } => "element::getComputedStyle",
            Command::IsEnabled { .. } => "element::isEnabled",
            Command::IsFocused { .. } => "element::isFocused",
            Command::Focus { .. } => "element::focus",
            Command::SetValue { .. } => "element::setValue",
            Command::ElementPointer { action, .. } => match action {
                PointerAction::Down => "element::mouseDown",
                PointerAction::Up => "element::mouseUp",
                PointerAction::Move => "element::mouseMove",
            },
            Command::ElementClick { .. } => "element::click",
            Command::ElementDoubleClick { .. } => "element::dblclick",
            Command::ElementTouch { action, .. } => match action {
                TouchAction::Down => "element::touchDown",
                TouchAction::Up => "element::touchUp",
                TouchAction::Move => "element::touchMove",
            },
            Command::TouchClick { .. } => "element::touchClick",
            Command::TouchDoubleClick { .. } => "element::touchDblClick",
            Command::TouchLongClick { .. } => "element::touchLongClick",
            Command::Component { .. } => "component",
            Command::GetObjectName { .. } => "component::getObjectName",
            Command::GetModuleId { .. } => "component::getModuleId",
            Command::GetProperty { .. } => "component::getProperty",
            Command::SetProperty { .. } => "component::setProperty",
            Command::CallMethod { .. } => "component::callMethod",
            Command::GetTitle => "getTitle",
            Command::GetSource => "getSource",
            Command::GetPageScroll => "getScroll",
            Command::SetPageScroll { .. } => "setScroll",
            Command::GetWindowSize => "getWindowSize",
            Command::PagePointer { action, .. } => match action {
                PointerAction::Down => "mouseDown",
                PointerAction::Up => "mouseUp",
                PointerAction::Move => "mouseMove",
            },
            Command::PageClick { .. } => "click",
            Command::PageDoubleClick { .. } => "doubleClick",
        }
    }
}

fn element_pointer(a: &mut Args, action: PointerAction) -> Result<Command, AgentError> {
    Ok(Command::ElementPointer {
        target: a.target()?,
        action,
        x: a.number("x")?,
        y: a.number("y")?,
    })
}

fn element_touch(a: &mut Args, action: TouchAction) -> Result<Command, AgentError> {
    Ok(Command::ElementTouch {
        target: a.target()?,
        action,
        x: a.number("x")?,
        y: a.number("y")?,
    })
}

fn page_pointer(a: &mut Args, action: PointerAction) -> Result<Command, AgentError> {
    Ok(Command::PagePointer {
        action,
        x: a.number("x")?,
        y: a.number("y")?,
    })
}

/// Cursor over positional arguments. Missing trailing arguments read as null.
struct Args<'a> {
    command: &'a str,
    values: std::vec::IntoIter<Value>,
}

impl<'a> Args<'a> {
    fn new(command: &'a str, values: Vec<Value>) -> Self {
        Self {
            command,
            values: values.into_iter(),
        }
    }

    fn next(&mut self) -> Value {
        self.values.next().unwrap_or(Value::Null)
    }

    fn invalid(&self, what: &str, expected: &str, got: &Value) -> AgentError {
        AgentError::InvalidRequest(format!(
            "{}: expected {} for '{}', got {}",
            self.command, expected, what, got
        ))
    }

    fn target(&mut self) -> Result<Target, AgentError> {
        match self.next() {
            Value::Number(n) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .map(|n| Target::Id(ElementId(n)))
                .ok_or_else(|| self.invalid("id", "element id", &Value::Number(n))),
            Value::String(selector) => Ok(Target::Selector(selector)),
            other => Err(self.invalid("id", "element id or selector", &other)),
        }
    }

    fn string(&mut self, what: &str) -> Result<String, AgentError> {
        match self.next() {
            Value::String(s) => Ok(s),
            other => Err(self.invalid(what, "string", &other)),
        }
    }

    /// Like `string`, but scalars are stringified the way an attribute write would.
    fn text(&mut self, what: &str) -> Result<String, AgentError> {
        match self.next() {
            Value::String(s) => Ok(s),
            v @ (Value::Number(_) | Value::Bool(_)) => Ok(v.to_string()),
            other => Err(self.invalid(what, "string", &other)),
        }
    }

    fn optional_string(&mut self, what: &str) -> Result<Option<String>, AgentError> {
        match self.next() {
            Value::Null => Ok(None),
            Value::String(s) if s.is_empty() => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Err(self.invalid(what, "string", &other)),
        }
    }

    fn value(&mut self, what: &str) -> Result<Value, AgentError> {
        match self.values.next() {
            Some(v) => Ok(v),
            None => Err(AgentError::InvalidRequest(format!(
                "{}: missing argument '{}'",
                self.command, what
            ))),
        }
    }

    fn optional_array(&mut self, what: &str) -> Result<Option<Vec<Value>>, AgentError> {
        match self.next() {
            Value::Null => Ok(None),
            Value::Array(items) => Ok(Some(items)),
            other => Err(self.invalid(what, "array", &other)),
        }
    }

    fn number(&mut self, what: &str) -> Result<f64, AgentError> {
        match self.optional_number(what)? {
            Some(n) => Ok(n),
            None => Err(AgentError::InvalidRequest(format!(
                "{}: missing argument '{}'",
                self.command, what
            ))),
        }
    }

    fn optional_number(&mut self, what: &str) -> Result<Option<f64>, AgentError> {
        match self.next() {
            Value::Null => Ok(None),
            Value::Number(n) => n
                .as_f64()
                .map(Some)
                .ok_or_else(|| self.invalid(what, "number", &Value::Number(n))),
            other => Err(self.invalid(what, "number", &other)),
        }
    }

    fn integer(&mut self, what: &str) -> Result<i32, AgentError> {
        match self.next() {
            Value::Number(n) => n
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .ok_or_else(|| self.invalid(what, "integer", &Value::Number(n))),
            other => Err(self.invalid(what, "integer", &other)),
        }
    }

    fn optional_u64(&mut self, what: &str) -> Result<Option<u64>, AgentError> {
        match self.next() {
            Value::Null => Ok(None),
            Value::Number(n) => match n.as_u64() {
                Some(v) => Ok(Some(v)),
                // Fractional timeouts are truncated; negative ones are rejected.
                None => match n.as_f64() {
                    Some(f) if f >= 0.0 => Ok(Some(f as u64)),
                    _ => Err(self.invalid(what, "non-negative number", &Value::Number(n))),
                },
            },
            other => Err(self.invalid(what, "non-negative number", &other)),
        }
    }

    fn button(&mut self) -> Result<i16, AgentError> {
        Ok(self.optional_button()?.unwrap_or(0))
    }

    fn optional_button(&mut self) -> Result<Option<i16>, AgentError> {
        match self.next() {
            Value::Null => Ok(None),
            Value::Number(n) => n
                .as_i64()
                .and_then(|n| i16::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| self.invalid("button", "button index", &Value::Number(n))),
            other => Err(self.invalid("button", "button index", &other)),
        }
    }
}
