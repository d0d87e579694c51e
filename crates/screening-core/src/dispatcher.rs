//! Command Dispatcher
//!
//! One arm per command. Every arm is single-attempt and completes
//! synchronously except `waitForElement`, which polls, and
//! `touchLongClick`, which defers its `touchend` to a timer.

use crate::agent::Agent;
use crate::events::{self, MouseEventKind, SyntheticEvent, TouchPhase, TouchPoint};
use crate::host::{Component, ElementHandle, HostError};
use crate::wait;
use screening_common::{AgentError, Command, ElementId, PointerAction, Target, TouchAction};
use serde_json::{Value, json};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use tracing::{info, warn};

fn none() -> Vec<Value> {
    Vec::new()
}

fn one(value: impl Into<Value>) -> Vec<Value> {
    vec![value.into()]
}

fn mouse_kind(action: PointerAction) -> MouseEventKind {
    match action {
        PointerAction::Down => MouseEventKind::Down,
        PointerAction::Up => MouseEventKind::Up,
        PointerAction::Move => MouseEventKind::Move,
    }
}

fn touch_phase(action: TouchAction) -> TouchPhase {
    match action {
        TouchAction::Down => TouchPhase::Start,
        TouchAction::Up => TouchPhase::End,
        TouchAction::Move => TouchPhase::Move,
    }
}

/// Scalars are written the way a DOM property assignment would stringify them.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn dispatch_all(element: &ElementHandle, events: &[SyntheticEvent]) -> Result<(), AgentError> {
    for event in events {
        element.dispatch(event)?;
    }
    Ok(())
}

impl Agent {
    /// Execute a decoded command, returning its result values.
    pub async fn execute(&self, command: Command) -> Result<Vec<Value>, AgentError> {
        match command {
            Command::WaitForElement {
                selector,
                timeout_ms,
            } => {
                let timeout = Duration::from_millis(
                    timeout_ms.unwrap_or(self.config.default_wait_timeout_ms),
                );
                let id = wait::wait_for_element(
                    self.scheduler.as_ref(),
                    &selector,
                    timeout,
                    self.config.poll_interval(),
                    || self.resolve(&selector),
                )
                .await?;
                Ok(one(id.0))
            }
            other => self.execute_now(other),
        }
    }

    fn execute_now(&self, command: Command) -> Result<Vec<Value>, AgentError> {
        match command {
            // Navigation / script
            Command::ExecuteScript { script, args } => self
                .document
                .execute_script(&script, &args)
                .map(one)
                .map_err(|e| match e {
                    HostError::Script(message) => AgentError::ScriptError(message),
                    other => AgentError::ScriptError(other.to_string()),
                }),
            Command::GotoUrl { url } => {
                info!(%url, "navigating");
                self.document.navigate(&url)?;
                Ok(none())
            }
            Command::Refresh => {
                self.document.reload()?;
                Ok(none())
            }

            // Element resolution
            Command::Element { selector } => {
                let ids = self.resolve(&selector)?;
                Ok(one(ids[0].0))
            }
            Command::Elements { selector } => {
                let ids = self.resolve(&selector)?;
                Ok(one(json!(ids)))
            }
            Command::DoesElementExist { selector } => match self.resolve(&selector) {
                Ok(_) => Ok(one(true)),
                Err(e) if e.is_no_match() => Ok(one(false)),
                Err(e) => Err(e),
            },
            Command::WaitForElement { .. } => Err(AgentError::InvalidRequest(
                "waitForElement must be awaited".into(),
            )),

            // Element state
            Command::GetAttribute { target, name } => {
                let (_, element) = self.target(&target)?;
                Ok(one(element.attribute(&name)?))
            }
            Command::SetAttribute {
                target,
                name,
                value,
            } => {
                let (_, element) = self.target(&target)?;
                element.set_attribute(&name, &value)?;
                Ok(none())
            }
            Command::GetInnerText { target } => {
                let (_, element) = self.target(&target)?;
                Ok(one(element.inner_text()?))
            }
            Command::GetElementScroll { target } => {
                let (_, element) = self.target(&target)?;
                let (x, y) = element.scroll()?;
                Ok(vec![x.into(), y.into()])
            }
            Command::SetElementScroll { target, x, y } => {
                let (_, element) = self.target(&target)?;
                element.set_scroll(x, y)?;
                Ok(none())
            }
            Command::GetSelectedIndex { target } => {
                let (_, element) = self.target(&target)?;
                Ok(one(element.selected_index()?))
            }
            Command::SetSelectedIndex { target, index } => {
                let (_, element) = self.target(&target)?;
                element.set_selected_index(index)?;
                // Programmatic selection does not fire `change` on its own.
                element.dispatch(&SyntheticEvent::Change)?;
                Ok(none())
            }
            Command::GetSelectedValue { target } => {
                let (_, element) = self.target(&target)?;
                let index = element.selected_index()?;
                let values = element.option_values()?;
                let selected = usize::try_from(index)
                    .ok()
                    .and_then(|i| values.into_iter().nth(i));
                Ok(one(selected))
            }
            Command::SetSelectedValue { target, value } => {
                let (_, element) = self.target(&target)?;
                let position = element
                    .option_values()?
                    .iter()
                    .position(|option| *option == value)
                    .ok_or(AgentError::OptionNotFound { value })?;
                element.set_selected_index(position as i32)?;
                element.dispatch(&SyntheticEvent::Change)?;
                Ok(none())
            }
            Command::GetText { target } => {
                let (_, element) = self.target(&target)?;
                let tag = element.tag_name()?.to_ascii_lowercase();
                if tag == "input" || tag == "textarea" {
                    Ok(one(element.value()?))
                } else {
                    Ok(one(element.inner_text()?))
                }
            }
            Command::GetComputedStyle { target, property } => {
                let (_, element) = self.target(&target)?;
                Ok(one(element.computed_style(property.as_deref())?))
            }
            Command::IsEnabled { target } => {
                let (_, element) = self.target(&target)?;
                Ok(one(!element.is_disabled()?))
            }
            Command::IsFocused { target } => {
                let (_, element) = self.target(&target)?;
                Ok(one(element.is_focused()?))
            }
            Command::Focus { target } => {
                let (_, element) = self.target(&target)?;
                element.focus()?;
                Ok(none())
            }
            Command::SetValue { target, value } => {
                let (_, element) = self.target(&target)?;
                match element.component()? {
                    Some(component) => component.set_property("value", value)?,
                    None => element.set_value(&value_text(&value))?,
                }
                Ok(none())
            }

            // Element input synthesis
            Command::ElementPointer {
                target,
                action,
                x,
                y,
            } => {
                let (_, element) = self.target(&target)?;
                element.dispatch(&events::mouse(mouse_kind(action), x, y, 0))?;
                self.set_mouse_position(x, y);
                Ok(none())
            }
            Command::ElementClick {
                target,
                button,
                x,
                y,
            } => {
                let (_, element) = self.target(&target)?;
                dispatch_all(&element, &events::click(x, y, button))?;
                self.set_mouse_position(x, y);
                Ok(none())
            }
            Command::ElementDoubleClick { target, x, y } => {
                let (_, element) = self.target(&target)?;
                dispatch_all(&element, &events::double_click(x, y, 0))?;
                self.set_mouse_position(x, y);
                Ok(none())
            }
            Command::ElementTouch {
                target,
                action,
                x,
                y,
            } => {
                let (_, element) = self.target(&target)?;
                element.dispatch(&events::touch(touch_phase(action), &[TouchPoint::at(x, y)]))?;
                Ok(none())
            }
            Command::TouchClick { target } => {
                let (_, element) = self.target(&target)?;
                dispatch_all(&element, &events::touch_click(TouchPoint::default()))?;
                Ok(none())
            }
            Command::TouchDoubleClick { target } => {
                let (_, element) = self.target(&target)?;
                dispatch_all(&element, &events::touch_double_click(TouchPoint::default()))?;
                Ok(none())
            }
            Command::TouchLongClick { target } => {
                let (id, element) = self.target(&target)?;
                let press = events::touch_long_click(TouchPoint::default(), self.config.long_press());
                // The end is scheduled first so a refused timer leaves no press half-done.
                let pressed = Rc::new(Cell::new(false));
                let end = press.end;
                let (releasing, released) = (Rc::clone(&element), Rc::clone(&pressed));
                self.scheduler.defer(
                    press.delay,
                    Box::new(move || {
                        if !released.get() {
                            return;
                        }
                        if let Err(e) = releasing.dispatch(&end) {
                            warn!(%id, error = %e, "deferred touchend failed");
                        }
                    }),
                )?;
                element.dispatch(&press.start)?;
                pressed.set(true);
                Ok(none())
            }

            // Component introspection
            Command::Component { target } => {
                let (id, _) = self.component(&target)?;
                Ok(one(id.0))
            }
            Command::GetObjectName { target } => {
                let (_, component) = self.component(&target)?;
                Ok(one(component.object_name()?))
            }
            Command::GetModuleId { target } => {
                let (_, component) = self.component(&target)?;
                Ok(one(component.module_id()?))
            }
            Command::GetProperty { target, name } => {
                let (_, component) = self.component(&target)?;
                Ok(one(component.get_property(&name)?))
            }
            Command::SetProperty {
                target,
                name,
                value,
            } => {
                let (_, component) = self.component(&target)?;
                component.set_property(&name, value)?;
                Ok(none())
            }
            Command::CallMethod { target, name, args } => {
                let (_, component) = self.component(&target)?;
                Ok(one(component.invoke(&name, &args)?))
            }

            // Page level
            Command::GetTitle => Ok(one(self.document.title()?)),
            Command::GetSource => Ok(one(self.document.source()?)),
            Command::GetPageScroll => {
                let (x, y) = self.document.scroll()?;
                Ok(one(json!([x, y])))
            }
            Command::SetPageScroll { x, y } => {
                self.document.set_scroll(x, y)?;
                Ok(none())
            }
            Command::GetWindowSize => {
                let (width, height) = self.document.window_size()?;
                Ok(one(json!([width, height])))
            }
            Command::PagePointer { action, x, y } => {
                let element = self.element_at(x, y)?;
                element.dispatch(&events::mouse(mouse_kind(action), x, y, 0))?;
                self.set_mouse_position(x, y);
                Ok(none())
            }
            Command::PageClick { button, position } => {
                let (x, y) = position.unwrap_or_else(|| {
                    let current = self.mouse_position();
                    (current.x, current.y)
                });
                let element = self.element_at(x, y)?;
                dispatch_all(&element, &events::click(x, y, button))?;
                self.set_mouse_position(x, y);
                Ok(none())
            }
            Command::PageDoubleClick { button } => {
                let current = self.mouse_position();
                let element = self.element_at(current.x, current.y)?;
                dispatch_all(&element, &events::double_click(current.x, current.y, button))?;
                Ok(none())
            }
        }
    }

    /// Resolve the target and require an attached component.
    fn component(&self, target: &Target) -> Result<(ElementId, Rc<dyn Component>), AgentError> {
        let (id, element) = self.target(target)?;
        match element.component()? {
            Some(component) => Ok((id, component)),
            None => Err(AgentError::ComponentNotFound {
                target: target.to_string(),
            }),
        }
    }

    fn element_at(&self, x: f64, y: f64) -> Result<ElementHandle, AgentError> {
        self.document
            .element_at(x, y)?
            .ok_or_else(|| AgentError::Host(format!("no element at ({}, {})", x, y)))
    }
}
