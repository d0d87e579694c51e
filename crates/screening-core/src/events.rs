//! Event Synthesizer
//!
//! Builds declarative descriptions of the input events the agent dispatches.
//! Hosts turn a [`SyntheticEvent`] into a platform event object; nothing in
//! here touches the DOM.

use serde::Serialize;
use std::time::Duration;

/// Delay between `touchstart` and `touchend` for an emulated long press.
pub const LONG_PRESS_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseEventKind {
    Down,
    Up,
    Move,
}

impl MouseEventKind {
    pub fn event_type(self) -> &'static str {
        match self {
            MouseEventKind::Down => "mousedown",
            MouseEventKind::Up => "mouseup",
            MouseEventKind::Move => "mousemove",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MouseEventInit {
    pub kind: MouseEventKind,
    pub bubbles: bool,
    pub cancelable: bool,
    pub button: i16,
    pub client_x: f64,
    pub client_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TouchPhase {
    Start,
    Move,
    End,
}

impl TouchPhase {
    pub fn event_type(self) -> &'static str {
        match self {
            TouchPhase::Start => "touchstart",
            TouchPhase::Move => "touchmove",
            TouchPhase::End => "touchend",
        }
    }
}

/// Coordinates of one finger. Unset coordinates are 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TouchPoint {
    pub screen_x: f64,
    pub screen_y: f64,
    pub client_x: f64,
    pub client_y: f64,
    pub page_x: f64,
    pub page_y: f64,
}

impl TouchPoint {
    /// A point with every coordinate pair set to `(x, y)`.
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            screen_x: x,
            screen_y: y,
            client_x: x,
            client_y: y,
            page_x: x,
            page_y: y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Touch {
    pub identifier: u32,
    #[serde(flatten)]
    pub point: TouchPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TouchEventInit {
    pub phase: TouchPhase,
    pub bubbles: bool,
    pub cancelable: bool,
    pub touches: Vec<Touch>,
    pub target_touches: Vec<Touch>,
    pub changed_touches: Vec<Touch>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum SyntheticEvent {
    Mouse(MouseEventInit),
    Touch(TouchEventInit),
    /// A `change` notification after a programmatic selection update.
    Change,
}

impl SyntheticEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            SyntheticEvent::Mouse(init) => init.kind.event_type(),
            SyntheticEvent::Touch(init) => init.phase.event_type(),
            SyntheticEvent::Change => "change",
        }
    }

    pub fn bubbles(&self) -> bool {
        match self {
            SyntheticEvent::Mouse(init) => init.bubbles,
            SyntheticEvent::Touch(init) => init.bubbles,
            SyntheticEvent::Change => true,
        }
    }

    pub fn cancelable(&self) -> bool {
        match self {
            SyntheticEvent::Mouse(init) => init.cancelable,
            SyntheticEvent::Touch(init) => init.cancelable,
            SyntheticEvent::Change => false,
        }
    }
}

/// A long press: `start` now, `end` after `delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct LongPress {
    pub start: SyntheticEvent,
    pub end: SyntheticEvent,
    pub delay: Duration,
}

pub fn mouse(kind: MouseEventKind, x: f64, y: f64, button: i16) -> SyntheticEvent {
    SyntheticEvent::Mouse(MouseEventInit {
        kind,
        bubbles: true,
        cancelable: kind != MouseEventKind::Move,
        button,
        client_x: x,
        client_y: y,
    })
}

/// Down then up at the same point.
pub fn click(x: f64, y: f64, button: i16) -> Vec<SyntheticEvent> {
    vec![
        mouse(MouseEventKind::Down, x, y, button),
        mouse(MouseEventKind::Up, x, y, button),
    ]
}

pub fn double_click(x: f64, y: f64, button: i16) -> Vec<SyntheticEvent> {
    let mut events = click(x, y, button);
    events.extend(click(x, y, button));
    events
}

/// Build one touch event for `points`.
///
/// Identifiers are assigned 0, 1, 2, ... on every call, so separate calls for
/// the same finger do not share an identifier. `touches` and `targetTouches`
/// are left empty for the end phase: a lifted finger is no longer active.
pub fn touch(phase: TouchPhase, points: &[TouchPoint]) -> SyntheticEvent {
    let changed = touch_list(points);
    let active = match phase {
        TouchPhase::Start | TouchPhase::Move => changed.clone(),
        TouchPhase::End => Vec::new(),
    };
    SyntheticEvent::Touch(TouchEventInit {
        phase,
        bubbles: true,
        cancelable: true,
        touches: active.clone(),
        target_touches: active,
        changed_touches: changed,
    })
}

fn touch_list(points: &[TouchPoint]) -> Vec<Touch> {
    points
        .iter()
        .enumerate()
        .map(|(i, point)| Touch {
            identifier: i as u32,
            point: *point,
        })
        .collect()
}

pub fn touch_click(point: TouchPoint) -> Vec<SyntheticEvent> {
    vec![
        touch(TouchPhase::Start, &[point]),
        touch(TouchPhase::End, &[point]),
    ]
}

pub fn touch_double_click(point: TouchPoint) -> Vec<SyntheticEvent> {
    let mut events = touch_click(point);
    events.extend(touch_click(point));
    events
}

pub fn touch_long_click(point: TouchPoint, delay: Duration) -> LongPress {
    LongPress {
        start: touch(TouchPhase::Start, &[point]),
        end: touch(TouchPhase::End, &[point]),
        delay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_is_not_cancelable() {
        assert!(!mouse(MouseEventKind::Move, 1.0, 2.0, 0).cancelable());
        assert!(mouse(MouseEventKind::Down, 1.0, 2.0, 0).cancelable());
        assert!(mouse(MouseEventKind::Move, 1.0, 2.0, 0).bubbles());
    }

    #[test]
    fn double_click_is_two_pairs() {
        let types: Vec<_> = double_click(0.0, 0.0, 0)
            .iter()
            .map(SyntheticEvent::event_type)
            .collect();
        assert_eq!(types, ["mousedown", "mouseup", "mousedown", "mouseup"]);
    }

    #[test]
    fn end_phase_only_carries_changed_touches() {
        let SyntheticEvent::Touch(init) = touch(TouchPhase::End, &[TouchPoint::at(3.0, 4.0)])
        else {
            panic!("expected touch event");
        };
        assert!(init.touches.is_empty());
        assert!(init.target_touches.is_empty());
        assert_eq!(init.changed_touches.len(), 1);
        assert_eq!(init.changed_touches[0].point.page_y, 4.0);
    }

    #[test]
    fn identifiers_restart_per_event() {
        // Flagged behavior: a finger's identifier is not carried from start to end.
        let points = [TouchPoint::at(1.0, 1.0), TouchPoint::at(2.0, 2.0)];
        for phase in [TouchPhase::Start, TouchPhase::Move, TouchPhase::End] {
            let SyntheticEvent::Touch(init) = touch(phase, &points) else {
                panic!("expected touch event");
            };
            let ids: Vec<_> = init.changed_touches.iter().map(|t| t.identifier).collect();
            assert_eq!(ids, [0, 1]);
        }
    }
}
