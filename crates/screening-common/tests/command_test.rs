use screening_common::{AgentError, Command, ElementId, PointerAction, Request, Response, Target};
use serde_json::json;

fn parse(name: &str, args: serde_json::Value) -> Result<Command, AgentError> {
    let args = match args {
        serde_json::Value::Array(values) => values,
        other => panic!("args must be an array, got {}", other),
    };
    Command::parse(name, args)
}

#[test]
fn test_numeric_target_is_an_id() {
    let cmd = parse("element::getAttribute", json!([3, "href"])).unwrap();
    assert_eq!(
        cmd,
        Command::GetAttribute {
            target: Target::Id(ElementId(3)),
            name: "href".into()
        }
    );
}

#[test]
fn test_string_target_is_a_legacy_selector() {
    let cmd = parse("element::getInnerText", json!(["//h1"])).unwrap();
    assert_eq!(
        cmd,
        Command::GetInnerText {
            target: Target::Selector("//h1".into())
        }
    );
}

#[test]
fn test_mouse_up_maps_to_up_action() {
    let cmd = parse("element::mouseUp", json!([0, 4, 5])).unwrap();
    assert_eq!(
        cmd,
        Command::ElementPointer {
            target: Target::Id(ElementId(0)),
            action: PointerAction::Up,
            x: 4.0,
            y: 5.0
        }
    );
    assert_eq!(cmd.name(), "element::mouseUp");
}

#[test]
fn test_get_selected_value_is_its_own_command() {
    let cmd = parse("element::getSelectedValue", json!([1])).unwrap();
    assert!(matches!(cmd, Command::GetSelectedValue { .. }));
}

#[test]
fn test_wait_timeout_is_optional() {
    let with = parse("waitForElement", json!(["//p", 250])).unwrap();
    let without = parse("waitForElement", json!(["//p"])).unwrap();
    assert_eq!(
        with,
        Command::WaitForElement {
            selector: "//p".into(),
            timeout_ms: Some(250)
        }
    );
    assert_eq!(
        without,
        Command::WaitForElement {
            selector: "//p".into(),
            timeout_ms: None
        }
    );
}

#[test]
fn test_page_click_coordinates() {
    assert_eq!(
        parse("click", json!([])).unwrap(),
        Command::PageClick {
            button: 0,
            position: None
        }
    );
    assert_eq!(
        parse("click", json!([2, 10, 20])).unwrap(),
        Command::PageClick {
            button: 2,
            position: Some((10.0, 20.0))
        }
    );
    let err = parse("click", json!([0, 10])).unwrap_err();
    assert_eq!(err.code(), "INVALID_REQUEST");
}

#[test]
fn test_missing_argument_is_invalid_request() {
    let err = parse("element::getAttribute", json!([0])).unwrap_err();
    assert_eq!(err.code(), "INVALID_REQUEST");

    let err = parse("element::setScroll", json!([0, "left", 3])).unwrap_err();
    assert_eq!(err.code(), "INVALID_REQUEST");
}

#[test]
fn test_unknown_command() {
    let err = parse("element::explode", json!([0])).unwrap_err();
    assert_eq!(err, AgentError::UnknownCommand("element::explode".into()));
    assert_eq!(err.code(), "UNKNOWN_COMMAND");
}

#[test]
fn test_every_name_round_trips() {
    let cases = [
        ("executeScript", json!(["1 + 1"])),
        ("gotoUrl", json!(["http://example.com"])),
        ("refresh", json!([])),
        ("element", json!(["//a"])),
        ("elements", json!(["//a"])),
        ("doesElementExist", json!(["//a"])),
        ("element::setAttribute", json!([0, "title", 5])),
        ("element::getScroll", json!([0])),
        ("element::setSelectedIndex", json!([0, 1])),
        ("element::setSelectedValue", json!([0, "b"])),
        ("element::getText", json!([0])),
        ("element::getComputedStyle", json!([0])),
        ("element::isEnabled", json!([0])),
        ("element::isFocused", json!([0])),
        ("element::focus", json!([0])),
        ("element::setValue", json!([0, "x"])),
        ("element::click", json!([0, 0, 1, 1])),
        ("element::dblclick", json!([0, 1, 1])),
        ("element::touchMove", json!([0, 1, 1])),
        ("element::touchClick", json!([0])),
        ("element::touchDblClick", json!([0])),
        ("element::touchLongClick", json!([0])),
        ("component", json!([0])),
        ("component::getObjectName", json!([0])),
        ("component::getModuleId", json!([0])),
        ("component::getProperty", json!([0, "value"])),
        ("component::setProperty", json!([0, "value", 3])),
        ("component::callMethod", json!([0, "reset"])),
        ("getTitle", json!([])),
        ("getSource", json!([])),
        ("getScroll", json!([])),
        ("setScroll", json!([0, 10])),
        ("getWindowSize", json!([])),
        ("mouseMove", json!([1, 1])),
        ("doubleClick", json!([])),
    ];
    for (name, args) in cases {
        let cmd = parse(name, args).unwrap_or_else(|e| panic!("{} failed: {}", name, e));
        assert_eq!(cmd.name(), name);
    }
}

#[test]
fn test_response_wire_format() {
    let ok = Response::from_result(7, Ok(vec![json!(3)]));
    assert_eq!(
        serde_json::to_value(&ok).unwrap(),
        json!({"status": "ok", "id": 7, "result": [3]})
    );

    let err = Response::from_result(8, Err(AgentError::ElementNotFound { id: ElementId(9) }));
    assert_eq!(
        serde_json::to_value(&err).unwrap(),
        json!({
            "status": "error",
            "id": 8,
            "code": "ELEMENT_NOT_FOUND",
            "message": "Element 9 does not exist."
        })
    );
}

#[test]
fn test_request_args_default_to_empty() {
    let request: Request = serde_json::from_str(r#"{"id": 1, "command": "getTitle"}"#).unwrap();
    assert_eq!(request, Request::new(1, "getTitle", vec![]));
}

#[test]
fn test_resolution_messages() {
    assert_eq!(
        AgentError::no_match("//x").to_string(),
        "Could not find element with selector //x"
    );
    assert!(AgentError::no_match("//x").is_no_match());
    let failed = AgentError::evaluation_failed("//[", "bad");
    assert!(!failed.is_no_match());
    assert_eq!(failed.code(), "RESOLUTION_ERROR");
}
