use screening_common::{Request, Response};
use screening_core::events::SyntheticEvent;
use screening_core::memory::{MemoryPage, NodeSpec};
use screening_core::{Agent, AgentConfig, TokioScheduler};
use serde_json::{Value, json};
use std::rc::Rc;
use std::time::Duration;
use tokio::task::LocalSet;
use tokio::time::Instant;

fn agent_for(page: &MemoryPage) -> Agent {
    Agent::new(Rc::new(page.clone()), Rc::new(TokioScheduler::new()))
}

async fn call(agent: &Agent, command: &str, args: Value) -> Response {
    let args = args.as_array().cloned().unwrap_or_default();
    agent.handle(Request::new(1, command, args)).await
}

#[tokio::test(start_paused = true)]
async fn test_wait_times_out_at_deadline() {
    let page = MemoryPage::new("Empty");
    let agent = agent_for(&page);

    let start = Instant::now();
    let response = call(&agent, "waitForElement", json!(["//dialog", 2000])).await;

    assert_eq!(response.error_code(), Some("TIMEOUT"));
    assert_eq!(start.elapsed(), Duration::from_millis(2000));
    assert_eq!(agent.registered_elements(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_wait_deadline_not_on_poll_boundary() {
    let page = MemoryPage::new("Empty");
    let agent = agent_for(&page);

    let start = Instant::now();
    let response = call(&agent, "waitForElement", json!(["//dialog", 1200])).await;

    assert_eq!(response.error_code(), Some("TIMEOUT"));
    assert_eq!(start.elapsed(), Duration::from_millis(1200));
}

#[tokio::test(start_paused = true)]
async fn test_wait_returns_immediately_when_present() {
    let page = MemoryPage::new("Present");
    page.append(page.body(), &NodeSpec::new("dialog"));
    let agent = agent_for(&page);

    let start = Instant::now();
    let response = call(&agent, "waitForElement", json!(["//dialog", 2000])).await;

    assert_eq!(response.value(), Some(&json!(0)));
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_wait_sees_element_added_later() {
    LocalSet::new()
        .run_until(async {
            let page = MemoryPage::new("Late");
            let agent = agent_for(&page);
            let body = page.body();
            let later = page.clone();
            tokio::task::spawn_local(async move {
                tokio::time::sleep(Duration::from_millis(1200)).await;
                later.append(body, &NodeSpec::new("div").attr("id", "late"));
            });

            let start = Instant::now();
            let response = call(&agent, "waitForElement", json!(["//div[@id='late']", 5000])).await;

            // Found on the first poll after it appeared.
            assert_eq!(response.value(), Some(&json!(0)));
            assert_eq!(start.elapsed(), Duration::from_millis(1500));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_wait_aborts_on_invalid_selector() {
    let page = MemoryPage::new("Empty");
    let agent = agent_for(&page);

    let start = Instant::now();
    let response = call(&agent, "waitForElement", json!(["//div[", 2000])).await;

    assert_eq!(response.error_code(), Some("RESOLUTION_ERROR"));
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_wait_uses_configured_default_timeout() {
    let page = MemoryPage::new("Empty");
    let config = AgentConfig {
        default_wait_timeout_ms: 750,
        poll_interval_ms: 250,
        ..AgentConfig::default()
    };
    let agent = Agent::with_config(Rc::new(page.clone()), Rc::new(TokioScheduler::new()), config);

    let start = Instant::now();
    let response = call(&agent, "waitForElement", json!(["//dialog"])).await;

    assert_eq!(response.error_code(), Some("TIMEOUT"));
    assert_eq!(start.elapsed(), Duration::from_millis(750));
}

#[tokio::test(start_paused = true)]
async fn test_zero_poll_interval_still_reaches_deadline() {
    let page = MemoryPage::new("Empty");
    let config = AgentConfig {
        poll_interval_ms: 0,
        ..AgentConfig::default()
    };
    let agent = Agent::with_config(Rc::new(page.clone()), Rc::new(TokioScheduler::new()), config);

    let start = Instant::now();
    let response = call(&agent, "waitForElement", json!(["//dialog", 20])).await;

    assert_eq!(response.error_code(), Some("TIMEOUT"));
    assert_eq!(start.elapsed(), Duration::from_millis(20));
}

#[tokio::test(start_paused = true)]
async fn test_zero_timeout_is_one_attempt() {
    let page = MemoryPage::new("Empty");
    let agent = agent_for(&page);

    let start = Instant::now();
    let response = call(&agent, "waitForElement", json!(["//dialog", 0])).await;

    assert_eq!(response.error_code(), Some("TIMEOUT"));
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_touch_long_click_defers_touchend() {
    LocalSet::new()
        .run_until(async {
            let page = MemoryPage::new("Touch");
            let target = page.append(page.body(), &NodeSpec::new("div"));
            let agent = agent_for(&page);
            let id = call(&agent, "element", json!(["//div"])).await.value().cloned().unwrap();

            let start = Instant::now();
            let response = call(&agent, "element::touchLongClick", json!([id])).await;

            // Answered before the press ends.
            assert!(response.is_ok());
            assert_eq!(start.elapsed(), Duration::ZERO);
            assert_eq!(page.event_types(target), vec!["touchstart"]);

            tokio::time::sleep(Duration::from_millis(1499)).await;
            assert_eq!(page.event_types(target), vec!["touchstart"]);

            tokio::time::sleep(Duration::from_millis(10)).await;
            assert_eq!(page.event_types(target), vec!["touchstart", "touchend"]);

            let events = page.events(target);
            let SyntheticEvent::Touch(end) = &events[1] else {
                panic!("expected a touch event");
            };
            assert!(end.touches.is_empty());
            assert_eq!(end.changed_touches.len(), 1);
            assert_eq!(end.changed_touches[0].point.client_x, 0.0);
        })
        .await;
}
