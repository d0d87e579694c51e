use futures::{SinkExt, StreamExt};
use screening_common::{Request, Response};
use screening_core::ScreeningConfig;
use screening_core::memory::MemoryPage;
use screening_r::server::ControlServer;
use screening_r::session;
use serde_json::json;
use serial_test::serial;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::LocalSet;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

const FIXTURE: &str = r#"{
    "title": "Checkout",
    "body": [
        {"tag": "form", "children": [
            {"tag": "input", "attributes": {"name": "email"}, "value": "a@b.c"},
            {"tag": "button", "attributes": {"id": "pay"}, "text": "Pay"}
        ]}
    ]
}"#;

fn config_for(origin: String) -> ScreeningConfig {
    let mut config = ScreeningConfig::default();
    config.transport.controller = origin;
    config
}

#[tokio::test]
#[serial]
async fn test_agent_round_trip() {
    // 1. Start the controller on an ephemeral port
    let handle = ControlServer::new(0).start().await.expect("Failed to start server");
    let config = config_for(handle.origin());

    LocalSet::new()
        .run_until(async move {
            // 2. Connect an agent over the fixture page
            let page = MemoryPage::from_json_str(FIXTURE).unwrap();
            tokio::task::spawn_local(async move { session::run(&config, page).await });
            handle.wait_for_agent(Duration::from_secs(5)).await.unwrap();

            // 3. Drive it
            let title = handle.call("getTitle", vec![]).await.unwrap();
            assert_eq!(title.value(), Some(&json!("Checkout")));

            let id = handle.call("element", vec![json!("//button[@id='pay']")]).await.unwrap();
            assert_eq!(id.value(), Some(&json!(0)));

            let text = handle.call("element::getText", vec![json!(0)]).await.unwrap();
            assert_eq!(text.value(), Some(&json!("Pay")));

            let missing = handle.call("element::getText", vec![json!(7)]).await.unwrap();
            assert_eq!(missing.error_code(), Some("ELEMENT_NOT_FOUND"));
        })
        .await;
}

#[tokio::test]
#[serial]
async fn test_wait_does_not_block_other_requests() {
    let handle = ControlServer::new(0).start().await.expect("Failed to start server");
    let config = config_for(handle.origin());

    LocalSet::new()
        .run_until(async move {
            let page = MemoryPage::from_json_str(FIXTURE).unwrap();
            tokio::task::spawn_local(async move { session::run(&config, page).await });
            handle.wait_for_agent(Duration::from_secs(5)).await.unwrap();

            handle
                .send(Request::new(100, "waitForElement", vec![json!("//dialog"), json!(300)]))
                .unwrap();
            handle.send(Request::new(101, "getTitle", vec![])).unwrap();

            let first = handle.recv().await.unwrap();
            let second = handle.recv().await.unwrap();
            assert_eq!(first.id(), 101);
            assert_eq!(second.id(), 100);
            assert_eq!(second.error_code(), Some("TIMEOUT"));
        })
        .await;
}

#[tokio::test]
#[serial]
async fn test_concurrent_calls_each_get_their_response() {
    let handle = ControlServer::new(0).start().await.expect("Failed to start server");
    let config = config_for(handle.origin());

    LocalSet::new()
        .run_until(async move {
            let page = MemoryPage::from_json_str(FIXTURE).unwrap();
            tokio::task::spawn_local(async move { session::run(&config, page).await });
            handle.wait_for_agent(Duration::from_secs(5)).await.unwrap();

            // The wait answers after the title, so one call reads the other's response.
            let both = futures::future::join(
                handle.call("waitForElement", vec![json!("//dialog"), json!(300)]),
                handle.call("getTitle", vec![]),
            );
            let (waited, title) = tokio::time::timeout(Duration::from_secs(5), both)
                .await
                .expect("concurrent calls did not complete");

            assert_eq!(waited.unwrap().error_code(), Some("TIMEOUT"));
            assert_eq!(title.unwrap().value(), Some(&json!("Checkout")));
        })
        .await;
}

#[tokio::test]
#[serial]
async fn test_malformed_frames_are_skipped() {
    // A bare WebSocket controller, so the agent can be sent arbitrary frames.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = format!("http://{}", listener.local_addr().unwrap());
    let config = config_for(origin);

    LocalSet::new()
        .run_until(async move {
            let page = MemoryPage::from_json_str(FIXTURE).unwrap();
            let agent = tokio::task::spawn_local(async move { session::run(&config, page).await });

            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();

            ws.send(Message::Text("not json".into())).await.unwrap();
            ws.send(Message::Text(r#"{"command": "getTitle"}"#.into())).await.unwrap();
            let request = serde_json::to_string(&Request::new(5, "getTitle", vec![])).unwrap();
            ws.send(Message::Text(request)).await.unwrap();

            let reply = ws.next().await.unwrap().unwrap();
            let response: Response = serde_json::from_str(reply.to_text().unwrap()).unwrap();
            assert_eq!(response.id(), 5);
            assert_eq!(response.value(), Some(&json!("Checkout")));

            // Closing the controller side ends the session cleanly.
            ws.close(None).await.unwrap();
            let outcome = tokio::time::timeout(Duration::from_secs(5), agent)
                .await
                .expect("session did not end")
                .unwrap();
            assert!(outcome.is_ok(), "{:?}", outcome.err());
        })
        .await;
}

#[tokio::test]
#[serial]
async fn test_second_agent_in_process_is_rejected() {
    let handle = ControlServer::new(0).start().await.expect("Failed to start server");
    let config = config_for(handle.origin());

    LocalSet::new()
        .run_until(async move {
            let first_config = config.clone();
            tokio::task::spawn_local(async move {
                session::run(&first_config, MemoryPage::new("one")).await
            });
            handle.wait_for_agent(Duration::from_secs(5)).await.unwrap();

            let second = session::run(&config, MemoryPage::new("two")).await;
            let err = second.unwrap_err();
            assert!(err.to_string().contains("re-initialize"), "{}", err);
        })
        .await;
}

#[tokio::test]
async fn test_wait_for_agent_times_out() {
    let handle = ControlServer::new(0).start().await.expect("Failed to start server");
    let err = handle
        .wait_for_agent(Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("No agent connected"));
}
