//! Browser host: the agent running inside a real page.

pub mod dom;
pub mod scheduler;
pub mod socket;

pub use dom::WasmDocument;
pub use scheduler::TimerScheduler;
pub use socket::AgentSocket;

use crate::agent::Agent;
use crate::config::TransportConfig;
use crate::session;
use std::rc::Rc;
use wasm_bindgen::prelude::*;

/// Connect this page to the controller at `origin` and start serving commands.
///
/// Fails if an agent is already running in this page.
#[wasm_bindgen]
pub fn run(origin: &str) -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    let guard = session::initialize().map_err(|e| JsValue::from_str(&e.to_string()))?;
    let url = session::endpoint_url(origin, &TransportConfig::default().path)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    let document = WasmDocument::current().map_err(|e| JsValue::from_str(&e.to_string()))?;
    let (socket, incoming) =
        AgentSocket::connect(&url).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let agent = Agent::new(Rc::new(document), Rc::new(TimerScheduler::new()));

    wasm_bindgen_futures::spawn_local(async move {
        // The slot stays claimed until the controller hangs up.
        let _guard = guard;
        if let Err(e) = session::serve(&agent, incoming, socket.responses()).await {
            web_sys::console::error_1(&JsValue::from_str(&format!("agent session failed: {}", e)));
        }
    });
    Ok(())
}

/// Crate version, for the controller's handshake checks.
#[wasm_bindgen(js_name = getVersion)]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
