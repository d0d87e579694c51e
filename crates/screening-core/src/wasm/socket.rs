//! WebSocket transport between the page and the controller.

use super::dom::js_message;
use futures::channel::mpsc::{self, UnboundedReceiver};
use futures::{Sink, sink};
use screening_common::{AgentError, Request, Response};
use std::cell::RefCell;
use std::rc::Rc;
use url::Url;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{MessageEvent, WebSocket};

/// An open controller connection. Dropping it unhooks the callbacks.
pub struct AgentSocket {
    socket: WebSocket,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_close: Closure<dyn FnMut(JsValue)>,
}

impl AgentSocket {
    /// Connect and return the stream of decoded requests.
    ///
    /// Frames that are not requests are logged to the console and skipped.
    /// The stream ends when the socket closes.
    pub fn connect(url: &Url) -> Result<(Self, UnboundedReceiver<Request>), AgentError> {
        let socket = WebSocket::new(url.as_str()).map_err(|e| AgentError::Transport(js_message(&e)))?;
        let (tx, rx) = mpsc::unbounded();
        let sender = Rc::new(RefCell::new(Some(tx)));

        let on_message = {
            let sender = sender.clone();
            Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
                let Some(text) = event.data().as_string() else {
                    web_sys::console::warn_1(&JsValue::from_str("ignoring non-text frame"));
                    return;
                };
                match serde_json::from_str::<Request>(&text) {
                    Ok(request) => {
                        let id = request.id;
                        let delivered = sender
                            .borrow()
                            .as_ref()
                            .is_some_and(|tx| tx.unbounded_send(request).is_ok());
                        if !delivered {
                            web_sys::console::warn_1(&JsValue::from_str(&format!(
                                "dropping request {}: agent is no longer serving",
                                id
                            )));
                        }
                    }
                    Err(e) => web_sys::console::warn_1(&JsValue::from_str(&format!(
                        "skipping malformed frame: {}",
                        e
                    ))),
                }
            })
        };
        socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));

        let on_close = Closure::<dyn FnMut(JsValue)>::new(move |_| {
            sender.borrow_mut().take();
        });
        socket.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        Ok((
            Self {
                socket,
                _on_message: on_message,
                _on_close: on_close,
            },
            rx,
        ))
    }

    /// Sink that writes each response as one text frame.
    pub fn responses(&self) -> impl Sink<Response, Error = AgentError> + Unpin + use<> {
        Box::pin(sink::unfold(
            self.socket.clone(),
            |socket: WebSocket, response: Response| async move {
                let text = serde_json::to_string(&response)
                    .map_err(|e| AgentError::Transport(e.to_string()))?;
                socket
                    .send_with_str(&text)
                    .map_err(|e| AgentError::Transport(js_message(&e)))?;
                Ok::<_, AgentError>(socket)
            },
        ))
    }
}

impl Drop for AgentSocket {
    fn drop(&mut self) {
        self.socket.set_onmessage(None);
        self.socket.set_onclose(None);
    }
}
