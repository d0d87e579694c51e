//! Controller side: accepts agent connections and drives them.

use crate::session::TransportError;
use futures::{SinkExt, StreamExt};
use screening_common::{Request, Response};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

pub struct ControlServer {
    port: u16,
}

/// Sends requests to connected agents and collects their responses.
pub struct ControlHandle {
    /// Address actually bound; differs from the requested one for port 0.
    pub addr: SocketAddr,
    pub request_tx: broadcast::Sender<Request>,
    pub response_rx: Arc<Mutex<mpsc::Receiver<Response>>>,
    next_id: AtomicU64,
    // Responses read by `call` while it was waiting on a different id.
    parked: Mutex<HashMap<u64, Response>>,
}

impl ControlServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn start(&self) -> Result<ControlHandle, TransportError> {
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], self.port))).await?;
        let addr = listener.local_addr()?;
        info!(%addr, "control server listening");

        let (request_tx, _) = broadcast::channel(100);
        let (response_tx, response_rx) = mpsc::channel(100);

        let server_request_tx = request_tx.clone();
        tokio::spawn(async move {
            while let Ok((stream, peer)) = listener.accept().await {
                info!(%peer, "accepted agent connection");
                tokio::spawn(accept_connection(
                    stream,
                    server_request_tx.subscribe(),
                    response_tx.clone(),
                ));
            }
        });

        Ok(ControlHandle {
            addr,
            request_tx,
            response_rx: Arc::new(Mutex::new(response_rx)),
            next_id: AtomicU64::new(1),
            parked: Mutex::new(HashMap::new()),
        })
    }
}

impl ControlHandle {
    /// Origin an agent should be pointed at, e.g. `http://127.0.0.1:9001`.
    pub fn origin(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Wait until at least one agent is connected.
    pub async fn wait_for_agent(&self, timeout: Duration) -> Result<(), TransportError> {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.request_tx.receiver_count() == 0 {
            if tokio::time::Instant::now() >= deadline {
                return Err(TransportError::NoAgent(timeout));
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        Ok(())
    }

    pub fn send(&self, request: Request) -> Result<(), TransportError> {
        self.request_tx
            .send(request)
            .map(|_| ())
            .map_err(|_| TransportError::Closed)
    }

    pub async fn recv(&self) -> Result<Response, TransportError> {
        self.response_rx
            .lock()
            .await
            .recv()
            .await
            .ok_or(TransportError::Closed)
    }

    /// Send `command` under a fresh id and wait for its response.
    ///
    /// Safe to run concurrently: whoever holds the receiver parks responses
    /// for other calls, and each call looks at the parked ones under that
    /// same lock before reading the socket again.
    pub async fn call(&self, command: &str, args: Vec<Value>) -> Result<Response, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.send(Request::new(id, command, args))?;
        debug!(id, command, "sent request");

        loop {
            let mut rx = self.response_rx.lock().await;
            if let Some(response) = self.parked.lock().await.remove(&id) {
                return Ok(response);
            }
            let response = rx.recv().await.ok_or(TransportError::Closed)?;
            if response.id() == id {
                return Ok(response);
            }
            self.parked.lock().await.insert(response.id(), response);
        }
    }
}

async fn accept_connection(
    stream: TcpStream,
    mut request_rx: broadcast::Receiver<Request>,
    response_tx: mpsc::Sender<Response>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            error!("Error during the websocket handshake occurred: {}", e);
            return;
        }
    };
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    loop {
        tokio::select! {
            request = request_rx.recv() => {
                let request = match request {
                    Ok(request) => request,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "agent connection fell behind");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let json = match serde_json::to_string(&request) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to encode request {}: {}", request.id, e);
                        continue;
                    }
                };
                if let Err(e) = ws_sender.send(Message::Text(json)).await {
                    error!("Failed to send message to WS: {}", e);
                    break;
                }
            }

            message = ws_receiver.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<Response>(&text) {
                            Ok(response) => {
                                if let Err(e) = response_tx.send(response).await {
                                    error!("Failed to forward response: {}", e);
                                    break;
                                }
                            }
                            Err(e) => warn!("Failed to parse response from agent: {} | Text: {}", e, text),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("agent disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}
