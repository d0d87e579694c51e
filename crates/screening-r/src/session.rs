//! Native agent session: connects an in-memory page to a controller.

use futures::{SinkExt, StreamExt, future};
use screening_common::{AgentError, Request, Response};
use screening_core::memory::MemoryPage;
use screening_core::{Agent, ScreeningConfig, TokioScheduler};
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{info, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("{0}")]
    Agent(#[from] AgentError),

    #[error("No agent connected within {0:?}")]
    NoAgent(Duration),

    #[error("Connection closed")]
    Closed,
}

fn decode_request(text: &str) -> Option<Request> {
    match serde_json::from_str(text) {
        Ok(request) => Some(request),
        Err(e) => {
            warn!(error = %e, "skipping malformed frame");
            None
        }
    }
}

/// Connect to `url` and serve `agent` until the controller hangs up.
pub async fn connect_and_serve(agent: &Agent, url: &Url) -> Result<(), TransportError> {
    let (ws_stream, _) = connect_async(url.as_str()).await?;
    info!(%url, "connected to controller");
    let (ws_sender, ws_receiver) = ws_stream.split();

    let incoming = ws_receiver
        .take_while(|message| {
            future::ready(match message {
                Ok(Message::Close(_)) => false,
                Ok(_) => true,
                Err(e) => {
                    warn!(error = %e, "connection error");
                    false
                }
            })
        })
        .filter_map(|message| {
            future::ready(match message {
                Ok(Message::Text(text)) => decode_request(&text),
                _ => None,
            })
        });

    let outgoing = ws_sender.with(|response: Response| {
        future::ready(
            serde_json::to_string(&response)
                .map(Message::Text)
                .map_err(TransportError::from),
        )
    });

    screening_core::serve(agent, Box::pin(incoming), Box::pin(outgoing)).await?;
    Ok(())
}

/// Run one agent over `page` against the configured controller.
///
/// Must be called inside a [`tokio::task::LocalSet`].
pub async fn run(config: &ScreeningConfig, page: MemoryPage) -> Result<(), TransportError> {
    let _guard = screening_core::initialize()?;
    let url = screening_core::endpoint_url(&config.transport.controller, &config.transport.path)?;
    let agent = Agent::with_config(
        Rc::new(page),
        Rc::new(TokioScheduler::new()),
        config.agent.clone(),
    );
    connect_and_serve(&agent, &url).await
}
