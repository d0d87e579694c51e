//! Session plumbing between a transport and the agent.

use crate::agent::Agent;
use futures::stream::FuturesUnordered;
use futures::{Sink, SinkExt, Stream, StreamExt};
use screening_common::{AgentError, Request, Response};
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};
use url::Url;

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Held for as long as the agent is connected. Dropping it is teardown.
#[derive(Debug)]
pub struct SessionGuard {
    _private: (),
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        INITIALIZED.store(false, Ordering::SeqCst);
    }
}

/// Claim the one agent slot for this process (or page).
pub fn initialize() -> Result<SessionGuard, AgentError> {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return Err(AgentError::AlreadyInitialized);
    }
    Ok(SessionGuard { _private: () })
}

/// WebSocket endpoint for a controller origin.
///
/// A trailing slash on the origin is dropped before `path` is appended, and
/// `http`/`https` map to `ws`/`wss`.
pub fn endpoint_url(origin: &str, path: &str) -> Result<Url, AgentError> {
    let origin = origin.strip_suffix('/').unwrap_or(origin);
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    let mut url = Url::parse(&format!("{}{}", origin, path))
        .map_err(|e| AgentError::Transport(format!("invalid controller origin {}: {}", origin, e)))?;
    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        "ws" | "wss" => return Ok(url),
        other => {
            return Err(AgentError::Transport(format!(
                "unsupported controller scheme: {}",
                other
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| AgentError::Transport(format!("cannot use scheme {}", scheme)))?;
    Ok(url)
}

/// Serve requests from `incoming` until it ends, writing responses to `outgoing`.
///
/// Each request's handler starts as soon as the request arrives, so a
/// long-running wait does not hold up the commands behind it. Responses are
/// written in completion order. When `incoming` ends, in-flight handlers are
/// drained before returning.
pub async fn serve<St, Si>(agent: &Agent, incoming: St, mut outgoing: Si) -> Result<(), AgentError>
where
    St: Stream<Item = Request> + Unpin,
    Si: Sink<Response> + Unpin,
    Si::Error: Display,
{
    let mut incoming = incoming.fuse();
    let mut in_flight = FuturesUnordered::new();
    info!("agent session started");

    loop {
        futures::select! {
            request = incoming.next() => match request {
                Some(request) => {
                    debug!(request = request.id, command = %request.command, "received");
                    in_flight.push(agent.handle(request));
                }
                None => break,
            },
            response = in_flight.select_next_some() => {
                send(&mut outgoing, response).await?;
            }
        }
    }

    while let Some(response) = in_flight.next().await {
        send(&mut outgoing, response).await?;
    }
    info!("agent session ended");
    Ok(())
}

async fn send<Si>(outgoing: &mut Si, response: Response) -> Result<(), AgentError>
where
    Si: Sink<Response> + Unpin,
    Si::Error: Display,
{
    outgoing
        .send(response)
        .await
        .map_err(|e| AgentError::Transport(e.to_string()))
}
