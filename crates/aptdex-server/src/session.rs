//! WebSocket sessions.
//!
//! Every connection gets a `connected` frame, then each text frame is routed
//! through the [`CommandRegistry`]. Requests on one connection are handled one
//! at a time, in arrival order; command execution runs on the blocking pool so
//! a long index never stalls other connections.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::Response,
    routing::get,
    Router,
};
use serde_json::Value;
use tokio::{net::TcpListener, sync::mpsc};
use tracing::{debug, info, warn};

use crate::{
    command::{
        status, status_with_error, Command, CommandRegistry, Responder, STATUS_COMMAND_NOT_FOUND,
        STATUS_CONNECTED, STATUS_EXECUTION_FAILURE, STATUS_INVALID_JSON, STATUS_MISSING_COMMAND,
        STATUS_MISSING_PAYLOAD, STATUS_VALIDATION_FAILURE,
    },
    error::{Result, ServerError},
};

/// Default cap on a single inbound message.
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// A session that sends nothing, not even a ping, for this long is closed.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(36);

/// What to do with one inbound text frame.
pub enum Dispatch {
    /// Answer immediately with this frame.
    Reply(Value),
    /// Run a validated command.
    Execute {
        command: Arc<dyn Command>,
        payload: Value,
    },
}

impl CommandRegistry {
    /// Parses a client frame and resolves it to a validated command.
    pub fn dispatch(&self, text: &str) -> Dispatch {
        let mut message: Value = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(err) => return Dispatch::Reply(status_with_error(STATUS_INVALID_JSON, err)),
        };

        let Some(name) = message.get("command") else {
            return Dispatch::Reply(status(STATUS_MISSING_COMMAND));
        };
        if message.get("payload").is_none() {
            return Dispatch::Reply(status(STATUS_MISSING_PAYLOAD));
        }
        let Some(name) = name.as_str() else {
            return Dispatch::Reply(status_with_error(
                STATUS_INVALID_JSON,
                "'command' must be a string",
            ));
        };

        let Some(command) = self.get(name) else {
            debug!(command = name, "unknown command");
            return Dispatch::Reply(status(STATUS_COMMAND_NOT_FOUND));
        };

        let payload = message["payload"].take();
        if let Err(err) = command.validate(&payload) {
            debug!(command = command.name(), "payload rejected: {err}");
            return Dispatch::Reply(status_with_error(STATUS_VALIDATION_FAILURE, err));
        }

        Dispatch::Execute {
            command,
            payload,
        }
    }
}

#[derive(Clone)]
struct AppState {
    registry: Arc<CommandRegistry>,
    max_payload_size: usize,
}

/// Builds the router serving sessions on `/`.
pub fn router(registry: Arc<CommandRegistry>, max_payload_size: usize) -> Router {
    let state = AppState {
        registry,
        max_payload_size,
    };
    Router::new().route("/", get(handle_upgrade)).with_state(state)
}

/// Serves sessions on an already bound listener until the process exits.
pub async fn serve(
    listener: TcpListener,
    registry: Arc<CommandRegistry>,
    max_payload_size: usize,
) -> Result<()> {
    let app = router(registry, max_payload_size);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Binds `addr` and serves sessions.
pub async fn run(
    addr: SocketAddr,
    registry: Arc<CommandRegistry>,
    max_payload_size: usize,
) -> Result<()> {
    let listener = TcpListener::bind(addr).await.map_err(|source| {
        ServerError::Bind {
            addr,
            source,
        }
    })?;
    info!(
        "Listening on {} (commands: {})",
        listener.local_addr()?,
        registry.names().join(", ")
    );
    serve(listener, registry, max_payload_size).await
}

async fn handle_upgrade(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    ws.max_message_size(state.max_payload_size)
        .on_upgrade(move |socket| handle_session(socket, peer, state.registry))
}

async fn send(socket: &mut WebSocket, frame: &Value) -> bool {
    socket
        .send(Message::Text(frame.to_string().into()))
        .await
        .is_ok()
}

async fn handle_session(mut socket: WebSocket, peer: SocketAddr, registry: Arc<CommandRegistry>) {
    debug!(%peer, "session opened");

    if !send(&mut socket, &status(STATUS_CONNECTED)).await {
        return;
    }

    loop {
        let message = match tokio::time::timeout(IDLE_TIMEOUT, socket.recv()).await {
            Ok(Some(message)) => message,
            Ok(None) => break,
            Err(_) => {
                debug!(%peer, "session idle, closing");
                break;
            }
        };
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                debug!(%peer, "session error: {err}");
                break;
            }
        };

        match registry.dispatch(text.as_str()) {
            Dispatch::Reply(frame) => {
                if !send(&mut socket, &frame).await {
                    break;
                }
            }
            Dispatch::Execute {
                command,
                payload,
            } => {
                if !execute(&mut socket, command, payload).await {
                    break;
                }
            }
        }
    }

    debug!(%peer, "session closed");
}

/// Runs `command` off the async runtime, forwarding its frames as they arrive.
async fn execute(socket: &mut WebSocket, command: Arc<dyn Command>, payload: Value) -> bool {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let name = command.name();
    let task = tokio::task::spawn_blocking(move || {
        let responder = Responder::new(tx);
        command.execute(payload, &responder)
    });

    let mut open = true;
    while let Some(frame) = rx.recv().await {
        if open && !send(socket, &frame).await {
            // keep draining so the command can finish
            open = false;
        }
    }

    let failure = match task.await {
        Ok(Ok(())) => None,
        Ok(Err(err)) => Some(err.to_string()),
        Err(err) => Some(format!("command '{name}' aborted: {err}")),
    };

    if let Some(error) = failure {
        warn!(command = name, "execution failed: {error}");
        if open {
            open = send(socket, &status_with_error(STATUS_EXECUTION_FAILURE, error)).await;
        }
    }
    open
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct Probe;

    impl Command for Probe {
        fn name(&self) -> &'static str {
            "probe"
        }

        fn validate(&self, payload: &Value) -> Result<()> {
            match payload.as_u64() {
                Some(_) => Ok(()),
                None => Err(ServerError::Validation("expected a number".into())),
            }
        }

        fn execute(&self, _payload: Value, _responder: &Responder) -> Result<()> {
            Ok(())
        }
    }

    fn registry() -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(Probe));
        registry
    }

    fn reply_status(dispatch: Dispatch) -> Value {
        match dispatch {
            Dispatch::Reply(frame) => frame,
            Dispatch::Execute {
                ..
            } => panic!("expected an immediate reply"),
        }
    }

    #[test]
    fn test_dispatch_invalid_json() {
        let frame = reply_status(registry().dispatch("{not json"));
        assert_eq!(frame["status"], STATUS_INVALID_JSON);
        assert!(frame["error"].is_string());
    }

    #[test]
    fn test_dispatch_missing_fields() {
        let registry = registry();
        assert_eq!(
            reply_status(registry.dispatch(r#"{"payload": 1}"#))["status"],
            STATUS_MISSING_COMMAND
        );
        assert_eq!(
            reply_status(registry.dispatch("[1, 2]"))["status"],
            STATUS_MISSING_COMMAND
        );
        assert_eq!(
            reply_status(registry.dispatch(r#"{"command": "probe"}"#))["status"],
            STATUS_MISSING_PAYLOAD
        );
    }

    #[test]
    fn test_dispatch_non_string_command() {
        let frame = reply_status(registry().dispatch(r#"{"command": 5, "payload": 1}"#));
        assert_eq!(frame["status"], STATUS_INVALID_JSON);
    }

    #[test]
    fn test_dispatch_unknown_command() {
        let frame = reply_status(registry().dispatch(r#"{"command": "nope", "payload": 1}"#));
        assert_eq!(frame["status"], STATUS_COMMAND_NOT_FOUND);
        assert!(frame.get("error").is_none());
    }

    #[test]
    fn test_dispatch_validation_failure() {
        let frame = reply_status(registry().dispatch(r#"{"command": "probe", "payload": "x"}"#));
        assert_eq!(frame["status"], STATUS_VALIDATION_FAILURE);
        assert_eq!(frame["error"], "expected a number");
    }

    #[test]
    fn test_dispatch_execute() {
        match registry().dispatch(r#"{"command": "probe", "payload": 3}"#) {
            Dispatch::Execute {
                command,
                payload,
            } => {
                assert_eq!(command.name(), "probe");
                assert_eq!(payload, json!(3));
            }
            Dispatch::Reply(frame) => panic!("unexpected reply {frame}"),
        }
    }
}
