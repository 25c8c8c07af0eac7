//! Session commands and the registry that routes them.

use std::{collections::HashMap, sync::Arc};

use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedSender;

use crate::error::Result;

/// Timestamp format used in every response frame.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const STATUS_CONNECTED: &str = "connected";
pub const STATUS_INVALID_JSON: &str = "Error: Invalid JSON";
pub const STATUS_MISSING_COMMAND: &str = "Error: Missing 'command' parameter";
pub const STATUS_MISSING_PAYLOAD: &str = "Error: Missing 'payload' parameter";
pub const STATUS_COMMAND_NOT_FOUND: &str = "Error: Command not found";
pub const STATUS_VALIDATION_FAILURE: &str = "Error: Payload Validation Failure";
pub const STATUS_EXECUTION_FAILURE: &str = "Error: Command Execution Failure";

pub fn timestamp() -> String {
    chrono::Local::now().format(DATE_FORMAT).to_string()
}

/// A `{status, date}` response frame.
pub fn status(status: &str) -> Value {
    json!({
        "status": status,
        "date": timestamp(),
    })
}

/// A `{status, date, error}` response frame.
pub fn status_with_error(status: &str, error: impl ToString) -> Value {
    json!({
        "status": status,
        "date": timestamp(),
        "error": error.to_string(),
    })
}

/// Sends response frames back to the session that issued a command.
///
/// Usable from blocking code; frames are delivered in the order sent.
#[derive(Clone)]
pub struct Responder {
    tx: UnboundedSender<Value>,
}

impl Responder {
    pub fn new(tx: UnboundedSender<Value>) -> Self {
        Self {
            tx,
        }
    }

    /// Queues a frame. Frames for a closed session are dropped.
    pub fn send(&self, frame: Value) {
        let _ = self.tx.send(frame);
    }
}

/// A named operation a client can invoke.
///
/// `execute` runs on a blocking thread and is only called with payloads that
/// passed `validate`.
pub trait Command: Send + Sync {
    fn name(&self) -> &'static str;

    fn validate(&self, payload: &Value) -> Result<()>;

    fn execute(&self, payload: Value, responder: &Responder) -> Result<()>;
}

#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<&'static str, Arc<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `command`, replacing any command with the same name.
    pub fn register(&mut self, command: Arc<dyn Command>) {
        self.commands.insert(command.name(), command);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.commands.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
