//! Session layer for aptdex.
//!
//! Clients connect over WebSocket and send JSON text frames of the form
//! `{"command": <name>, "payload": <any>}`. The only command shipped is
//! [`IndexRepoCommand`] (`index_repo`), which indexes each repository in the
//! payload and answers with one `Repository Completed` frame per repository.

pub mod command;
pub mod error;
pub mod index_repo;
pub mod session;

use std::sync::Arc;

use aptdex_registry::RepositoryIndexer;

pub use command::{Command, CommandRegistry, Responder};
pub use error::{Result, ServerError};
pub use index_repo::{IndexRepoCommand, RepositoryRequest};
pub use session::{router, run, serve, Dispatch, DEFAULT_MAX_PAYLOAD_SIZE};

/// Registry with every built-in command, backed by `indexer`.
pub fn default_registry(indexer: Arc<RepositoryIndexer>) -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry.register(Arc::new(IndexRepoCommand::new(indexer)));
    registry
}
