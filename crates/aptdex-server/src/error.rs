use std::net::SocketAddr;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ServerError {
    #[error("{0}")]
    #[diagnostic(code(aptdex_server::validation))]
    Validation(String),

    #[error("Failed to bind {addr}: {source}")]
    #[diagnostic(
        code(aptdex_server::bind),
        help("Check that no other process is listening on this address")
    )]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(aptdex_server::io))]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
