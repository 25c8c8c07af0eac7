//! Error types for the registry crate.
//!
//! [`RegistryError`] covers failures that abort an operation outright. Errors
//! that are recovered from during indexing live next to the code that
//! produces them: [`DecodeError`](crate::codec::DecodeError),
//! [`FormatError`](crate::control::FormatError) and
//! [`RequestError`](crate::index::RequestError).

use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur during registry operations.
#[derive(Error, Diagnostic, Debug)]
pub enum RegistryError {
    #[error("Error while {action}: {source}")]
    #[diagnostic(code(aptdex_registry::io))]
    IoError {
        action: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(
        code(aptdex_registry::transport),
        help("Check your network connection and the repository URL")
    )]
    Transport(#[from] aptdex_dl::TransportError),

    #[error(transparent)]
    #[diagnostic(code(aptdex_registry::decode))]
    Decode(#[from] crate::codec::DecodeError),

    #[error("Failed to build parse worker pool: {0}")]
    #[diagnostic(
        code(aptdex_registry::thread_pool),
        help("Try lowering `parse_workers` in the configuration")
    )]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Unknown index variant '{0}'")]
    #[diagnostic(
        code(aptdex_registry::unknown_codec),
        help("Supported variants are zst, bz2, gz, xz and plain")
    )]
    UnknownCodec(String),
}

/// A specialized Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Extension trait for adding context to I/O errors.
pub trait ErrorContext<T> {
    /// Adds context to an error, describing what action was being performed.
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            RegistryError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}
