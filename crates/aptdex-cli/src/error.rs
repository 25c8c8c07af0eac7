use aptdex_config::error::ConfigError;
use aptdex_dl::TransportError;
use aptdex_registry::RegistryError;
use aptdex_server::ServerError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Transport(#[from] TransportError),

    #[error("Invalid proxy '{proxy}': {source}")]
    #[diagnostic(
        code(aptdex_cli::proxy),
        help("Use a URL such as http://host:port or socks5://host:port")
    )]
    InvalidProxy {
        proxy: String,
        #[source]
        source: ureq::Error,
    },

    #[error("Failed to write JSON output: {0}")]
    #[diagnostic(code(aptdex_cli::json))]
    Json(#[from] serde_json::Error),

    #[error("Error while {action}: {source}")]
    #[diagnostic(code(aptdex_cli::io))]
    IoError {
        action: String,
        source: std::io::Error,
    },
}

pub type CliResult<T> = std::result::Result<T, CliError>;
