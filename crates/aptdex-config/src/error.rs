use aptdex_utils::error::{BytesError, DurationError, PathError, UtilsError};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML serialization error: {0}")]
    #[diagnostic(
        code(aptdex_config::toml_serialize),
        help("Check your configuration structure for invalid values")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(aptdex_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Configuration file already exists")]
    #[diagnostic(
        code(aptdex_config::already_exists),
        help("Remove the existing config file or use a different location")
    )]
    ConfigAlreadyExists,

    #[error("Invalid listen address: {0}")]
    #[diagnostic(
        code(aptdex_config::invalid_listen),
        help("Use a socket address such as 0.0.0.0:9000")
    )]
    InvalidListenAddress(String),

    #[error("Invalid value for `{field}`")]
    #[diagnostic(
        code(aptdex_config::invalid_size),
        help("Use a size such as 256 MiB, 64KiB or 1048576")
    )]
    InvalidSize {
        field: &'static str,
        #[source]
        source: BytesError,
    },

    #[error("Invalid value for `{field}`")]
    #[diagnostic(
        code(aptdex_config::invalid_duration),
        help("Use a duration such as 10s, 1m30s or 500ms")
    )]
    InvalidDuration {
        field: &'static str,
        #[source]
        source: DurationError,
    },

    #[error("`parse_workers` must be at least 1")]
    #[diagnostic(code(aptdex_config::invalid_parse_workers))]
    InvalidParseWorkers,

    #[error("`codecs` must list at least one index variant")]
    #[diagnostic(
        code(aptdex_config::empty_codecs),
        help("Supported variants are zst, bz2, gz, xz and plain")
    )]
    EmptyCodecList,

    #[error("IO error: {0}")]
    #[diagnostic(code(aptdex_config::io))]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(code(aptdex_config::utils))]
    Utils(#[from] UtilsError),

    #[error("Failed to parse TOML: {0}")]
    #[diagnostic(code(aptdex_config::toml))]
    Toml(#[from] toml_edit::TomlError),

    #[error("Encountered unexpected TOML item: {0}")]
    #[diagnostic(code(aptdex_config::unexpected_toml_item))]
    UnexpectedTomlItem(String),
}

impl From<PathError> for ConfigError {
    fn from(err: PathError) -> Self {
        Self::Utils(UtilsError::Path(err))
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
