use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum TransportError {
    #[error("Invalid URL: {url}")]
    #[diagnostic(code(aptdex_dl::invalid_url))]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Unsupported URL scheme '{scheme}': {url}")]
    #[diagnostic(
        code(aptdex_dl::unsupported_scheme),
        help("Repository URLs must use http or https")
    )]
    UnsupportedScheme { url: String, scheme: String },

    #[error(transparent)]
    #[diagnostic(
        code(aptdex_dl::network),
        help("Check your internet connection or try again later")
    )]
    Network(#[from] Box<ureq::Error>),

    #[error("HTTP {status}: {url}")]
    #[diagnostic(code(aptdex_dl::http_status))]
    HttpStatus { status: u16, url: String },

    #[error("Empty response body: {url}")]
    #[diagnostic(code(aptdex_dl::empty_body))]
    EmptyBody { url: String },

    #[error("Invalid header '{name}': {reason}")]
    #[diagnostic(
        code(aptdex_dl::invalid_header),
        help("Headers are given as 'Name: value'")
    )]
    InvalidHeader { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, TransportError>;

impl From<ureq::Error> for TransportError {
    fn from(e: ureq::Error) -> Self {
        Self::Network(Box::new(e))
    }
}

impl TransportError {
    /// HTTP status code carried by this error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus {
                status, ..
            } => Some(*status),
            Self::Network(err) => {
                match err.as_ref() {
                    ureq::Error::StatusCode(code) => Some(*code),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}
