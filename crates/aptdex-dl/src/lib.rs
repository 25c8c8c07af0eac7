pub mod error;
pub mod http;
pub mod http_client;

pub use error::TransportError;
pub use http::{Fetcher, Http, HttpFetcher};
