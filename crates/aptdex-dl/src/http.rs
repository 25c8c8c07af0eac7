use tracing::{debug, trace};
use url::Url;

use crate::{
    error::{Result, TransportError},
    http_client::SHARED_AGENT,
};

pub struct Http;

impl Http {
    /// Performs a single GET against `url` and returns the whole body.
    ///
    /// Succeeds only on status 200 with a non-empty body.
    pub fn fetch_bytes(url: &str) -> Result<Vec<u8>> {
        let parsed = Url::parse(url).map_err(|source| {
            TransportError::InvalidUrl {
                url: url.to_string(),
                source,
            }
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TransportError::UnsupportedScheme {
                url: url.to_string(),
                scheme: parsed.scheme().to_string(),
            });
        }

        trace!(url = url, "sending request");
        let mut response = SHARED_AGENT.get(url).call()?;

        let status = response.status().as_u16();
        if status != 200 {
            debug!(url = url, status = status, "unexpected status");
            return Err(TransportError::HttpStatus {
                status,
                url: url.to_string(),
            });
        }

        let body = response
            .body_mut()
            .with_config()
            .limit(SHARED_AGENT.max_body_size())
            .read_to_vec()?;

        if body.is_empty() {
            return Err(TransportError::EmptyBody {
                url: url.to_string(),
            });
        }

        debug!(url = url, bytes = body.len(), "fetched");
        Ok(body)
    }
}

/// Source of raw repository documents.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// [`Fetcher`] backed by the shared HTTP agent.
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpFetcher;

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        Http::fetch_bytes(url)
    }
}
