use std::{
    sync::{Arc, LazyLock, RwLock},
    time::Duration,
};

use ureq::{
    http::{self, HeaderMap, HeaderName, HeaderValue, Uri},
    typestate::WithoutBody,
    Agent, Proxy, RequestBuilder,
};

use crate::error::{Result, TransportError};

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = "Telesphoreo APT-HTTP/1.0.592";

/// Per-request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest response body read into memory when none is configured.
pub const DEFAULT_MAX_BODY_SIZE: u64 = 256 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub user_agent: Option<String>,
    pub headers: Option<HeaderMap>,
    pub proxy: Option<Proxy>,
    pub timeout: Option<Duration>,
    pub max_body_size: u64,
}

impl Default for ClientConfig {
    /// Creates a client that identifies itself the way an APT client on a
    /// device would: fixed user agent, device marker headers and cache bypass.
    ///
    /// # Examples
    ///
    /// ```
    /// use aptdex_dl::http_client::ClientConfig;
    ///
    /// let cfg = ClientConfig::default();
    /// assert_eq!(cfg.user_agent.as_deref(), Some("Telesphoreo APT-HTTP/1.0.592"));
    /// assert!(cfg.headers.unwrap().contains_key("x-machine"));
    /// ```
    fn default() -> Self {
        Self {
            user_agent: Some(DEFAULT_USER_AGENT.into()),
            proxy: None,
            headers: Some(default_headers()),
            timeout: Some(DEFAULT_TIMEOUT),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl ClientConfig {
    /// Builds an HTTP `Agent` configured from this `ClientConfig`.
    ///
    /// Non-2xx statuses are returned as responses rather than errors so the
    /// caller can report the exact status code.
    pub fn build(&self) -> Agent {
        let mut config = ureq::Agent::config_builder()
            .proxy(self.proxy.clone())
            .timeout_global(self.timeout)
            .http_status_as_error(false);

        if let Some(user_agent) = &self.user_agent {
            config = config.user_agent(user_agent);
        }

        config.build().into()
    }
}

/// The header set sent with every repository request.
pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("x-unique-id"),
        HeaderValue::from_static("0000000000000000000000000000000000000000"),
    );
    headers.insert(
        HeaderName::from_static("x-firmware"),
        HeaderValue::from_static("14.4"),
    );
    headers.insert(
        HeaderName::from_static("x-machine"),
        HeaderValue::from_static("iPhone10,3"),
    );
    headers.insert(http::header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(http::header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}

/// Parses a `Name: value` header line.
pub fn parse_header(raw: &str) -> Result<(HeaderName, HeaderValue)> {
    let (name, value) = raw.split_once(':').ok_or_else(|| {
        TransportError::InvalidHeader {
            name: raw.to_string(),
            reason: "missing ':' separator".to_string(),
        }
    })?;
    header_pair(name.trim(), value.trim())
}

/// Builds a validated header name/value pair.
pub fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let header_name =
        HeaderName::try_from(name).map_err(|err| {
            TransportError::InvalidHeader {
                name: name.to_string(),
                reason: err.to_string(),
            }
        })?;
    let header_value =
        HeaderValue::try_from(value).map_err(|err| {
            TransportError::InvalidHeader {
                name: name.to_string(),
                reason: err.to_string(),
            }
        })?;
    Ok((header_name, header_value))
}

struct SharedClient {
    agent: Agent,
    config: ClientConfig,
}

static SHARED_CLIENT_STATE: LazyLock<Arc<RwLock<SharedClient>>> = LazyLock::new(|| {
    let config = ClientConfig::default();
    let agent = config.build();

    Arc::new(RwLock::new(SharedClient {
        agent,
        config,
    }))
});

#[derive(Clone, Default)]
pub struct SharedAgent;

impl SharedAgent {
    pub fn new() -> Self {
        Self
    }

    /// Create a GET request builder for the given URI using the shared agent.
    ///
    /// Any global headers configured in the shared client are applied.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use aptdex_dl::http_client::SHARED_AGENT;
    ///
    /// let response = SHARED_AGENT.get("https://repo.example.org/Packages.gz").call();
    /// ```
    pub fn get<T>(&self, uri: T) -> RequestBuilder<WithoutBody>
    where
        Uri: TryFrom<T>,
        <Uri as TryFrom<T>>::Error: Into<http::Error>,
    {
        let state = SHARED_CLIENT_STATE.read().unwrap();
        let req = state.agent.get(uri);
        apply_headers(req, &state.config.headers)
    }

    /// Largest response body the shared client will read.
    pub fn max_body_size(&self) -> u64 {
        SHARED_CLIENT_STATE.read().unwrap().config.max_body_size
    }
}

fn apply_headers<B>(mut req: RequestBuilder<B>, headers: &Option<HeaderMap>) -> RequestBuilder<B> {
    if let Some(headers) = headers {
        for (key, value) in headers.iter() {
            req = req.header(key, value);
        }
    }
    req
}

pub static SHARED_AGENT: LazyLock<SharedAgent> = LazyLock::new(SharedAgent::new);

/// Updates the global shared HTTP client configuration and rebuilds the agent.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use aptdex_dl::http_client::configure_http_client;
///
/// configure_http_client(|cfg| {
///     cfg.timeout = Some(Duration::from_secs(30));
/// });
/// ```
pub fn configure_http_client<F>(updater: F)
where
    F: FnOnce(&mut ClientConfig),
{
    let mut state = SHARED_CLIENT_STATE.write().unwrap();
    let mut new_config = state.config.clone();
    updater(&mut new_config);
    let new_agent = new_config.build();
    state.agent = new_agent;
    state.config = new_config;
}
