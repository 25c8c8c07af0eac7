use std::{
    collections::BTreeMap,
    fs,
    net::SocketAddr,
    path::PathBuf,
    sync::{LazyLock, RwLock},
    thread,
    time::Duration,
};

use aptdex_utils::{bytes::parse_bytes, path::xdg_config_home, time::parse_duration};
use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};
use toml_edit::DocumentMut;
use tracing::{debug, info};

use crate::{
    annotations::annotate_toml_table,
    error::{ConfigError, Result},
};

pub const DEFAULT_LISTEN: &str = "0.0.0.0:9000";
pub const DEFAULT_MAX_PAYLOAD_SIZE: &str = "16 MiB";
pub const DEFAULT_FETCH_TIMEOUT: &str = "10s";
pub const DEFAULT_MAX_DECODED_SIZE: &str = "256 MiB";
pub const DEFAULT_CODECS: [&str; 3] = ["zst", "bz2", "gz"];

/// Indexer configuration
#[derive(Clone, Debug, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct Config {
    /// Address the session server listens on.
    /// Default: 0.0.0.0:9000
    pub listen: Option<String>,

    /// Largest client message the session server accepts.
    /// Default: 16 MiB
    pub max_payload_size: Option<String>,

    /// Timeout applied to every repository request (e.g. "10s", "1m").
    /// Default: 10s
    pub fetch_timeout: Option<String>,

    /// User agent sent with repository requests.
    /// Default: the built-in APT client user agent
    pub user_agent: Option<String>,

    /// Proxy used for repository requests (e.g. "http://127.0.0.1:3128").
    pub proxy: Option<String>,

    /// Ceiling on the decoded size of one Packages index. Decoding stops with an
    /// error once a document grows past it.
    /// Default: 256 MiB
    pub max_decoded_size: Option<String>,

    /// Number of worker threads parsing package stanzas.
    /// Default: number of available CPUs
    pub parse_workers: Option<usize>,

    /// Packages index variants to try, in order. The first one that downloads and
    /// decodes to a non-empty document wins.
    /// Supported: "zst", "bz2", "gz", "xz", "plain"
    /// Default: ["zst", "bz2", "gz"]
    pub codecs: Option<Vec<String>>,

    /// Extra request headers. Entries replace the built-in client markers with the
    /// same name.
    pub headers: Option<BTreeMap<String, String>>,
}

pub static CONFIG: LazyLock<RwLock<Option<Config>>> = LazyLock::new(|| RwLock::new(None));

pub static CONFIG_PATH: LazyLock<RwLock<PathBuf>> = LazyLock::new(|| {
    RwLock::new(match std::env::var("APTDEX_CONFIG") {
        Ok(path) => PathBuf::from(path),
        Err(_) => xdg_config_home().join("aptdex").join("config.toml"),
    })
});

/// Loads the configuration file and installs it as the global configuration.
pub fn init() -> Result<()> {
    let config = Config::new()?;
    let mut global = CONFIG.write().unwrap();
    *global = Some(config);
    Ok(())
}

/// Returns a clone of the global configuration, falling back to defaults if
/// [`init`] was never called.
pub fn get_config() -> Config {
    if let Some(config) = CONFIG.read().unwrap().as_ref() {
        return config.clone();
    }

    let mut global = CONFIG.write().unwrap();
    global.get_or_insert_with(Config::default_config).clone()
}

/// Replaces the global configuration.
pub fn set_config(config: Config) {
    let mut global = CONFIG.write().unwrap();
    *global = Some(config);
}

/// Points the loader at a different configuration file.
pub fn set_config_path(path: PathBuf) {
    let mut config_path = CONFIG_PATH.write().unwrap();
    *config_path = path;
}

impl Config {
    pub fn default_config() -> Self {
        Self {
            listen: Some(DEFAULT_LISTEN.to_string()),
            max_payload_size: Some(DEFAULT_MAX_PAYLOAD_SIZE.to_string()),
            fetch_timeout: Some(DEFAULT_FETCH_TIMEOUT.to_string()),
            user_agent: None,
            proxy: None,
            max_decoded_size: Some(DEFAULT_MAX_DECODED_SIZE.to_string()),
            parse_workers: None,
            codecs: Some(DEFAULT_CODECS.iter().map(|c| c.to_string()).collect()),
            headers: None,
        }
    }

    /// Loads the configuration from [`CONFIG_PATH`], using defaults when the file
    /// does not exist.
    pub fn new() -> Result<Self> {
        let config_path = CONFIG_PATH.read().unwrap().to_path_buf();
        Self::load_from(config_path)
    }

    pub fn load_from(config_path: PathBuf) -> Result<Self> {
        let mut config = match fs::read_to_string(&config_path) {
            Ok(content) => {
                debug!("Loading configuration from {}", config_path.display());
                toml::from_str(&content)?
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(
                    "No configuration at {}, using defaults",
                    config_path.display()
                );
                Self::default_config()
            }
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.resolve()?;

        Ok(config)
    }

    /// Fills in defaults and validates every field that is parsed later on.
    pub fn resolve(&mut self) -> Result<()> {
        self.listen.get_or_insert_with(|| DEFAULT_LISTEN.to_string());
        self.max_payload_size
            .get_or_insert_with(|| DEFAULT_MAX_PAYLOAD_SIZE.to_string());
        self.fetch_timeout
            .get_or_insert_with(|| DEFAULT_FETCH_TIMEOUT.to_string());
        self.max_decoded_size
            .get_or_insert_with(|| DEFAULT_MAX_DECODED_SIZE.to_string());
        self.codecs
            .get_or_insert_with(|| DEFAULT_CODECS.iter().map(|c| c.to_string()).collect());

        self.listen_addr()?;
        self.max_payload_size()?;
        self.fetch_timeout()?;
        self.max_decoded_size()?;

        if self.parse_workers == Some(0) {
            return Err(ConfigError::InvalidParseWorkers);
        }

        if self.codecs().is_empty() {
            return Err(ConfigError::EmptyCodecList);
        }

        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let listen = self.listen.as_deref().unwrap_or(DEFAULT_LISTEN);
        listen
            .parse()
            .map_err(|_| ConfigError::InvalidListenAddress(listen.to_string()))
    }

    pub fn max_payload_size(&self) -> Result<usize> {
        let value = self
            .max_payload_size
            .as_deref()
            .unwrap_or(DEFAULT_MAX_PAYLOAD_SIZE);
        parse_bytes(value)
            .map(|size| size as usize)
            .map_err(|source| {
                ConfigError::InvalidSize {
                    field: "max_payload_size",
                    source,
                }
            })
    }

    pub fn fetch_timeout(&self) -> Result<Duration> {
        let value = self
            .fetch_timeout
            .as_deref()
            .unwrap_or(DEFAULT_FETCH_TIMEOUT);
        parse_duration(value).map_err(|source| {
            ConfigError::InvalidDuration {
                field: "fetch_timeout",
                source,
            }
        })
    }

    pub fn max_decoded_size(&self) -> Result<u64> {
        let value = self
            .max_decoded_size
            .as_deref()
            .unwrap_or(DEFAULT_MAX_DECODED_SIZE);
        parse_bytes(value).map_err(|source| {
            ConfigError::InvalidSize {
                field: "max_decoded_size",
                source,
            }
        })
    }

    pub fn parse_workers(&self) -> usize {
        self.parse_workers.unwrap_or_else(|| {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }

    pub fn codecs(&self) -> Vec<String> {
        match &self.codecs {
            Some(codecs) => codecs.clone(),
            None => DEFAULT_CODECS.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = CONFIG_PATH.read().unwrap().to_path_buf();
        let serialized = toml::to_string_pretty(self)?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&config_path, serialized)?;
        info!("Configuration saved to {}", config_path.display());
        Ok(())
    }

    pub fn to_annotated_document(&self) -> Result<DocumentMut> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut doc = toml_string.parse::<DocumentMut>()?;

        annotate_toml_table::<Config>(doc.as_table_mut(), true)?;

        Ok(doc)
    }
}

/// Writes the default configuration, annotated with field documentation, to
/// [`CONFIG_PATH`].
pub fn generate_default_config() -> Result<PathBuf> {
    let config_path = CONFIG_PATH.read().unwrap().to_path_buf();

    if config_path.exists() {
        return Err(ConfigError::ConfigAlreadyExists);
    }

    let annotated_doc = Config::default_config().to_annotated_document()?;

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(&config_path, annotated_doc.to_string())?;
    info!(
        "Default configuration file generated with documentation at: {}",
        config_path.display()
    );
    Ok(config_path)
}
