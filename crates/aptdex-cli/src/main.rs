use std::{env, sync::Arc};

use aptdex_config::config::{self, generate_default_config, get_config, set_config_path, Config};
use aptdex_dl::{
    http_client::{configure_http_client, header_pair, parse_header},
    HttpFetcher,
};
use aptdex_events::{ChannelSink, EventSinkHandle, LogSink, NullSink};
use aptdex_registry::{CodecKind, IndexerOptions, RepositoryIndexer, RepositorySpec, ResolveOptions};
use aptdex_utils::path::resolve_path;
use clap::Parser;
use cli::Args;
use error::{CliError, CliResult};
use logging::setup_logging;
use progress::spawn_event_handler;
use tracing::debug;
use ureq::Proxy;
use utils::{COLOR, PROGRESS};

mod cli;
mod error;
mod index;
mod logging;
mod progress;
mod utils;

fn build_indexer(config: &Config, events: EventSinkHandle) -> CliResult<RepositoryIndexer> {
    let options = IndexerOptions {
        resolve: ResolveOptions {
            codecs: CodecKind::parse_list(config.codecs().as_slice())?,
            max_decoded_size: config.max_decoded_size()?,
        },
        parse_workers: config.parse_workers(),
    };
    debug!(
        codecs = ?options.resolve.codecs,
        workers = options.parse_workers,
        "indexer options"
    );
    Ok(RepositoryIndexer::new(Arc::new(HttpFetcher), options)?.with_events(events))
}

/// Applies config values, then command line flags, to the shared HTTP client.
fn setup_http_client(config: &Config, args: &Args) -> CliResult<()> {
    let proxy = match args.proxy.as_deref().or(config.proxy.as_deref()) {
        Some(proxy) => {
            Some(Proxy::new(proxy).map_err(|source| {
                CliError::InvalidProxy {
                    proxy: proxy.to_string(),
                    source,
                }
            })?)
        }
        None => None,
    };

    let mut headers = Vec::new();
    for (name, value) in config.headers.iter().flatten() {
        headers.push(header_pair(name, value)?);
    }
    for raw in args.header.iter().flatten() {
        headers.push(parse_header(raw)?);
    }

    let user_agent = args.user_agent.clone().or_else(|| config.user_agent.clone());
    let timeout = config.fetch_timeout()?;
    let max_body_size = config.max_decoded_size()?;

    configure_http_client(|client| {
        if proxy.is_some() {
            client.proxy = proxy;
        }
        if let Some(user_agent) = user_agent {
            client.user_agent = Some(user_agent);
        }
        if !headers.is_empty() {
            let map = client.headers.get_or_insert_with(Default::default);
            for (name, value) in headers {
                map.insert(name, value);
            }
        }
        client.timeout = Some(timeout);
        client.max_body_size = max_body_size;
    });
    Ok(())
}

fn load_config(args: &Args) -> CliResult<Config> {
    config::init()?;
    let config = get_config();
    setup_http_client(&config, args)?;
    Ok(config)
}

async fn handle_cli() -> CliResult<()> {
    let args = Args::parse();

    setup_logging(&args);

    if args.no_color {
        let mut color = COLOR.write().unwrap();
        *color = false;
    }

    if args.no_progress || args.json {
        let mut progress = PROGRESS.write().unwrap();
        *progress = false;
    }

    if let Some(ref c) = args.config {
        let path = resolve_path(c).map_err(aptdex_config::error::ConfigError::from)?;
        let path = if path.is_absolute() {
            path
        } else {
            env::current_dir()
                .map_err(|source| {
                    CliError::IoError {
                        action: "retrieving current directory".to_string(),
                        source,
                    }
                })?
                .join(path)
        };
        set_config_path(path);
    }

    match &args.command {
        cli::Commands::DefConfig => {
            generate_default_config()?;
        }
        cli::Commands::Config => {
            config::init()?;
            print!("{}", get_config().to_annotated_document()?);
        }
        cli::Commands::Serve {
            listen,
        } => {
            let mut config = load_config(&args)?;
            if listen.is_some() {
                config.listen = listen.clone();
            }
            let addr = config.listen_addr()?;
            let max_payload_size = config.max_payload_size()?;

            let indexer = Arc::new(build_indexer(&config, Arc::new(LogSink))?);
            let registry = Arc::new(aptdex_server::default_registry(indexer));
            aptdex_server::run(addr, registry, max_payload_size).await?;
        }
        cli::Commands::Index {
            url,
            dist,
            suite,
            records,
        } => {
            let config = load_config(&args)?;
            let spec = RepositorySpec {
                base_url: url.clone(),
                dist: dist.clone(),
                suite: suite.clone(),
            };

            let (sink, receiver) = ChannelSink::new();
            let guard = spawn_event_handler(receiver);
            let indexer = build_indexer(&config, Arc::new(sink))?;
            let result = index::index_repository(&indexer, &spec, *records);

            // the indexer owns the sink; drop it so the handler can drain
            drop(indexer);
            guard.finish();

            let count = result?;
            debug!(package_count = count, "index finished");
        }
        cli::Commands::Parse {
            file,
            records,
        } => {
            let config = load_config(&args)?;
            let indexer = build_indexer(&config, Arc::new(NullSink))?;
            let count = index::parse_file(&indexer, file, *records)?;
            debug!(package_count = count, "parse finished");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if let Err(err) = handle_cli().await {
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(1);
    }
}
