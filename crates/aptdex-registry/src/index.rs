//! The repository indexing entry point.

use std::{fs, path::Path, sync::Arc};

use aptdex_dl::Fetcher;
use aptdex_events::{EventSinkHandle, IndexEvent, IndexStage, NullSink};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    codec::{self, CodecKind},
    control::{split, ControlRecord, FormatError},
    error::{ErrorContext, Result},
    fetch::{resolve_document, CandidateFailure, ResolveOptions},
    parse::{default_workers, StanzaParser},
};

/// Location of a repository to index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySpec {
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite: Option<String>,
}

impl RepositorySpec {
    /// A flat repository with `Packages` directly under `base_url`.
    pub fn flat(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            dist: None,
            suite: None,
        }
    }

    /// A distribution-style repository (`dists/<dist>/<suite>`).
    pub fn distribution(
        base_url: impl Into<String>,
        dist: impl Into<String>,
        suite: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            dist: Some(dist.into()),
            suite: Some(suite.into()),
        }
    }

    /// Whether both `dist` and `suite` are given, whatever their contents.
    pub fn is_distribution(&self) -> bool {
        self.dist.is_some() && self.suite.is_some()
    }

    /// Base URL without surrounding whitespace or trailing slashes.
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }
}

/// A request that cannot be acted on at all.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Repository base URL is empty")]
    #[diagnostic(
        code(aptdex_registry::index::empty_base_url),
        help("Provide the repository URL, e.g. https://repo.example.org")
    )]
    EmptyBaseUrl,
}

/// What happened when a repository was indexed.
#[derive(Debug)]
pub enum IndexOutcome {
    /// The index was found and parsed. `failures` lists stanzas that were skipped.
    Indexed {
        source_url: String,
        encoding: CodecKind,
        records: Vec<ControlRecord>,
        failures: Vec<FormatError>,
    },
    /// No codec candidate produced a document.
    Unavailable { attempts: Vec<CandidateFailure> },
    /// Distribution-style repositories are not indexed yet.
    NotImplemented,
    Invalid(RequestError),
}

impl IndexOutcome {
    /// The package count reported to clients. Invalid requests report `-1`.
    pub fn record_count(&self) -> i64 {
        match self {
            IndexOutcome::Indexed {
                records, ..
            } => records.len() as i64,
            IndexOutcome::Unavailable {
                ..
            }
            | IndexOutcome::NotImplemented => 0,
            IndexOutcome::Invalid(_) => -1,
        }
    }

    pub fn records(&self) -> &[ControlRecord] {
        match self {
            IndexOutcome::Indexed {
                records, ..
            } => records,
            _ => &[],
        }
    }

    fn stage(&self) -> IndexStage {
        match self {
            IndexOutcome::Indexed {
                records,
                failures,
                ..
            } => {
                IndexStage::Complete {
                    records: records.len(),
                    failed: failures.len(),
                }
            }
            IndexOutcome::Unavailable {
                ..
            } => IndexStage::Unavailable,
            IndexOutcome::NotImplemented => IndexStage::NotImplemented,
            IndexOutcome::Invalid(err) => {
                IndexStage::Rejected {
                    reason: err.to_string(),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexerOptions {
    pub resolve: ResolveOptions,
    pub parse_workers: usize,
}

impl Default for IndexerOptions {
    fn default() -> Self {
        Self {
            resolve: ResolveOptions::default(),
            parse_workers: default_workers(),
        }
    }
}

/// Fetches, decodes and parses repository indexes.
///
/// One indexer can serve many calls; nothing is cached between them.
pub struct RepositoryIndexer {
    fetcher: Arc<dyn Fetcher>,
    parser: StanzaParser,
    options: ResolveOptions,
    events: EventSinkHandle,
}

impl RepositoryIndexer {
    pub fn new(fetcher: Arc<dyn Fetcher>, options: IndexerOptions) -> Result<Self> {
        Ok(Self {
            fetcher,
            parser: StanzaParser::new(options.parse_workers)?,
            options: options.resolve,
            events: Arc::new(NullSink),
        })
    }

    pub fn with_events(mut self, events: EventSinkHandle) -> Self {
        self.events = events;
        self
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Indexes one repository. Blocks until fetching and parsing are done.
    pub fn index(&self, spec: &RepositorySpec) -> IndexOutcome {
        let repository = spec.normalized_base_url().to_string();
        let outcome = self.run(spec, &repository);

        self.events.emit(IndexEvent::Progress {
            repository,
            stage: outcome.stage(),
        });
        outcome
    }

    fn run(&self, spec: &RepositorySpec, repository: &str) -> IndexOutcome {
        if repository.is_empty() {
            debug!(base_url = %spec.base_url, "rejecting request");
            return IndexOutcome::Invalid(RequestError::EmptyBaseUrl);
        }

        self.events.emit(IndexEvent::IndexStarted {
            repository: repository.to_string(),
        });

        if spec.is_distribution() {
            info!(
                repository = repository,
                dist = spec.dist.as_deref().unwrap_or_default(),
                suite = spec.suite.as_deref().unwrap_or_default(),
                "distribution repositories are not indexed yet"
            );
            return IndexOutcome::NotImplemented;
        }

        self.events.emit(IndexEvent::Progress {
            repository: repository.to_string(),
            stage: IndexStage::Resolving,
        });

        let resolution =
            resolve_document(self.fetcher.as_ref(), repository, &self.options, self.events.as_ref());

        let Some(document) = resolution.document else {
            warn!(
                repository = repository,
                attempts = resolution.failures.len(),
                "no usable package index found"
            );
            return IndexOutcome::Unavailable {
                attempts: resolution.failures,
            };
        };

        let stanzas = split(&document.text);
        self.events.emit(IndexEvent::Progress {
            repository: repository.to_string(),
            stage: IndexStage::Parsing {
                stanzas: stanzas.len(),
            },
        });

        let report = self.parser.parse_all(&stanzas);
        info!(
            repository = repository,
            codec = document.encoding.name(),
            records = report.records.len(),
            failed = report.failures.len(),
            "indexed repository"
        );

        IndexOutcome::Indexed {
            source_url: document.source_url,
            encoding: document.encoding,
            records: report.records,
            failures: report.failures,
        }
    }

    /// Parses a local index file, choosing the codec from its extension.
    pub fn index_file<P: AsRef<Path>>(&self, path: P) -> Result<IndexOutcome> {
        let path = path.as_ref();
        let raw = fs::read(path).with_context(|| format!("reading {}", path.display()))?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();
        let encoding = CodecKind::from_file_name(&file_name);
        let text = codec::decode(encoding, &raw, self.options.max_decoded_size)?;
        let report = self.parser.parse_all(&split(&text));

        debug!(
            path = %path.display(),
            codec = encoding.name(),
            records = report.records.len(),
            "parsed local index"
        );

        Ok(IndexOutcome::Indexed {
            source_url: path.display().to_string(),
            encoding,
            records: report.records,
            failures: report.failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_spec_strategy() {
        assert!(!RepositorySpec::flat("https://repo.example.org").is_distribution());
        assert!(RepositorySpec::distribution("https://deb.example.org", "stable", "main")
            .is_distribution());

        let half = RepositorySpec {
            base_url: "https://deb.example.org".to_string(),
            dist: Some("stable".to_string()),
            suite: None,
        };
        assert!(!half.is_distribution());

        let blank = RepositorySpec {
            base_url: "https://deb.example.org".to_string(),
            dist: Some("stable".to_string()),
            suite: Some(" ".to_string()),
        };
        assert!(blank.is_distribution());

        let empty = RepositorySpec {
            base_url: "https://deb.example.org".to_string(),
            dist: Some(String::new()),
            suite: Some(String::new()),
        };
        assert!(empty.is_distribution());
    }

    #[test]
    fn test_normalized_base_url() {
        assert_eq!(
            RepositorySpec::flat(" https://repo.example.org/// ").normalized_base_url(),
            "https://repo.example.org"
        );
        assert_eq!(RepositorySpec::flat("/").normalized_base_url(), "");
    }

    #[test]
    fn test_record_count() {
        assert_eq!(IndexOutcome::NotImplemented.record_count(), 0);
        assert_eq!(
            IndexOutcome::Unavailable {
                attempts: Vec::new()
            }
            .record_count(),
            0
        );
        assert_eq!(
            IndexOutcome::Invalid(RequestError::EmptyBaseUrl).record_count(),
            -1
        );

        let indexed = IndexOutcome::Indexed {
            source_url: "https://repo.example.org/Packages.gz".to_string(),
            encoding: CodecKind::Gzip,
            records: vec![ControlRecord::default(), ControlRecord::default()],
            failures: vec![FormatError::NoFields { offset: 0 }],
        };
        assert_eq!(indexed.record_count(), 2);
        assert_eq!(indexed.records().len(), 2);
    }

    #[test]
    fn test_repository_spec_deserialize() {
        let spec: RepositorySpec =
            serde_json::from_str(r#"{"base_url":"https://repo.example.org"}"#).unwrap();
        assert_eq!(spec, RepositorySpec::flat("https://repo.example.org"));
    }
}
