use std::io::Write;

use aptdex_registry::{ControlRecord, IndexOutcome, RepositoryIndexer, RepositorySpec};
use nu_ansi_term::Color::{Cyan, Green, Yellow};
use tracing::{info, warn};

use crate::{
    error::{CliError, CliResult},
    utils::Colored,
};

fn print_records(records: &[ControlRecord]) -> CliResult<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, records)?;
    writeln!(out).map_err(|source| {
        CliError::IoError {
            action: "writing records to stdout".to_string(),
            source,
        }
    })
}

fn report_failures(outcome: &IndexOutcome) {
    if let IndexOutcome::Indexed {
        failures, ..
    } = outcome
    {
        for failure in failures {
            warn!("Skipped malformed stanza: {failure}");
        }
    }
}

/// Indexes one remote repository and prints the wire package count, or the
/// records themselves when `records` is set.
pub fn index_repository(
    indexer: &RepositoryIndexer,
    spec: &RepositorySpec,
    records: bool,
) -> CliResult<i64> {
    let outcome = indexer.index(spec);
    report_failures(&outcome);

    if let IndexOutcome::Unavailable {
        attempts,
    } = &outcome
    {
        for attempt in attempts {
            warn!("{}: {}", attempt.url, attempt.reason());
        }
    }

    if records {
        print_records(outcome.records())?;
    }
    Ok(outcome.record_count())
}

/// Parses a local index file.
pub fn parse_file(indexer: &RepositoryIndexer, file: &str, records: bool) -> CliResult<i64> {
    let outcome = indexer.index_file(file)?;
    report_failures(&outcome);

    if records {
        print_records(outcome.records())?;
    } else if let IndexOutcome::Indexed {
        encoding,
        records: parsed,
        failures,
        ..
    } = &outcome
    {
        let skipped = if failures.is_empty() {
            String::new()
        } else {
            format!(
                " ({})",
                Colored(Yellow, format!("{} malformed stanzas skipped", failures.len()))
            )
        };
        info!(
            "{} [{}]: {}{}",
            Colored(Cyan, file),
            encoding,
            Colored(Green, format!("{} packages", parsed.len())),
            skipped
        );
    }
    Ok(outcome.record_count())
}

#[cfg(test)]
mod tests {
    use std::{fs, sync::Arc};

    use aptdex_dl::{Fetcher, TransportError};
    use aptdex_registry::{CodecKind, IndexerOptions, ResolveOptions};
    use tempfile::tempdir;

    use super::*;

    struct PlainRepository;

    impl Fetcher for PlainRepository {
        fn fetch(&self, url: &str) -> aptdex_dl::error::Result<Vec<u8>> {
            match url {
                "https://repo.example.org/Packages" => {
                    Ok(b"Package: a\nVersion: 1\n\nPackage: b\nVersion: 2\n".to_vec())
                }
                _ => {
                    Err(TransportError::HttpStatus {
                        status: 404,
                        url: url.to_string(),
                    })
                }
            }
        }
    }

    fn indexer() -> RepositoryIndexer {
        RepositoryIndexer::new(
            Arc::new(PlainRepository),
            IndexerOptions {
                resolve: ResolveOptions {
                    codecs: vec![CodecKind::Gzip, CodecKind::Plain],
                    ..Default::default()
                },
                parse_workers: 1,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_index_repository_counts() {
        let indexer = indexer();
        let count = |url: &str| {
            index_repository(&indexer, &RepositorySpec::flat(url), false).unwrap()
        };

        assert_eq!(count("https://repo.example.org/"), 2);
        assert_eq!(count("https://missing.example.org"), 0);
        assert_eq!(count("  "), -1);

        let dist = RepositorySpec::distribution("https://repo.example.org", "stable", "main");
        assert_eq!(index_repository(&indexer, &dist, false).unwrap(), 0);
    }

    #[test]
    fn test_parse_file_skips_malformed_stanzas() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Packages");
        fs::write(&path, "Package: a\n\n   \n\nno separator here\n\nPackage: b\n").unwrap();

        let count = parse_file(&indexer(), path.to_str().unwrap(), false).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_parse_file_missing() {
        let err = parse_file(&indexer(), "/nonexistent/Packages", false).unwrap_err();
        assert!(matches!(err, CliError::Registry(_)));
    }
}
