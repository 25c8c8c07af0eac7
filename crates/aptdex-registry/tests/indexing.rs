use std::{
    collections::HashMap,
    io::Write,
    sync::{Arc, Mutex},
};

use aptdex_dl::{Fetcher, TransportError};
use aptdex_events::{CollectorSink, IndexEvent, IndexStage};
use aptdex_registry::{
    resolve_document, CandidateError, CodecKind, IndexOutcome, IndexerOptions, RepositoryIndexer,
    RepositorySpec, RequestError, ResolveOptions,
};

const BASE: &str = "https://repo.example.org";

const PACKAGES: &str = "\
Package: com.example.alpha
Version: 1.0
Architecture: iphoneos-arm
Description: first package
 with a folded line

Package: com.example.beta
Version: 2.1
Architecture: iphoneos-arm
Tag:
Name: Beta
";

#[derive(Default)]
struct MockRepository {
    routes: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl MockRepository {
    fn serve(mut self, resource: &str, body: Vec<u8>) -> Self {
        self.routes.insert(format!("{BASE}/{resource}"), body);
        self
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Fetcher for MockRepository {
    fn fetch(&self, url: &str) -> aptdex_dl::error::Result<Vec<u8>> {
        self.requests.lock().unwrap().push(url.to_string());
        self.routes.get(url).cloned().ok_or_else(|| {
            TransportError::HttpStatus {
                status: 404,
                url: url.to_string(),
            }
        })
    }
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn bzip2(data: &[u8]) -> Vec<u8> {
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn indexer(repo: &Arc<MockRepository>) -> RepositoryIndexer {
    let options = IndexerOptions {
        parse_workers: 2,
        ..Default::default()
    };
    RepositoryIndexer::new(repo.clone(), options).unwrap()
}

#[test]
fn test_resolver_stops_at_first_success() {
    let repo = MockRepository::default()
        .serve("Packages.bz2", bzip2(PACKAGES.as_bytes()))
        .serve("Packages.gz", gzip(b"Package: never-read\n"));
    let events = CollectorSink::default();

    let resolution = resolve_document(&repo, BASE, &ResolveOptions::default(), &events);

    let document = resolution.document.expect("bzip2 candidate should resolve");
    assert_eq!(document.encoding, CodecKind::Bzip2);
    assert_eq!(document.source_url, format!("{BASE}/Packages.bz2"));
    assert_eq!(document.text, PACKAGES.as_bytes());

    assert_eq!(resolution.failures.len(), 1);
    assert_eq!(resolution.failures[0].codec, CodecKind::Zstd);
    assert!(matches!(
        resolution.failures[0].error,
        CandidateError::Transport(TransportError::HttpStatus { status: 404, .. })
    ));
    assert_eq!(resolution.skipped, vec![CodecKind::Gzip]);

    assert_eq!(
        repo.requests(),
        vec![format!("{BASE}/Packages.zst"), format!("{BASE}/Packages.bz2")]
    );

    let kinds: Vec<_> = events
        .events()
        .into_iter()
        .map(|e| {
            match e {
                IndexEvent::CandidateAttempt { codec, .. } => format!("attempt:{codec}"),
                IndexEvent::CandidateFailed { codec, .. } => format!("failed:{codec}"),
                IndexEvent::DocumentResolved { codec, .. } => format!("resolved:{codec}"),
                IndexEvent::CandidateSkipped { codec, .. } => format!("skipped:{codec}"),
                other => format!("{other:?}"),
            }
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "attempt:zst",
            "failed:zst",
            "attempt:bz2",
            "resolved:bz2",
            "skipped:gz"
        ]
    );
}

#[test]
fn test_corrupt_candidate_falls_back() {
    let repo = MockRepository::default()
        .serve("Packages.zst", b"<html>not zstd</html>".to_vec())
        .serve("Packages.bz2", Vec::from(&b"BZh9 truncated"[..]))
        .serve("Packages.gz", gzip(PACKAGES.as_bytes()));
    let repo = Arc::new(repo);

    let outcome = indexer(&repo).index(&RepositorySpec::flat(BASE));
    match outcome {
        IndexOutcome::Indexed {
            encoding,
            records,
            failures,
            ..
        } => {
            assert_eq!(encoding, CodecKind::Gzip);
            assert_eq!(records.len(), 2);
            assert!(failures.is_empty());
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(repo.requests().len(), 3);
}

#[test]
fn test_index_parses_records() {
    let repo = Arc::new(MockRepository::default().serve("Packages.gz", gzip(PACKAGES.as_bytes())));

    let outcome = indexer(&repo).index(&RepositorySpec::flat(format!("{BASE}/")));
    assert_eq!(outcome.record_count(), 2);

    let records = outcome.records();
    assert_eq!(records[0].package(), Some("com.example.alpha"));
    assert_eq!(
        records[0].get("Description"),
        Some("first package\nwith a folded line")
    );
    assert_eq!(records[1].get("Name"), Some("Beta"));
    assert_eq!(records[1].get("Tag"), None);
}

#[test]
fn test_index_empty_base_url_is_invalid() {
    let repo = Arc::new(MockRepository::default());
    let indexer = indexer(&repo);

    for base_url in ["", "   ", "/"] {
        let outcome = indexer.index(&RepositorySpec::flat(base_url));
        assert!(matches!(
            outcome,
            IndexOutcome::Invalid(RequestError::EmptyBaseUrl)
        ));
        assert_eq!(outcome.record_count(), -1);
    }
    assert!(repo.requests().is_empty());
}

#[test]
fn test_index_distribution_is_not_implemented() {
    let repo = Arc::new(MockRepository::default().serve("Packages.gz", gzip(PACKAGES.as_bytes())));

    let outcome = indexer(&repo).index(&RepositorySpec::distribution(BASE, "stable", "main"));
    assert!(matches!(outcome, IndexOutcome::NotImplemented));
    assert_eq!(outcome.record_count(), 0);
    assert!(repo.requests().is_empty());
}

#[test]
fn test_index_blank_dist_and_suite_still_select_distribution() {
    let repo = Arc::new(MockRepository::default().serve("Packages.gz", gzip(PACKAGES.as_bytes())));

    let outcome = indexer(&repo).index(&RepositorySpec::distribution(BASE, "", " "));
    assert!(matches!(outcome, IndexOutcome::NotImplemented));
    assert_eq!(outcome.record_count(), 0);
    assert!(repo.requests().is_empty());
}

#[test]
fn test_index_unavailable() {
    let repo = Arc::new(MockRepository::default());

    let outcome = indexer(&repo).index(&RepositorySpec::flat(BASE));
    assert_eq!(outcome.record_count(), 0);
    match outcome {
        IndexOutcome::Unavailable {
            attempts,
        } => {
            let codecs: Vec<_> = attempts.iter().map(|a| a.codec).collect();
            assert_eq!(codecs, vec![CodecKind::Zstd, CodecKind::Bzip2, CodecKind::Gzip]);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn test_index_reports_degraded_count() {
    let doc = format!("{PACKAGES}\njust words\n\n");
    let repo = Arc::new(MockRepository::default().serve("Packages.gz", gzip(doc.as_bytes())));

    match indexer(&repo).index(&RepositorySpec::flat(BASE)) {
        IndexOutcome::Indexed {
            records,
            failures,
            ..
        } => {
            assert_eq!(records.len(), 2);
            assert_eq!(failures.len(), 1);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn test_index_honors_codec_order() {
    let repo = Arc::new(
        MockRepository::default()
            .serve("Packages", PACKAGES.as_bytes().to_vec())
            .serve("Packages.gz", gzip(b"Package: only-gz\n")),
    );
    let options = IndexerOptions {
        resolve: ResolveOptions {
            codecs: vec![CodecKind::Xz, CodecKind::Plain, CodecKind::Gzip],
            ..Default::default()
        },
        parse_workers: 1,
    };

    let outcome = RepositoryIndexer::new(repo.clone(), options)
        .unwrap()
        .index(&RepositorySpec::flat(BASE));
    assert_eq!(outcome.record_count(), 2);
    assert_eq!(
        repo.requests(),
        vec![format!("{BASE}/Packages.xz"), format!("{BASE}/Packages")]
    );
}

#[test]
fn test_index_emits_lifecycle_events() {
    let repo = Arc::new(MockRepository::default().serve("Packages.gz", gzip(PACKAGES.as_bytes())));
    let events = Arc::new(CollectorSink::default());

    indexer(&repo)
        .with_events(events.clone())
        .index(&RepositorySpec::flat(BASE));

    let events = events.events();
    assert_eq!(
        events.first(),
        Some(&IndexEvent::IndexStarted {
            repository: BASE.to_string()
        })
    );
    assert!(events.contains(&IndexEvent::Progress {
        repository: BASE.to_string(),
        stage: IndexStage::Parsing { stanzas: 2 },
    }));
    assert_eq!(
        events.last(),
        Some(&IndexEvent::Progress {
            repository: BASE.to_string(),
            stage: IndexStage::Complete {
                records: 2,
                failed: 0
            },
        })
    );
}

#[test]
fn test_decoded_size_ceiling_rejects_candidate() {
    let repo = Arc::new(MockRepository::default().serve("Packages.gz", gzip(&vec![b'a'; 4096])));
    let options = IndexerOptions {
        resolve: ResolveOptions {
            max_decoded_size: 1024,
            ..Default::default()
        },
        parse_workers: 1,
    };

    let outcome = RepositoryIndexer::new(repo, options)
        .unwrap()
        .index(&RepositorySpec::flat(BASE));
    match outcome {
        IndexOutcome::Unavailable {
            attempts,
        } => {
            assert!(attempts[2].reason().contains("exceeds 1024 bytes"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn test_index_local_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Packages.bz2");
    std::fs::write(&path, bzip2(PACKAGES.as_bytes())).unwrap();

    let repo = Arc::new(MockRepository::default());
    let outcome = indexer(&repo).index_file(&path).unwrap();
    assert_eq!(outcome.record_count(), 2);
    assert!(repo.requests().is_empty());

    let missing = indexer(&repo).index_file(dir.path().join("Packages.gz"));
    assert!(missing.is_err());
}
