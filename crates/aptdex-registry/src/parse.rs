//! Parallel stanza parsing on a bounded worker pool.

use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::{
    control::{parse_stanza, ControlRecord, ControlStanza, FormatError},
    error::Result,
};

/// Records parsed from a document plus the stanzas that could not be parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub records: Vec<ControlRecord>,
    pub failures: Vec<FormatError>,
}

impl ParseReport {
    pub fn total(&self) -> usize {
        self.records.len() + self.failures.len()
    }
}

/// Worker count used when none is configured.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Parses stanzas concurrently on a dedicated rayon pool.
pub struct StanzaParser {
    pool: ThreadPool,
    workers: usize,
}

impl StanzaParser {
    pub fn new(workers: usize) -> Result<Self> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("aptdex-parse-{i}"))
            .build()?;

        Ok(Self {
            pool,
            workers,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Parses every stanza. Results keep document order; a stanza that fails
    /// to parse is reported in `failures` and does not affect the others.
    pub fn parse_all(&self, stanzas: &[ControlStanza<'_>]) -> ParseReport {
        let results: Vec<_> = self
            .pool
            .install(|| stanzas.par_iter().map(parse_stanza).collect());

        let mut report = ParseReport::default();
        for result in results {
            match result {
                Ok(record) => report.records.push(record),
                Err(err) => {
                    debug!(offset = err.offset(), "skipping stanza: {err}");
                    report.failures.push(err);
                }
            }
        }
        report
    }
}
