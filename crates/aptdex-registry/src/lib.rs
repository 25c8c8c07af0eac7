//! APT repository indexing for aptdex.
//!
//! This crate discovers a repository's `Packages` index, decodes it from
//! whichever compressed variant the server offers and parses the control
//! stanzas into [`ControlRecord`]s.
//!
//! # Overview
//!
//! - [`fetch`]: tries `Packages.zst`, `Packages.bz2` and `Packages.gz` (or a
//!   configured order) and keeps the first that decodes
//! - [`codec`]: bounded streaming decompressors
//! - [`control`]: stanza splitting and the field grammar
//! - [`parse`]: parallel parsing on a bounded worker pool
//! - [`index`]: the [`RepositoryIndexer`] facade
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use aptdex_dl::HttpFetcher;
//! use aptdex_registry::{IndexerOptions, RepositoryIndexer, RepositorySpec};
//!
//! fn count(url: &str) -> aptdex_registry::Result<i64> {
//!     let indexer = RepositoryIndexer::new(Arc::new(HttpFetcher), IndexerOptions::default())?;
//!     Ok(indexer.index(&RepositorySpec::flat(url)).record_count())
//! }
//! ```

pub mod codec;
pub mod control;
pub mod error;
pub mod fetch;
pub mod index;
pub mod parse;

pub use codec::{decode, CodecKind, DecodeError};
pub use control::{parse_stanza, split, ControlRecord, ControlStanza, FormatError};
pub use error::{ErrorContext, RegistryError, Result};
pub use fetch::{resolve_document, CandidateError, CandidateFailure, Resolution, ResolveOptions};
pub use index::{IndexOutcome, IndexerOptions, RepositoryIndexer, RepositorySpec, RequestError};
pub use parse::{ParseReport, StanzaParser};
