//! Index discovery with codec fallback.
//!
//! A repository may publish its `Packages` index under several encodings.
//! [`resolve_document`] walks the configured candidates in order and keeps the
//! first one that both downloads and decodes to a non-empty document.

use aptdex_dl::{Fetcher, TransportError};
use aptdex_events::{EventSink, IndexEvent};
use miette::Diagnostic;
use thiserror::Error;
use tracing::{debug, trace};

use crate::codec::{self, CodecKind, DecodeError, DEFAULT_MAX_DECODED_SIZE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Candidates in the order they are tried.
    pub codecs: Vec<CodecKind>,
    /// Ceiling for a single decoded document.
    pub max_decoded_size: u64,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            codecs: CodecKind::DEFAULT_ORDER.to_vec(),
            max_decoded_size: DEFAULT_MAX_DECODED_SIZE,
        }
    }
}

/// Raw bytes of one candidate, not yet decoded.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub source_url: String,
    pub encoding: CodecKind,
    pub raw_bytes: Vec<u8>,
}

impl FetchedDocument {
    pub fn decode(self, limit: u64) -> Result<DecodedDocument, CandidateError> {
        let text = codec::decode(self.encoding, &self.raw_bytes, limit)?;
        if text.iter().all(u8::is_ascii_whitespace) {
            return Err(CandidateError::EmptyDocument);
        }
        Ok(DecodedDocument {
            source_url: self.source_url,
            encoding: self.encoding,
            compressed_size: self.raw_bytes.len() as u64,
            text,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedDocument {
    pub source_url: String,
    pub encoding: CodecKind,
    pub compressed_size: u64,
    pub text: Vec<u8>,
}

/// Why a single candidate was rejected.
#[derive(Error, Diagnostic, Debug)]
pub enum CandidateError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Decode(#[from] DecodeError),

    #[error("Decoded document is empty")]
    #[diagnostic(code(aptdex_registry::fetch::empty_document))]
    EmptyDocument,
}

#[derive(Debug)]
pub struct CandidateFailure {
    pub codec: CodecKind,
    pub url: String,
    pub error: CandidateError,
}

impl CandidateFailure {
    pub fn reason(&self) -> String {
        self.error.to_string()
    }
}

/// Result of walking the candidate list.
#[derive(Debug, Default)]
pub struct Resolution {
    /// The first candidate that decoded, if any.
    pub document: Option<DecodedDocument>,
    /// Candidates that were tried and rejected, in order.
    pub failures: Vec<CandidateFailure>,
    /// Candidates left untried because an earlier one succeeded.
    pub skipped: Vec<CodecKind>,
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        self.document.is_some()
    }
}

/// URL of `codec`'s index resource under `base_url`.
pub fn candidate_url(base_url: &str, codec: CodecKind) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), codec.resource())
}

fn fetch_candidate(
    fetcher: &dyn Fetcher,
    url: &str,
    codec: CodecKind,
) -> Result<FetchedDocument, CandidateError> {
    let raw_bytes = fetcher.fetch(url)?;
    Ok(FetchedDocument {
        source_url: url.to_string(),
        encoding: codec,
        raw_bytes,
    })
}

/// Tries each configured codec against `base_url` until one yields a document.
///
/// Never fails: every rejected candidate is recorded in the returned
/// [`Resolution`] and announced through `events`.
pub fn resolve_document(
    fetcher: &dyn Fetcher,
    base_url: &str,
    options: &ResolveOptions,
    events: &dyn EventSink,
) -> Resolution {
    let mut resolution = Resolution::default();

    for &codec in &options.codecs {
        let url = candidate_url(base_url, codec);

        if resolution.document.is_some() {
            events.emit(IndexEvent::CandidateSkipped {
                url,
                codec: codec.name().to_string(),
            });
            resolution.skipped.push(codec);
            continue;
        }

        trace!(url = %url, codec = codec.name(), "trying candidate");
        events.emit(IndexEvent::CandidateAttempt {
            url: url.clone(),
            codec: codec.name().to_string(),
        });

        let result = fetch_candidate(fetcher, &url, codec)
            .and_then(|fetched| fetched.decode(options.max_decoded_size));

        match result {
            Ok(document) => {
                debug!(
                    url = %url,
                    codec = codec.name(),
                    compressed = document.compressed_size,
                    decoded = document.text.len(),
                    "resolved index"
                );
                events.emit(IndexEvent::DocumentResolved {
                    url,
                    codec: codec.name().to_string(),
                    compressed: document.compressed_size,
                    decoded: document.text.len() as u64,
                });
                resolution.document = Some(document);
            }
            Err(error) => {
                debug!(url = %url, codec = codec.name(), "candidate failed: {error}");
                events.emit(IndexEvent::CandidateFailed {
                    url: url.clone(),
                    codec: codec.name().to_string(),
                    reason: error.to_string(),
                });
                resolution.failures.push(CandidateFailure {
                    codec,
                    url,
                    error,
                });
            }
        }
    }

    resolution
}
