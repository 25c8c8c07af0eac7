/// All event types emitted while indexing a repository.
///
/// Codec names are the short config names (`zst`, `bz2`, `gz`, `xz`, `plain`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexEvent {
    /// An indexing call started for `repository`.
    IndexStarted { repository: String },
    /// A codec candidate is being fetched.
    CandidateAttempt { url: String, codec: String },
    /// A codec candidate failed to fetch or decode; the next one is tried.
    CandidateFailed {
        url: String,
        codec: String,
        reason: String,
    },
    /// A codec candidate was not tried because an earlier one succeeded.
    CandidateSkipped { url: String, codec: String },
    /// A candidate fetched and decoded into a non-empty document.
    DocumentResolved {
        url: String,
        codec: String,
        compressed: u64,
        decoded: u64,
    },
    /// Indexing stage change for `repository`.
    Progress { repository: String, stage: IndexStage },
}

/// Indexing stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexStage {
    /// Walking the codec candidates.
    Resolving,
    /// Parsing the decoded document.
    Parsing { stanzas: usize },
    /// Finished with parsed records.
    Complete { records: usize, failed: usize },
    /// Every codec candidate failed.
    Unavailable,
    /// The request uses a strategy that has no implementation.
    NotImplemented,
    /// The request was structurally invalid.
    Rejected { reason: String },
}
