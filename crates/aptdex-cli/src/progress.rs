use std::{
    collections::HashMap,
    sync::{mpsc::Receiver, Arc, LazyLock},
    time::Duration,
};

use aptdex_events::{IndexEvent, IndexStage};
use aptdex_utils::bytes::format_bytes;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use nu_ansi_term::Color::{Cyan, Green, Red, Yellow};
use tracing::{debug, info};

use crate::utils::{progress_enabled, Colored};

/// Shared MultiProgress instance so log output can suspend the spinners.
static MULTI: LazyLock<Arc<MultiProgress>> = LazyLock::new(|| Arc::new(MultiProgress::new()));

/// Pause progress display, run the closure, then resume.
pub fn suspend<F: FnOnce()>(f: F) {
    MULTI.suspend(f);
}

/// Owns the background thread started by [`spawn_event_handler`].
pub struct ProgressGuard {
    handle: Option<std::thread::JoinHandle<()>>,
}

impl ProgressGuard {
    /// Waits for the handler thread to drain the remaining events.
    ///
    /// Every sender (the indexer holding the sink) must be dropped first,
    /// otherwise this blocks forever.
    pub fn finish(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {prefix} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn create_spinner(repository: &str) -> ProgressBar {
    let pb = if progress_enabled() {
        MULTI.add(ProgressBar::new_spinner())
    } else {
        MULTI.add(ProgressBar::hidden())
    };
    pb.set_style(spinner_style());
    pb.set_prefix(format!("{}", Colored(Cyan, repository)));
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// One-line summary printed when a repository finishes.
fn stage_summary(stage: &IndexStage) -> Option<String> {
    let summary = match stage {
        IndexStage::Complete {
            records,
            failed: 0,
        } => format!("{}", Colored(Green, format!("{records} packages"))),
        IndexStage::Complete {
            records,
            failed,
        } => {
            format!(
                "{} ({})",
                Colored(Green, format!("{records} packages")),
                Colored(Yellow, format!("{failed} malformed stanzas skipped"))
            )
        }
        IndexStage::Unavailable => format!("{}", Colored(Red, "no usable package index")),
        IndexStage::NotImplemented => {
            format!(
                "{}",
                Colored(Yellow, "distribution repositories are not indexed")
            )
        }
        IndexStage::Rejected {
            reason,
        } => format!("{}", Colored(Red, reason)),
        IndexStage::Resolving
        | IndexStage::Parsing {
            ..
        } => return None,
    };
    Some(summary)
}

/// Spawns a thread that maps [`IndexEvent`]s onto one spinner per repository.
pub fn spawn_event_handler(receiver: Receiver<IndexEvent>) -> ProgressGuard {
    let handle = std::thread::spawn(move || {
        let mut jobs: HashMap<String, ProgressBar> = HashMap::new();
        let mut current: Option<String> = None;

        while let Ok(event) = receiver.recv() {
            match event {
                IndexEvent::IndexStarted {
                    repository,
                } => {
                    let pb = create_spinner(&repository);
                    pb.set_message("starting");
                    jobs.insert(repository.clone(), pb);
                    current = Some(repository);
                }
                IndexEvent::CandidateAttempt {
                    url,
                    codec,
                } => {
                    debug!(url = %url, codec = %codec, "trying candidate");
                    if let Some(pb) = current.as_ref().and_then(|r| jobs.get(r)) {
                        pb.set_message(format!("fetching Packages.{codec}"));
                    }
                }
                IndexEvent::CandidateFailed {
                    url,
                    reason,
                    ..
                } => {
                    debug!(url = %url, "candidate failed: {reason}");
                }
                IndexEvent::CandidateSkipped {
                    ..
                } => {}
                IndexEvent::DocumentResolved {
                    url,
                    compressed,
                    decoded,
                    ..
                } => {
                    debug!(
                        url = %url,
                        "resolved {} ({} decoded)",
                        format_bytes(compressed, 2),
                        format_bytes(decoded, 2)
                    );
                    if let Some(pb) = current.as_ref().and_then(|r| jobs.get(r)) {
                        pb.set_message(format!("decoded {}", format_bytes(decoded, 2)));
                    }
                }
                IndexEvent::Progress {
                    repository,
                    stage,
                } => {
                    match &stage {
                        IndexStage::Resolving => {
                            if let Some(pb) = jobs.get(&repository) {
                                pb.set_message("resolving");
                            }
                        }
                        IndexStage::Parsing {
                            stanzas,
                        } => {
                            if let Some(pb) = jobs.get(&repository) {
                                pb.set_message(format!("parsing {stanzas} stanzas"));
                            }
                        }
                        _ => {
                            if let Some(pb) = jobs.remove(&repository) {
                                pb.finish_and_clear();
                            }
                            if let Some(summary) = stage_summary(&stage) {
                                info!("{}: {summary}", Colored(Cyan, &repository));
                            }
                            if current.as_deref() == Some(repository.as_str()) {
                                current = None;
                            }
                        }
                    }
                }
            }
        }

        for (_, pb) in jobs {
            pb.finish_and_clear();
        }
    });

    ProgressGuard {
        handle: Some(handle),
    }
}
