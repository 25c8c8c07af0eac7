mod event;
mod sink;

use std::sync::Arc;

pub use event::*;
pub use sink::*;

/// Shared handle to an event sink.
pub type EventSinkHandle = Arc<dyn EventSink>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_sink() {
        NullSink.emit(IndexEvent::IndexStarted {
            repository: "https://repo.example.org".to_string(),
        });
    }

    #[test]
    fn test_log_sink_accepts_every_event() {
        let sink: EventSinkHandle = Arc::new(LogSink);
        sink.emit(IndexEvent::CandidateSkipped {
            url: "https://repo.example.org/Packages.gz".to_string(),
            codec: "gz".to_string(),
        });
        sink.emit(IndexEvent::Progress {
            repository: String::new(),
            stage: IndexStage::Rejected {
                reason: "empty base URL".to_string(),
            },
        });
    }

    #[test]
    fn test_channel_sink() {
        let (sink, rx) = ChannelSink::new();
        sink.emit(IndexEvent::CandidateAttempt {
            url: "https://repo.example.org/Packages.zst".to_string(),
            codec: "zst".to_string(),
        });
        sink.emit(IndexEvent::CandidateFailed {
            url: "https://repo.example.org/Packages.zst".to_string(),
            codec: "zst".to_string(),
            reason: "HTTP 404".to_string(),
        });
        sink.emit(IndexEvent::DocumentResolved {
            url: "https://repo.example.org/Packages.bz2".to_string(),
            codec: "bz2".to_string(),
            compressed: 10,
            decoded: 40,
        });

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], IndexEvent::CandidateAttempt { codec, .. } if codec == "zst"));
        assert!(matches!(&events[1], IndexEvent::CandidateFailed { .. }));
        assert!(matches!(
            &events[2],
            IndexEvent::DocumentResolved {
                decoded: 40,
                ..
            }
        ));
    }

    #[test]
    fn test_channel_sink_receiver_dropped() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.emit(IndexEvent::Progress {
            repository: "orphaned".to_string(),
            stage: IndexStage::Resolving,
        });
    }

    #[test]
    fn test_collector_sink() {
        let sink = CollectorSink::default();
        assert!(sink.is_empty());

        sink.emit(IndexEvent::Progress {
            repository: "repo".to_string(),
            stage: IndexStage::Parsing { stanzas: 12 },
        });
        sink.emit(IndexEvent::Progress {
            repository: "repo".to_string(),
            stage: IndexStage::Complete {
                records: 11,
                failed: 1,
            },
        });

        assert_eq!(sink.len(), 2);
        assert_eq!(
            sink.events()[1],
            IndexEvent::Progress {
                repository: "repo".to_string(),
                stage: IndexStage::Complete {
                    records: 11,
                    failed: 1,
                },
            }
        );
    }

    #[test]
    fn test_event_sink_handle() {
        let collector = Arc::new(CollectorSink::default());
        let sink: EventSinkHandle = collector.clone();
        sink.emit(IndexEvent::CandidateSkipped {
            url: "https://repo.example.org/Packages.gz".to_string(),
            codec: "gz".to_string(),
        });
        assert_eq!(collector.len(), 1);
    }

    #[test]
    fn test_event_sink_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NullSink>();
        assert_send_sync::<ChannelSink>();
        assert_send_sync::<CollectorSink>();
    }
}
