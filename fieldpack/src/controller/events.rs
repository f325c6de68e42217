//! Progress events.
//!
//! Each operation gets its own [`PackageEvents`] stream; the controller also
//! fans every event out on a broadcast channel for UI listeners. Within one
//! stream progress never decreases and exactly one event is terminal.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};

use crate::package::{PackageRecord, PackageStatus};

/// Which pipeline produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Download,
    Removal,
    Validation,
}

/// One progress update for a package.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageEvent {
    pub package_id: String,
    pub operation: Operation,
    pub status: PackageStatus,
    /// Percent complete, `0..=100`.
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Final record, present on the terminal event only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<PackageRecord>,
    pub terminal: bool,
}

/// Receiving end of one operation's events.
#[derive(Debug)]
pub struct PackageEvents {
    package_id: String,
    rx: mpsc::UnboundedReceiver<PackageEvent>,
}

impl PackageEvents {
    pub fn package_id(&self) -> &str {
        &self.package_id
    }

    /// Next event, or `None` once the pipeline has finished and the stream
    /// is drained.
    pub async fn next(&mut self) -> Option<PackageEvent> {
        self.rx.recv().await
    }

    /// Skip to the terminal event.
    pub async fn wait_terminal(mut self) -> Option<PackageEvent> {
        while let Some(event) = self.rx.recv().await {
            if event.terminal {
                return Some(event);
            }
        }
        None
    }

    /// Every event up to and including the terminal one.
    pub async fn collect(mut self) -> Vec<PackageEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.rx.recv().await {
            let terminal = event.terminal;
            events.push(event);
            if terminal {
                break;
            }
        }
        events
    }
}

#[derive(Debug, Default)]
struct SinkState {
    last_progress: u8,
    finished: bool,
}

/// Sending end shared by a pipeline and its progress callbacks.
#[derive(Debug)]
pub(crate) struct EventSink {
    package_id: String,
    operation: Operation,
    state: Mutex<SinkState>,
    tx: Option<mpsc::UnboundedSender<PackageEvent>>,
    fanout: broadcast::Sender<PackageEvent>,
}

impl EventSink {
    /// Create a sink and its receiving stream.
    pub(crate) fn channel(
        package_id: &str,
        operation: Operation,
        fanout: broadcast::Sender<PackageEvent>,
    ) -> (Arc<Self>, PackageEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Self {
            package_id: package_id.to_string(),
            operation,
            state: Mutex::new(SinkState::default()),
            tx: Some(tx),
            fanout,
        };
        let events = PackageEvents {
            package_id: package_id.to_string(),
            rx,
        };
        (Arc::new(sink), events)
    }

    /// Create a sink that only feeds the broadcast channel.
    pub(crate) fn detached(
        package_id: &str,
        operation: Operation,
        fanout: broadcast::Sender<PackageEvent>,
    ) -> Arc<Self> {
        Arc::new(Self {
            package_id: package_id.to_string(),
            operation,
            state: Mutex::new(SinkState::default()),
            tx: None,
            fanout,
        })
    }

    /// Emit a non-terminal update. Ignored after the terminal event.
    pub(crate) fn progress(&self, status: PackageStatus, progress: u8) {
        let mut state = self.state.lock();
        if state.finished {
            return;
        }
        state.last_progress = state.last_progress.max(progress.min(100));
        self.send(PackageEvent {
            package_id: self.package_id.clone(),
            operation: self.operation,
            status,
            progress: state.last_progress,
            error_message: None,
            record: None,
            terminal: false,
        });
    }

    /// Emit the terminal event carrying `record`.
    ///
    /// `progress` of `None` repeats the last value. Returns false if a
    /// terminal event was already sent.
    pub(crate) fn finish(&self, record: &PackageRecord, progress: Option<u8>) -> bool {
        let mut state = self.state.lock();
        if state.finished {
            return false;
        }
        state.finished = true;
        if let Some(progress) = progress {
            state.last_progress = state.last_progress.max(progress.min(100));
        }
        self.send(PackageEvent {
            package_id: self.package_id.clone(),
            operation: self.operation,
            status: record.status,
            progress: state.last_progress,
            error_message: record.error_message.clone(),
            record: Some(record.clone()),
            terminal: true,
        });
        true
    }

    fn send(&self, event: PackageEvent) {
        // Nobody listening is fine for both channels
        let _ = self.fanout.send(event.clone());
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::Bounds;

    fn record(status: PackageStatus) -> PackageRecord {
        let mut record = PackageRecord::new(
            "farm1",
            "farm1",
            "style",
            Bounds::new(-49.0, -22.0, -48.5, -21.5),
            10,
            14,
        );
        record.set_status(status);
        record
    }

    #[tokio::test]
    async fn test_progress_is_clamped_non_decreasing() {
        let (fanout, _) = broadcast::channel(16);
        let (sink, events) = EventSink::channel("farm1", Operation::Download, fanout);

        sink.progress(PackageStatus::Downloading, 0);
        sink.progress(PackageStatus::Downloading, 90);
        sink.progress(PackageStatus::Downloading, 30);
        sink.progress(PackageStatus::Validating, 95);
        sink.finish(&record(PackageStatus::Ready), Some(100));

        let progress: Vec<u8> = events.collect().await.iter().map(|e| e.progress).collect();
        assert_eq!(progress, vec![0, 90, 90, 95, 100]);
    }

    #[tokio::test]
    async fn test_only_one_terminal_event() {
        let (fanout, mut listener) = broadcast::channel(16);
        let (sink, mut events) = EventSink::channel("farm1", Operation::Removal, fanout);

        assert!(sink.finish(&record(PackageStatus::Removed), Some(100)));
        assert!(!sink.finish(&record(PackageStatus::Error), None));
        sink.progress(PackageStatus::Removing, 100);
        drop(sink);

        let first = events.next().await.unwrap();
        assert!(first.terminal);
        assert_eq!(first.status, PackageStatus::Removed);
        assert!(events.next().await.is_none());
        assert_eq!(listener.recv().await.unwrap(), first);
    }

    #[test]
    fn test_event_serializes_camel_case() {
        let event = PackageEvent {
            package_id: "farm1".into(),
            operation: Operation::Download,
            status: PackageStatus::Downloading,
            progress: 42,
            error_message: None,
            record: None,
            terminal: false,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["packageId"], "farm1");
        assert_eq!(value["status"], "downloading");
        assert_eq!(value["operation"], "download");
        assert!(value.get("record").is_none());
    }
}
