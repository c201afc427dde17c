//! Scan progress notifications
//!
//! The indexer reports progress through an observer registered by the
//! embedding application. Delivery happens on the scanner's worker thread
//! and is fire-and-forget; marshalling onto a UI thread is the embedder's
//! responsibility.

use std::sync::mpsc::{channel, Receiver, Sender};

use crate::models::ScanSummary;

/// Callbacks fired by the scanner worker
///
/// Implementations must tolerate being called from a thread other than the
/// one that registered them, and must not block: a slow observer stalls the
/// scan itself.
pub trait IndexObserver: Send + Sync {
    /// Progress percentage changed (0-100, monotonically non-decreasing
    /// within one scan)
    fn on_progress(&self, _percent: u8) {}

    /// The scan finished, naturally or via cancellation. Fired exactly once
    /// per scan.
    fn on_finished(&self, _summary: &ScanSummary) {}
}

/// Scan events as plain values, for channel-based consumers
#[derive(Debug, Clone)]
pub enum IndexEvent {
    Progress(u8),
    Finished(ScanSummary),
}

/// Observer that forwards events into an mpsc channel
///
/// Useful for pollers and for tests: the receiving end drains events on
/// whatever thread it likes. Send failures (receiver dropped) are ignored.
pub struct ChannelObserver {
    tx: Sender<IndexEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, Receiver<IndexEvent>) {
        let (tx, rx) = channel();
        (Self { tx }, rx)
    }
}

impl IndexObserver for ChannelObserver {
    fn on_progress(&self, percent: u8) {
        let _ = self.tx.send(IndexEvent::Progress(percent));
    }

    fn on_finished(&self, summary: &ScanSummary) {
        let _ = self.tx.send(IndexEvent::Finished(summary.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_observer_forwards_events() {
        let (observer, rx) = ChannelObserver::new();

        observer.on_progress(42);
        observer.on_finished(&ScanSummary {
            files: 1,
            directories: 0,
            skipped: 0,
            cancelled: false,
            elapsed_ms: 5,
        });

        match rx.recv().unwrap() {
            IndexEvent::Progress(p) => assert_eq!(p, 42),
            other => panic!("unexpected event: {:?}", other),
        }
        match rx.recv().unwrap() {
            IndexEvent::Finished(summary) => assert_eq!(summary.files, 1),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (observer, rx) = ChannelObserver::new();
        drop(rx);

        // Must not panic
        observer.on_progress(10);
    }
}
