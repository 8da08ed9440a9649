//! Single-slot hand-off of the latest meeting list.
//!
//! The poller replaces the slot after every fetch; the UI reads the newest
//! value whenever it renders. Readers never see a partially built list.

use std::sync::Arc;

use meetbar_core::MeetingList;
use tokio::sync::watch;

/// Creates a connected publisher/subscriber pair holding an empty list.
pub fn snapshot_channel() -> (SnapshotPublisher, SnapshotSubscriber) {
    let (tx, rx) = watch::channel(Arc::new(MeetingList::empty()));
    (SnapshotPublisher { tx }, SnapshotSubscriber { rx })
}

/// Write side, owned by the poller.
#[derive(Debug)]
pub struct SnapshotPublisher {
    tx: watch::Sender<Arc<MeetingList>>,
}

impl SnapshotPublisher {
    /// Replaces the current snapshot.
    ///
    /// Publishing with no subscribers left is not an error.
    pub fn publish(&self, meetings: MeetingList) {
        self.tx.send_replace(Arc::new(meetings));
    }
}

/// Read side; cheap to clone.
#[derive(Debug, Clone)]
pub struct SnapshotSubscriber {
    rx: watch::Receiver<Arc<MeetingList>>,
}

impl SnapshotSubscriber {
    /// Returns the latest snapshot and marks it seen.
    pub fn latest(&mut self) -> Arc<MeetingList> {
        Arc::clone(&self.rx.borrow_and_update())
    }

    /// Waits until a snapshot newer than the last one seen is published.
    ///
    /// Returns `false` once the publisher is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}
