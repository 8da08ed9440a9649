//! Background polling for meetbar.
//!
//! [`Poller`] connects through a [`Connector`], fetches the upcoming meetings
//! every poll interval and publishes each result through a
//! [`SnapshotPublisher`]. The UI reads it with a [`SnapshotSubscriber`].

pub mod connector;
pub mod error;
pub mod poller;
pub mod snapshot;

pub use connector::{Connector, GoogleConnector};
pub use error::PollerError;
pub use poller::{Poller, PollerConfig};
pub use snapshot::{SnapshotPublisher, SnapshotSubscriber, snapshot_channel};
