mod drive;
mod migrate;
mod snapshot;

pub use snapshot::{LoadOutcome, SnapshotStore};
