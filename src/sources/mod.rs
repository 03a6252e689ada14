//! Source retrieval for the wrapped library.

pub mod snapshot;

pub use snapshot::{ArchiveFormat, SnapshotSource, SourceError};
