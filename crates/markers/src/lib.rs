pub mod bbox;
pub mod client;
pub mod error;
pub mod sync;

pub use bbox::BoundingBox;
pub use client::{MarkerClient, MarkerSource};
pub use error::{MarkerError, Result};
pub use sync::{MarkerDiff, MarkerSyncLoop, VisibleMarkers};
