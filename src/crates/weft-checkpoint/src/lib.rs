//! # weft-checkpoint — durability sideband for weft runs
//!
//! This crate defines the storage contract the weft runner uses to record run
//! progress, plus an in-memory reference backend. The engine consults the
//! store only at run and superstep boundaries; scheduling correctness never
//! depends on it, and a failing store merely loses durability.
//!
//! ## Core types
//!
//! - [`CheckpointStore`] — async trait a storage backend implements
//! - [`RunRecord`] / [`StepRecord`] — the two persisted record shapes
//! - [`RunStatus`] / [`RunFilter`] — status lifecycle and query filter
//! - [`InMemoryCheckpointStore`] — reference backend for tests and tools
//!
//! ## Example
//!
//! ```rust
//! use weft_checkpoint::{CheckpointStore, InMemoryCheckpointStore, RunFilter};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = InMemoryCheckpointStore::new();
//! let runs = store.list_runs(RunFilter::default()).await.unwrap();
//! assert!(runs.is_empty());
//! # }
//! ```

pub mod error;
pub mod memory;
pub mod records;
pub mod store;

pub use error::{CheckpointError, Result};
pub use memory::InMemoryCheckpointStore;
pub use records::{RunFilter, RunRecord, RunStatus, StepRecord};
pub use store::CheckpointStore;
