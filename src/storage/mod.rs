//! Storage layer abstraction.
//!
//! The graph store is reached only through the [`GraphBackend`] trait. The
//! default backend is an embedded `SQLite` database; an in-memory backend
//! with identical merge semantics is provided for tests.

// Allow significant_drop_tightening - dropping database connections slightly early
// provides no meaningful benefit.
#![allow(clippy::significant_drop_tightening)]

pub mod graph;
pub mod traits;

pub use graph::{InMemoryGraphBackend, SqliteGraphBackend};
pub use traits::{GraphBackend, GraphStats};
