//! Run record persistence
//!
//! Runs are persisted independently of the queues so operators can query
//! progress and history after the workers have detached, and so the
//! one-active-run-per-domain rule survives restarts. [`SqliteRunRepository`]
//! is the durable implementation; [`InMemoryRunRepository`] backs tests and
//! local runs.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryRunRepository;
pub use sqlite::SqliteRunRepository;
