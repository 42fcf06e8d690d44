//! Mapping store clients
//!
//! The mapping store correlates legacy keys to target keys and is the
//! single source of truth for idempotency and duplicate detection.
//! [`HttpMappingStore`] talks to the real service; [`InMemoryMappingStore`]
//! enforces the same at-most-one-per-key invariant for tests and local
//! runs.

pub mod client;
pub mod memory;

pub use client::HttpMappingStore;
pub use memory::InMemoryMappingStore;
