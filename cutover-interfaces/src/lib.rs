//! # Cutover Interfaces
//!
//! Trait seams shared across the cutover engine crates.
//!
//! The generic migration and synchronisation machinery is parameterized by
//! these contracts instead of subclassing per domain: a [`DomainAdapter`]
//! supplies the per-domain capabilities, the [`MappingStore`] is the single
//! source of truth for correlation and idempotency, and the
//! [`RunRepository`] persists run records independently of the queues.

pub mod adapter;
pub mod mapping;
pub mod reconcile;
pub mod repository;
pub mod telemetry;

// Re-export commonly used types
pub use adapter::{DomainAdapter, LegacyError, Page, TargetError, TransformError};
pub use mapping::{MappingOutcome, MappingStore, StoreError};
pub use reconcile::ReconcileSupport;
pub use repository::{RepositoryError, RunRepository};
pub use telemetry::{CapturingRecorder, EventRecorder, TracingRecorder};
