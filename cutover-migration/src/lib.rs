//! Batch migration orchestration
//!
//! Drives a single migration run end to end: enumerate legacy ids, fan out
//! one work item per id, migrate each item idempotently, detect completion
//! by watching the mapping store's authoritative count, and support
//! mid-flight cancellation. All of it is generic over the
//! [`cutover_interfaces::DomainAdapter`] capability interface — a domain
//! supplies its adapter and inherits the whole engine.

pub mod completion;
pub mod error;
pub mod messages;
pub mod orchestrator;
pub mod service;
pub mod worker;

pub use completion::CompletionMonitor;
pub use error::MigrationError;
pub use messages::{queue_name, MappingPayload, MigratePayload, MigrationMessage};
pub use orchestrator::MigrationOrchestrator;
pub use service::MigrationService;
pub use worker::MigrationWorker;
