//! Core domain entities for the cutover migration and synchronisation engine.
//!
//! This crate holds the data model shared by every other cutover crate:
//! migration runs, mapping records, queued work items, and live change
//! events. It deliberately contains no I/O — trait seams live in
//! `cutover-interfaces`, implementations in the engine crates.

pub mod event;
pub mod mapping;
pub mod message;
pub mod run;

pub use event::{ChangeEvent, ChangeEventType};
pub use mapping::{LegacyKey, MappingRecord, MappingType, TargetKey};
pub use message::{MessageContext, WorkItem};
pub use run::{MigrationRun, RunId, RunStatus};

/// Error when parsing a status or type enum from its string form
#[derive(Debug, thiserror::Error)]
#[error("invalid {kind}: '{value}'")]
pub struct ParseError {
    pub kind: &'static str,
    pub value: String,
}
