//! Live change-event synchronisation
//!
//! Consumes a domain's change-event stream and keeps Target consistent with
//! Legacy until cutover: envelope discrimination (live event vs typed
//! retry), per-`(domain, event)` feature switches, self-write suppression
//! to break Target→Legacy→Target feedback loops, a generic upsert handler
//! speaking the mapping-store protocol, and the booking-move / merge
//! reconciler for identity-changing events.

pub mod error;
pub mod feature;
pub mod handler;
pub mod messages;
pub mod reconcile;
pub mod router;

pub use error::SyncError;
pub use feature::FeatureSwitches;
pub use handler::{ChangeHandler, SyncHandler};
pub use messages::{RetryKind, SyncMappingPayload, SyncMessage};
pub use reconcile::{BookingMovedDetails, MergeDetails, Reconciler};
pub use router::SyncEventRouter;
