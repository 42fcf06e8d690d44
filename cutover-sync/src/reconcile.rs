//! Booking-move and merge reconciliation
//!
//! Identity-changing legacy events risk leaving the two systems diverged,
//! so failures here are recorded and re-raised — broker redelivery and
//! backoff apply, nothing is swallowed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use cutover_core::{ChangeEvent, LegacyKey};
use cutover_interfaces::{EventRecorder, ReconcileSupport};

use crate::error::SyncError;

/// Payload of a `merged` event
#[derive(Debug, Clone, Deserialize)]
pub struct MergeDetails {
    /// Identity whose records are disappearing
    pub losing: LegacyKey,

    /// Identity that survives the merge
    pub surviving: LegacyKey,
}

/// Payload of a `booking_moved` event
#[derive(Debug, Clone, Deserialize)]
pub struct BookingMovedDetails {
    pub booking_id: String,

    /// Person the booking moved away from
    pub from_person: LegacyKey,

    /// Person the booking moved to
    pub to_person: LegacyKey,

    /// Start of the moved booking; the gate for destination re-sync
    pub booking_started_at: DateTime<Utc>,
}

/// Cross-entity consistency repair for identity-changing events
pub struct Reconciler {
    domain: String,
    support: Arc<dyn ReconcileSupport>,
    recorder: Arc<dyn EventRecorder>,
}

impl Reconciler {
    pub fn new(
        domain: impl Into<String>,
        support: Arc<dyn ReconcileSupport>,
        recorder: Arc<dyn EventRecorder>,
    ) -> Self {
        Self {
            domain: domain.into(),
            support,
            recorder,
        }
    }

    /// Two person records merged: instruct the target to fold the losing
    /// identity's data into the surviving one
    pub async fn merged(&self, event: &ChangeEvent) -> Result<(), SyncError> {
        let details: MergeDetails = serde_json::from_value(event.payload.clone())
            .map_err(|e| SyncError::MalformedPayload(e.to_string()))?;

        if let Err(error) = self.support.merge_target(&details.losing, &details.surviving).await {
            self.record_error("merge", &error);
            return Err(error.into());
        }

        info!(losing = %details.losing, surviving = %details.surviving, "target merge completed");
        Ok(())
    }

    /// A booking moved between persons: re-sync origin unconditionally,
    /// re-sync destination only when its data changed because of the move,
    /// then push the destination state back into Legacy
    pub async fn booking_moved(&self, event: &ChangeEvent) -> Result<(), SyncError> {
        let details: BookingMovedDetails = serde_json::from_value(event.payload.clone())
            .map_err(|e| SyncError::MalformedPayload(e.to_string()))?;

        if let Err(error) = self.apply_booking_move(&details).await {
            self.record_error("booking-move", &error);
            return Err(error);
        }
        Ok(())
    }

    async fn apply_booking_move(&self, details: &BookingMovedDetails) -> Result<(), SyncError> {
        // 1. The origin's latest-booking view may now reflect an earlier
        //    booking; re-sync it unconditionally
        match self.support.latest_view(&details.from_person).await? {
            Some(view) => {
                self.support.push_view(&details.from_person, &view).await?;
                debug!(person = %details.from_person, "origin view re-synced");
            }
            None => {
                info!(person = %details.from_person, "origin has no remaining view");
            }
        }

        // 2 + 3. Destination: a last-modified timestamp strictly after the
        //    booking start means the data changed because of the move;
        //    anything else is stale history carried over and must not
        //    overwrite the target
        let Some(view) = self.support.latest_view(&details.to_person).await? else {
            info!(person = %details.to_person, "destination has no view, nothing to reconcile");
            return Ok(());
        };

        let changed_by_move = self
            .support
            .modified_at(&view)
            .map(|modified| modified > details.booking_started_at)
            .unwrap_or(false);

        if changed_by_move {
            self.support.push_view(&details.to_person, &view).await?;
            debug!(person = %details.to_person, "destination view re-synced");
        } else {
            debug!(
                person = %details.to_person,
                booking_id = %details.booking_id,
                "destination view predates booking start, skipping target push"
            );
        }

        // The move itself can leave legacy-side derived fields stale
        self.support.sync_back(&details.to_person, &view).await?;

        Ok(())
    }

    fn record_error(&self, step: &str, error: &dyn std::fmt::Display) {
        self.recorder.record(
            &format!("{}-reconcile-error", self.domain),
            &[("step", step.to_string()), ("error", error.to_string())],
        );
    }
}
