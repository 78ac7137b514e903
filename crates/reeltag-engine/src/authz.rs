//! Per-segment ownership authorization.
//!
//! Ownership is checked per segment, not per video: one call may mix
//! segments owned by different users. A failure on any single planned
//! mutation rejects the whole call before anything is written, so no
//! partial application is ever observable for a rejected call.

use reeltag_core::{Error, Identity, Result};

use crate::plan::ReconcilePlan;

/// Check every planned mutation against the caller's identity.
///
/// Updates and deletions require the caller to own the persisted segment
/// unless the role is elevated (admin/root). Creations are always allowed;
/// ownership of a new segment is assigned from the caller, never taken
/// from the payload. Pristine entries never reach the plan, so they can
/// never trigger a rejection.
pub fn authorize_plan(identity: &Identity, plan: &ReconcilePlan) -> Result<()> {
    if identity.role.is_elevated() {
        return Ok(());
    }

    for update in &plan.updated {
        if update.owner != identity.user_id {
            return Err(Error::Forbidden(format!(
                "segment {} is owned by another user",
                update.spec.segment_id
            )));
        }
    }
    for deleted in &plan.deleted {
        if deleted.segment.owner != identity.user_id {
            return Err(Error::Forbidden(format!(
                "segment {} is owned by another user",
                deleted.segment.segment_id
            )));
        }
    }

    Ok(())
}
