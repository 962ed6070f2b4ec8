// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! State-changing operations for the persistence layer.
//!
//! ## Module Organization
//!
//! - `audit`: Audit event persistence
//! - `numbering`: Permit number allocation
//! - `permits`: Permit row and child row writes
//!
//! The functions here compose those into one transaction per command, so a
//! permit and its audit event are committed together or not at all.

pub mod audit;
pub mod numbering;
pub mod permits;

use diesel::SqliteConnection;
use diesel::prelude::*;
use hse_permit::{CreationResult, TransitionResult};
use hse_permit_audit::AuditEvent;
use hse_permit_domain::HazardCategoryTable;
use tracing::info;

use crate::error::PersistenceError;

pub use numbering::allocate_permit_number;

/// Identifiers assigned when a permit command is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistedPermit {
    pub permit_id: i64,
    /// The permit's version after the commit.
    pub version: i64,
    pub event_id: i64,
}

/// Persists a newly created permit and its creation event.
///
/// # Errors
///
/// Returns an error if any write fails; nothing is committed in that case.
pub fn persist_creation(
    conn: &mut SqliteConnection,
    result: &CreationResult,
    categories: &HazardCategoryTable,
) -> Result<PersistedPermit, PersistenceError> {
    conn.immediate_transaction(|conn| {
        let permit_id: i64 = permits::insert_permit(conn, &result.permit, categories)?;
        let event_id: i64 =
            audit::persist_audit_event(conn, &result.audit_event, Some(permit_id))?;

        info!(
            permit_id,
            event_id,
            permit_number = %result.permit.permit_number(),
            "Persisted new permit"
        );
        Ok(PersistedPermit {
            permit_id,
            version: 1,
            event_id,
        })
    })
}

/// Persists the outcome of a command applied to a stored permit.
///
/// # Errors
///
/// Returns `ConcurrencyConflict` if the permit changed since it was loaded,
/// or another error if a write fails. Nothing is committed on error.
pub fn persist_transition(
    conn: &mut SqliteConnection,
    result: &TransitionResult,
    categories: &HazardCategoryTable,
) -> Result<PersistedPermit, PersistenceError> {
    conn.immediate_transaction(|conn| {
        let (permit_id, version): (i64, i64) =
            permits::update_permit(conn, &result.new_permit, categories)?;
        let event_id: i64 =
            audit::persist_audit_event(conn, &result.audit_event, Some(permit_id))?;

        info!(
            permit_id,
            version,
            event_id,
            action = %result.audit_event.action.name,
            "Persisted permit transition"
        );
        Ok(PersistedPermit {
            permit_id,
            version,
            event_id,
        })
    })
}

/// Deletes a permit and records the deletion in the audit log.
///
/// # Returns
///
/// The event ID of the deletion event.
///
/// # Errors
///
/// Returns an error if the permit is missing or was modified concurrently.
pub fn persist_deletion(
    conn: &mut SqliteConnection,
    permit_id: i64,
    expected_version: i64,
    event: &AuditEvent,
) -> Result<i64, PersistenceError> {
    conn.immediate_transaction(|conn| {
        permits::delete_permit(conn, permit_id, expected_version)?;
        // The permit row is gone; the event keeps only the permit number.
        let event_id: i64 = audit::persist_audit_event(conn, event, None)?;
        info!(permit_id, event_id, "Deleted permit");
        Ok(event_id)
    })
}
