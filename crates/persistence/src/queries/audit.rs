// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Audit event queries.

use diesel::SqliteConnection;
use diesel::prelude::*;
use hse_permit_audit::{Action, Actor, AuditEvent, Cause, StateSnapshot};
use hse_permit_domain::PermitNumber;

use crate::data_models::{ActionData, ActorData, AuditEventRow, CauseData, StateSnapshotData};
use crate::diesel_schema::audit_events;
use crate::error::PersistenceError;
use crate::records::parse_timestamp;

fn event_from_row(row: AuditEventRow) -> Result<AuditEvent, PersistenceError> {
    let actor: ActorData = serde_json::from_str(&row.actor_json)?;
    let cause: CauseData = serde_json::from_str(&row.cause_json)?;
    let action: ActionData = serde_json::from_str(&row.action_json)?;
    let before: StateSnapshotData = serde_json::from_str(&row.before_snapshot_json)?;
    let after: StateSnapshotData = serde_json::from_str(&row.after_snapshot_json)?;

    Ok(AuditEvent::new(
        row.permit_id,
        row.permit_number.parse::<PermitNumber>()?,
        Actor::new(actor.id, actor.actor_type),
        Cause::new(cause.id, cause.description),
        Action::new(action.name, action.details),
        StateSnapshot::new(before.data),
        StateSnapshot::new(after.data),
        parse_timestamp(&row.occurred_at)?,
    )
    .with_event_id(row.event_id))
}

/// Retrieves an audit event by ID.
///
/// # Errors
///
/// Returns `EventNotFound` if no such event exists.
pub fn get_audit_event(
    conn: &mut SqliteConnection,
    event_id: i64,
) -> Result<AuditEvent, PersistenceError> {
    let row: AuditEventRow = audit_events::table
        .filter(audit_events::event_id.eq(event_id))
        .select(AuditEventRow::as_select())
        .first(conn)
        .optional()?
        .ok_or(PersistenceError::EventNotFound(event_id))?;
    event_from_row(row)
}

/// Retrieves every audit event recorded for a permit number, oldest first.
///
/// Events of deleted permits are still returned.
///
/// # Errors
///
/// Returns an error if the query fails or an event cannot be deserialized.
pub fn get_audit_timeline(
    conn: &mut SqliteConnection,
    permit_number: &PermitNumber,
) -> Result<Vec<AuditEvent>, PersistenceError> {
    audit_events::table
        .filter(audit_events::permit_number.eq(permit_number.as_str()))
        .order(audit_events::event_id.asc())
        .select(AuditEventRow::as_select())
        .load(conn)?
        .into_iter()
        .map(event_from_row)
        .collect()
}
