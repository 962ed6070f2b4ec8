// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Permit row mutations.
//!
//! The `permits` row carries the optimistic concurrency token. Hazards,
//! precautions and attachments are editable ledgers and are replaced in
//! full on every save. Approvals and lifecycle events are append-only, so a
//! save only inserts the records beyond those already stored.

use diesel::SqliteConnection;
use diesel::prelude::*;
use hse_permit::WorkPermit;
use hse_permit_domain::HazardCategoryTable;
use num_traits::ToPrimitive;
use tracing::{debug, warn};

use crate::backend::sqlite::get_last_insert_rowid;
use crate::data_models::{AttachmentRow, HazardRow, PermitColumns, PrecautionRow};
use crate::diesel_schema::{
    permit_approvals, permit_attachments, permit_hazards, permit_lifecycle_events,
    permit_precautions, permits,
};
use crate::error::PersistenceError;
use crate::records::{
    approval_rows, attachment_rows, hazard_rows, lifecycle_rows, permit_columns, precaution_rows,
};

/// Inserts a new permit at version 1.
///
/// # Arguments
///
/// * `conn` - The active database connection
/// * `permit` - The permit to insert; its id is ignored
/// * `categories` - The hazard category table
///
/// # Returns
///
/// The permit ID assigned by the database.
///
/// # Errors
///
/// Returns an error if the permit number is taken or any insert fails.
pub fn insert_permit(
    conn: &mut SqliteConnection,
    permit: &WorkPermit,
    categories: &HazardCategoryTable,
) -> Result<i64, PersistenceError> {
    let columns: PermitColumns = permit_columns(permit, 1)?;
    diesel::insert_into(permits::table)
        .values(&columns)
        .execute(conn)?;
    let permit_id: i64 = get_last_insert_rowid(conn)?;

    replace_ledgers(conn, permit_id, permit, categories)?;
    append_history(conn, permit_id, permit)?;

    debug!(permit_id, permit_number = %permit.permit_number(), "Inserted permit");
    Ok(permit_id)
}

/// Writes a modified permit if nobody else has written it since it was loaded.
///
/// # Arguments
///
/// * `conn` - The active database connection
/// * `permit` - The modified permit, carrying the id and version it was loaded with
/// * `categories` - The hazard category table
///
/// # Returns
///
/// The permit ID and its new version.
///
/// # Errors
///
/// Returns an error if:
/// - The permit has never been stored
/// - The permit no longer exists
/// - The stored version differs from the permit's version
pub fn update_permit(
    conn: &mut SqliteConnection,
    permit: &WorkPermit,
    categories: &HazardCategoryTable,
) -> Result<(i64, i64), PersistenceError> {
    let permit_id: i64 = permit.id().ok_or_else(|| {
        PersistenceError::Other(format!(
            "Permit {} has not been stored yet",
            permit.permit_number()
        ))
    })?;
    let expected_version: i64 = permit.version();
    let new_version: i64 = expected_version + 1;

    let columns: PermitColumns = permit_columns(permit, new_version)?;
    let updated: usize = diesel::update(
        permits::table
            .filter(permits::permit_id.eq(permit_id))
            .filter(permits::version.eq(expected_version)),
    )
    .set(&columns)
    .execute(conn)?;

    if updated == 0 {
        return Err(version_mismatch(conn, permit_id, expected_version));
    }

    replace_ledgers(conn, permit_id, permit, categories)?;
    append_history(conn, permit_id, permit)?;

    debug!(permit_id, version = new_version, "Updated permit");
    Ok((permit_id, new_version))
}

/// Deletes a permit and all of its child rows.
///
/// # Errors
///
/// Returns an error if the permit does not exist or the stored version
/// differs from `expected_version`.
pub fn delete_permit(
    conn: &mut SqliteConnection,
    permit_id: i64,
    expected_version: i64,
) -> Result<(), PersistenceError> {
    let deleted: usize = diesel::delete(
        permits::table
            .filter(permits::permit_id.eq(permit_id))
            .filter(permits::version.eq(expected_version)),
    )
    .execute(conn)?;

    if deleted == 0 {
        return Err(version_mismatch(conn, permit_id, expected_version));
    }

    debug!(permit_id, "Deleted permit");
    Ok(())
}

/// Explains why a version-guarded write touched no rows.
fn version_mismatch(
    conn: &mut SqliteConnection,
    permit_id: i64,
    expected_version: i64,
) -> PersistenceError {
    let actual: Result<Option<i64>, diesel::result::Error> = permits::table
        .select(permits::version)
        .filter(permits::permit_id.eq(permit_id))
        .first::<i64>(conn)
        .optional();

    match actual {
        Ok(Some(actual_version)) => {
            warn!(
                permit_id,
                expected_version, actual_version, "Optimistic concurrency conflict"
            );
            PersistenceError::ConcurrencyConflict {
                permit_id,
                expected_version,
                actual_version,
            }
        }
        Ok(None) => PersistenceError::PermitNotFound(permit_id),
        Err(e) => PersistenceError::from(e),
    }
}

fn replace_ledgers(
    conn: &mut SqliteConnection,
    permit_id: i64,
    permit: &WorkPermit,
    categories: &HazardCategoryTable,
) -> Result<(), PersistenceError> {
    diesel::delete(permit_hazards::table.filter(permit_hazards::permit_id.eq(permit_id)))
        .execute(conn)?;
    let hazards: Vec<HazardRow> = hazard_rows(permit_id, permit, categories)?;
    if !hazards.is_empty() {
        diesel::insert_into(permit_hazards::table)
            .values(&hazards)
            .execute(conn)?;
    }

    diesel::delete(permit_precautions::table.filter(permit_precautions::permit_id.eq(permit_id)))
        .execute(conn)?;
    let precautions: Vec<PrecautionRow> = precaution_rows(permit_id, permit)?;
    if !precautions.is_empty() {
        diesel::insert_into(permit_precautions::table)
            .values(&precautions)
            .execute(conn)?;
    }

    diesel::delete(permit_attachments::table.filter(permit_attachments::permit_id.eq(permit_id)))
        .execute(conn)?;
    let attachments: Vec<AttachmentRow> = attachment_rows(permit_id, permit)?;
    if !attachments.is_empty() {
        diesel::insert_into(permit_attachments::table)
            .values(&attachments)
            .execute(conn)?;
    }

    Ok(())
}

fn stored_count(count: i64) -> usize {
    count.to_usize().unwrap_or(0)
}

fn append_history(
    conn: &mut SqliteConnection,
    permit_id: i64,
    permit: &WorkPermit,
) -> Result<(), PersistenceError> {
    let stored_approvals: usize = stored_count(
        permit_approvals::table
            .filter(permit_approvals::permit_id.eq(permit_id))
            .count()
            .get_result::<i64>(conn)?,
    );
    if let Some(new_approvals) = permit.approvals().get(stored_approvals..)
        && !new_approvals.is_empty()
    {
        diesel::insert_into(permit_approvals::table)
            .values(&approval_rows(permit_id, new_approvals)?)
            .execute(conn)?;
    }

    let stored_events: usize = stored_count(
        permit_lifecycle_events::table
            .filter(permit_lifecycle_events::permit_id.eq(permit_id))
            .count()
            .get_result::<i64>(conn)?,
    );
    if let Some(new_events) = permit.events().get(stored_events..)
        && !new_events.is_empty()
    {
        let first_sequence: i64 = i64::try_from(stored_events + 1).map_err(|_| {
            PersistenceError::Other(String::from("Lifecycle sequence out of range"))
        })?;
        diesel::insert_into(permit_lifecycle_events::table)
            .values(&lifecycle_rows(permit_id, new_events, first_sequence)?)
            .execute(conn)?;
    }

    Ok(())
}
