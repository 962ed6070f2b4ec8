// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Permit queries.

use diesel::SqliteConnection;
use diesel::prelude::*;
use hse_permit::PermitRecord;
use hse_permit_domain::{HazardCategoryTable, PermitNumber, PermitStatus, PermitType, RiskLevel};
use time::OffsetDateTime;

use crate::data_models::{
    ApprovalRow, AttachmentRow, HazardRow, LifecycleEventRow, PermitRow, PrecautionRow,
};
use crate::diesel_schema::{
    permit_approvals, permit_attachments, permit_hazards, permit_lifecycle_events,
    permit_precautions, permits,
};
use crate::error::PersistenceError;
use crate::records::{StoredPermit, build_record, parse_timestamp};

/// Largest number of permits a single list query returns.
pub const MAX_LIST_LIMIT: i64 = 500;

/// Filters for listing permits. Unset filters match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermitQuery {
    pub status: Option<PermitStatus>,
    pub permit_type: Option<PermitType>,
    pub requestor_id: Option<String>,
    /// Defaults to, and is capped at, [`MAX_LIST_LIMIT`].
    pub limit: Option<i64>,
}

/// One row of a permit list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitSummary {
    pub permit_id: i64,
    pub version: i64,
    pub permit_number: PermitNumber,
    pub title: String,
    pub permit_type: PermitType,
    pub status: PermitStatus,
    pub overall_risk_level: RiskLevel,
    pub location: String,
    pub requestor_id: String,
    pub requestor_name: String,
    pub planned_start: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Loads every stored row of a permit and rebuilds its record.
///
/// # Arguments
///
/// * `conn` - The database connection
/// * `permit_id` - The permit to load
/// * `categories` - The hazard category table
///
/// # Errors
///
/// Returns `PermitNotFound` if no such permit exists, or
/// `ReconstructionError` if a stored value is malformed.
pub fn load_permit(
    conn: &mut SqliteConnection,
    permit_id: i64,
    categories: &HazardCategoryTable,
) -> Result<PermitRecord, PersistenceError> {
    let permit: PermitRow = permits::table
        .filter(permits::permit_id.eq(permit_id))
        .select(PermitRow::as_select())
        .first(conn)
        .optional()?
        .ok_or(PersistenceError::PermitNotFound(permit_id))?;

    let hazards: Vec<HazardRow> = permit_hazards::table
        .filter(permit_hazards::permit_id.eq(permit_id))
        .order(permit_hazards::hazard_id.asc())
        .select(HazardRow::as_select())
        .load(conn)?;
    let precautions: Vec<PrecautionRow> = permit_precautions::table
        .filter(permit_precautions::permit_id.eq(permit_id))
        .order(permit_precautions::precaution_id.asc())
        .select(PrecautionRow::as_select())
        .load(conn)?;
    let approvals: Vec<ApprovalRow> = permit_approvals::table
        .filter(permit_approvals::permit_id.eq(permit_id))
        .order(permit_approvals::sequence.asc())
        .select(ApprovalRow::as_select())
        .load(conn)?;
    let events: Vec<LifecycleEventRow> = permit_lifecycle_events::table
        .filter(permit_lifecycle_events::permit_id.eq(permit_id))
        .order(permit_lifecycle_events::sequence.asc())
        .select(LifecycleEventRow::as_select())
        .load(conn)?;
    let attachments: Vec<AttachmentRow> = permit_attachments::table
        .filter(permit_attachments::permit_id.eq(permit_id))
        .order(permit_attachments::attachment_id.asc())
        .select(AttachmentRow::as_select())
        .load(conn)?;

    build_record(
        StoredPermit {
            permit,
            hazards,
            precautions,
            approvals,
            events,
            attachments,
        },
        categories,
    )
}

/// Looks up a permit's id from its number.
///
/// # Errors
///
/// Returns `NotFound` if no permit carries the number.
pub fn find_permit_id(
    conn: &mut SqliteConnection,
    permit_number: &PermitNumber,
) -> Result<i64, PersistenceError> {
    permits::table
        .select(permits::permit_id)
        .filter(permits::permit_number.eq(permit_number.as_str()))
        .first::<i64>(conn)
        .optional()?
        .ok_or_else(|| PersistenceError::NotFound(format!("Permit {permit_number}")))
}

type SummaryColumns = (
    i64,
    i64,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
);

/// Lists permits matching the query, most recently updated first.
///
/// # Errors
///
/// Returns an error if the query fails or a stored value is malformed.
pub fn list_permits(
    conn: &mut SqliteConnection,
    query: &PermitQuery,
) -> Result<Vec<PermitSummary>, PersistenceError> {
    let mut statement = permits::table.into_boxed();
    if let Some(status) = query.status {
        statement = statement.filter(permits::status.eq(status.as_str()));
    }
    if let Some(permit_type) = query.permit_type {
        statement = statement.filter(permits::permit_type.eq(permit_type.as_str()));
    }
    if let Some(requestor_id) = &query.requestor_id {
        statement = statement.filter(permits::requestor_id.eq(requestor_id.clone()));
    }
    let limit: i64 = query.limit.unwrap_or(MAX_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);

    let rows: Vec<SummaryColumns> = statement
        .select((
            permits::permit_id,
            permits::version,
            permits::permit_number,
            permits::title,
            permits::permit_type,
            permits::status,
            permits::overall_risk_level,
            permits::location,
            permits::requestor_id,
            permits::requestor_name,
            permits::planned_start,
            permits::updated_at,
        ))
        .order((permits::updated_at.desc(), permits::permit_id.desc()))
        .limit(limit)
        .load::<SummaryColumns>(conn)?;

    let mut summaries: Vec<PermitSummary> = Vec::with_capacity(rows.len());
    for (
        permit_id,
        version,
        permit_number,
        title,
        permit_type,
        status,
        risk,
        location,
        requestor_id,
        requestor_name,
        planned_start,
        updated_at,
    ) in rows
    {
        summaries.push(PermitSummary {
            permit_id,
            version,
            permit_number: permit_number.parse()?,
            title,
            permit_type: permit_type.parse()?,
            status: status.parse()?,
            overall_risk_level: risk.parse()?,
            location,
            requestor_id,
            requestor_name,
            planned_start: parse_timestamp(&planned_start)?,
            updated_at: parse_timestamp(&updated_at)?,
        });
    }
    Ok(summaries)
}
