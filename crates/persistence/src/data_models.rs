// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Row types for the permit tables.
//!
//! Each child row type is used both to insert and to load, so the columns
//! written and the columns read cannot drift apart. Surrogate `row_id`
//! columns are never read.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::diesel_schema::{
    permit_approvals, permit_attachments, permit_hazards, permit_lifecycle_events,
    permit_precautions, permits,
};

/// The columns of a `permits` row, less its id.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = permits)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct PermitColumns {
    pub version: i64,
    pub permit_number: String,
    pub status: String,
    pub permit_type: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub planned_start: String,
    pub planned_end: String,
    pub number_of_workers: i64,
    pub requestor_id: String,
    pub requestor_name: String,
    pub requestor_department: String,
    pub requestor_position: Option<String>,
    pub requestor_phone: Option<String>,
    pub contractor_company: Option<String>,
    pub equipment: Option<String>,
    pub safety_json: String,
    pub compliance_json: String,
    pub risk_assessment: Option<String>,
    pub emergency_procedures: Option<String>,
    pub priority_override: Option<String>,
    pub overall_risk_level: String,
    pub next_hazard_id: i64,
    pub next_precaution_id: i64,
    pub next_attachment_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// A loaded `permits` row.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = permits)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PermitRow {
    pub permit_id: i64,
    #[diesel(embed)]
    pub columns: PermitColumns,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = permit_hazards)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct HazardRow {
    pub permit_id: i64,
    pub hazard_id: i64,
    pub description: String,
    pub category_id: i64,
    pub likelihood: i32,
    pub severity: i32,
    pub risk_level: String,
    pub control_measures: String,
    pub responsible_person: Option<String>,
    pub residual_likelihood: Option<i32>,
    pub residual_severity: Option<i32>,
    pub implemented_at: Option<String>,
    pub implementation_notes: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = permit_precautions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PrecautionRow {
    pub permit_id: i64,
    pub precaution_id: i64,
    pub description: String,
    pub category: String,
    pub is_required: bool,
    pub priority: i32,
    pub responsible_person: Option<String>,
    pub verification_method: Option<String>,
    pub requires_verification: bool,
    pub is_k3_requirement: bool,
    pub k3_standard_reference: Option<String>,
    pub is_mandatory_by_law: bool,
    pub completed_by_id: Option<String>,
    pub completed_by_name: Option<String>,
    pub completed_at: Option<String>,
    pub completion_notes: Option<String>,
    pub verified_by_id: Option<String>,
    pub verified_by_name: Option<String>,
    pub verified_at: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = permit_approvals)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ApprovalRow {
    pub permit_id: i64,
    pub sequence: i64,
    pub round: i64,
    pub approver_id: String,
    pub approver_name: String,
    pub level: String,
    pub approved: bool,
    pub comments: Option<String>,
    pub decided_at: String,
    pub k3_certificate_number: Option<String>,
    pub authority_level: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = permit_lifecycle_events)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LifecycleEventRow {
    pub permit_id: i64,
    pub sequence: i64,
    pub kind: String,
    pub actor_id: String,
    pub actor_name: String,
    pub occurred_at: String,
    pub reason: Option<String>,
    pub completion_notes: Option<String>,
    pub completed_safely: Option<bool>,
    pub lessons_learned: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = permit_attachments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AttachmentRow {
    pub permit_id: i64,
    pub attachment_id: i64,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_key: String,
    pub description: Option<String>,
    pub uploaded_by: String,
    pub uploaded_at: String,
}

/// Serializable representation of an Actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorData {
    pub id: String,
    pub actor_type: String,
}

/// Serializable representation of a Cause.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CauseData {
    pub id: String,
    pub description: String,
}

/// Serializable representation of an Action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionData {
    pub name: String,
    pub details: Option<String>,
}

/// Serializable representation of a `StateSnapshot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshotData {
    pub data: String,
}

/// A loaded `audit_events` row.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::diesel_schema::audit_events)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AuditEventRow {
    pub event_id: i64,
    pub permit_id: Option<i64>,
    pub permit_number: String,
    pub actor_json: String,
    pub cause_json: String,
    pub action_json: String,
    pub before_snapshot_json: String,
    pub after_snapshot_json: String,
    pub occurred_at: String,
}
