// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API request and response data transfer objects.
//!
//! These DTOs are distinct from domain types and represent the API contract.
//! Enumerations travel as strings and are parsed at the boundary.

use hse_permit_domain::{ComplianceInfo, RequestorSnapshot, SafetyRequirements};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

// ----------------------------------------------------------------------
// Requests
// ----------------------------------------------------------------------

/// API request to create a new Draft permit.
///
/// The requestor is the acting user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePermitRequest {
    pub title: String,
    pub description: String,
    /// One of the permit type names, e.g. `HotWork`.
    pub permit_type: String,
    pub location: String,
    #[serde(with = "time::serde::rfc3339")]
    pub planned_start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub planned_end: OffsetDateTime,
    pub number_of_workers: u32,
    #[serde(default)]
    pub contractor_company: Option<String>,
    #[serde(default)]
    pub equipment: Option<String>,
    #[serde(default)]
    pub safety: SafetyRequirements,
    #[serde(default)]
    pub compliance: ComplianceInfo,
    #[serde(default)]
    pub risk_assessment: Option<String>,
    #[serde(default)]
    pub emergency_procedures: Option<String>,
    /// Priority override; derived from risk when absent.
    #[serde(default)]
    pub priority: Option<String>,
}

/// API request to replace a permit's editable details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePermitRequest {
    pub title: String,
    pub description: String,
    pub location: String,
    #[serde(with = "time::serde::rfc3339")]
    pub planned_start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub planned_end: OffsetDateTime,
    pub number_of_workers: u32,
    #[serde(default)]
    pub contractor_company: Option<String>,
    #[serde(default)]
    pub equipment: Option<String>,
    #[serde(default)]
    pub safety: SafetyRequirements,
    #[serde(default)]
    pub compliance: ComplianceInfo,
    #[serde(default)]
    pub risk_assessment: Option<String>,
    #[serde(default)]
    pub emergency_procedures: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

/// API request to add or replace a hazard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardRequest {
    pub description: String,
    /// One of the hazard category names, e.g. `Fire`.
    pub category: String,
    pub likelihood: u8,
    pub severity: u8,
    pub control_measures: String,
    #[serde(default)]
    pub responsible_person: Option<String>,
}

/// API request to record that a hazard's controls are in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementControlsRequest {
    pub residual_likelihood: u8,
    pub residual_severity: u8,
    #[serde(default)]
    pub notes: Option<String>,
}

/// API request to add or replace a precaution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecautionRequest {
    pub description: String,
    /// One of the precaution category names, e.g. `Isolation`.
    pub category: String,
    pub is_required: bool,
    pub priority: u8,
    #[serde(default)]
    pub responsible_person: Option<String>,
    #[serde(default)]
    pub verification_method: Option<String>,
    #[serde(default)]
    pub requires_verification: bool,
    #[serde(default)]
    pub is_k3_requirement: bool,
    #[serde(default)]
    pub k3_standard_reference: Option<String>,
    #[serde(default)]
    pub is_mandatory_by_law: bool,
}

/// API request to mark a precaution completed by the acting user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompletePrecautionRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

/// API request to approve a submitted permit as the acting user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveRequest {
    /// The approval level being signed, e.g. `Supervisor`.
    pub level: String,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub k3_certificate_number: Option<String>,
    #[serde(default)]
    pub authority_level: Option<String>,
}

/// API request to reject a submitted permit as the acting user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectRequest {
    pub level: String,
    pub reason: String,
}

/// API request to finish work on a permit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteWorkRequest {
    pub notes: String,
    pub completed_safely: bool,
    #[serde(default)]
    pub lessons_learned: Option<String>,
}

/// API request to cancel a permit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}

/// API request to attach a file to a permit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddAttachmentRequest {
    pub file_name: String,
    pub content_type: String,
    pub description: Option<String>,
    pub bytes: Vec<u8>,
}

/// API request to list permits. Every filter is optional.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListPermitsRequest {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub permit_type: Option<String>,
    #[serde(default)]
    pub requestor_id: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

// ----------------------------------------------------------------------
// Responses
// ----------------------------------------------------------------------

/// API response for any successful state-changing operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResponse {
    pub permit_id: i64,
    pub permit_number: String,
    /// The permit's version after the change.
    pub version: i64,
    pub status: String,
    /// The audit event recording the change.
    pub event_id: i64,
    /// The hazard, precaution or attachment the operation touched, if any.
    pub child_id: Option<u32>,
    pub message: String,
}

/// API response for a permit deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletePermitResponse {
    pub permit_id: i64,
    pub permit_number: String,
    pub event_id: i64,
    pub message: String,
}

/// Where a permit stands in its approval round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStatusResponse {
    pub permit_id: i64,
    pub status: String,
    pub round: u32,
    pub required_levels: Vec<String>,
    pub received_levels: Vec<String>,
    pub missing_levels: Vec<String>,
    pub progress_percent: u8,
    pub is_fully_approved: bool,
}

/// A hazard as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardInfo {
    pub hazard_id: u32,
    pub description: String,
    pub category: String,
    pub likelihood: u8,
    pub severity: u8,
    pub risk_score: u8,
    pub risk_level: String,
    pub control_measures: String,
    pub responsible_person: Option<String>,
    pub controls_implemented: bool,
    pub residual_likelihood: Option<u8>,
    pub residual_severity: Option<u8>,
    pub residual_risk_level: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub implemented_at: Option<OffsetDateTime>,
    pub implementation_notes: Option<String>,
}

/// A precaution as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecautionInfo {
    pub precaution_id: u32,
    pub description: String,
    pub category: String,
    pub is_required: bool,
    pub priority: u8,
    pub responsible_person: Option<String>,
    pub verification_method: Option<String>,
    pub requires_verification: bool,
    pub is_k3_requirement: bool,
    pub k3_standard_reference: Option<String>,
    pub is_mandatory_by_law: bool,
    pub is_completed: bool,
    pub completed_by: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    pub completion_notes: Option<String>,
    pub is_verified: bool,
    pub verified_by: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub verified_at: Option<OffsetDateTime>,
}

/// One approval decision as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalInfo {
    pub sequence: u32,
    pub round: u32,
    pub approver_id: String,
    pub approver_name: String,
    pub level: String,
    pub approved: bool,
    pub comments: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub decided_at: OffsetDateTime,
    pub k3_certificate_number: Option<String>,
    pub authority_level: Option<String>,
}

/// Attachment metadata as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentInfo {
    pub attachment_id: u32,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub description: Option<String>,
    pub uploaded_by: String,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
}

/// An attachment together with its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentContent {
    pub info: AttachmentInfo,
    pub bytes: Vec<u8>,
}

/// One lifecycle event as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEventInfo {
    pub kind: String,
    pub status_after: String,
    pub actor_id: String,
    pub actor_name: String,
    pub reason: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub occurred_at: OffsetDateTime,
}

/// The completion report of a finished permit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionInfo {
    pub notes: String,
    pub completed_safely: bool,
    pub lessons_learned: Option<String>,
}

/// The full permit detail view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitResponse {
    pub permit_id: i64,
    pub version: i64,
    pub permit_number: String,
    pub title: String,
    pub description: String,
    pub permit_type: String,
    pub status: String,
    pub location: String,
    #[serde(with = "time::serde::rfc3339")]
    pub planned_start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub planned_end: OffsetDateTime,
    pub number_of_workers: u32,
    pub requestor: RequestorSnapshot,
    pub contractor_company: Option<String>,
    pub equipment: Option<String>,
    pub safety: SafetyRequirements,
    pub compliance: ComplianceInfo,
    pub risk_assessment: Option<String>,
    pub emergency_procedures: Option<String>,
    pub overall_risk_level: String,
    pub priority: String,
    pub approval: ApprovalStatusResponse,
    pub hazards: Vec<HazardInfo>,
    pub precautions: Vec<PrecautionInfo>,
    pub approvals: Vec<ApprovalInfo>,
    pub attachments: Vec<AttachmentInfo>,
    pub lifecycle: Vec<LifecycleEventInfo>,
    pub submitted_by: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub submitted_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub actual_start: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub actual_end: Option<OffsetDateTime>,
    pub completion: Option<CompletionInfo>,
    /// The reason of the most recent rejection or cancellation.
    pub latest_reason: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A permit row in a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitSummaryInfo {
    pub permit_id: i64,
    pub version: i64,
    pub permit_number: String,
    pub title: String,
    pub permit_type: String,
    pub status: String,
    pub overall_risk_level: String,
    pub location: String,
    pub requestor_id: String,
    pub requestor_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub planned_start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// API response for a permit list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPermitsResponse {
    pub permits: Vec<PermitSummaryInfo>,
}

/// One audit event as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEventInfo {
    pub event_id: i64,
    pub permit_id: Option<i64>,
    pub actor_id: String,
    pub actor_type: String,
    pub cause_id: String,
    pub cause_description: String,
    pub action: String,
    pub details: Option<String>,
    pub before: String,
    pub after: String,
    #[serde(with = "time::serde::rfc3339")]
    pub occurred_at: OffsetDateTime,
}

/// API response for a permit's audit timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTimelineResponse {
    pub permit_number: String,
    pub events: Vec<AuditEventInfo>,
}
