// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Read models built from permits and audit events.

use hse_permit::{ApprovalStatus, LifecycleEvent, WorkPermit};
use hse_permit_audit::AuditEvent;
use hse_permit_domain::{Approval, ApprovalPolicy, Attachment, Hazard, Precaution};
use hse_permit_persistence::PermitSummary;

use crate::request_response::{
    ApprovalInfo, ApprovalStatusResponse, AttachmentInfo, AuditEventInfo, CompletionInfo,
    HazardInfo, LifecycleEventInfo, PermitResponse, PermitSummaryInfo, PrecautionInfo,
};

fn stored_id(permit: &WorkPermit) -> i64 {
    permit.id().unwrap_or_default()
}

#[must_use]
pub fn approval_status_response(
    permit: &WorkPermit,
    policy: &ApprovalPolicy,
) -> ApprovalStatusResponse {
    let status: ApprovalStatus = permit.approval_status(policy);
    ApprovalStatusResponse {
        permit_id: stored_id(permit),
        status: permit.status().to_string(),
        round: status.round,
        required_levels: status.required_levels,
        received_levels: status.received_levels,
        missing_levels: status.missing_levels,
        progress_percent: status.progress_percent,
        is_fully_approved: status.is_fully_approved,
    }
}

#[must_use]
pub fn hazard_info(hazard: &Hazard) -> HazardInfo {
    let implementation = hazard.implementation.as_ref();
    HazardInfo {
        hazard_id: hazard.id,
        description: hazard.description.clone(),
        category: hazard.category.to_string(),
        likelihood: hazard.initial.likelihood.value(),
        severity: hazard.initial.severity.value(),
        risk_score: hazard.initial.score(),
        risk_level: hazard.risk_level().to_string(),
        control_measures: hazard.control_measures.clone(),
        responsible_person: hazard.responsible_person.clone(),
        controls_implemented: hazard.is_implemented(),
        residual_likelihood: implementation.map(|i| i.residual.likelihood.value()),
        residual_severity: implementation.map(|i| i.residual.severity.value()),
        residual_risk_level: hazard.residual_risk_level().map(|l| l.to_string()),
        implemented_at: implementation.map(|i| i.implemented_at),
        implementation_notes: implementation.and_then(|i| i.notes.clone()),
    }
}

#[must_use]
pub fn precaution_info(precaution: &Precaution) -> PrecautionInfo {
    PrecautionInfo {
        precaution_id: precaution.id,
        description: precaution.description.clone(),
        category: precaution.category.to_string(),
        is_required: precaution.is_required,
        priority: precaution.priority,
        responsible_person: precaution.responsible_person.clone(),
        verification_method: precaution.verification_method.clone(),
        requires_verification: precaution.requires_verification,
        is_k3_requirement: precaution.regulation.is_k3_requirement,
        k3_standard_reference: precaution.regulation.k3_standard_reference.clone(),
        is_mandatory_by_law: precaution.regulation.is_mandatory_by_law,
        is_completed: precaution.is_completed(),
        completed_by: precaution.completion.as_ref().map(|c| c.by.name.clone()),
        completed_at: precaution.completion.as_ref().map(|c| c.at),
        completion_notes: precaution
            .completion
            .as_ref()
            .and_then(|c| c.notes.clone()),
        is_verified: precaution.is_verified(),
        verified_by: precaution.verification.as_ref().map(|v| v.by.name.clone()),
        verified_at: precaution.verification.as_ref().map(|v| v.at),
    }
}

fn approval_info(approval: &Approval) -> ApprovalInfo {
    ApprovalInfo {
        sequence: approval.sequence,
        round: approval.round,
        approver_id: approval.approver_id.clone(),
        approver_name: approval.approver_name.clone(),
        level: approval.level.clone(),
        approved: approval.approved,
        comments: approval.comments.clone(),
        decided_at: approval.decided_at,
        k3_certificate_number: approval.k3_certificate_number.clone(),
        authority_level: approval.authority_level.clone(),
    }
}

#[must_use]
pub fn attachment_info(attachment: &Attachment) -> AttachmentInfo {
    AttachmentInfo {
        attachment_id: attachment.id,
        file_name: attachment.file_name.clone(),
        content_type: attachment.content_type.clone(),
        size_bytes: attachment.size_bytes,
        description: attachment.description.clone(),
        uploaded_by: attachment.uploaded_by.clone(),
        uploaded_at: attachment.uploaded_at,
    }
}

fn lifecycle_info(event: &LifecycleEvent) -> LifecycleEventInfo {
    LifecycleEventInfo {
        kind: event.kind.to_string(),
        status_after: event.kind.resulting_status().to_string(),
        actor_id: event.actor.id.clone(),
        actor_name: event.actor.name.clone(),
        reason: event.kind.reason().map(str::to_string),
        occurred_at: event.occurred_at,
    }
}

/// Builds the full detail view of a stored permit.
#[must_use]
pub fn permit_response(permit: &WorkPermit, policy: &ApprovalPolicy) -> PermitResponse {
    let details = permit.details();
    let options = permit.options();
    let submitted = permit.submitted();

    PermitResponse {
        permit_id: stored_id(permit),
        version: permit.version(),
        permit_number: permit.permit_number().to_string(),
        title: details.title.clone(),
        description: details.description.clone(),
        permit_type: details.permit_type.to_string(),
        status: permit.status().to_string(),
        location: details.location.clone(),
        planned_start: details.schedule.planned_start(),
        planned_end: details.schedule.planned_end(),
        number_of_workers: details.number_of_workers,
        requestor: details.requestor.clone(),
        contractor_company: options.contractor_company.clone(),
        equipment: options.equipment.clone(),
        safety: options.safety,
        compliance: options.compliance.clone(),
        risk_assessment: options.risk_assessment.clone(),
        emergency_procedures: options.emergency_procedures.clone(),
        overall_risk_level: permit.overall_risk_level().to_string(),
        priority: permit.priority().to_string(),
        approval: approval_status_response(permit, policy),
        hazards: permit.hazards().iter().map(hazard_info).collect(),
        precautions: permit.precautions().iter().map(precaution_info).collect(),
        approvals: permit.approvals().iter().map(approval_info).collect(),
        attachments: permit.attachments().iter().map(attachment_info).collect(),
        lifecycle: permit.events().iter().map(lifecycle_info).collect(),
        submitted_by: submitted.map(|(who, _)| who.name.clone()),
        submitted_at: submitted.map(|(_, at)| at),
        actual_start: permit.actual_start(),
        actual_end: permit.actual_end(),
        completion: permit.completion_report().map(|report| CompletionInfo {
            notes: report.notes.clone(),
            completed_safely: report.completed_safely,
            lessons_learned: report.lessons_learned.clone(),
        }),
        latest_reason: permit.latest_reason().map(str::to_string),
        created_at: permit.created_at(),
        updated_at: permit.updated_at(),
    }
}

#[must_use]
pub fn summary_info(summary: PermitSummary) -> PermitSummaryInfo {
    PermitSummaryInfo {
        permit_id: summary.permit_id,
        version: summary.version,
        permit_number: summary.permit_number.to_string(),
        title: summary.title,
        permit_type: summary.permit_type.to_string(),
        status: summary.status.to_string(),
        overall_risk_level: summary.overall_risk_level.to_string(),
        location: summary.location,
        requestor_id: summary.requestor_id,
        requestor_name: summary.requestor_name,
        planned_start: summary.planned_start,
        updated_at: summary.updated_at,
    }
}

#[must_use]
pub fn audit_event_info(event: AuditEvent) -> AuditEventInfo {
    AuditEventInfo {
        event_id: event.event_id.unwrap_or_default(),
        permit_id: event.permit_id,
        actor_id: event.actor.id,
        actor_type: event.actor.actor_type,
        cause_id: event.cause.id,
        cause_description: event.cause.description,
        action: event.action.name,
        details: event.action.details,
        before: event.before.data,
        after: event.after.data,
        occurred_at: event.occurred_at,
    }
}
