// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Conversion between the permit aggregate and its rows.

use hse_permit::{
    CompletionReport, LifecycleEvent, LifecycleEventKind, PermitDetails, PermitOptions,
    PermitRecord, WorkPermit,
};
use hse_permit_domain::{
    Approval, Attachment, Completion, ComplianceInfo, ControlImplementation, Hazard,
    HazardCategory, HazardCategoryTable, K3Regulation, PermitNumber, PermitPriority, PermitType,
    PersonRef, Precaution, PrecautionCategory, RequestorSnapshot, RiskRating, SafetyRequirements,
    Schedule, Verification,
};
use num_traits::ToPrimitive;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::data_models::{
    ApprovalRow, AttachmentRow, HazardRow, LifecycleEventRow, PermitColumns, PermitRow,
    PrecautionRow,
};
use crate::error::PersistenceError;

/// Formats a timestamp for storage.
///
/// # Errors
///
/// Returns an error if the timestamp cannot be represented in RFC 3339.
pub fn format_timestamp(at: OffsetDateTime) -> Result<String, PersistenceError> {
    Ok(at.format(&Rfc3339)?)
}

/// Parses a stored timestamp.
///
/// # Errors
///
/// Returns an error if the text is not RFC 3339.
pub fn parse_timestamp(text: &str) -> Result<OffsetDateTime, PersistenceError> {
    Ok(OffsetDateTime::parse(text, &Rfc3339)?)
}

fn parse_optional_timestamp(
    text: Option<&str>,
) -> Result<Option<OffsetDateTime>, PersistenceError> {
    text.map(parse_timestamp).transpose()
}

fn stored_u32(value: i64, column: &str) -> Result<u32, PersistenceError> {
    value.to_u32().ok_or_else(|| {
        PersistenceError::ReconstructionError(format!("{column} out of range: {value}"))
    })
}

fn person(id: Option<String>, name: Option<String>) -> Option<PersonRef> {
    match (id, name) {
        (Some(id), Some(name)) => Some(PersonRef::new(id, name)),
        _ => None,
    }
}

/// Builds the `permits` columns for a permit at the given version.
///
/// # Errors
///
/// Returns an error if a field cannot be serialized.
pub fn permit_columns(
    permit: &WorkPermit,
    version: i64,
) -> Result<PermitColumns, PersistenceError> {
    let details: &PermitDetails = permit.details();
    let options: &PermitOptions = permit.options();

    Ok(PermitColumns {
        version,
        permit_number: permit.permit_number().to_string(),
        status: permit.status().as_str().to_string(),
        permit_type: details.permit_type.as_str().to_string(),
        title: details.title.clone(),
        description: details.description.clone(),
        location: details.location.clone(),
        planned_start: format_timestamp(details.schedule.planned_start())?,
        planned_end: format_timestamp(details.schedule.planned_end())?,
        number_of_workers: i64::from(details.number_of_workers),
        requestor_id: details.requestor.id.clone(),
        requestor_name: details.requestor.name.clone(),
        requestor_department: details.requestor.department.clone(),
        requestor_position: details.requestor.position.clone(),
        requestor_phone: details.requestor.phone.clone(),
        contractor_company: options.contractor_company.clone(),
        equipment: options.equipment.clone(),
        safety_json: serde_json::to_string(&options.safety)?,
        compliance_json: serde_json::to_string(&options.compliance)?,
        risk_assessment: options.risk_assessment.clone(),
        emergency_procedures: options.emergency_procedures.clone(),
        priority_override: options.priority.map(|p| p.as_str().to_string()),
        overall_risk_level: permit.overall_risk_level().as_str().to_string(),
        next_hazard_id: i64::from(permit.hazards().next_id()),
        next_precaution_id: i64::from(permit.precautions().next_id()),
        next_attachment_id: i64::from(permit.attachments().next_id()),
        created_at: format_timestamp(permit.created_at())?,
        updated_at: format_timestamp(permit.updated_at())?,
    })
}

/// Builds the hazard rows for a permit.
///
/// # Errors
///
/// Returns an error if a timestamp cannot be formatted.
pub fn hazard_rows(
    permit_id: i64,
    permit: &WorkPermit,
    categories: &HazardCategoryTable,
) -> Result<Vec<HazardRow>, PersistenceError> {
    permit
        .hazards()
        .iter()
        .map(|hazard| -> Result<HazardRow, PersistenceError> {
            let implementation: Option<&ControlImplementation> = hazard.implementation.as_ref();
            Ok(HazardRow {
                permit_id,
                hazard_id: i64::from(hazard.id),
                description: hazard.description.clone(),
                category_id: categories.id_of(hazard.category),
                likelihood: i32::from(hazard.initial.likelihood.value()),
                severity: i32::from(hazard.initial.severity.value()),
                risk_level: hazard.risk_level().as_str().to_string(),
                control_measures: hazard.control_measures.clone(),
                responsible_person: hazard.responsible_person.clone(),
                residual_likelihood: implementation
                    .map(|i| i32::from(i.residual.likelihood.value())),
                residual_severity: implementation.map(|i| i32::from(i.residual.severity.value())),
                implemented_at: implementation
                    .map(|i| format_timestamp(i.implemented_at))
                    .transpose()?,
                implementation_notes: implementation.and_then(|i| i.notes.clone()),
            })
        })
        .collect()
}

/// Builds the precaution rows for a permit.
///
/// # Errors
///
/// Returns an error if a timestamp cannot be formatted.
pub fn precaution_rows(
    permit_id: i64,
    permit: &WorkPermit,
) -> Result<Vec<PrecautionRow>, PersistenceError> {
    permit
        .precautions()
        .iter()
        .map(|p| -> Result<PrecautionRow, PersistenceError> {
            let completion: Option<&Completion> = p.completion.as_ref();
            let verification: Option<&Verification> = p.verification.as_ref();
            Ok(PrecautionRow {
                permit_id,
                precaution_id: i64::from(p.id),
                description: p.description.clone(),
                category: p.category.as_str().to_string(),
                is_required: p.is_required,
                priority: i32::from(p.priority),
                responsible_person: p.responsible_person.clone(),
                verification_method: p.verification_method.clone(),
                requires_verification: p.requires_verification,
                is_k3_requirement: p.regulation.is_k3_requirement,
                k3_standard_reference: p.regulation.k3_standard_reference.clone(),
                is_mandatory_by_law: p.regulation.is_mandatory_by_law,
                completed_by_id: completion.map(|c| c.by.id.clone()),
                completed_by_name: completion.map(|c| c.by.name.clone()),
                completed_at: completion.map(|c| format_timestamp(c.at)).transpose()?,
                completion_notes: completion.and_then(|c| c.notes.clone()),
                verified_by_id: verification.map(|v| v.by.id.clone()),
                verified_by_name: verification.map(|v| v.by.name.clone()),
                verified_at: verification.map(|v| format_timestamp(v.at)).transpose()?,
            })
        })
        .collect()
}

/// Builds approval rows for the given records.
///
/// # Errors
///
/// Returns an error if a timestamp cannot be formatted.
pub fn approval_rows(
    permit_id: i64,
    approvals: &[Approval],
) -> Result<Vec<ApprovalRow>, PersistenceError> {
    approvals
        .iter()
        .map(|a| -> Result<ApprovalRow, PersistenceError> {
            Ok(ApprovalRow {
                permit_id,
                sequence: i64::from(a.sequence),
                round: i64::from(a.round),
                approver_id: a.approver_id.clone(),
                approver_name: a.approver_name.clone(),
                level: a.level.clone(),
                approved: a.approved,
                comments: a.comments.clone(),
                decided_at: format_timestamp(a.decided_at)?,
                k3_certificate_number: a.k3_certificate_number.clone(),
                authority_level: a.authority_level.clone(),
            })
        })
        .collect()
}

/// Builds lifecycle rows for `events`, numbering them from `first_sequence`.
///
/// # Errors
///
/// Returns an error if a timestamp cannot be formatted.
pub fn lifecycle_rows(
    permit_id: i64,
    events: &[LifecycleEvent],
    first_sequence: i64,
) -> Result<Vec<LifecycleEventRow>, PersistenceError> {
    (first_sequence..)
        .zip(events)
        .map(|(sequence, event)| -> Result<LifecycleEventRow, PersistenceError> {
            let report: Option<&CompletionReport> = match &event.kind {
                LifecycleEventKind::WorkCompleted(report) => Some(report),
                _ => None,
            };
            Ok(LifecycleEventRow {
                permit_id,
                sequence,
                kind: event.kind.as_str().to_string(),
                actor_id: event.actor.id.clone(),
                actor_name: event.actor.name.clone(),
                occurred_at: format_timestamp(event.occurred_at)?,
                reason: event.kind.reason().map(ToString::to_string),
                completion_notes: report.map(|r| r.notes.clone()),
                completed_safely: report.map(|r| r.completed_safely),
                lessons_learned: report.and_then(|r| r.lessons_learned.clone()),
            })
        })
        .collect()
}

/// Builds the attachment rows for a permit.
///
/// # Errors
///
/// Returns an error if a size does not fit the column or a timestamp cannot
/// be formatted.
pub fn attachment_rows(
    permit_id: i64,
    permit: &WorkPermit,
) -> Result<Vec<AttachmentRow>, PersistenceError> {
    permit
        .attachments()
        .iter()
        .map(|a| -> Result<AttachmentRow, PersistenceError> {
            Ok(AttachmentRow {
                permit_id,
                attachment_id: i64::from(a.id),
                file_name: a.file_name.clone(),
                content_type: a.content_type.clone(),
                size_bytes: a.size_bytes.to_i64().ok_or_else(|| {
                    PersistenceError::SerializationError(format!(
                        "attachment {} is too large to record",
                        a.id
                    ))
                })?,
                storage_key: a.storage_key.clone(),
                description: a.description.clone(),
                uploaded_by: a.uploaded_by.clone(),
                uploaded_at: format_timestamp(a.uploaded_at)?,
            })
        })
        .collect()
}

/// All stored rows of one permit.
#[derive(Debug)]
pub struct StoredPermit {
    pub permit: PermitRow,
    pub hazards: Vec<HazardRow>,
    pub precautions: Vec<PrecautionRow>,
    pub approvals: Vec<ApprovalRow>,
    pub events: Vec<LifecycleEventRow>,
    pub attachments: Vec<AttachmentRow>,
}

fn restore_hazard(
    row: HazardRow,
    categories: &HazardCategoryTable,
) -> Result<Hazard, PersistenceError> {
    let category: HazardCategory = categories.category_of(row.category_id).ok_or_else(|| {
        PersistenceError::ReconstructionError(format!(
            "hazard {} references unknown category id {}",
            row.hazard_id, row.category_id
        ))
    })?;

    let implementation: Option<ControlImplementation> =
        match (row.residual_likelihood, row.residual_severity, row.implemented_at) {
            (Some(likelihood), Some(severity), Some(at)) => Some(ControlImplementation {
                residual: RiskRating::clamped(i64::from(likelihood), i64::from(severity)),
                implemented_at: parse_timestamp(&at)?,
                notes: row.implementation_notes,
            }),
            _ => None,
        };

    Ok(Hazard {
        id: stored_u32(row.hazard_id, "hazard_id")?,
        description: row.description,
        category,
        initial: RiskRating::clamped(i64::from(row.likelihood), i64::from(row.severity)),
        control_measures: row.control_measures,
        responsible_person: row.responsible_person,
        implementation,
    })
}

fn restore_precaution(row: PrecautionRow) -> Result<Precaution, PersistenceError> {
    let completion: Option<Completion> = match (
        person(row.completed_by_id, row.completed_by_name),
        parse_optional_timestamp(row.completed_at.as_deref())?,
    ) {
        (Some(by), Some(at)) => Some(Completion {
            by,
            at,
            notes: row.completion_notes,
        }),
        _ => None,
    };
    let verification: Option<Verification> = match (
        person(row.verified_by_id, row.verified_by_name),
        parse_optional_timestamp(row.verified_at.as_deref())?,
    ) {
        (Some(by), Some(at)) => Some(Verification { by, at }),
        _ => None,
    };

    Ok(Precaution {
        id: stored_u32(row.precaution_id, "precaution_id")?,
        description: row.description,
        category: row.category.parse::<PrecautionCategory>()?,
        is_required: row.is_required,
        priority: row.priority.to_u8().ok_or_else(|| {
            PersistenceError::ReconstructionError(format!(
                "precaution priority out of range: {}",
                row.priority
            ))
        })?,
        responsible_person: row.responsible_person,
        verification_method: row.verification_method,
        requires_verification: row.requires_verification,
        regulation: K3Regulation {
            is_k3_requirement: row.is_k3_requirement,
            k3_standard_reference: row.k3_standard_reference,
            is_mandatory_by_law: row.is_mandatory_by_law,
        },
        completion,
        verification,
    })
}

fn restore_approval(row: ApprovalRow) -> Result<Approval, PersistenceError> {
    Ok(Approval {
        sequence: stored_u32(row.sequence, "sequence")?,
        round: stored_u32(row.round, "round")?,
        approver_id: row.approver_id,
        approver_name: row.approver_name,
        level: row.level,
        approved: row.approved,
        comments: row.comments,
        decided_at: parse_timestamp(&row.decided_at)?,
        k3_certificate_number: row.k3_certificate_number,
        authority_level: row.authority_level,
    })
}

fn restore_event(row: LifecycleEventRow) -> Result<LifecycleEvent, PersistenceError> {
    let report: Option<CompletionReport> = row.completion_notes.map(|notes| CompletionReport {
        notes,
        completed_safely: row.completed_safely.unwrap_or(false),
        lessons_learned: row.lessons_learned,
    });
    Ok(LifecycleEvent {
        kind: LifecycleEventKind::from_stored(&row.kind, row.reason, report)?,
        actor: PersonRef::new(row.actor_id, row.actor_name),
        occurred_at: parse_timestamp(&row.occurred_at)?,
    })
}

fn restore_attachment(row: AttachmentRow) -> Result<Attachment, PersistenceError> {
    Ok(Attachment {
        id: stored_u32(row.attachment_id, "attachment_id")?,
        file_name: row.file_name,
        content_type: row.content_type,
        size_bytes: row.size_bytes.to_u64().ok_or_else(|| {
            PersistenceError::ReconstructionError(format!(
                "attachment size out of range: {}",
                row.size_bytes
            ))
        })?,
        storage_key: row.storage_key,
        description: row.description,
        uploaded_by: row.uploaded_by,
        uploaded_at: parse_timestamp(&row.uploaded_at)?,
    })
}

/// Rebuilds a permit record from its stored rows.
///
/// Child rows must already be ordered by their id or sequence.
///
/// # Errors
///
/// Returns `ReconstructionError` if any stored value is malformed.
pub fn build_record(
    stored: StoredPermit,
    categories: &HazardCategoryTable,
) -> Result<PermitRecord, PersistenceError> {
    let StoredPermit {
        permit,
        hazards,
        precautions,
        approvals,
        events,
        attachments,
    } = stored;
    let columns: PermitColumns = permit.columns;

    let details: PermitDetails = PermitDetails {
        title: columns.title,
        description: columns.description,
        permit_type: columns.permit_type.parse::<PermitType>()?,
        location: columns.location,
        schedule: Schedule::new(
            parse_timestamp(&columns.planned_start)?,
            parse_timestamp(&columns.planned_end)?,
        )?,
        number_of_workers: stored_u32(columns.number_of_workers, "number_of_workers")?,
        requestor: RequestorSnapshot {
            id: columns.requestor_id,
            name: columns.requestor_name,
            department: columns.requestor_department,
            position: columns.requestor_position,
            phone: columns.requestor_phone,
        },
    };
    let options: PermitOptions = PermitOptions {
        contractor_company: columns.contractor_company,
        equipment: columns.equipment,
        safety: serde_json::from_str::<SafetyRequirements>(&columns.safety_json)?,
        compliance: serde_json::from_str::<ComplianceInfo>(&columns.compliance_json)?,
        risk_assessment: columns.risk_assessment,
        emergency_procedures: columns.emergency_procedures,
        priority: columns
            .priority_override
            .as_deref()
            .map(str::parse::<PermitPriority>)
            .transpose()?,
    };

    Ok(PermitRecord {
        id: permit.permit_id,
        version: columns.version,
        permit_number: columns.permit_number.parse::<PermitNumber>()?,
        details,
        options,
        hazards: hazards
            .into_iter()
            .map(|row| restore_hazard(row, categories))
            .collect::<Result<_, _>>()?,
        next_hazard_id: stored_u32(columns.next_hazard_id, "next_hazard_id")?,
        precautions: precautions
            .into_iter()
            .map(restore_precaution)
            .collect::<Result<_, _>>()?,
        next_precaution_id: stored_u32(columns.next_precaution_id, "next_precaution_id")?,
        approvals: approvals
            .into_iter()
            .map(restore_approval)
            .collect::<Result<_, _>>()?,
        attachments: attachments
            .into_iter()
            .map(restore_attachment)
            .collect::<Result<_, _>>()?,
        next_attachment_id: stored_u32(columns.next_attachment_id, "next_attachment_id")?,
        events: events
            .into_iter()
            .map(restore_event)
            .collect::<Result<_, _>>()?,
        created_at: parse_timestamp(&columns.created_at)?,
        updated_at: parse_timestamp(&columns.updated_at)?,
    })
}
