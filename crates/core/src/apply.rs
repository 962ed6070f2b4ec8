// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::command::Command;
use crate::error::CoreError;
use crate::permit::{PermitDetails, PermitOptions, WorkPermit};
use crate::state::{CreationResult, TransitionResult};
use hse_permit_audit::{Action, Actor, AuditEvent, Cause, StateSnapshot};
use hse_permit_domain::{ApprovalPolicy, PermitNumber};
use time::OffsetDateTime;

/// Creates a new Draft permit and the audit event recording it.
///
/// # Arguments
///
/// * `permit_number` - The freshly allocated permit number
/// * `details` - The required fields
/// * `options` - The optional fields
/// * `actor` - The actor performing this action
/// * `cause` - The cause or reason for this action
/// * `now` - The creation time
///
/// # Errors
///
/// Returns an error if a required field is blank or the worker count is invalid.
pub fn create_permit(
    permit_number: PermitNumber,
    details: PermitDetails,
    options: PermitOptions,
    actor: Actor,
    cause: Cause,
    now: OffsetDateTime,
) -> Result<CreationResult, CoreError> {
    let permit: WorkPermit = WorkPermit::create(permit_number, details, options, now)?;

    let action: Action = Action::new(
        String::from("CreatePermit"),
        Some(format!(
            "Created {} permit '{}' for {}",
            permit.details().permit_type,
            permit.details().title,
            permit.details().requestor.name
        )),
    );
    let audit_event: AuditEvent = AuditEvent::new(
        None,
        permit.permit_number().clone(),
        actor,
        cause,
        action,
        StateSnapshot::empty(),
        permit.to_snapshot(),
        now,
    );

    Ok(CreationResult {
        permit,
        audit_event,
    })
}

/// Applies a command to a permit, producing the new permit and an audit event.
///
/// The input permit is never modified; a failed command has no effect.
///
/// # Arguments
///
/// * `permit` - The current permit (immutable)
/// * `command` - The command to apply
/// * `policy` - The approval policy in force
/// * `actor` - The actor performing this action
/// * `cause` - The cause or reason for this action
/// * `now` - When the command is applied
///
/// # Returns
///
/// * `Ok(TransitionResult)` containing the new permit and audit event
/// * `Err(CoreError)` if the command is invalid
///
/// # Errors
///
/// Returns an error if:
/// - The permit's status does not allow the operation
/// - The command's input fails validation
/// - A referenced hazard, precaution or attachment does not exist
#[allow(clippy::too_many_lines)]
pub fn apply(
    permit: &WorkPermit,
    command: Command,
    policy: &ApprovalPolicy,
    actor: Actor,
    cause: Cause,
    now: OffsetDateTime,
) -> Result<TransitionResult, CoreError> {
    let name: &'static str = command.name();
    let mut new_permit: WorkPermit = permit.clone();

    let (child_id, details): (Option<u32>, String) = match command {
        Command::UpdateDetails { revision } => {
            new_permit.update_details(revision)?;
            (None, String::from("Updated permit details"))
        }
        Command::AddHazard { hazard } => {
            let id: u32 = new_permit.add_hazard(hazard)?;
            (Some(id), format!("Added hazard {id}"))
        }
        Command::UpdateHazard { hazard_id, hazard } => {
            new_permit.update_hazard(hazard_id, hazard)?;
            (Some(hazard_id), format!("Updated hazard {hazard_id}"))
        }
        Command::RemoveHazard { hazard_id } => {
            new_permit.remove_hazard(hazard_id)?;
            (Some(hazard_id), format!("Removed hazard {hazard_id}"))
        }
        Command::ImplementHazardControls {
            hazard_id,
            residual_likelihood,
            residual_severity,
            notes,
        } => {
            new_permit.implement_hazard_controls(
                hazard_id,
                residual_likelihood,
                residual_severity,
                notes,
                now,
            )?;
            (
                Some(hazard_id),
                format!(
                    "Implemented controls for hazard {hazard_id} (residual {residual_likelihood}x{residual_severity})"
                ),
            )
        }
        Command::AddPrecaution { precaution } => {
            let id: u32 = new_permit.add_precaution(precaution)?;
            (Some(id), format!("Added precaution {id}"))
        }
        Command::UpdatePrecaution {
            precaution_id,
            precaution,
        } => {
            new_permit.update_precaution(precaution_id, precaution)?;
            (Some(precaution_id), format!("Updated precaution {precaution_id}"))
        }
        Command::RemovePrecaution { precaution_id } => {
            new_permit.remove_precaution(precaution_id)?;
            (Some(precaution_id), format!("Removed precaution {precaution_id}"))
        }
        Command::CompletePrecaution {
            precaution_id,
            by,
            notes,
        } => {
            let who: String = by.name.clone();
            new_permit.complete_precaution(precaution_id, by, notes, now)?;
            (
                Some(precaution_id),
                format!("Precaution {precaution_id} completed by {who}"),
            )
        }
        Command::VerifyPrecaution { precaution_id, by } => {
            let who: String = by.name.clone();
            new_permit.verify_precaution(precaution_id, by, now)?;
            (
                Some(precaution_id),
                format!("Precaution {precaution_id} verified by {who}"),
            )
        }
        Command::AddAttachment { attachment } => {
            let file_name: String = attachment.file_name.clone();
            let id: u32 = new_permit.add_attachment(attachment, now)?;
            (Some(id), format!("Attached '{file_name}' as attachment {id}"))
        }
        Command::RemoveAttachment { attachment_id } => {
            let removed = new_permit.remove_attachment(attachment_id)?;
            (
                Some(attachment_id),
                format!("Removed attachment {attachment_id} ('{}')", removed.file_name),
            )
        }
        Command::Submit { submitter } => {
            let who: String = submitter.name.clone();
            new_permit.submit(submitter, now)?;
            (
                None,
                format!("Submitted by {who} (round {})", new_permit.round()),
            )
        }
        Command::Approve { decision } => {
            let summary: String = format!(
                "Approved at level {} by {}",
                decision.level, decision.approver_name
            );
            new_permit.approve(decision, policy, now)?;
            let progress: u8 = new_permit.approval_status(policy).progress_percent;
            (
                None,
                format!("{summary}; progress {progress}%, status {}", new_permit.status()),
            )
        }
        Command::Reject {
            approver,
            level,
            reason,
        } => {
            let summary: String =
                format!("Rejected at level {level} by {}: {reason}", approver.name);
            new_permit.reject(approver, level, reason, now)?;
            (None, summary)
        }
        Command::StartWork { actor: by } => {
            let who: String = by.name.clone();
            new_permit.start_work(by, now)?;
            (None, format!("Work started by {who}"))
        }
        Command::CompleteWork { actor: by, report } => {
            let summary: String = format!(
                "Work completed by {} (completed safely: {})",
                by.name, report.completed_safely
            );
            new_permit.complete_work(by, report, now)?;
            (None, summary)
        }
        Command::Cancel { actor: by, reason } => {
            let summary: String = format!("Cancelled by {}: {reason}", by.name);
            new_permit.cancel(by, reason, now)?;
            (None, summary)
        }
    };

    new_permit.touch(now);

    let audit_event: AuditEvent = AuditEvent::new(
        permit.id(),
        permit.permit_number().clone(),
        actor,
        cause,
        Action::new(name.to_string(), Some(details)),
        permit.to_snapshot(),
        new_permit.to_snapshot(),
        now,
    );

    Ok(TransitionResult {
        new_permit,
        audit_event,
        child_id,
    })
}
