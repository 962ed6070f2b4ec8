// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API handler functions for state-changing and read-only operations.

use hse_permit::{
    Command, CompletionReport, CreationResult, PermitDetails, PermitOptions, PermitRevision,
    WorkPermit, create_permit as create_permit_core,
};
use hse_permit_audit::{Action, AuditEvent, StateSnapshot};
use hse_permit_domain::{
    ApprovalDecision, AttachmentDraft, DomainError, HazardCategory, HazardDraft, K3Regulation,
    PermitNumber, PermitPriority, PermitStatus, PermitType, PrecautionCategory, PrecautionDraft,
    Schedule, validate_file_name,
};
use hse_permit_persistence::{PermitQuery, PermitSummary, PersistedPermit, PersistenceError};
use num_traits::cast::ToPrimitive;
use std::str::FromStr;
use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::attachments::generate_storage_key;
use crate::error::{
    ApiError, translate_core_error, translate_domain_error, translate_persistence_error,
};
use crate::request_response::{
    AddAttachmentRequest, ApprovalStatusResponse, ApproveRequest, AttachmentContent,
    AuditEventInfo, AuditTimelineResponse, CancelRequest, CompletePrecautionRequest,
    CompleteWorkRequest, CreatePermitRequest, DeletePermitResponse, HazardRequest,
    ImplementControlsRequest, ListPermitsRequest, ListPermitsResponse, PermitResponse,
    PrecautionRequest, RejectRequest, UpdatePermitRequest, WriteResponse,
};
use crate::service::{Executed, PermitService, RequestContext};
use crate::views::{
    approval_status_response, attachment_info, audit_event_info, permit_response, summary_info,
};

/// Largest attachment accepted, in bytes.
pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

fn parse<T: FromStr<Err = DomainError>>(value: &str) -> Result<T, ApiError> {
    value.trim().parse::<T>().map_err(translate_domain_error)
}

fn parse_optional<T: FromStr<Err = DomainError>>(
    value: Option<&str>,
) -> Result<Option<T>, ApiError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(parse::<T>)
        .transpose()
}

fn schedule(start: OffsetDateTime, end: OffsetDateTime) -> Result<Schedule, ApiError> {
    Schedule::new(start, end).map_err(translate_domain_error)
}

fn hazard_draft(request: &HazardRequest) -> Result<HazardDraft, ApiError> {
    Ok(HazardDraft {
        description: request.description.clone(),
        category: parse::<HazardCategory>(&request.category)?,
        likelihood: request.likelihood,
        severity: request.severity,
        control_measures: request.control_measures.clone(),
        responsible_person: request.responsible_person.clone(),
    })
}

fn precaution_draft(request: &PrecautionRequest) -> Result<PrecautionDraft, ApiError> {
    Ok(PrecautionDraft {
        description: request.description.clone(),
        category: parse::<PrecautionCategory>(&request.category)?,
        is_required: request.is_required,
        priority: request.priority,
        responsible_person: request.responsible_person.clone(),
        verification_method: request.verification_method.clone(),
        requires_verification: request.requires_verification,
        regulation: K3Regulation {
            is_k3_requirement: request.is_k3_requirement,
            k3_standard_reference: request.k3_standard_reference.clone(),
            is_mandatory_by_law: request.is_mandatory_by_law,
        },
    })
}

fn revision(request: &UpdatePermitRequest) -> Result<PermitRevision, ApiError> {
    Ok(PermitRevision {
        title: request.title.clone(),
        description: request.description.clone(),
        location: request.location.clone(),
        schedule: schedule(request.planned_start, request.planned_end)?,
        number_of_workers: request.number_of_workers,
        options: PermitOptions {
            contractor_company: request.contractor_company.clone(),
            equipment: request.equipment.clone(),
            safety: request.safety,
            compliance: request.compliance.clone(),
            risk_assessment: request.risk_assessment.clone(),
            emergency_procedures: request.emergency_procedures.clone(),
            priority: parse_optional::<PermitPriority>(request.priority.as_deref())?,
        },
    })
}

impl PermitService {
    // ------------------------------------------------------------------
    // Creation and editing
    // ------------------------------------------------------------------

    /// Creates a new Draft permit requested by the acting user.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The acting user, cause and cancellation signal
    /// * `request` - The permit's fields
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The permit type or priority is unknown
    /// - The schedule, worker count or a required field is invalid
    /// - The request is cancelled or the store fails
    pub fn create_permit(
        &mut self,
        ctx: &RequestContext,
        request: &CreatePermitRequest,
    ) -> Result<WriteResponse, ApiError> {
        let permit_type: PermitType = parse(&request.permit_type)?;
        let details: PermitDetails = PermitDetails {
            title: request.title.clone(),
            description: request.description.clone(),
            permit_type,
            location: request.location.clone(),
            schedule: schedule(request.planned_start, request.planned_end)?,
            number_of_workers: request.number_of_workers,
            requestor: ctx.user.to_requestor_snapshot(),
        };
        let options: PermitOptions = PermitOptions {
            contractor_company: request.contractor_company.clone(),
            equipment: request.equipment.clone(),
            safety: request.safety,
            compliance: request.compliance.clone(),
            risk_assessment: request.risk_assessment.clone(),
            emergency_procedures: request.emergency_procedures.clone(),
            priority: parse_optional::<PermitPriority>(request.priority.as_deref())?,
        };

        let (created, persisted): (CreationResult, PersistedPermit) =
            self.with_retry(0, |service| {
                ctx.cancellation.check()?;
                let now: OffsetDateTime = OffsetDateTime::now_utc();
                let number: PermitNumber = service
                    .persistence
                    .allocate_permit_number(now)
                    .map_err(translate_persistence_error)?;
                let created: CreationResult = create_permit_core(
                    number,
                    details.clone(),
                    options.clone(),
                    ctx.user.to_audit_actor(),
                    ctx.cause.clone(),
                    now,
                )
                .map_err(translate_core_error)?;

                ctx.cancellation.check()?;
                let persisted: PersistedPermit = service
                    .persistence
                    .persist_creation(&created)
                    .map_err(translate_persistence_error)?;
                Ok((created, persisted))
            })?;

        info!(
            permit_id = persisted.permit_id,
            permit_number = %created.permit.permit_number(),
            actor_id = %ctx.user.id,
            "Created permit"
        );

        Ok(WriteResponse {
            permit_id: persisted.permit_id,
            permit_number: created.permit.permit_number().to_string(),
            version: persisted.version,
            status: created.permit.status().to_string(),
            event_id: persisted.event_id,
            child_id: None,
            message: created
                .audit_event
                .action
                .details
                .unwrap_or_else(|| String::from("Created permit")),
        })
    }

    /// Replaces a permit's editable details. Only Draft and Rejected permits are editable.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit does not exist, is not editable, or a field is invalid.
    pub fn update_permit(
        &mut self,
        permit_id: i64,
        ctx: &RequestContext,
        request: &UpdatePermitRequest,
    ) -> Result<WriteResponse, ApiError> {
        let revision: PermitRevision = revision(request)?;
        self.execute(permit_id, ctx, |_| {
            Ok(Command::UpdateDetails {
                revision: revision.clone(),
            })
        })
        .map(Executed::into_write_response)
    }

    /// Adds a hazard. The response's `child_id` is the new hazard's id.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is not editable or the hazard is invalid.
    pub fn add_hazard(
        &mut self,
        permit_id: i64,
        ctx: &RequestContext,
        request: &HazardRequest,
    ) -> Result<WriteResponse, ApiError> {
        let hazard: HazardDraft = hazard_draft(request)?;
        self.execute(permit_id, ctx, |_| {
            Ok(Command::AddHazard {
                hazard: hazard.clone(),
            })
        })
        .map(Executed::into_write_response)
    }

    /// Replaces a hazard's fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is not editable, the hazard does not
    /// exist, or the new values are invalid.
    pub fn update_hazard(
        &mut self,
        permit_id: i64,
        hazard_id: u32,
        ctx: &RequestContext,
        request: &HazardRequest,
    ) -> Result<WriteResponse, ApiError> {
        let hazard: HazardDraft = hazard_draft(request)?;
        self.execute(permit_id, ctx, |_| {
            Ok(Command::UpdateHazard {
                hazard_id,
                hazard: hazard.clone(),
            })
        })
        .map(Executed::into_write_response)
    }

    /// Removes a hazard.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is not editable or the hazard does not exist.
    pub fn remove_hazard(
        &mut self,
        permit_id: i64,
        hazard_id: u32,
        ctx: &RequestContext,
    ) -> Result<WriteResponse, ApiError> {
        self.execute(permit_id, ctx, |_| Ok(Command::RemoveHazard { hazard_id }))
            .map(Executed::into_write_response)
    }

    /// Records that a hazard's controls are in place, with the residual scores.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is closed, the hazard does not exist,
    /// its controls are already recorded, or a score is out of range.
    pub fn implement_hazard_controls(
        &mut self,
        permit_id: i64,
        hazard_id: u32,
        ctx: &RequestContext,
        request: &ImplementControlsRequest,
    ) -> Result<WriteResponse, ApiError> {
        self.execute(permit_id, ctx, |_| {
            Ok(Command::ImplementHazardControls {
                hazard_id,
                residual_likelihood: request.residual_likelihood,
                residual_severity: request.residual_severity,
                notes: request.notes.clone(),
            })
        })
        .map(Executed::into_write_response)
    }

    /// Adds a precaution. The response's `child_id` is the new precaution's id.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is not editable or the precaution is invalid.
    pub fn add_precaution(
        &mut self,
        permit_id: i64,
        ctx: &RequestContext,
        request: &PrecautionRequest,
    ) -> Result<WriteResponse, ApiError> {
        let precaution: PrecautionDraft = precaution_draft(request)?;
        self.execute(permit_id, ctx, |_| {
            Ok(Command::AddPrecaution {
                precaution: precaution.clone(),
            })
        })
        .map(Executed::into_write_response)
    }

    /// Replaces a precaution's fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is not editable, the precaution does not
    /// exist, or the new values are invalid.
    pub fn update_precaution(
        &mut self,
        permit_id: i64,
        precaution_id: u32,
        ctx: &RequestContext,
        request: &PrecautionRequest,
    ) -> Result<WriteResponse, ApiError> {
        let precaution: PrecautionDraft = precaution_draft(request)?;
        self.execute(permit_id, ctx, |_| {
            Ok(Command::UpdatePrecaution {
                precaution_id,
                precaution: precaution.clone(),
            })
        })
        .map(Executed::into_write_response)
    }

    /// Removes a precaution.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is not editable or the precaution does not exist.
    pub fn remove_precaution(
        &mut self,
        permit_id: i64,
        precaution_id: u32,
        ctx: &RequestContext,
    ) -> Result<WriteResponse, ApiError> {
        self.execute(permit_id, ctx, |_| {
            Ok(Command::RemovePrecaution { precaution_id })
        })
        .map(Executed::into_write_response)
    }

    /// Marks a precaution completed by the acting user.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is closed, the precaution does not
    /// exist, or it is already completed.
    pub fn complete_precaution(
        &mut self,
        permit_id: i64,
        precaution_id: u32,
        ctx: &RequestContext,
        request: &CompletePrecautionRequest,
    ) -> Result<WriteResponse, ApiError> {
        self.execute(permit_id, ctx, |_| {
            Ok(Command::CompletePrecaution {
                precaution_id,
                by: ctx.user.to_person_ref(),
                notes: request.notes.clone(),
            })
        })
        .map(Executed::into_write_response)
    }

    /// Marks a completed precaution verified by the acting user.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is closed, the precaution does not
    /// exist, needs no verification, is not completed, or is already verified.
    pub fn verify_precaution(
        &mut self,
        permit_id: i64,
        precaution_id: u32,
        ctx: &RequestContext,
    ) -> Result<WriteResponse, ApiError> {
        self.execute(permit_id, ctx, |_| {
            Ok(Command::VerifyPrecaution {
                precaution_id,
                by: ctx.user.to_person_ref(),
            })
        })
        .map(Executed::into_write_response)
    }

    // ------------------------------------------------------------------
    // Attachments
    // ------------------------------------------------------------------

    /// Stores an attachment's bytes and records it on the permit.
    ///
    /// The bytes are written first. If the permit change is then rejected or
    /// fails to commit, the bytes are deleted again; a failure to delete them
    /// is logged only.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is empty, too large or badly named, the
    /// permit does not exist or is closed, or either store fails.
    pub fn add_attachment(
        &mut self,
        permit_id: i64,
        ctx: &RequestContext,
        request: &AddAttachmentRequest,
    ) -> Result<WriteResponse, ApiError> {
        if request.bytes.is_empty() {
            return Err(ApiError::ValidationFailure {
                field: String::from("file"),
                message: String::from("Attachment is empty"),
            });
        }
        if request.bytes.len() > MAX_ATTACHMENT_BYTES {
            return Err(ApiError::ValidationFailure {
                field: String::from("file"),
                message: format!(
                    "Attachment of {} bytes exceeds the limit of {MAX_ATTACHMENT_BYTES} bytes",
                    request.bytes.len()
                ),
            });
        }
        validate_file_name(&request.file_name).map_err(translate_domain_error)?;
        ctx.cancellation.check()?;
        self.load(permit_id)?;

        let size_bytes: u64 = request
            .bytes
            .len()
            .to_u64()
            .ok_or_else(|| ApiError::ValidationFailure {
                field: String::from("file"),
                message: String::from("Attachment size does not fit in 64 bits"),
            })?;
        let storage_key: String = generate_storage_key();
        self.attachments
            .save(permit_id, &storage_key, &request.bytes)?;

        let draft: AttachmentDraft = AttachmentDraft {
            file_name: request.file_name.trim().to_string(),
            content_type: request.content_type.clone(),
            size_bytes,
            storage_key: storage_key.clone(),
            description: request.description.clone(),
            uploaded_by: ctx.user.id.clone(),
        };

        match self.execute(permit_id, ctx, |_| {
            Ok(Command::AddAttachment {
                attachment: draft.clone(),
            })
        }) {
            Ok(executed) => Ok(executed.into_write_response()),
            Err(err) => {
                if let Err(cleanup) = self.attachments.delete(permit_id, &storage_key) {
                    error!(
                        permit_id,
                        storage_key = %storage_key,
                        error = %cleanup,
                        "Failed to delete attachment bytes after a rejected upload"
                    );
                }
                Err(err)
            }
        }
    }

    /// Removes an attachment from the permit, then deletes its bytes.
    ///
    /// A failure to delete the bytes after the commit is logged only.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit or attachment does not exist, the
    /// permit is closed, or the store fails.
    pub fn remove_attachment(
        &mut self,
        permit_id: i64,
        attachment_id: u32,
        ctx: &RequestContext,
    ) -> Result<WriteResponse, ApiError> {
        let storage_key: Option<String> = self
            .load(permit_id)?
            .attachments()
            .get(attachment_id)
            .map(|a| a.storage_key.clone());

        let executed: Executed = self.execute(permit_id, ctx, |_| {
            Ok(Command::RemoveAttachment { attachment_id })
        })?;

        if let Some(key) = storage_key
            && let Err(err) = self.attachments.delete(permit_id, &key)
        {
            warn!(
                permit_id,
                attachment_id,
                storage_key = %key,
                error = %err,
                "Attachment removed but its bytes could not be deleted"
            );
        }
        Ok(executed.into_write_response())
    }

    /// Returns an attachment's metadata and bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit or attachment does not exist or the
    /// bytes cannot be read.
    pub fn get_attachment(
        &mut self,
        permit_id: i64,
        attachment_id: u32,
    ) -> Result<AttachmentContent, ApiError> {
        let permit: WorkPermit = self.load(permit_id)?;
        let attachment = permit
            .attachments()
            .get(attachment_id)
            .ok_or_else(|| translate_domain_error(DomainError::AttachmentNotFound(attachment_id)))?;
        let bytes: Vec<u8> = self.attachments.read(permit_id, &attachment.storage_key)?;
        Ok(AttachmentContent {
            info: attachment_info(attachment),
            bytes,
        })
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Submits a permit for approval as the acting user.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is not Draft or Rejected, or fails the
    /// submission checks.
    pub fn submit(&mut self, permit_id: i64, ctx: &RequestContext) -> Result<WriteResponse, ApiError> {
        self.execute(permit_id, ctx, |_| {
            Ok(Command::Submit {
                submitter: ctx.user.to_person_ref(),
            })
        })
        .map(Executed::into_write_response)
    }

    /// Records an approval by the acting user at the requested level.
    ///
    /// The permit becomes Approved once every required level is approved in
    /// the current round.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is not Submitted or the level is blank.
    pub fn approve(
        &mut self,
        permit_id: i64,
        ctx: &RequestContext,
        request: &ApproveRequest,
    ) -> Result<WriteResponse, ApiError> {
        let decision: ApprovalDecision = ApprovalDecision {
            approver_id: ctx.user.id.clone(),
            approver_name: ctx.user.name.clone(),
            level: request.level.trim().to_string(),
            comments: request.comments.clone(),
            k3_certificate_number: request.k3_certificate_number.clone(),
            authority_level: request.authority_level.clone(),
        };
        self.execute(permit_id, ctx, |_| {
            Ok(Command::Approve {
                decision: decision.clone(),
            })
        })
        .map(Executed::into_write_response)
    }

    /// Rejects a submitted permit as the acting user.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is not Submitted or the level or reason is blank.
    pub fn reject(
        &mut self,
        permit_id: i64,
        ctx: &RequestContext,
        request: &RejectRequest,
    ) -> Result<WriteResponse, ApiError> {
        self.execute(permit_id, ctx, |_| {
            Ok(Command::Reject {
                approver: ctx.user.to_person_ref(),
                level: request.level.trim().to_string(),
                reason: request.reason.clone(),
            })
        })
        .map(Executed::into_write_response)
    }

    /// Starts work on an approved permit.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is not Approved or a required
    /// precaution is not completed.
    pub fn start_work(
        &mut self,
        permit_id: i64,
        ctx: &RequestContext,
    ) -> Result<WriteResponse, ApiError> {
        self.execute(permit_id, ctx, |_| {
            Ok(Command::StartWork {
                actor: ctx.user.to_person_ref(),
            })
        })
        .map(Executed::into_write_response)
    }

    /// Completes work on a permit in progress.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is not in progress or the notes are blank.
    pub fn complete_work(
        &mut self,
        permit_id: i64,
        ctx: &RequestContext,
        request: &CompleteWorkRequest,
    ) -> Result<WriteResponse, ApiError> {
        let report: CompletionReport = CompletionReport {
            notes: request.notes.clone(),
            completed_safely: request.completed_safely,
            lessons_learned: request.lessons_learned.clone(),
        };
        self.execute(permit_id, ctx, |_| {
            Ok(Command::CompleteWork {
                actor: ctx.user.to_person_ref(),
                report: report.clone(),
            })
        })
        .map(Executed::into_write_response)
    }

    /// Cancels a permit that is not yet Completed or Cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is terminal or the reason is blank.
    pub fn cancel(
        &mut self,
        permit_id: i64,
        ctx: &RequestContext,
        request: &CancelRequest,
    ) -> Result<WriteResponse, ApiError> {
        self.execute(permit_id, ctx, |_| {
            Ok(Command::Cancel {
                actor: ctx.user.to_person_ref(),
                reason: request.reason.clone(),
            })
        })
        .map(Executed::into_write_response)
    }

    /// Hard-deletes a Draft permit and then its attachment bytes.
    ///
    /// The audit trail survives the deletion. Failures to delete attachment
    /// bytes are logged only.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit does not exist, is not a Draft, the
    /// request is cancelled, or the store fails.
    pub fn delete_permit(
        &mut self,
        permit_id: i64,
        ctx: &RequestContext,
    ) -> Result<DeletePermitResponse, ApiError> {
        let (permit, event_id): (WorkPermit, i64) =
            self.with_retry(permit_id, |service| service.delete_once(permit_id, ctx))?;

        for attachment in permit.attachments().iter() {
            if let Err(err) = self.attachments.delete(permit_id, &attachment.storage_key) {
                warn!(
                    permit_id,
                    attachment_id = attachment.id,
                    error = %err,
                    "Permit deleted but attachment bytes could not be deleted"
                );
            }
        }

        info!(
            permit_id,
            permit_number = %permit.permit_number(),
            event_id,
            actor_id = %ctx.user.id,
            "Deleted permit"
        );

        Ok(DeletePermitResponse {
            permit_id,
            permit_number: permit.permit_number().to_string(),
            event_id,
            message: format!("Deleted draft permit {}", permit.permit_number()),
        })
    }

    fn delete_once(
        &mut self,
        permit_id: i64,
        ctx: &RequestContext,
    ) -> Result<(WorkPermit, i64), ApiError> {
        ctx.cancellation.check()?;
        let permit: WorkPermit = self.load(permit_id)?;
        permit.ensure_deletable().map_err(translate_domain_error)?;

        let audit_event: AuditEvent = AuditEvent::new(
            permit.id(),
            permit.permit_number().clone(),
            ctx.user.to_audit_actor(),
            ctx.cause.clone(),
            Action::new(
                String::from("DeletePermit"),
                Some(format!("Deleted draft permit '{}'", permit.details().title)),
            ),
            permit.to_snapshot(),
            StateSnapshot::empty(),
            OffsetDateTime::now_utc(),
        );

        ctx.cancellation.check()?;
        let event_id: i64 = self
            .persistence
            .delete_permit(permit_id, permit.version(), &audit_event)
            .map_err(translate_persistence_error)?;
        Ok((permit, event_id))
    }

    // ------------------------------------------------------------------
    // Read models
    // ------------------------------------------------------------------

    /// Returns the full detail view of a permit.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the permit does not exist.
    pub fn get_permit(&mut self, permit_id: i64) -> Result<PermitResponse, ApiError> {
        let permit: WorkPermit = self.load(permit_id)?;
        Ok(permit_response(&permit, &self.policy))
    }

    /// Returns the full detail view of a permit by its number.
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailure` for a malformed number and `NotFound` if
    /// no permit has it.
    pub fn get_permit_by_number(&mut self, permit_number: &str) -> Result<PermitResponse, ApiError> {
        let number: PermitNumber = parse(permit_number)?;
        let permit: WorkPermit = self
            .persistence
            .load_permit_by_number(&number)
            .map_err(|e| permit_not_found(e, &number))?;
        Ok(permit_response(&permit, &self.policy))
    }

    /// Returns where a permit stands in its approval round.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the permit does not exist.
    pub fn get_approval_status(
        &mut self,
        permit_id: i64,
    ) -> Result<ApprovalStatusResponse, ApiError> {
        let permit: WorkPermit = self.load(permit_id)?;
        Ok(approval_status_response(&permit, &self.policy))
    }

    /// Lists permits, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailure` for an unknown status or type or a
    /// non-positive limit.
    pub fn list_permits(
        &mut self,
        request: &ListPermitsRequest,
    ) -> Result<ListPermitsResponse, ApiError> {
        if let Some(limit) = request.limit
            && limit < 1
        {
            return Err(ApiError::ValidationFailure {
                field: String::from("limit"),
                message: format!("Limit must be at least 1, got {limit}"),
            });
        }

        let query: PermitQuery = PermitQuery {
            status: parse_optional::<PermitStatus>(request.status.as_deref())?,
            permit_type: parse_optional::<PermitType>(request.permit_type.as_deref())?,
            requestor_id: request
                .requestor_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            limit: request.limit,
        };

        let summaries: Vec<PermitSummary> = self
            .persistence
            .list_permits(&query)
            .map_err(translate_persistence_error)?;
        Ok(ListPermitsResponse {
            permits: summaries.into_iter().map(summary_info).collect(),
        })
    }

    /// Returns the audit timeline of a permit number, including events of
    /// a deleted permit.
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailure` for a malformed number and `NotFound` if
    /// nothing was ever recorded for it.
    pub fn get_audit_timeline(
        &mut self,
        permit_number: &str,
    ) -> Result<AuditTimelineResponse, ApiError> {
        let number: PermitNumber = parse(permit_number)?;
        let events: Vec<AuditEvent> = self
            .persistence
            .get_audit_timeline(&number)
            .map_err(translate_persistence_error)?;
        if events.is_empty() {
            return Err(ApiError::NotFound {
                resource_type: String::from("Permit"),
                message: format!("No audit events recorded for {number}"),
            });
        }
        Ok(AuditTimelineResponse {
            permit_number: number.to_string(),
            events: events.into_iter().map(audit_event_info).collect(),
        })
    }

    /// Returns a single audit event.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no event has the id.
    pub fn get_audit_event(&mut self, event_id: i64) -> Result<AuditEventInfo, ApiError> {
        self.persistence
            .get_audit_event(event_id)
            .map(audit_event_info)
            .map_err(translate_persistence_error)
    }

    /// Returns the audit timeline of a stored permit.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the permit does not exist.
    pub fn get_permit_audit_timeline(
        &mut self,
        permit_id: i64,
    ) -> Result<AuditTimelineResponse, ApiError> {
        let permit: WorkPermit = self.load(permit_id)?;
        self.get_audit_timeline(permit.permit_number().as_str())
    }
}

fn permit_not_found(err: PersistenceError, number: &PermitNumber) -> ApiError {
    if err.is_not_found() {
        ApiError::NotFound {
            resource_type: String::from("Permit"),
            message: format!("Permit {number} does not exist"),
        }
    } else {
        translate_persistence_error(err)
    }
}
