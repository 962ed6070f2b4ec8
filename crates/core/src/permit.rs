// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! The work permit aggregate.
//!
//! `WorkPermit` owns its hazards, precautions, approvals, attachments and
//! lifecycle log. Every mutation goes through a named operation that checks
//! the current status, validates its input, and only then changes state, so
//! a failed operation leaves the permit untouched.

use crate::lifecycle::{CompletionReport, LifecycleEvent, LifecycleEventKind, status_of};
use hse_permit_audit::StateSnapshot;
use hse_permit_domain::{
    Approval, ApprovalDecision, ApprovalPolicy, Attachment, AttachmentDraft, AttachmentLedger,
    ComplianceInfo, DomainError, Hazard, HazardDraft, HazardLedger, PermitNumber, PermitPriority,
    PermitStatus, PermitType, PersonRef, Precaution, PrecautionDraft, PrecautionLedger,
    RequestorSnapshot, RiskLevel, SafetyRequirements, Schedule, SubmissionContext,
    approval_progress_percent, missing_levels, received_levels, validate_required_text,
    validate_submission, validate_worker_count,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use time::OffsetDateTime;

/// The required fields of a permit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitDetails {
    pub title: String,
    pub description: String,
    pub permit_type: PermitType,
    pub location: String,
    pub schedule: Schedule,
    pub number_of_workers: u32,
    pub requestor: RequestorSnapshot,
}

/// The optional fields of a permit, with their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PermitOptions {
    pub contractor_company: Option<String>,
    pub equipment: Option<String>,
    pub safety: SafetyRequirements,
    pub compliance: ComplianceInfo,
    pub risk_assessment: Option<String>,
    pub emergency_procedures: Option<String>,
    /// Overrides the priority derived from the overall risk level.
    pub priority: Option<PermitPriority>,
}

/// Replacement values for the editable fields of a permit.
///
/// The permit type, number and requestor are fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitRevision {
    pub title: String,
    pub description: String,
    pub location: String,
    pub schedule: Schedule,
    pub number_of_workers: u32,
    pub options: PermitOptions,
}

/// Everything needed to rebuild a stored permit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitRecord {
    pub id: i64,
    pub version: i64,
    pub permit_number: PermitNumber,
    pub details: PermitDetails,
    pub options: PermitOptions,
    pub hazards: Vec<Hazard>,
    pub next_hazard_id: u32,
    pub precautions: Vec<Precaution>,
    pub next_precaution_id: u32,
    pub approvals: Vec<Approval>,
    pub attachments: Vec<Attachment>,
    pub next_attachment_id: u32,
    pub events: Vec<LifecycleEvent>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Approval progress of a permit, with the submission round it is in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStatus {
    pub round: u32,
    pub required_levels: Vec<String>,
    pub received_levels: Vec<String>,
    pub missing_levels: Vec<String>,
    pub progress_percent: u8,
    pub is_fully_approved: bool,
}

/// The work permit aggregate root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkPermit {
    /// `None` until the permit is first stored.
    id: Option<i64>,
    /// Optimistic concurrency token, checked by the store on save.
    version: i64,
    permit_number: PermitNumber,
    details: PermitDetails,
    options: PermitOptions,
    hazards: HazardLedger,
    precautions: PrecautionLedger,
    approvals: Vec<Approval>,
    attachments: AttachmentLedger,
    events: Vec<LifecycleEvent>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

fn validate_details(
    title: &str,
    description: &str,
    location: &str,
    number_of_workers: u32,
) -> Result<(), DomainError> {
    validate_required_text("title", title)?;
    validate_required_text("description", description)?;
    validate_required_text("location", location)?;
    validate_worker_count(number_of_workers)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl WorkPermit {
    /// Creates a new Draft permit.
    ///
    /// # Arguments
    ///
    /// * `permit_number` - The freshly allocated permit number
    /// * `details` - The required fields
    /// * `options` - The optional fields
    /// * `now` - The creation time
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Title, description or location is blank
    /// - The worker count is zero or too large
    /// - The requestor snapshot lacks an id, name or department
    pub fn create(
        permit_number: PermitNumber,
        details: PermitDetails,
        options: PermitOptions,
        now: OffsetDateTime,
    ) -> Result<Self, DomainError> {
        validate_details(
            &details.title,
            &details.description,
            &details.location,
            details.number_of_workers,
        )?;
        validate_required_text("requestor.id", &details.requestor.id)?;
        validate_required_text("requestor.name", &details.requestor.name)?;
        validate_required_text("requestor.department", &details.requestor.department)?;

        Ok(Self {
            id: None,
            version: 0,
            permit_number,
            details,
            options,
            hazards: HazardLedger::default(),
            precautions: PrecautionLedger::default(),
            approvals: Vec::new(),
            attachments: AttachmentLedger::default(),
            events: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuilds a permit from storage.
    ///
    /// Stored data is trusted; no transition rules are re-checked.
    #[must_use]
    pub fn restore(record: PermitRecord) -> Self {
        let mut approvals: Vec<Approval> = record.approvals;
        approvals.sort_by_key(|a| a.sequence);

        Self {
            id: Some(record.id),
            version: record.version,
            permit_number: record.permit_number,
            details: record.details,
            options: record.options,
            hazards: HazardLedger::restore(record.hazards, record.next_hazard_id),
            precautions: PrecautionLedger::restore(record.precautions, record.next_precaution_id),
            approvals,
            attachments: AttachmentLedger::restore(record.attachments, record.next_attachment_id),
            events: record.events,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    /// Records the id and version assigned by the store.
    pub const fn mark_persisted(&mut self, id: i64, version: i64) {
        self.id = Some(id);
        self.version = version;
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[must_use]
    pub const fn id(&self) -> Option<i64> {
        self.id
    }

    #[must_use]
    pub const fn version(&self) -> i64 {
        self.version
    }

    #[must_use]
    pub const fn permit_number(&self) -> &PermitNumber {
        &self.permit_number
    }

    #[must_use]
    pub const fn details(&self) -> &PermitDetails {
        &self.details
    }

    #[must_use]
    pub const fn options(&self) -> &PermitOptions {
        &self.options
    }

    #[must_use]
    pub const fn hazards(&self) -> &HazardLedger {
        &self.hazards
    }

    #[must_use]
    pub const fn precautions(&self) -> &PrecautionLedger {
        &self.precautions
    }

    #[must_use]
    pub const fn attachments(&self) -> &AttachmentLedger {
        &self.attachments
    }

    /// The full append-only approval history, oldest first.
    #[must_use]
    pub fn approvals(&self) -> &[Approval] {
        &self.approvals
    }

    /// The full append-only lifecycle log, oldest first.
    #[must_use]
    pub fn events(&self) -> &[LifecycleEvent] {
        &self.events
    }

    #[must_use]
    pub const fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    #[must_use]
    pub const fn updated_at(&self) -> OffsetDateTime {
        self.updated_at
    }

    // ------------------------------------------------------------------
    // Derived views
    // ------------------------------------------------------------------

    /// The current status, folded from the lifecycle log.
    #[must_use]
    pub fn status(&self) -> PermitStatus {
        status_of(&self.events)
    }

    /// The current submission round. Zero before the first submission.
    #[must_use]
    pub fn round(&self) -> u32 {
        let submissions: usize = self
            .events
            .iter()
            .filter(|e| e.kind == LifecycleEventKind::Submitted)
            .count();
        u32::try_from(submissions).unwrap_or(u32::MAX)
    }

    /// The highest initial risk level across all hazards, `Low` when empty.
    #[must_use]
    pub fn overall_risk_level(&self) -> RiskLevel {
        self.hazards.highest_risk_level().unwrap_or_default()
    }

    /// The priority override if set, otherwise the one derived from risk.
    #[must_use]
    pub fn priority(&self) -> PermitPriority {
        self.options
            .priority
            .unwrap_or_else(|| PermitPriority::from_risk_level(self.overall_risk_level()))
    }

    /// The approval levels this permit requires under `policy`.
    #[must_use]
    pub fn required_levels(&self, policy: &ApprovalPolicy) -> Vec<String> {
        policy.required_levels(self.details.permit_type, &self.options.safety)
    }

    /// Distinct levels with at least one approval on record.
    #[must_use]
    pub fn received_levels(&self) -> BTreeSet<String> {
        received_levels(&self.approvals)
    }

    /// Required levels with no approval on record.
    #[must_use]
    pub fn missing_levels(&self, policy: &ApprovalPolicy) -> Vec<String> {
        missing_levels(&self.required_levels(policy), &self.received_levels())
    }

    /// Approval progress across the permit's approval history.
    #[must_use]
    pub fn approval_status(&self, policy: &ApprovalPolicy) -> ApprovalStatus {
        let required: Vec<String> = self.required_levels(policy);
        let received: BTreeSet<String> = self.received_levels();
        let missing: Vec<String> = missing_levels(&required, &received);
        let progress_percent: u8 = approval_progress_percent(&required, &received);

        ApprovalStatus {
            round: self.round(),
            is_fully_approved: missing.is_empty() && !received.is_empty(),
            required_levels: required,
            received_levels: received.into_iter().collect(),
            missing_levels: missing,
            progress_percent,
        }
    }

    fn latest_event(&self, name: &str) -> Option<&LifecycleEvent> {
        self.events.iter().rev().find(|e| e.kind.as_str() == name)
    }

    /// Who submitted the permit most recently, and when.
    #[must_use]
    pub fn submitted(&self) -> Option<(&PersonRef, OffsetDateTime)> {
        self.latest_event("Submitted")
            .map(|e| (&e.actor, e.occurred_at))
    }

    /// When work actually started.
    #[must_use]
    pub fn actual_start(&self) -> Option<OffsetDateTime> {
        self.latest_event("WorkStarted").map(|e| e.occurred_at)
    }

    /// When work actually finished.
    #[must_use]
    pub fn actual_end(&self) -> Option<OffsetDateTime> {
        self.latest_event("WorkCompleted").map(|e| e.occurred_at)
    }

    /// The completion report, once work is completed.
    #[must_use]
    pub fn completion_report(&self) -> Option<&CompletionReport> {
        self.events.iter().rev().find_map(|e| match &e.kind {
            LifecycleEventKind::WorkCompleted(report) => Some(report),
            _ => None,
        })
    }

    /// The reason given by the most recent rejection or cancellation.
    #[must_use]
    pub fn latest_reason(&self) -> Option<&str> {
        self.events.iter().rev().find_map(|e| e.kind.reason())
    }

    /// Summarises the permit for audit purposes.
    #[must_use]
    pub fn to_snapshot(&self) -> StateSnapshot {
        StateSnapshot::new(format!(
            "permit_number={},status={},version={},hazards={},precautions={},approvals={},attachments={},risk={},priority={}",
            self.permit_number,
            self.status(),
            self.version,
            self.hazards.len(),
            self.precautions.len(),
            self.approvals.len(),
            self.attachments.len(),
            self.overall_risk_level(),
            self.priority(),
        ))
    }

    // ------------------------------------------------------------------
    // Guards
    // ------------------------------------------------------------------

    fn ensure_status(
        &self,
        allowed: impl Fn(PermitStatus) -> bool,
        operation: &'static str,
    ) -> Result<(), DomainError> {
        let from: PermitStatus = self.status();
        if allowed(from) {
            Ok(())
        } else {
            Err(DomainError::InvalidStatusTransition { from, operation })
        }
    }

    fn ensure_editable(&self, operation: &'static str) -> Result<(), DomainError> {
        self.ensure_status(|s| s.is_editable(), operation)
    }

    fn ensure_active(&self, operation: &'static str) -> Result<(), DomainError> {
        self.ensure_status(|s| !s.is_terminal(), operation)
    }

    /// Checks that the permit may be hard-deleted.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStatusTransition` unless the permit is a Draft.
    pub fn ensure_deletable(&self) -> Result<(), DomainError> {
        self.ensure_status(|s| s == PermitStatus::Draft, "delete")
    }

    fn record(&mut self, kind: LifecycleEventKind, actor: PersonRef, at: OffsetDateTime) {
        self.events.push(LifecycleEvent {
            kind,
            actor,
            occurred_at: at,
        });
    }

    // ------------------------------------------------------------------
    // Editing (Draft or Rejected)
    // ------------------------------------------------------------------

    /// Replaces the editable fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is not editable or a field is invalid.
    pub fn update_details(&mut self, revision: PermitRevision) -> Result<(), DomainError> {
        self.ensure_editable("update")?;
        validate_details(
            &revision.title,
            &revision.description,
            &revision.location,
            revision.number_of_workers,
        )?;

        self.details.title = revision.title;
        self.details.description = revision.description;
        self.details.location = revision.location;
        self.details.schedule = revision.schedule;
        self.details.number_of_workers = revision.number_of_workers;
        self.options = revision.options;
        Ok(())
    }

    /// Adds a hazard, returning its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is not editable or the hazard is invalid.
    pub fn add_hazard(&mut self, draft: HazardDraft) -> Result<u32, DomainError> {
        self.ensure_editable("add a hazard to")?;
        self.hazards.add(draft)
    }

    /// Replaces a hazard's fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is not editable, the hazard does not
    /// exist, or the new fields are invalid.
    pub fn update_hazard(&mut self, id: u32, draft: HazardDraft) -> Result<(), DomainError> {
        self.ensure_editable("update a hazard on")?;
        self.hazards.update(id, draft)
    }

    /// Removes a hazard.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is not editable or the hazard does not exist.
    pub fn remove_hazard(&mut self, id: u32) -> Result<(), DomainError> {
        self.ensure_editable("remove a hazard from")?;
        self.hazards.remove(id).map(|_| ())
    }

    /// Adds a precaution, returning its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is not editable or the precaution is invalid.
    pub fn add_precaution(&mut self, draft: PrecautionDraft) -> Result<u32, DomainError> {
        self.ensure_editable("add a precaution to")?;
        self.precautions.add(draft)
    }

    /// Replaces a precaution's fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is not editable, the precaution does
    /// not exist, or the new fields are invalid.
    pub fn update_precaution(
        &mut self,
        id: u32,
        draft: PrecautionDraft,
    ) -> Result<(), DomainError> {
        self.ensure_editable("update a precaution on")?;
        self.precautions.update(id, draft)
    }

    /// Removes a precaution.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is not editable or the precaution does not exist.
    pub fn remove_precaution(&mut self, id: u32) -> Result<(), DomainError> {
        self.ensure_editable("remove a precaution from")?;
        self.precautions.remove(id).map(|_| ())
    }

    // ------------------------------------------------------------------
    // Progress tracking (any non-terminal status)
    // ------------------------------------------------------------------

    /// Records that a hazard's controls are implemented.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is terminal, the hazard does not exist,
    /// controls were already recorded, or a residual score is out of range.
    pub fn implement_hazard_controls(
        &mut self,
        id: u32,
        residual_likelihood: u8,
        residual_severity: u8,
        notes: Option<String>,
        at: OffsetDateTime,
    ) -> Result<(), DomainError> {
        self.ensure_active("implement hazard controls on")?;
        self.hazards
            .implement_controls(id, residual_likelihood, residual_severity, notes, at)
    }

    /// Marks a precaution as completed.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is terminal, the precaution does not
    /// exist, or it is already completed.
    pub fn complete_precaution(
        &mut self,
        id: u32,
        by: PersonRef,
        notes: Option<String>,
        at: OffsetDateTime,
    ) -> Result<(), DomainError> {
        self.ensure_active("complete a precaution on")?;
        self.precautions.complete(id, by, notes, at)
    }

    /// Marks a completed precaution as verified.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is terminal or the precaution cannot be
    /// verified.
    pub fn verify_precaution(
        &mut self,
        id: u32,
        by: PersonRef,
        at: OffsetDateTime,
    ) -> Result<(), DomainError> {
        self.ensure_active("verify a precaution on")?;
        self.precautions.verify(id, by, at)
    }

    /// Records an attachment whose bytes are already stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is terminal or the metadata is invalid.
    pub fn add_attachment(
        &mut self,
        draft: AttachmentDraft,
        at: OffsetDateTime,
    ) -> Result<u32, DomainError> {
        self.ensure_active("attach a file to")?;
        self.attachments.add(draft, at)
    }

    /// Removes an attachment, returning it so its bytes can be deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is terminal or the attachment does not exist.
    pub fn remove_attachment(&mut self, id: u32) -> Result<Attachment, DomainError> {
        self.ensure_active("remove an attachment from")?;
        self.attachments.remove(id)
    }

    // ------------------------------------------------------------------
    // Lifecycle transitions
    // ------------------------------------------------------------------

    /// Draft or Rejected → Submitted. Starts a new submission round.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is not editable or fails the submission
    /// rules.
    pub fn submit(&mut self, submitter: PersonRef, at: OffsetDateTime) -> Result<(), DomainError> {
        self.ensure_editable("submit")?;
        let context: SubmissionContext<'_> = SubmissionContext {
            permit_type: self.details.permit_type,
            safety: &self.options.safety,
            hazard_count: self.hazards.len(),
            risk_assessment: self.options.risk_assessment.as_deref(),
            emergency_procedures: self.options.emergency_procedures.as_deref(),
        };
        validate_submission(&context, self.precautions.iter())?;

        self.record(LifecycleEventKind::Submitted, submitter, at);
        Ok(())
    }

    /// Appends an approval and moves to Approved once nothing is missing.
    ///
    /// A permit that requires no levels still needs one approval before it
    /// is Approved.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is not Submitted or the decision lacks
    /// an approver or level.
    pub fn approve(
        &mut self,
        decision: ApprovalDecision,
        policy: &ApprovalPolicy,
        at: OffsetDateTime,
    ) -> Result<(), DomainError> {
        self.ensure_status(|s| s == PermitStatus::Submitted, "approve")?;
        validate_required_text("approver_id", &decision.approver_id)?;
        validate_required_text("approver_name", &decision.approver_name)?;
        validate_required_text("level", &decision.level)?;

        let approver: PersonRef = PersonRef::new(&decision.approver_id, &decision.approver_name);
        self.append_approval(
            decision.approver_id,
            decision.approver_name,
            decision.level,
            true,
            non_blank(decision.comments),
            decision.k3_certificate_number,
            decision.authority_level,
            at,
        );

        if self.missing_levels(policy).is_empty() && !self.received_levels().is_empty() {
            self.record(LifecycleEventKind::Approved, approver, at);
        }
        Ok(())
    }

    /// Submitted → Rejected. Appends a rejection record with the reason.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is not Submitted or the reason, level
    /// or approver is blank.
    pub fn reject(
        &mut self,
        approver: PersonRef,
        level: String,
        reason: String,
        at: OffsetDateTime,
    ) -> Result<(), DomainError> {
        self.ensure_status(|s| s == PermitStatus::Submitted, "reject")?;
        validate_required_text("approver_id", &approver.id)?;
        validate_required_text("approver_name", &approver.name)?;
        validate_required_text("level", &level)?;
        validate_required_text("reason", &reason)?;

        self.append_approval(
            approver.id.clone(),
            approver.name.clone(),
            level,
            false,
            Some(reason.clone()),
            None,
            None,
            at,
        );
        self.record(LifecycleEventKind::Rejected { reason }, approver, at);
        Ok(())
    }

    /// Approved → `InProgress`. Every required precaution must be completed.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is not Approved or required precautions
    /// are outstanding.
    pub fn start_work(&mut self, actor: PersonRef, at: OffsetDateTime) -> Result<(), DomainError> {
        self.ensure_status(|s| s == PermitStatus::Approved, "start work on")?;
        let outstanding: Vec<u32> = self.precautions.outstanding_required();
        if !outstanding.is_empty() {
            return Err(DomainError::RequiredPrecautionsIncomplete { outstanding });
        }

        self.record(LifecycleEventKind::WorkStarted, actor, at);
        Ok(())
    }

    /// `InProgress` → Completed.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is not in progress or the notes are blank.
    pub fn complete_work(
        &mut self,
        actor: PersonRef,
        report: CompletionReport,
        at: OffsetDateTime,
    ) -> Result<(), DomainError> {
        self.ensure_status(|s| s == PermitStatus::InProgress, "complete work on")?;
        validate_required_text("completion_notes", &report.notes)?;

        let report: CompletionReport = CompletionReport {
            lessons_learned: non_blank(report.lessons_learned),
            ..report
        };
        self.record(LifecycleEventKind::WorkCompleted(report), actor, at);
        Ok(())
    }

    /// Any non-terminal status → Cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the permit is terminal or the reason is blank.
    pub fn cancel(
        &mut self,
        actor: PersonRef,
        reason: String,
        at: OffsetDateTime,
    ) -> Result<(), DomainError> {
        self.ensure_active("cancel")?;
        validate_required_text("reason", &reason)?;

        self.record(LifecycleEventKind::Cancelled { reason }, actor, at);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn append_approval(
        &mut self,
        approver_id: String,
        approver_name: String,
        level: String,
        approved: bool,
        comments: Option<String>,
        k3_certificate_number: Option<String>,
        authority_level: Option<String>,
        at: OffsetDateTime,
    ) {
        let sequence: u32 = self
            .approvals
            .iter()
            .map(|a| a.sequence)
            .max()
            .unwrap_or(0)
            + 1;
        let round: u32 = self.round();
        self.approvals.push(Approval {
            sequence,
            round,
            approver_id,
            approver_name,
            level: level.trim().to_string(),
            approved,
            comments,
            decided_at: at,
            k3_certificate_number: non_blank(k3_certificate_number),
            authority_level: non_blank(authority_level),
        });
    }

    pub(crate) const fn touch(&mut self, at: OffsetDateTime) {
        self.updated_at = at;
    }
}
