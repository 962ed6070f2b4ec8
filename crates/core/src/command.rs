// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::lifecycle::CompletionReport;
use crate::permit::PermitRevision;
use hse_permit_domain::{
    ApprovalDecision, AttachmentDraft, HazardDraft, PersonRef, PrecautionDraft,
};

/// A command represents user or system intent as data only.
///
/// Commands are the only way to request changes to an existing permit.
/// Each one maps onto exactly one permit operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Replace the editable fields of a Draft or Rejected permit.
    UpdateDetails {
        /// The replacement values.
        revision: PermitRevision,
    },
    /// Add a hazard.
    AddHazard {
        /// The hazard fields.
        hazard: HazardDraft,
    },
    /// Replace a hazard's fields.
    UpdateHazard {
        /// The hazard to update.
        hazard_id: u32,
        /// The replacement fields.
        hazard: HazardDraft,
    },
    /// Remove a hazard.
    RemoveHazard {
        /// The hazard to remove.
        hazard_id: u32,
    },
    /// Record residual risk once a hazard's controls are in place.
    ImplementHazardControls {
        /// The hazard whose controls were implemented.
        hazard_id: u32,
        /// Likelihood after controls (1-5).
        residual_likelihood: u8,
        /// Severity after controls (1-5).
        residual_severity: u8,
        /// Optional implementation notes.
        notes: Option<String>,
    },
    /// Add a precaution.
    AddPrecaution {
        /// The precaution fields.
        precaution: PrecautionDraft,
    },
    /// Replace a precaution's fields.
    UpdatePrecaution {
        /// The precaution to update.
        precaution_id: u32,
        /// The replacement fields.
        precaution: PrecautionDraft,
    },
    /// Remove a precaution.
    RemovePrecaution {
        /// The precaution to remove.
        precaution_id: u32,
    },
    /// Mark a precaution as completed.
    CompletePrecaution {
        /// The precaution that was completed.
        precaution_id: u32,
        /// Who completed it.
        by: PersonRef,
        /// Optional completion notes.
        notes: Option<String>,
    },
    /// Mark a completed precaution as verified.
    VerifyPrecaution {
        /// The precaution that was verified.
        precaution_id: u32,
        /// Who verified it.
        by: PersonRef,
    },
    /// Record an attachment whose bytes are already stored.
    AddAttachment {
        /// The attachment metadata.
        attachment: AttachmentDraft,
    },
    /// Remove an attachment.
    RemoveAttachment {
        /// The attachment to remove.
        attachment_id: u32,
    },
    /// Submit the permit for approval.
    Submit {
        /// Who submitted it.
        submitter: PersonRef,
    },
    /// Sign off one approval level.
    Approve {
        /// The approver and level.
        decision: ApprovalDecision,
    },
    /// Send the permit back to the requestor.
    Reject {
        /// Who rejected it.
        approver: PersonRef,
        /// The level the approver acted at.
        level: String,
        /// Why it was rejected.
        reason: String,
    },
    /// Start the permitted work.
    StartWork {
        /// Who started the work.
        actor: PersonRef,
    },
    /// Finish the permitted work.
    CompleteWork {
        /// Who completed the work.
        actor: PersonRef,
        /// The completion notes, safety flag and lessons learned.
        report: CompletionReport,
    },
    /// Withdraw the permit.
    Cancel {
        /// Who cancelled it.
        actor: PersonRef,
        /// Why it was cancelled.
        reason: String,
    },
}

impl Command {
    /// The action name recorded in the audit log.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UpdateDetails { .. } => "UpdatePermitDetails",
            Self::AddHazard { .. } => "AddHazard",
            Self::UpdateHazard { .. } => "UpdateHazard",
            Self::RemoveHazard { .. } => "RemoveHazard",
            Self::ImplementHazardControls { .. } => "ImplementHazardControls",
            Self::AddPrecaution { .. } => "AddPrecaution",
            Self::UpdatePrecaution { .. } => "UpdatePrecaution",
            Self::RemovePrecaution { .. } => "RemovePrecaution",
            Self::CompletePrecaution { .. } => "CompletePrecaution",
            Self::VerifyPrecaution { .. } => "VerifyPrecaution",
            Self::AddAttachment { .. } => "AddAttachment",
            Self::RemoveAttachment { .. } => "RemoveAttachment",
            Self::Submit { .. } => "SubmitForApproval",
            Self::Approve { .. } => "Approve",
            Self::Reject { .. } => "Reject",
            Self::StartWork { .. } => "StartWork",
            Self::CompleteWork { .. } => "CompleteWork",
            Self::Cancel { .. } => "Cancel",
        }
    }
}
