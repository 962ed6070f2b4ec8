// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]

mod approval;
mod attachment;
mod category_table;
mod error;
mod hazard;
mod precaution;
mod risk;
mod types;
mod validation;

#[cfg(test)]
mod tests;

pub use approval::{
    Approval, ApprovalDecision, ApprovalPolicy, DEPARTMENT_HEAD, FIRE_SAFETY_OFFICER, K3_OFFICER,
    SAFETY_OFFICER, SUPERVISOR, approval_progress_percent, missing_levels, received_levels,
};
pub use attachment::{Attachment, AttachmentDraft, AttachmentLedger};
pub use category_table::HazardCategoryTable;
pub use error::DomainError;
pub use hazard::{
    ControlImplementation, HAZARD_CATEGORY_COUNT, Hazard, HazardCategory, HazardDraft,
    HazardLedger,
};
pub use precaution::{
    Completion, K3Regulation, MAX_PRECAUTION_PRIORITY, MIN_PRECAUTION_PRIORITY, Precaution,
    PrecautionCategory, PrecautionDraft, PrecautionLedger, Verification, validate_k3_reference,
};
pub use risk::{Likelihood, MAX_SCORE, MIN_SCORE, RiskLevel, RiskRating, Severity, evaluate_risk};
pub use types::{
    ComplianceInfo, MAX_PERMIT_DURATION_DAYS, PermitNumber, PermitPriority, PermitStatus,
    PermitType, PersonRef, RequestorSnapshot, SafetyFlag, SafetyRequirements, Schedule,
};
pub use validation::{
    MAX_WORKERS, SubmissionContext, validate_file_name, validate_required_text,
    validate_submission, validate_worker_count,
};
