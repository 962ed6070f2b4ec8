// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::types::PermitStatus;
use time::OffsetDateTime;

/// Errors that can occur during domain validation and permit transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A required field is empty.
    MissingField {
        /// The name of the missing field.
        field: &'static str,
    },
    /// A field value is malformed or outside its permitted range.
    InvalidField {
        /// The name of the invalid field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
    /// A likelihood or severity score is outside 1..=5.
    ScoreOutOfRange {
        /// Which score was out of range.
        field: &'static str,
        /// The rejected value.
        value: u8,
    },
    /// The planned end is not strictly after the planned start.
    InvalidSchedule {
        /// The planned start.
        start: OffsetDateTime,
        /// The planned end.
        end: OffsetDateTime,
    },
    /// The planned duration exceeds the permitted maximum.
    ScheduleTooLong {
        /// The requested duration in whole days.
        days: i64,
        /// The maximum permitted duration in days.
        max_days: i64,
    },
    /// A precaution flagged as a K3 requirement has no standard reference.
    MissingK3StandardReference {
        /// The precaution description.
        description: String,
    },
    /// A permit cannot be submitted without at least one hazard.
    NoHazardsRecorded,
    /// Required precautions are still incomplete.
    RequiredPrecautionsIncomplete {
        /// Ids of the outstanding precautions.
        outstanding: Vec<u32>,
    },
    /// The operation is not permitted from the permit's current status.
    InvalidStatusTransition {
        /// The current status.
        from: PermitStatus,
        /// The attempted operation.
        operation: &'static str,
    },
    /// Hazard id does not exist on the permit.
    HazardNotFound(u32),
    /// Precaution id does not exist on the permit.
    PrecautionNotFound(u32),
    /// Attachment id does not exist on the permit.
    AttachmentNotFound(u32),
    /// The precaution has already been completed.
    PrecautionAlreadyCompleted(u32),
    /// The precaution must be completed before it can be verified.
    PrecautionNotCompleted(u32),
    /// The precaution does not require verification.
    VerificationNotRequired(u32),
    /// The precaution has already been verified.
    PrecautionAlreadyVerified(u32),
    /// Hazard controls have already been recorded as implemented.
    ControlsAlreadyImplemented(u32),
    /// Permit type string is not recognised.
    InvalidPermitType(String),
    /// Permit status string is not recognised.
    InvalidPermitStatus(String),
    /// Permit priority string is not recognised.
    InvalidPriority(String),
    /// Risk level string is not recognised.
    InvalidRiskLevel(String),
    /// Hazard category string is not recognised.
    InvalidHazardCategory(String),
    /// Precaution category string is not recognised.
    InvalidPrecautionCategory(String),
    /// Safety flag string is not recognised.
    InvalidSafetyFlag(String),
    /// Lifecycle event kind string is not recognised.
    InvalidLifecycleEvent(String),
    /// Permit number is malformed.
    InvalidPermitNumber(String),
    /// The approval policy is malformed.
    InvalidApprovalPolicy(String),
    /// The hazard category lookup table is incomplete or ambiguous.
    InvalidCategoryTable(String),
}

impl DomainError {
    /// Returns true if the error refers to a child entity that does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::HazardNotFound(_) | Self::PrecautionNotFound(_) | Self::AttachmentNotFound(_)
        )
    }

    /// Returns true if the error is a lifecycle guard rejection.
    #[must_use]
    pub const fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidStatusTransition { .. })
    }

    /// Returns the name of the field the error is about, if any.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::MissingField { field }
            | Self::InvalidField { field, .. }
            | Self::ScoreOutOfRange { field, .. } => *field,
            Self::InvalidSchedule { .. } | Self::ScheduleTooLong { .. } => "schedule",
            Self::MissingK3StandardReference { .. } => "k3_standard_reference",
            Self::NoHazardsRecorded | Self::ControlsAlreadyImplemented(_) => "hazards",
            Self::RequiredPrecautionsIncomplete { .. }
            | Self::PrecautionAlreadyCompleted(_)
            | Self::PrecautionNotCompleted(_)
            | Self::VerificationNotRequired(_)
            | Self::PrecautionAlreadyVerified(_) => "precautions",
            Self::InvalidPermitType(_) => "permit_type",
            Self::InvalidPermitStatus(_) | Self::InvalidStatusTransition { .. } => "status",
            Self::InvalidPriority(_) => "priority",
            Self::InvalidRiskLevel(_) => "risk_level",
            Self::InvalidHazardCategory(_) | Self::InvalidPrecautionCategory(_) => "category",
            Self::InvalidSafetyFlag(_) => "safety_flag",
            Self::InvalidLifecycleEvent(_) => "lifecycle_event",
            Self::InvalidPermitNumber(_) => "permit_number",
            Self::InvalidApprovalPolicy(_) => "approval_policy",
            Self::InvalidCategoryTable(_) => "hazard_categories",
            Self::HazardNotFound(_) => "hazard_id",
            Self::PrecautionNotFound(_) => "precaution_id",
            Self::AttachmentNotFound(_) => "attachment_id",
        }
    }
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField { field } => write!(f, "Field '{field}' is required"),
            Self::InvalidField { field, reason } => {
                write!(f, "Invalid value for '{field}': {reason}")
            }
            Self::ScoreOutOfRange { field, value } => {
                write!(f, "{field} must be between 1 and 5, got {value}")
            }
            Self::InvalidSchedule { start, end } => {
                write!(
                    f,
                    "Planned end ({end}) must be strictly after planned start ({start})"
                )
            }
            Self::ScheduleTooLong { days, max_days } => {
                write!(
                    f,
                    "Planned duration of {days} days exceeds the maximum of {max_days} days"
                )
            }
            Self::MissingK3StandardReference { description } => {
                write!(
                    f,
                    "Precaution '{description}' is a K3 requirement but has no K3 standard reference"
                )
            }
            Self::NoHazardsRecorded => {
                write!(f, "At least one hazard must be recorded before submission")
            }
            Self::RequiredPrecautionsIncomplete { outstanding } => {
                write!(f, "Required precautions are not completed: {outstanding:?}")
            }
            Self::InvalidStatusTransition { from, operation } => {
                write!(f, "Cannot {operation} a permit in status {from}")
            }
            Self::HazardNotFound(id) => write!(f, "Hazard {id} not found"),
            Self::PrecautionNotFound(id) => write!(f, "Precaution {id} not found"),
            Self::AttachmentNotFound(id) => write!(f, "Attachment {id} not found"),
            Self::PrecautionAlreadyCompleted(id) => {
                write!(f, "Precaution {id} is already completed")
            }
            Self::PrecautionNotCompleted(id) => {
                write!(f, "Precaution {id} must be completed before verification")
            }
            Self::VerificationNotRequired(id) => {
                write!(f, "Precaution {id} does not require verification")
            }
            Self::PrecautionAlreadyVerified(id) => {
                write!(f, "Precaution {id} is already verified")
            }
            Self::ControlsAlreadyImplemented(id) => {
                write!(f, "Controls for hazard {id} are already implemented")
            }
            Self::InvalidPermitType(s) => write!(f, "Invalid permit type: {s}"),
            Self::InvalidPermitStatus(s) => write!(f, "Invalid permit status: {s}"),
            Self::InvalidPriority(s) => write!(f, "Invalid priority: {s}"),
            Self::InvalidRiskLevel(s) => write!(f, "Invalid risk level: {s}"),
            Self::InvalidHazardCategory(s) => write!(f, "Invalid hazard category: {s}"),
            Self::InvalidPrecautionCategory(s) => write!(f, "Invalid precaution category: {s}"),
            Self::InvalidSafetyFlag(s) => write!(f, "Invalid safety flag: {s}"),
            Self::InvalidLifecycleEvent(s) => write!(f, "Invalid lifecycle event: {s}"),
            Self::InvalidPermitNumber(s) => write!(f, "Invalid permit number: {s}"),
            Self::InvalidApprovalPolicy(msg) => write!(f, "Invalid approval policy: {msg}"),
            Self::InvalidCategoryTable(msg) => {
                write!(f, "Invalid hazard category table: {msg}")
            }
        }
    }
}

impl std::error::Error for DomainError {}
