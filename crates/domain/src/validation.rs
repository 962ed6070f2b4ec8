// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::DomainError;
use crate::precaution::{Precaution, validate_k3_reference};
use crate::types::{PermitType, SafetyRequirements};

/// Upper bound on the number of workers a single permit may cover.
pub const MAX_WORKERS: u32 = 1_000;

/// Validates that a required text field is not blank.
///
/// # Arguments
///
/// * `field` - The field name reported on failure
/// * `value` - The value to check
///
/// # Errors
///
/// Returns `MissingField` if the value is empty or whitespace.
pub fn validate_required_text(field: &'static str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::MissingField { field });
    }
    Ok(())
}

/// Validates the number of workers covered by a permit.
///
/// # Errors
///
/// Returns `InvalidField` if the count is zero or above [`MAX_WORKERS`].
pub fn validate_worker_count(count: u32) -> Result<(), DomainError> {
    if count == 0 {
        return Err(DomainError::InvalidField {
            field: "number_of_workers",
            reason: String::from("must be positive"),
        });
    }
    if count > MAX_WORKERS {
        return Err(DomainError::InvalidField {
            field: "number_of_workers",
            reason: format!("must not exceed {MAX_WORKERS}"),
        });
    }
    Ok(())
}

/// Validates an attachment file name.
///
/// # Errors
///
/// Returns an error if the name is blank, is a relative path component, or
/// contains a path separator, a double quote or a control character. The
/// name is sent back verbatim in `Content-Disposition` headers.
pub fn validate_file_name(name: &str) -> Result<(), DomainError> {
    validate_required_text("file_name", name)?;
    if name.contains(['/', '\\', '"']) || name.chars().any(char::is_control) {
        return Err(DomainError::InvalidField {
            field: "file_name",
            reason: String::from("must not contain separators, quotes or control characters"),
        });
    }
    if name == "." || name == ".." {
        return Err(DomainError::InvalidField {
            field: "file_name",
            reason: String::from("must be a plain file name"),
        });
    }
    Ok(())
}

/// The permit attributes the submission rules look at.
#[derive(Debug, Clone, Copy)]
pub struct SubmissionContext<'a> {
    pub permit_type: PermitType,
    pub safety: &'a SafetyRequirements,
    pub hazard_count: usize,
    pub risk_assessment: Option<&'a str>,
    pub emergency_procedures: Option<&'a str>,
}

fn is_present(text: Option<&str>) -> bool {
    text.is_some_and(|t| !t.trim().is_empty())
}

/// Validates that a permit is complete enough to be submitted.
///
/// # Arguments
///
/// * `context` - The permit attributes
/// * `precautions` - The permit's precautions
///
/// # Errors
///
/// Returns an error if:
/// - No hazard is recorded
/// - A risk assessment is missing while a safety flag is set or the type is high-risk
/// - Emergency procedures are missing for confined-space work
/// - A K3-requirement precaution has no standard reference
pub fn validate_submission<'a>(
    context: &SubmissionContext<'_>,
    precautions: impl IntoIterator<Item = &'a Precaution>,
) -> Result<(), DomainError> {
    if context.hazard_count == 0 {
        return Err(DomainError::NoHazardsRecorded);
    }

    let needs_assessment: bool = context.permit_type.is_high_risk() || context.safety.any();
    if needs_assessment && !is_present(context.risk_assessment) {
        return Err(DomainError::MissingField {
            field: "risk_assessment",
        });
    }

    let confined: bool = context.permit_type == PermitType::ConfinedSpace
        || context.safety.confined_space_entry;
    if confined && !is_present(context.emergency_procedures) {
        return Err(DomainError::MissingField {
            field: "emergency_procedures",
        });
    }

    for precaution in precautions {
        validate_k3_reference(&precaution.description, &precaution.regulation)?;
    }

    Ok(())
}
