// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Safety precautions and their completion and verification state.

use crate::error::DomainError;
use crate::types::PersonRef;
use crate::validation::validate_required_text;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use time::OffsetDateTime;

/// Lowest precaution priority.
pub const MIN_PRECAUTION_PRIORITY: u8 = 1;
/// Highest precaution priority.
pub const MAX_PRECAUTION_PRIORITY: u8 = 5;

/// The kind of control a precaution provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrecautionCategory {
    PersonalProtectiveEquipment,
    Isolation,
    Ventilation,
    FireProtection,
    GasTesting,
    Barricading,
    Communication,
    EmergencyPreparedness,
    Training,
    Other,
}

impl PrecautionCategory {
    /// Every category in declaration order.
    pub const ALL: [Self; 10] = [
        Self::PersonalProtectiveEquipment,
        Self::Isolation,
        Self::Ventilation,
        Self::FireProtection,
        Self::GasTesting,
        Self::Barricading,
        Self::Communication,
        Self::EmergencyPreparedness,
        Self::Training,
        Self::Other,
    ];

    /// Converts this category to its string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PersonalProtectiveEquipment => "PersonalProtectiveEquipment",
            Self::Isolation => "Isolation",
            Self::Ventilation => "Ventilation",
            Self::FireProtection => "FireProtection",
            Self::GasTesting => "GasTesting",
            Self::Barricading => "Barricading",
            Self::Communication => "Communication",
            Self::EmergencyPreparedness => "EmergencyPreparedness",
            Self::Training => "Training",
            Self::Other => "Other",
        }
    }
}

impl FromStr for PrecautionCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| DomainError::InvalidPrecautionCategory(s.to_string()))
    }
}

impl std::fmt::Display for PrecautionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Indonesian regulatory flags on a precaution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct K3Regulation {
    /// The precaution is mandated by K3 regulation.
    pub is_k3_requirement: bool,
    /// The K3 standard the precaution implements. Required when
    /// `is_k3_requirement` is set.
    pub k3_standard_reference: Option<String>,
    pub is_mandatory_by_law: bool,
}

/// Caller-supplied precaution fields, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecautionDraft {
    pub description: String,
    pub category: PrecautionCategory,
    pub is_required: bool,
    pub priority: u8,
    pub responsible_person: Option<String>,
    pub verification_method: Option<String>,
    pub requires_verification: bool,
    #[serde(default)]
    pub regulation: K3Regulation,
}

/// Who completed a precaution, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub by: PersonRef,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
    pub notes: Option<String>,
}

/// Who verified a completed precaution, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub by: PersonRef,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

/// A precaution owned by a permit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precaution {
    /// Identifier, unique within the owning permit.
    pub id: u32,
    pub description: String,
    pub category: PrecautionCategory,
    pub is_required: bool,
    pub priority: u8,
    pub responsible_person: Option<String>,
    pub verification_method: Option<String>,
    pub requires_verification: bool,
    pub regulation: K3Regulation,
    pub completion: Option<Completion>,
    pub verification: Option<Verification>,
}

impl Precaution {
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completion.is_some()
    }

    #[must_use]
    pub const fn is_verified(&self) -> bool {
        self.verification.is_some()
    }
}

/// Checks the K3 reference rule for a precaution.
///
/// # Errors
///
/// Returns `MissingK3StandardReference` when the precaution is a K3
/// requirement but carries no reference.
pub fn validate_k3_reference(
    description: &str,
    regulation: &K3Regulation,
) -> Result<(), DomainError> {
    let has_reference: bool = regulation
        .k3_standard_reference
        .as_deref()
        .is_some_and(|r| !r.trim().is_empty());

    if regulation.is_k3_requirement && !has_reference {
        return Err(DomainError::MissingK3StandardReference {
            description: description.to_string(),
        });
    }
    Ok(())
}

fn validated(id: u32, draft: PrecautionDraft) -> Result<Precaution, DomainError> {
    validate_required_text("description", &draft.description)?;
    if !(MIN_PRECAUTION_PRIORITY..=MAX_PRECAUTION_PRIORITY).contains(&draft.priority) {
        return Err(DomainError::InvalidField {
            field: "priority",
            reason: format!(
                "must be between {MIN_PRECAUTION_PRIORITY} and {MAX_PRECAUTION_PRIORITY}, got {}",
                draft.priority
            ),
        });
    }
    validate_k3_reference(&draft.description, &draft.regulation)?;

    Ok(Precaution {
        id,
        description: draft.description.trim().to_string(),
        category: draft.category,
        is_required: draft.is_required,
        priority: draft.priority,
        responsible_person: draft.responsible_person,
        verification_method: draft.verification_method,
        requires_verification: draft.requires_verification,
        regulation: draft.regulation,
        completion: None,
        verification: None,
    })
}

/// The ordered set of precautions owned by one permit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PrecautionLedger {
    precautions: Vec<Precaution>,
    next_id: u32,
}

impl PrecautionLedger {
    /// Rebuilds a ledger from stored precautions.
    ///
    /// `next_id` is the last id handed out; ids are never reused, even
    /// after the precaution that held them is removed.
    #[must_use]
    pub fn restore(precautions: Vec<Precaution>, next_id: u32) -> Self {
        let highest: u32 = precautions.iter().map(|x| x.id).max().unwrap_or(0);
        Self {
            precautions,
            next_id: next_id.max(highest),
        }
    }

    /// The last id handed out by this ledger.
    #[must_use]
    pub const fn next_id(&self) -> u32 {
        self.next_id
    }

    /// Validates and appends a precaution, returning its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the description is empty, the priority is out of
    /// range, or a K3 requirement has no standard reference.
    pub fn add(&mut self, draft: PrecautionDraft) -> Result<u32, DomainError> {
        let id: u32 = self.next_id + 1;
        let precaution: Precaution = validated(id, draft)?;
        self.precautions.push(precaution);
        self.next_id = id;
        Ok(id)
    }

    /// Replaces the fields of an existing precaution, clearing its progress.
    ///
    /// # Errors
    ///
    /// Returns `PrecautionNotFound` for an unknown id, or a validation error.
    pub fn update(&mut self, id: u32, draft: PrecautionDraft) -> Result<(), DomainError> {
        let position: usize = self.position(id)?;
        let precaution: Precaution = validated(id, draft)?;
        self.precautions[position] = precaution;
        Ok(())
    }

    /// Removes a precaution by id.
    ///
    /// # Errors
    ///
    /// Returns `PrecautionNotFound` for an unknown id.
    pub fn remove(&mut self, id: u32) -> Result<Precaution, DomainError> {
        let position: usize = self.position(id)?;
        Ok(self.precautions.remove(position))
    }

    /// Marks a precaution as completed.
    ///
    /// # Errors
    ///
    /// Returns an error if the precaution does not exist or is already completed.
    pub fn complete(
        &mut self,
        id: u32,
        by: PersonRef,
        notes: Option<String>,
        at: OffsetDateTime,
    ) -> Result<(), DomainError> {
        let position: usize = self.position(id)?;
        let precaution: &mut Precaution = &mut self.precautions[position];
        if precaution.is_completed() {
            return Err(DomainError::PrecautionAlreadyCompleted(id));
        }
        precaution.completion = Some(Completion {
            by,
            at,
            notes: notes.filter(|n| !n.trim().is_empty()),
        });
        Ok(())
    }

    /// Marks a completed precaution as verified.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The precaution does not exist
    /// - It does not require verification
    /// - It has not been completed
    /// - It is already verified
    pub fn verify(&mut self, id: u32, by: PersonRef, at: OffsetDateTime) -> Result<(), DomainError> {
        let position: usize = self.position(id)?;
        let precaution: &mut Precaution = &mut self.precautions[position];
        if !precaution.requires_verification {
            return Err(DomainError::VerificationNotRequired(id));
        }
        if !precaution.is_completed() {
            return Err(DomainError::PrecautionNotCompleted(id));
        }
        if precaution.is_verified() {
            return Err(DomainError::PrecautionAlreadyVerified(id));
        }
        precaution.verification = Some(Verification { by, at });
        Ok(())
    }

    /// Ids of required precautions that are not yet completed.
    #[must_use]
    pub fn outstanding_required(&self) -> Vec<u32> {
        self.precautions
            .iter()
            .filter(|p| p.is_required && !p.is_completed())
            .map(|p| p.id)
            .collect()
    }

    #[must_use]
    pub fn get(&self, id: u32) -> Option<&Precaution> {
        self.precautions.iter().find(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Precaution> {
        self.precautions.iter()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.precautions.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.precautions.is_empty()
    }

    fn position(&self, id: u32) -> Result<usize, DomainError> {
        self.precautions
            .iter()
            .position(|p| p.id == id)
            .ok_or(DomainError::PrecautionNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use time::macros::datetime;

    fn draft() -> PrecautionDraft {
        PrecautionDraft {
            description: String::from("Gas test before entry"),
            category: PrecautionCategory::GasTesting,
            is_required: true,
            priority: 1,
            responsible_person: None,
            verification_method: Some(String::from("Detector log")),
            requires_verification: true,
            regulation: K3Regulation::default(),
        }
    }

    fn inspector() -> PersonRef {
        PersonRef::new("u-9", "Sari")
    }

    #[test]
    fn test_k3_requirement_needs_reference() {
        let mut ledger: PrecautionLedger = PrecautionLedger::default();
        let mut d: PrecautionDraft = draft();
        d.regulation.is_k3_requirement = true;
        d.regulation.k3_standard_reference = Some(String::from("  "));

        assert!(matches!(
            ledger.add(d.clone()),
            Err(DomainError::MissingK3StandardReference { .. })
        ));
        assert!(ledger.is_empty());

        d.regulation.k3_standard_reference = Some(String::from("Permenaker 5/2018"));
        assert_eq!(ledger.add(d).unwrap(), 1);
    }

    #[test]
    fn test_priority_out_of_range_is_rejected() {
        let mut ledger: PrecautionLedger = PrecautionLedger::default();
        let mut d: PrecautionDraft = draft();
        d.priority = 6;
        assert!(matches!(
            ledger.add(d),
            Err(DomainError::InvalidField {
                field: "priority",
                ..
            })
        ));
    }

    #[test]
    fn test_verification_requires_completion() {
        let mut ledger: PrecautionLedger = PrecautionLedger::default();
        ledger.add(draft()).unwrap();
        let at = datetime!(2026-03-01 09:00 UTC);

        assert_eq!(
            ledger.verify(1, inspector(), at),
            Err(DomainError::PrecautionNotCompleted(1))
        );
        ledger.complete(1, inspector(), None, at).unwrap();
        ledger.verify(1, inspector(), at).unwrap();
        assert_eq!(
            ledger.verify(1, inspector(), at),
            Err(DomainError::PrecautionAlreadyVerified(1))
        );
    }

    #[test]
    fn test_verification_not_required_is_rejected() {
        let mut ledger: PrecautionLedger = PrecautionLedger::default();
        let mut d: PrecautionDraft = draft();
        d.requires_verification = false;
        ledger.add(d).unwrap();
        let at = datetime!(2026-03-01 09:00 UTC);
        ledger.complete(1, inspector(), None, at).unwrap();

        assert_eq!(
            ledger.verify(1, inspector(), at),
            Err(DomainError::VerificationNotRequired(1))
        );
    }

    #[test]
    fn test_outstanding_required_ignores_optional_precautions() {
        let mut ledger: PrecautionLedger = PrecautionLedger::default();
        ledger.add(draft()).unwrap();
        let mut optional: PrecautionDraft = draft();
        optional.is_required = false;
        ledger.add(optional).unwrap();

        assert_eq!(ledger.outstanding_required(), vec![1]);
        ledger
            .complete(1, inspector(), None, datetime!(2026-03-01 09:00 UTC))
            .unwrap();
        assert!(ledger.outstanding_required().is_empty());
    }

    #[test]
    fn test_complete_twice_is_rejected() {
        let mut ledger: PrecautionLedger = PrecautionLedger::default();
        ledger.add(draft()).unwrap();
        let at = datetime!(2026-03-01 09:00 UTC);
        ledger.complete(1, inspector(), None, at).unwrap();
        assert_eq!(
            ledger.complete(1, inspector(), None, at),
            Err(DomainError::PrecautionAlreadyCompleted(1))
        );
    }
}
