// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Hazards recorded against a permit.

use crate::error::DomainError;
use crate::risk::{RiskLevel, RiskRating};
use crate::validation::validate_required_text;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use time::OffsetDateTime;

/// Number of hazard categories.
pub const HAZARD_CATEGORY_COUNT: usize = 10;

/// The broad class a hazard belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HazardCategory {
    Physical,
    Chemical,
    Biological,
    Ergonomic,
    Fire,
    Electrical,
    Mechanical,
    Environmental,
    Radiological,
    Behavioral,
}

impl HazardCategory {
    /// Every category in declaration order.
    pub const ALL: [Self; HAZARD_CATEGORY_COUNT] = [
        Self::Physical,
        Self::Chemical,
        Self::Biological,
        Self::Ergonomic,
        Self::Fire,
        Self::Electrical,
        Self::Mechanical,
        Self::Environmental,
        Self::Radiological,
        Self::Behavioral,
    ];

    /// Converts this category to its string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Physical => "Physical",
            Self::Chemical => "Chemical",
            Self::Biological => "Biological",
            Self::Ergonomic => "Ergonomic",
            Self::Fire => "Fire",
            Self::Electrical => "Electrical",
            Self::Mechanical => "Mechanical",
            Self::Environmental => "Environmental",
            Self::Radiological => "Radiological",
            Self::Behavioral => "Behavioral",
        }
    }

    /// Position of the category within [`HazardCategory::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Physical => 0,
            Self::Chemical => 1,
            Self::Biological => 2,
            Self::Ergonomic => 3,
            Self::Fire => 4,
            Self::Electrical => 5,
            Self::Mechanical => 6,
            Self::Environmental => 7,
            Self::Radiological => 8,
            Self::Behavioral => 9,
        }
    }
}

impl FromStr for HazardCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| DomainError::InvalidHazardCategory(s.to_string()))
    }
}

impl std::fmt::Display for HazardCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Caller-supplied hazard fields, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardDraft {
    pub description: String,
    pub category: HazardCategory,
    pub likelihood: u8,
    pub severity: u8,
    pub control_measures: String,
    pub responsible_person: Option<String>,
}

/// Residual risk recorded once control measures are in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlImplementation {
    pub residual: RiskRating,
    #[serde(with = "time::serde::rfc3339")]
    pub implemented_at: OffsetDateTime,
    pub notes: Option<String>,
}

/// A hazard owned by a permit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hazard {
    /// Identifier, unique within the owning permit.
    pub id: u32,
    pub description: String,
    pub category: HazardCategory,
    pub initial: RiskRating,
    pub control_measures: String,
    pub responsible_person: Option<String>,
    pub implementation: Option<ControlImplementation>,
}

impl Hazard {
    /// The initial risk level from the risk matrix.
    #[must_use]
    pub const fn risk_level(&self) -> RiskLevel {
        self.initial.level()
    }

    /// The residual risk level, once controls are implemented.
    #[must_use]
    pub fn residual_risk_level(&self) -> Option<RiskLevel> {
        self.implementation.as_ref().map(|i| i.residual.level())
    }

    /// Returns whether controls have been implemented.
    #[must_use]
    pub const fn is_implemented(&self) -> bool {
        self.implementation.is_some()
    }
}

fn validated(id: u32, draft: HazardDraft) -> Result<Hazard, DomainError> {
    validate_required_text("description", &draft.description)?;
    validate_required_text("control_measures", &draft.control_measures)?;
    let initial: RiskRating = RiskRating::new(draft.likelihood, draft.severity)?;

    Ok(Hazard {
        id,
        description: draft.description.trim().to_string(),
        category: draft.category,
        initial,
        control_measures: draft.control_measures.trim().to_string(),
        responsible_person: draft.responsible_person,
        implementation: None,
    })
}

/// The ordered set of hazards owned by one permit.
///
/// Mutators validate their input before touching the ledger, so a failed
/// call leaves it unchanged. Status guards belong to the owning permit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HazardLedger {
    hazards: Vec<Hazard>,
    next_id: u32,
}

impl HazardLedger {
    /// Rebuilds a ledger from stored hazards.
    ///
    /// `next_id` is the last id handed out; ids are never reused, even
    /// after the hazard that held them is removed.
    #[must_use]
    pub fn restore(hazards: Vec<Hazard>, next_id: u32) -> Self {
        let highest: u32 = hazards.iter().map(|x| x.id).max().unwrap_or(0);
        Self {
            hazards,
            next_id: next_id.max(highest),
        }
    }

    /// The last id handed out by this ledger.
    #[must_use]
    pub const fn next_id(&self) -> u32 {
        self.next_id
    }

    /// Validates and appends a hazard, returning its id.
    ///
    /// # Errors
    ///
    /// Returns an error if a text field is empty or a score is out of range.
    pub fn add(&mut self, draft: HazardDraft) -> Result<u32, DomainError> {
        let id: u32 = self.next_id + 1;
        let hazard: Hazard = validated(id, draft)?;
        self.hazards.push(hazard);
        self.next_id = id;
        Ok(id)
    }

    /// Replaces the fields of an existing hazard.
    ///
    /// Any previously recorded control implementation is discarded.
    ///
    /// # Errors
    ///
    /// Returns `HazardNotFound` for an unknown id, or a validation error.
    pub fn update(&mut self, id: u32, draft: HazardDraft) -> Result<(), DomainError> {
        let position: usize = self.position(id)?;
        let hazard: Hazard = validated(id, draft)?;
        self.hazards[position] = hazard;
        Ok(())
    }

    /// Removes a hazard by id.
    ///
    /// # Errors
    ///
    /// Returns `HazardNotFound` for an unknown id.
    pub fn remove(&mut self, id: u32) -> Result<Hazard, DomainError> {
        let position: usize = self.position(id)?;
        Ok(self.hazards.remove(position))
    }

    /// Records that a hazard's control measures are in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the hazard does not exist, controls were already
    /// recorded, or a residual score is out of range.
    pub fn implement_controls(
        &mut self,
        id: u32,
        residual_likelihood: u8,
        residual_severity: u8,
        notes: Option<String>,
        at: OffsetDateTime,
    ) -> Result<(), DomainError> {
        let position: usize = self.position(id)?;
        if self.hazards[position].is_implemented() {
            return Err(DomainError::ControlsAlreadyImplemented(id));
        }
        let residual: RiskRating = RiskRating::new(residual_likelihood, residual_severity)?;

        self.hazards[position].implementation = Some(ControlImplementation {
            residual,
            implemented_at: at,
            notes: notes.filter(|n| !n.trim().is_empty()),
        });
        Ok(())
    }

    /// Looks up a hazard by id.
    #[must_use]
    pub fn get(&self, id: u32) -> Option<&Hazard> {
        self.hazards.iter().find(|h| h.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hazard> {
        self.hazards.iter()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.hazards.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.hazards.is_empty()
    }

    /// The highest initial risk level across all hazards.
    #[must_use]
    pub fn highest_risk_level(&self) -> Option<RiskLevel> {
        self.hazards.iter().map(Hazard::risk_level).max()
    }

    fn position(&self, id: u32) -> Result<usize, DomainError> {
        self.hazards
            .iter()
            .position(|h| h.id == id)
            .ok_or(DomainError::HazardNotFound(id))
    }
}
