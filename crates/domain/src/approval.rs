// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Approval records and the approval requirement calculator.
//!
//! The set of approval levels a permit needs is configuration: an
//! [`ApprovalPolicy`] maps permit types and safety flags to level labels.
//! The calculator contract is fixed:
//!
//! - required levels depend only on the permit type and flags
//! - setting a flag or choosing a riskier type never removes a level
//! - progress is 100 only when nothing is missing

use crate::error::DomainError;
use crate::types::{PermitType, SafetyFlag, SafetyRequirements};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use time::OffsetDateTime;

pub const SUPERVISOR: &str = "Supervisor";
pub const SAFETY_OFFICER: &str = "SafetyOfficer";
pub const FIRE_SAFETY_OFFICER: &str = "FireSafetyOfficer";
pub const K3_OFFICER: &str = "K3Officer";
pub const DEPARTMENT_HEAD: &str = "DepartmentHead";

/// One append-only approval record.
///
/// Rejections are recorded as `approved = false` with the reason in
/// `comments`. Records are never mutated after they are appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    /// Position in the permit's approval history, starting at 1.
    pub sequence: u32,
    /// The submission round the record belongs to, starting at 1.
    pub round: u32,
    pub approver_id: String,
    pub approver_name: String,
    pub level: String,
    pub approved: bool,
    pub comments: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub decided_at: OffsetDateTime,
    pub k3_certificate_number: Option<String>,
    pub authority_level: Option<String>,
}

/// An approver's sign-off at a given level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalDecision {
    pub approver_id: String,
    pub approver_name: String,
    pub level: String,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub k3_certificate_number: Option<String>,
    #[serde(default)]
    pub authority_level: Option<String>,
}

/// Maps permit attributes to the approval levels they require.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalPolicy {
    /// Levels every permit requires.
    pub base_levels: Vec<String>,
    /// Additional levels per permit type.
    pub type_levels: BTreeMap<PermitType, Vec<String>>,
    /// Additional levels per safety flag that is set.
    pub flag_levels: BTreeMap<SafetyFlag, Vec<String>>,
}

fn labels(levels: &[&str]) -> Vec<String> {
    levels.iter().map(ToString::to_string).collect()
}

fn check_labels(entry: &str, levels: &[String]) -> Result<(), DomainError> {
    for label in levels {
        if label.trim().is_empty() {
            return Err(DomainError::InvalidApprovalPolicy(format!(
                "{entry} contains an empty label"
            )));
        }
        if label.trim() != label {
            return Err(DomainError::InvalidApprovalPolicy(format!(
                "{entry} label {label:?} has surrounding whitespace"
            )));
        }
    }
    Ok(())
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        let type_levels: BTreeMap<PermitType, Vec<String>> = BTreeMap::from([
            (
                PermitType::HotWork,
                labels(&[SAFETY_OFFICER, FIRE_SAFETY_OFFICER]),
            ),
            (
                PermitType::ConfinedSpace,
                labels(&[SAFETY_OFFICER, K3_OFFICER]),
            ),
            (PermitType::ElectricalWork, labels(&[SAFETY_OFFICER])),
            (PermitType::WorkingAtHeight, labels(&[SAFETY_OFFICER])),
            (PermitType::Excavation, labels(&[SAFETY_OFFICER])),
            (
                PermitType::Radiation,
                labels(&[SAFETY_OFFICER, K3_OFFICER, DEPARTMENT_HEAD]),
            ),
            (
                PermitType::Special,
                labels(&[SAFETY_OFFICER, K3_OFFICER, DEPARTMENT_HEAD]),
            ),
        ]);

        let flag_levels: BTreeMap<SafetyFlag, Vec<String>> = BTreeMap::from([
            (SafetyFlag::HotWorkPermit, labels(&[FIRE_SAFETY_OFFICER])),
            (SafetyFlag::ConfinedSpaceEntry, labels(&[K3_OFFICER])),
            (SafetyFlag::ElectricalIsolation, labels(&[SAFETY_OFFICER])),
            (SafetyFlag::HeightWork, labels(&[SAFETY_OFFICER])),
            (
                SafetyFlag::RadiationWork,
                labels(&[K3_OFFICER, DEPARTMENT_HEAD]),
            ),
            (SafetyFlag::Excavation, labels(&[SAFETY_OFFICER])),
            (SafetyFlag::FireWatch, labels(&[FIRE_SAFETY_OFFICER])),
            (SafetyFlag::GasMonitoring, labels(&[SAFETY_OFFICER])),
        ]);

        Self {
            base_levels: labels(&[SUPERVISOR]),
            type_levels,
            flag_levels,
        }
    }
}

impl ApprovalPolicy {
    /// Checks that every configured label is non-empty and has no
    /// surrounding whitespace.
    ///
    /// Approval levels are trimmed when recorded, so a padded label could
    /// never be satisfied.
    ///
    /// # Errors
    ///
    /// Returns `InvalidApprovalPolicy` naming the first offending entry.
    pub fn validate(&self) -> Result<(), DomainError> {
        check_labels("base_levels", &self.base_levels)?;
        for (permit_type, levels) in &self.type_levels {
            check_labels(&format!("type_levels.{permit_type}"), levels)?;
        }
        for (flag, levels) in &self.flag_levels {
            check_labels(&format!("flag_levels.{flag}"), levels)?;
        }
        Ok(())
    }

    /// Computes the ordered set of levels a permit requires.
    ///
    /// Order is base levels, then type levels, then flag levels in flag
    /// declaration order. Duplicates keep their first position.
    #[must_use]
    pub fn required_levels(
        &self,
        permit_type: PermitType,
        safety: &SafetyRequirements,
    ) -> Vec<String> {
        let type_levels = self.type_levels.get(&permit_type).into_iter().flatten();
        let flag_levels = safety
            .active_flags()
            .into_iter()
            .filter_map(|flag| self.flag_levels.get(&flag))
            .flatten();

        let mut seen: BTreeSet<&str> = BTreeSet::new();
        self.base_levels
            .iter()
            .chain(type_levels)
            .chain(flag_levels)
            .filter(|level| seen.insert(level.as_str()))
            .cloned()
            .collect()
    }
}

/// Distinct levels with at least one `approved = true` record.
///
/// Rejections never withdraw an earlier sign-off, so approvals from any
/// submission round count.
#[must_use]
pub fn received_levels(approvals: &[Approval]) -> BTreeSet<String> {
    approvals
        .iter()
        .filter(|a| a.approved)
        .map(|a| a.level.clone())
        .collect()
}

/// Required levels not yet received, in required order.
#[must_use]
pub fn missing_levels(required: &[String], received: &BTreeSet<String>) -> Vec<String> {
    required
        .iter()
        .filter(|level| !received.contains(*level))
        .cloned()
        .collect()
}

/// Percentage of required levels that have been received.
///
/// Rounds half up, but never reports 100 while a level is missing. Defined
/// as 0 when nothing is required.
#[must_use]
pub fn approval_progress_percent(required: &[String], received: &BTreeSet<String>) -> u8 {
    let denominator: usize = required.len();
    if denominator == 0 {
        return 0;
    }
    let satisfied: usize = required.iter().filter(|l| received.contains(*l)).count();
    if satisfied == denominator {
        return 100;
    }

    let rounded: usize = (200 * satisfied + denominator) / (2 * denominator);
    u8::try_from(rounded.min(99)).unwrap_or(99)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use time::macros::datetime;

    fn approval(level: &str, approved: bool, round: u32) -> Approval {
        Approval {
            sequence: 1,
            round,
            approver_id: String::from("u-1"),
            approver_name: String::from("Agus"),
            level: level.to_string(),
            approved,
            comments: None,
            decided_at: datetime!(2026-03-01 10:00 UTC),
            k3_certificate_number: None,
            authority_level: None,
        }
    }

    #[test]
    fn test_general_without_flags_requires_only_supervisor() {
        let policy: ApprovalPolicy = ApprovalPolicy::default();
        let required = policy.required_levels(PermitType::General, &SafetyRequirements::default());
        assert_eq!(required, vec![SUPERVISOR.to_string()]);
    }

    #[test]
    fn test_hot_work_with_fire_watch_requires_fire_safety_officer_once() {
        let policy: ApprovalPolicy = ApprovalPolicy::default();
        let safety: SafetyRequirements = SafetyRequirements {
            fire_watch: true,
            ..SafetyRequirements::default()
        };
        let required = policy.required_levels(PermitType::HotWork, &safety);
        assert_eq!(
            required,
            labels(&[SUPERVISOR, SAFETY_OFFICER, FIRE_SAFETY_OFFICER])
        );
    }

    #[test]
    fn test_adding_any_flag_never_removes_a_level() {
        let policy: ApprovalPolicy = ApprovalPolicy::default();
        for permit_type in PermitType::ALL {
            let base: Vec<String> =
                policy.required_levels(permit_type, &SafetyRequirements::default());
            let mut safety: SafetyRequirements = SafetyRequirements::default();
            for flag in SafetyFlag::ALL {
                let before: Vec<String> = policy.required_levels(permit_type, &safety);
                safety.set(flag, true);
                let after: Vec<String> = policy.required_levels(permit_type, &safety);
                assert!(
                    before.iter().all(|l| after.contains(l)),
                    "{permit_type} + {flag} dropped a level"
                );
                assert!(base.iter().all(|l| after.contains(l)));
            }
        }
    }

    #[test]
    fn test_high_risk_types_add_levels_over_general() {
        let policy: ApprovalPolicy = ApprovalPolicy::default();
        let none: SafetyRequirements = SafetyRequirements::default();
        let general: Vec<String> = policy.required_levels(PermitType::General, &none);
        for permit_type in PermitType::ALL {
            let levels: Vec<String> = policy.required_levels(permit_type, &none);
            assert!(general.iter().all(|l| levels.contains(l)));
            if permit_type.is_high_risk() {
                assert!(levels.len() > general.len(), "{permit_type}");
            }
        }
    }

    #[test]
    fn test_received_levels_counts_approvals_from_every_round() {
        let approvals: Vec<Approval> = vec![
            approval(SUPERVISOR, true, 1),
            approval(SAFETY_OFFICER, false, 1),
            approval(SAFETY_OFFICER, true, 2),
            approval(K3_OFFICER, false, 2),
        ];
        let received: BTreeSet<String> = received_levels(&approvals);
        assert_eq!(
            received.into_iter().collect::<Vec<String>>(),
            labels(&[SAFETY_OFFICER, SUPERVISOR])
        );
    }

    #[test]
    fn test_progress_is_bounded_and_exact_only_when_complete() {
        let required: Vec<String> = labels(&[SUPERVISOR, SAFETY_OFFICER, K3_OFFICER]);
        let mut received: BTreeSet<String> = BTreeSet::new();
        assert_eq!(approval_progress_percent(&required, &received), 0);

        received.insert(SUPERVISOR.to_string());
        assert_eq!(approval_progress_percent(&required, &received), 33);

        received.insert(SAFETY_OFFICER.to_string());
        assert_eq!(approval_progress_percent(&required, &received), 67);

        received.insert(String::from("Unrelated"));
        assert_eq!(approval_progress_percent(&required, &received), 67);

        received.insert(K3_OFFICER.to_string());
        assert_eq!(approval_progress_percent(&required, &received), 100);
        assert!(missing_levels(&required, &received).is_empty());
    }

    #[test]
    fn test_progress_never_reaches_100_with_missing_levels() {
        let required: Vec<String> = (0..250).map(|i| format!("L{i}")).collect();
        let received: BTreeSet<String> = required.iter().skip(1).cloned().collect();
        assert_eq!(approval_progress_percent(&required, &received), 99);
    }

    #[test]
    fn test_progress_is_zero_when_nothing_required() {
        assert_eq!(approval_progress_percent(&[], &BTreeSet::new()), 0);
    }

    #[test]
    fn test_policy_validation_rejects_empty_labels() {
        let mut policy: ApprovalPolicy = ApprovalPolicy::default();
        assert!(policy.validate().is_ok());
        policy
            .flag_levels
            .insert(SafetyFlag::GasMonitoring, vec![String::from(" ")]);
        assert!(matches!(
            policy.validate(),
            Err(DomainError::InvalidApprovalPolicy(_))
        ));
    }

    #[test]
    fn test_policy_validation_rejects_padded_labels() {
        let mut policy: ApprovalPolicy = ApprovalPolicy::default();
        policy.base_levels = vec![String::from(" Supervisor")];
        assert!(matches!(
            policy.validate(),
            Err(DomainError::InvalidApprovalPolicy(ref msg)) if msg.contains("base_levels")
        ));

        let mut policy: ApprovalPolicy = ApprovalPolicy::default();
        policy
            .type_levels
            .insert(PermitType::HotWork, vec![String::from("FireSafetyOfficer\t")]);
        assert!(matches!(
            policy.validate(),
            Err(DomainError::InvalidApprovalPolicy(ref msg)) if msg.contains("type_levels.HotWork")
        ));
    }

    #[test]
    fn test_policy_deserializes_from_json() {
        let json: &str = r#"{
            "base_levels": ["Foreman"],
            "type_levels": { "HotWork": ["FireMarshal"] },
            "flag_levels": { "GasMonitoring": ["GasTester"] }
        }"#;
        let policy: ApprovalPolicy = serde_json::from_str(json).unwrap();
        let safety: SafetyRequirements = SafetyRequirements {
            gas_monitoring: true,
            ..SafetyRequirements::default()
        };
        assert_eq!(
            policy.required_levels(PermitType::HotWork, &safety),
            labels(&["Foreman", "FireMarshal", "GasTester"])
        );
    }
}
