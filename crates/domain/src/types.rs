// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::DomainError;
use crate::risk::RiskLevel;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use time::{Duration, OffsetDateTime};

/// Maximum span between planned start and planned end.
pub const MAX_PERMIT_DURATION_DAYS: i64 = 365;

/// The kind of work a permit authorises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PermitType {
    General,
    HotWork,
    ColdWork,
    ConfinedSpace,
    ElectricalWork,
    WorkingAtHeight,
    Excavation,
    Radiation,
    Special,
}

impl PermitType {
    /// Every permit type in declaration order.
    pub const ALL: [Self; 9] = [
        Self::General,
        Self::HotWork,
        Self::ColdWork,
        Self::ConfinedSpace,
        Self::ElectricalWork,
        Self::WorkingAtHeight,
        Self::Excavation,
        Self::Radiation,
        Self::Special,
    ];

    /// Converts this permit type to its string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::General => "General",
            Self::HotWork => "HotWork",
            Self::ColdWork => "ColdWork",
            Self::ConfinedSpace => "ConfinedSpace",
            Self::ElectricalWork => "ElectricalWork",
            Self::WorkingAtHeight => "WorkingAtHeight",
            Self::Excavation => "Excavation",
            Self::Radiation => "Radiation",
            Self::Special => "Special",
        }
    }

    /// Returns whether the type demands a written risk assessment.
    ///
    /// Everything except `General` and `ColdWork` is high-risk.
    #[must_use]
    pub const fn is_high_risk(&self) -> bool {
        !matches!(self, Self::General | Self::ColdWork)
    }
}

impl FromStr for PermitType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DomainError::InvalidPermitType(s.to_string()))
    }
}

impl std::fmt::Display for PermitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The lifecycle state of a permit.
///
/// Valid transitions are:
/// - Draft → Submitted
/// - Submitted → Approved | Rejected
/// - Rejected → Submitted
/// - Approved → `InProgress`
/// - `InProgress` → Completed
/// - any non-terminal state → Cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PermitStatus {
    /// Being assembled by the requestor.
    #[default]
    Draft,
    /// Awaiting approvals.
    Submitted,
    /// All required approval levels signed off.
    Approved,
    /// Work has started.
    InProgress,
    /// Work finished. Terminal.
    Completed,
    /// Sent back to the requestor for amendment.
    Rejected,
    /// Withdrawn. Terminal.
    Cancelled,
}

impl PermitStatus {
    /// Every status in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Draft,
        Self::Submitted,
        Self::Approved,
        Self::InProgress,
        Self::Completed,
        Self::Rejected,
        Self::Cancelled,
    ];

    /// Converts this status to its string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Submitted => "Submitted",
            Self::Approved => "Approved",
            Self::InProgress => "InProgress",
            Self::Completed => "Completed",
            Self::Rejected => "Rejected",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Returns whether no further operations are permitted.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Returns whether hazards, precautions and details may be edited.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        matches!(self, Self::Draft | Self::Rejected)
    }
}

impl FromStr for PermitStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::InvalidPermitStatus(s.to_string()))
    }
}

impl std::fmt::Display for PermitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Scheduling priority of a permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PermitPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl PermitPriority {
    /// Converts this priority to its string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }

    /// Derives a priority from an overall risk level.
    #[must_use]
    pub const fn from_risk_level(level: RiskLevel) -> Self {
        match level {
            RiskLevel::Low => Self::Low,
            RiskLevel::Medium => Self::Medium,
            RiskLevel::High => Self::High,
            RiskLevel::Critical => Self::Critical,
        }
    }
}

impl FromStr for PermitPriority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(Self::Low),
            "Medium" => Ok(Self::Medium),
            "High" => Ok(Self::High),
            "Critical" => Ok(Self::Critical),
            _ => Err(DomainError::InvalidPriority(s.to_string())),
        }
    }
}

impl std::fmt::Display for PermitPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One of the eight safety requirement flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SafetyFlag {
    HotWorkPermit,
    ConfinedSpaceEntry,
    ElectricalIsolation,
    HeightWork,
    RadiationWork,
    Excavation,
    FireWatch,
    GasMonitoring,
}

impl SafetyFlag {
    /// Every flag in declaration order.
    pub const ALL: [Self; 8] = [
        Self::HotWorkPermit,
        Self::ConfinedSpaceEntry,
        Self::ElectricalIsolation,
        Self::HeightWork,
        Self::RadiationWork,
        Self::Excavation,
        Self::FireWatch,
        Self::GasMonitoring,
    ];

    /// Converts this flag to its string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HotWorkPermit => "HotWorkPermit",
            Self::ConfinedSpaceEntry => "ConfinedSpaceEntry",
            Self::ElectricalIsolation => "ElectricalIsolation",
            Self::HeightWork => "HeightWork",
            Self::RadiationWork => "RadiationWork",
            Self::Excavation => "Excavation",
            Self::FireWatch => "FireWatch",
            Self::GasMonitoring => "GasMonitoring",
        }
    }
}

impl FromStr for SafetyFlag {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|flag| flag.as_str() == s)
            .ok_or_else(|| DomainError::InvalidSafetyFlag(s.to_string()))
    }
}

impl std::fmt::Display for SafetyFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The independent safety requirement flags carried by a permit.
///
/// These drive both the approval levels a permit needs and the
/// submission rules it must satisfy.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SafetyRequirements {
    pub hot_work_permit: bool,
    pub confined_space_entry: bool,
    pub electrical_isolation: bool,
    pub height_work: bool,
    pub radiation_work: bool,
    pub excavation: bool,
    pub fire_watch: bool,
    pub gas_monitoring: bool,
}

impl SafetyRequirements {
    /// Returns whether the given flag is set.
    #[must_use]
    pub const fn is_set(&self, flag: SafetyFlag) -> bool {
        match flag {
            SafetyFlag::HotWorkPermit => self.hot_work_permit,
            SafetyFlag::ConfinedSpaceEntry => self.confined_space_entry,
            SafetyFlag::ElectricalIsolation => self.electrical_isolation,
            SafetyFlag::HeightWork => self.height_work,
            SafetyFlag::RadiationWork => self.radiation_work,
            SafetyFlag::Excavation => self.excavation,
            SafetyFlag::FireWatch => self.fire_watch,
            SafetyFlag::GasMonitoring => self.gas_monitoring,
        }
    }

    /// Sets or clears a flag.
    pub const fn set(&mut self, flag: SafetyFlag, value: bool) {
        match flag {
            SafetyFlag::HotWorkPermit => self.hot_work_permit = value,
            SafetyFlag::ConfinedSpaceEntry => self.confined_space_entry = value,
            SafetyFlag::ElectricalIsolation => self.electrical_isolation = value,
            SafetyFlag::HeightWork => self.height_work = value,
            SafetyFlag::RadiationWork => self.radiation_work = value,
            SafetyFlag::Excavation => self.excavation = value,
            SafetyFlag::FireWatch => self.fire_watch = value,
            SafetyFlag::GasMonitoring => self.gas_monitoring = value,
        }
    }

    /// The flags that are set, in declaration order.
    #[must_use]
    pub fn active_flags(&self) -> Vec<SafetyFlag> {
        SafetyFlag::ALL
            .into_iter()
            .filter(|flag| self.is_set(*flag))
            .collect()
    }

    /// Returns whether any flag is set.
    #[must_use]
    pub fn any(&self) -> bool {
        SafetyFlag::ALL.into_iter().any(|flag| self.is_set(flag))
    }
}

/// Indonesian regulatory compliance fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ComplianceInfo {
    /// K3 (Keselamatan dan Kesehatan Kerja) license number.
    pub k3_license_number: Option<String>,
    pub company_permit_number: Option<String>,
    /// Worker social-security scheme compliance.
    pub jamsostek_compliant: bool,
    /// SMK3 management-system compliance.
    pub smk3_compliant: bool,
    pub environmental_permit_number: Option<String>,
}

/// The requestor as they were when the permit was created.
///
/// This is a copy, not a live reference, so historical permits stay
/// accurate when a profile later changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestorSnapshot {
    pub id: String,
    pub name: String,
    pub department: String,
    pub position: Option<String>,
    pub phone: Option<String>,
}

/// A reference to the person who performed an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRef {
    pub id: String,
    pub name: String,
}

impl PersonRef {
    /// Creates a new person reference.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Planned start and end of the permitted work.
///
/// The end is strictly after the start and the span is at most
/// [`MAX_PERMIT_DURATION_DAYS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSchedule")]
pub struct Schedule {
    #[serde(with = "time::serde::rfc3339")]
    planned_start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    planned_end: OffsetDateTime,
}

#[derive(Deserialize)]
struct RawSchedule {
    #[serde(with = "time::serde::rfc3339")]
    planned_start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    planned_end: OffsetDateTime,
}

impl TryFrom<RawSchedule> for Schedule {
    type Error = DomainError;

    fn try_from(raw: RawSchedule) -> Result<Self, Self::Error> {
        Self::new(raw.planned_start, raw.planned_end)
    }
}

impl Schedule {
    /// Creates a validated schedule.
    ///
    /// # Arguments
    ///
    /// * `planned_start` - When work is planned to begin
    /// * `planned_end` - When work is planned to finish
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The end is not strictly after the start
    /// - The span exceeds 365 days
    pub fn new(
        planned_start: OffsetDateTime,
        planned_end: OffsetDateTime,
    ) -> Result<Self, DomainError> {
        if planned_end <= planned_start {
            return Err(DomainError::InvalidSchedule {
                start: planned_start,
                end: planned_end,
            });
        }

        let span: Duration = planned_end - planned_start;
        if span > Duration::days(MAX_PERMIT_DURATION_DAYS) {
            return Err(DomainError::ScheduleTooLong {
                days: span.whole_days(),
                max_days: MAX_PERMIT_DURATION_DAYS,
            });
        }

        Ok(Self {
            planned_start,
            planned_end,
        })
    }

    #[must_use]
    pub const fn planned_start(&self) -> OffsetDateTime {
        self.planned_start
    }

    #[must_use]
    pub const fn planned_end(&self) -> OffsetDateTime {
        self.planned_end
    }
}

/// Human-readable permit number of the form `WP-YYYYMM-NNNN`.
///
/// Assigned once at creation and never changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermitNumber(String);

impl PermitNumber {
    /// Formats a permit number from its allocation components.
    ///
    /// # Arguments
    ///
    /// * `year` - Calendar year of creation
    /// * `month` - Calendar month of creation (1-12)
    /// * `sequence` - The per-year sequence value
    #[must_use]
    pub fn from_sequence(year: i32, month: u8, sequence: u32) -> Self {
        Self(format!("WP-{year:04}{month:02}-{sequence:04}"))
    }

    /// Returns the permit number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PermitNumber {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::InvalidPermitNumber(s.to_string());
        let rest: &str = s.strip_prefix("WP-").ok_or_else(invalid)?;
        let (stamp, sequence) = rest.split_once('-').ok_or_else(invalid)?;

        let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if stamp.len() != 6 || !all_digits(stamp) || sequence.len() < 4 || !all_digits(sequence) {
            return Err(invalid());
        }

        let month: u8 = stamp[4..].parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }

        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for PermitNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PermitNumber> for String {
    fn from(number: PermitNumber) -> Self {
        number.0
    }
}

impl std::fmt::Display for PermitNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
