// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! The append-only lifecycle event log.
//!
//! A permit's status is never stored. It is the status produced by the most
//! recent lifecycle event, or `Draft` when there are none.

use hse_permit_domain::{DomainError, PermitStatus, PersonRef};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// What was recorded when work finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionReport {
    pub notes: String,
    pub completed_safely: bool,
    pub lessons_learned: Option<String>,
}

/// The kind of a lifecycle event, with any data it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEventKind {
    Submitted,
    Approved,
    Rejected { reason: String },
    WorkStarted,
    WorkCompleted(CompletionReport),
    Cancelled { reason: String },
}

impl LifecycleEventKind {
    /// Converts this kind to its string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "Submitted",
            Self::Approved => "Approved",
            Self::Rejected { .. } => "Rejected",
            Self::WorkStarted => "WorkStarted",
            Self::WorkCompleted(_) => "WorkCompleted",
            Self::Cancelled { .. } => "Cancelled",
        }
    }

    /// The status a permit is in immediately after this event.
    #[must_use]
    pub const fn resulting_status(&self) -> PermitStatus {
        match self {
            Self::Submitted => PermitStatus::Submitted,
            Self::Approved => PermitStatus::Approved,
            Self::Rejected { .. } => PermitStatus::Rejected,
            Self::WorkStarted => PermitStatus::InProgress,
            Self::WorkCompleted(_) => PermitStatus::Completed,
            Self::Cancelled { .. } => PermitStatus::Cancelled,
        }
    }

    /// The free-text reason carried by rejections and cancellations.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Rejected { reason } | Self::Cancelled { reason } => Some(reason.as_str()),
            _ => None,
        }
    }

    /// Rebuilds a kind from its stored columns.
    ///
    /// # Arguments
    ///
    /// * `name` - The stored kind name
    /// * `reason` - The stored reason, for rejections and cancellations
    /// * `report` - The stored completion report, for completions
    ///
    /// # Errors
    ///
    /// Returns `InvalidLifecycleEvent` if the name is unknown or the data the
    /// kind needs is missing.
    pub fn from_stored(
        name: &str,
        reason: Option<String>,
        report: Option<CompletionReport>,
    ) -> Result<Self, DomainError> {
        let missing = |what: &str| DomainError::InvalidLifecycleEvent(format!("{name} without {what}"));
        match name {
            "Submitted" => Ok(Self::Submitted),
            "Approved" => Ok(Self::Approved),
            "Rejected" => Ok(Self::Rejected {
                reason: reason.ok_or_else(|| missing("reason"))?,
            }),
            "WorkStarted" => Ok(Self::WorkStarted),
            "WorkCompleted" => Ok(Self::WorkCompleted(
                report.ok_or_else(|| missing("completion report"))?,
            )),
            "Cancelled" => Ok(Self::Cancelled {
                reason: reason.ok_or_else(|| missing("reason"))?,
            }),
            _ => Err(DomainError::InvalidLifecycleEvent(name.to_string())),
        }
    }
}

impl std::fmt::Display for LifecycleEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry in a permit's lifecycle log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub kind: LifecycleEventKind,
    pub actor: PersonRef,
    #[serde(with = "time::serde::rfc3339")]
    pub occurred_at: OffsetDateTime,
}

/// Folds a lifecycle log into the current status.
#[must_use]
pub fn status_of(events: &[LifecycleEvent]) -> PermitStatus {
    events
        .last()
        .map_or(PermitStatus::Draft, |event| event.kind.resulting_status())
}
