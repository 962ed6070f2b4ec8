// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::{DomainError, PermitStatus};
use time::macros::datetime;

#[test]
fn test_domain_error_display() {
    let err: DomainError = DomainError::MissingField { field: "title" };
    assert_eq!(format!("{err}"), "Field 'title' is required");

    let err: DomainError = DomainError::ScoreOutOfRange {
        field: "likelihood",
        value: 7,
    };
    assert_eq!(format!("{err}"), "likelihood must be between 1 and 5, got 7");

    let err: DomainError = DomainError::ScheduleTooLong {
        days: 400,
        max_days: 365,
    };
    assert_eq!(
        format!("{err}"),
        "Planned duration of 400 days exceeds the maximum of 365 days"
    );

    let err: DomainError = DomainError::NoHazardsRecorded;
    assert_eq!(
        format!("{err}"),
        "At least one hazard must be recorded before submission"
    );

    let err: DomainError = DomainError::InvalidStatusTransition {
        from: PermitStatus::Draft,
        operation: "approve",
    };
    assert_eq!(format!("{err}"), "Cannot approve a permit in status Draft");

    let err: DomainError = DomainError::HazardNotFound(4);
    assert_eq!(format!("{err}"), "Hazard 4 not found");

    let err: DomainError = DomainError::InvalidPermitType(String::from("Diving"));
    assert_eq!(format!("{err}"), "Invalid permit type: Diving");
}

#[test]
fn test_invalid_schedule_display_names_both_ends() {
    let err: DomainError = DomainError::InvalidSchedule {
        start: datetime!(2026-05-02 08:00 UTC),
        end: datetime!(2026-05-01 08:00 UTC),
    };
    let message: String = err.to_string();
    assert!(message.contains("2026-05-02"));
    assert!(message.contains("2026-05-01"));
}

#[test]
fn test_error_classification() {
    assert!(DomainError::PrecautionNotFound(1).is_not_found());
    assert!(DomainError::AttachmentNotFound(1).is_not_found());
    assert!(!DomainError::NoHazardsRecorded.is_not_found());

    let transition: DomainError = DomainError::InvalidStatusTransition {
        from: PermitStatus::Completed,
        operation: "cancel",
    };
    assert!(transition.is_invalid_transition());
    assert!(!DomainError::NoHazardsRecorded.is_invalid_transition());
}

#[test]
fn test_error_field_names() {
    assert_eq!(DomainError::MissingField { field: "location" }.field(), "location");
    assert_eq!(
        DomainError::MissingK3StandardReference {
            description: String::from("Harness")
        }
        .field(),
        "k3_standard_reference"
    );
    assert_eq!(DomainError::NoHazardsRecorded.field(), "hazards");
    assert_eq!(DomainError::HazardNotFound(2).field(), "hazard_id");
}
