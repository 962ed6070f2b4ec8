// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod permit_store_tests;

use crate::{PersistedPermit, Persistence};
use hse_permit::{
    Command, CreationResult, PermitDetails, PermitOptions, TransitionResult, WorkPermit, apply,
    create_permit,
};
use hse_permit_audit::{Action, Actor, AuditEvent, Cause, StateSnapshot};
use hse_permit_domain::{
    ApprovalDecision, ApprovalPolicy, HazardCategory, HazardDraft, PermitNumber, PermitType,
    PersonRef, RequestorSnapshot, Schedule,
};
use time::OffsetDateTime;
use time::macros::datetime;

pub const NOW: OffsetDateTime = datetime!(2026-03-02 08:00 UTC);

pub fn create_test_actor() -> Actor {
    Actor::new(String::from("u-100"), String::from("user"))
}

pub fn create_test_cause() -> Cause {
    Cause::new(String::from("test-cause"), String::from("Test operation"))
}

pub fn person() -> PersonRef {
    PersonRef::new("u-100", "Dewi Lestari")
}

pub fn details(permit_type: PermitType, requestor_id: &str) -> PermitDetails {
    PermitDetails {
        title: String::from("Replace pump seal"),
        description: String::from("Replace leaking seal on cooling water pump P-101"),
        permit_type,
        location: String::from("Utility area, Plant 2"),
        schedule: Schedule::new(datetime!(2026-03-03 07:00 UTC), datetime!(2026-03-03 17:00 UTC))
            .unwrap(),
        number_of_workers: 3,
        requestor: RequestorSnapshot {
            id: requestor_id.to_string(),
            name: String::from("Dewi Lestari"),
            department: String::from("Maintenance"),
            position: None,
            phone: None,
        },
    }
}

pub fn hazard(likelihood: u8, severity: u8) -> HazardDraft {
    HazardDraft {
        description: String::from("Hot surfaces"),
        category: HazardCategory::Fire,
        likelihood,
        severity,
        control_measures: String::from("Fire blanket and extinguisher on standby"),
        responsible_person: Some(String::from("Budi")),
    }
}

pub fn decision(level: &str) -> ApprovalDecision {
    ApprovalDecision {
        approver_id: format!("approver-{level}"),
        approver_name: format!("{level} on duty"),
        level: level.to_string(),
        comments: None,
        k3_certificate_number: None,
        authority_level: None,
    }
}

/// Creates and stores a draft requested by `u-100`, returning it as loaded.
pub fn store_draft(persistence: &mut Persistence, permit_type: PermitType) -> WorkPermit {
    store(persistence, details(permit_type, "u-100"), PermitOptions::default())
}

/// Creates and stores a draft, returning it as loaded from the store.
pub fn store(
    persistence: &mut Persistence,
    details: PermitDetails,
    options: PermitOptions,
) -> WorkPermit {
    let number: PermitNumber = persistence.allocate_permit_number(NOW).unwrap();
    let created: CreationResult = create_permit(
        number,
        details,
        options,
        create_test_actor(),
        create_test_cause(),
        NOW,
    )
    .unwrap();
    let persisted: PersistedPermit = persistence.persist_creation(&created).unwrap();
    persistence.load_permit(persisted.permit_id).unwrap()
}

pub fn apply_command(permit: &WorkPermit, command: Command) -> TransitionResult {
    apply(
        permit,
        command,
        &ApprovalPolicy::default(),
        create_test_actor(),
        create_test_cause(),
        NOW,
    )
    .unwrap()
}

/// Applies a command, persists it, and reloads the permit.
pub fn execute(persistence: &mut Persistence, permit: &WorkPermit, command: Command) -> WorkPermit {
    let result: TransitionResult = apply_command(permit, command);
    let persisted: PersistedPermit = persistence.persist_transition(&result).unwrap();
    persistence.load_permit(persisted.permit_id).unwrap()
}

pub fn deletion_event(permit: &WorkPermit) -> AuditEvent {
    AuditEvent::new(
        permit.id(),
        permit.permit_number().clone(),
        create_test_actor(),
        create_test_cause(),
        Action::new(String::from("DeletePermit"), None),
        permit.to_snapshot(),
        StateSnapshot::empty(),
        NOW,
    )
}
