// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::{
    Command, PermitDetails, PermitOptions, TransitionResult, WorkPermit, apply, create_permit,
};
use hse_permit_audit::{Actor, Cause};
use hse_permit_domain::{
    ApprovalDecision, ApprovalPolicy, HazardCategory, HazardDraft, K3Regulation, PermitNumber,
    PermitType, PersonRef, PrecautionCategory, PrecautionDraft, RequestorSnapshot, Schedule,
};
use time::OffsetDateTime;
use time::macros::datetime;

pub const NOW: OffsetDateTime = datetime!(2026-03-02 08:00 UTC);

pub fn create_test_actor() -> Actor {
    Actor::new(String::from("u-100"), String::from("user"))
}

pub fn create_test_cause() -> Cause {
    Cause::new(String::from("req-1"), String::from("Permit workflow request"))
}

pub fn requestor() -> RequestorSnapshot {
    RequestorSnapshot {
        id: String::from("u-100"),
        name: String::from("Dewi Lestari"),
        department: String::from("Maintenance"),
        position: Some(String::from("Technician")),
        phone: Some(String::from("+62 811 000 111")),
    }
}

pub fn person() -> PersonRef {
    PersonRef::new("u-100", "Dewi Lestari")
}

pub fn details(permit_type: PermitType) -> PermitDetails {
    PermitDetails {
        title: String::from("Replace pump seal"),
        description: String::from("Replace leaking seal on cooling water pump P-101"),
        permit_type,
        location: String::from("Utility area, Plant 2"),
        schedule: Schedule::new(datetime!(2026-03-03 07:00 UTC), datetime!(2026-03-03 17:00 UTC))
            .unwrap(),
        number_of_workers: 3,
        requestor: requestor(),
    }
}

pub fn create_draft(permit_type: PermitType, options: PermitOptions) -> WorkPermit {
    create_permit(
        PermitNumber::from_sequence(2026, 3, 1),
        details(permit_type),
        options,
        create_test_actor(),
        create_test_cause(),
        NOW,
    )
    .unwrap()
    .permit
}

pub fn hazard(likelihood: u8, severity: u8) -> HazardDraft {
    HazardDraft {
        description: String::from("Pressurised line"),
        category: HazardCategory::Mechanical,
        likelihood,
        severity,
        control_measures: String::from("Depressurise and lock out"),
        responsible_person: None,
    }
}

pub fn precaution(is_required: bool) -> PrecautionDraft {
    PrecautionDraft {
        description: String::from("Lock out / tag out"),
        category: PrecautionCategory::Isolation,
        is_required,
        priority: 1,
        responsible_person: None,
        verification_method: None,
        requires_verification: false,
        regulation: K3Regulation::default(),
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

pub fn run(permit: &WorkPermit, command: Command) -> TransitionResult {
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

/// A General permit with one hazard, submitted and awaiting approval.
pub fn submitted_general() -> WorkPermit {
    let draft: WorkPermit = create_draft(PermitType::General, PermitOptions::default());
    let with_hazard: WorkPermit = run(&draft, Command::AddHazard { hazard: hazard(2, 2) }).new_permit;
    run(&with_hazard, Command::Submit { submitter: person() }).new_permit
}

/// A General permit approved by its supervisor.
pub fn approved_general() -> WorkPermit {
    run(
        &submitted_general(),
        Command::Approve {
            decision: decision("Supervisor"),
        },
    )
    .new_permit
}

/// A General permit with work in progress.
pub fn in_progress_general() -> WorkPermit {
    run(&approved_general(), Command::StartWork { actor: person() }).new_permit
}
