// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use super::helpers::{
    NOW, create_draft, create_test_actor, create_test_cause, decision, hazard, person, run,
    submitted_general,
};
use crate::{ApprovalStatus, Command, CoreError, PermitOptions, WorkPermit, apply};
use hse_permit_domain::{
    ApprovalPolicy, DomainError, FIRE_SAFETY_OFFICER, PermitStatus, PermitType, RiskLevel,
    SAFETY_OFFICER, SUPERVISOR, SafetyRequirements,
};
use std::collections::{BTreeMap, BTreeSet};

fn hot_work_options(fire_watch: bool) -> PermitOptions {
    PermitOptions {
        safety: SafetyRequirements {
            hot_work_permit: true,
            fire_watch,
            ..SafetyRequirements::default()
        },
        risk_assessment: Some(String::from("JSA-2026-014")),
        ..PermitOptions::default()
    }
}

fn submitted_hot_work() -> WorkPermit {
    let draft: WorkPermit = create_draft(PermitType::HotWork, hot_work_options(true));
    let draft: WorkPermit = run(&draft, Command::AddHazard { hazard: hazard(3, 4) }).new_permit;
    let draft: WorkPermit = run(&draft, Command::AddHazard { hazard: hazard(1, 1) }).new_permit;
    run(&draft, Command::Submit { submitter: person() }).new_permit
}

fn approve(permit: &WorkPermit, level: &str) -> WorkPermit {
    run(
        permit,
        Command::Approve {
            decision: decision(level),
        },
    )
    .new_permit
}

#[test]
fn test_hot_work_with_fire_watch_requires_fire_safety_officer() {
    let permit: WorkPermit = create_draft(PermitType::HotWork, hot_work_options(true));
    let required: Vec<String> = permit.required_levels(&ApprovalPolicy::default());
    assert!(required.contains(&String::from(FIRE_SAFETY_OFFICER)));
    assert!(required.contains(&String::from(SUPERVISOR)));
    assert!(required.contains(&String::from(SAFETY_OFFICER)));

    let distinct: BTreeSet<&String> = required.iter().collect();
    assert_eq!(distinct.len(), required.len());
}

#[test]
fn test_hot_work_round_trip_to_approved() {
    let submitted: WorkPermit = submitted_hot_work();
    assert_eq!(submitted.overall_risk_level(), RiskLevel::Medium);

    let policy: ApprovalPolicy = ApprovalPolicy::default();
    let required: Vec<String> = submitted.required_levels(&policy);
    let mut permit: WorkPermit = submitted;
    for (index, level) in required.iter().enumerate() {
        assert_eq!(permit.status(), PermitStatus::Submitted);
        permit = approve(&permit, level);
        let status: ApprovalStatus = permit.approval_status(&policy);
        assert_eq!(status.received_levels.len(), index + 1);
        if index + 1 < required.len() {
            assert!(status.progress_percent < 100);
            assert!(!status.is_fully_approved);
        }
    }

    let status: ApprovalStatus = permit.approval_status(&policy);
    assert_eq!(permit.status(), PermitStatus::Approved);
    assert_eq!(status.progress_percent, 100);
    assert!(status.missing_levels.is_empty());
    assert!(status.is_fully_approved);
}

#[test]
fn test_partial_approval_stays_submitted() {
    let permit: WorkPermit = approve(&submitted_hot_work(), SUPERVISOR);
    let status: ApprovalStatus = permit.approval_status(&ApprovalPolicy::default());
    assert_eq!(permit.status(), PermitStatus::Submitted);
    assert_eq!(status.received_levels, vec![String::from(SUPERVISOR)]);
    assert!(status.missing_levels.contains(&String::from(FIRE_SAFETY_OFFICER)));
    assert_eq!(status.progress_percent, 33);
}

#[test]
fn test_repeated_level_counts_once() {
    let once: WorkPermit = approve(&submitted_hot_work(), SUPERVISOR);
    let twice: WorkPermit = approve(&once, SUPERVISOR);
    assert_eq!(twice.approvals().len(), 2);
    assert_eq!(twice.received_levels().len(), 1);
    assert_eq!(twice.status(), PermitStatus::Submitted);
}

#[test]
fn test_unrequired_level_does_not_complete_approval() {
    let permit: WorkPermit = approve(&submitted_hot_work(), "Auditor");
    assert_eq!(permit.status(), PermitStatus::Submitted);
    assert_eq!(
        permit
            .approval_status(&ApprovalPolicy::default())
            .progress_percent,
        0
    );
}

#[test]
fn test_approvals_survive_rejection_and_resubmission() {
    let partially: WorkPermit = approve(&submitted_hot_work(), SUPERVISOR);
    let rejected: WorkPermit = run(
        &partially,
        Command::Reject {
            approver: person(),
            level: String::from(SAFETY_OFFICER),
            reason: String::from("Fire blanket missing"),
        },
    )
    .new_permit;
    let resubmitted: WorkPermit =
        run(&rejected, Command::Submit { submitter: person() }).new_permit;

    assert_eq!(resubmitted.round(), 2);
    assert_eq!(
        resubmitted.received_levels(),
        BTreeSet::from([String::from(SUPERVISOR)])
    );
    assert_eq!(resubmitted.approvals()[0].round, 1);
    assert_eq!(resubmitted.approvals()[1].sequence, 2);

    let safety: WorkPermit = approve(&resubmitted, SAFETY_OFFICER);
    assert_eq!(safety.approvals()[2].round, 2);
    assert_eq!(safety.approvals()[2].sequence, 3);
    assert_eq!(safety.status(), PermitStatus::Submitted);
    assert_eq!(
        safety
            .approval_status(&ApprovalPolicy::default())
            .missing_levels,
        vec![String::from(FIRE_SAFETY_OFFICER)]
    );

    let approved: WorkPermit = approve(&safety, FIRE_SAFETY_OFFICER);
    let status: ApprovalStatus = approved.approval_status(&ApprovalPolicy::default());
    assert_eq!(approved.status(), PermitStatus::Approved);
    assert_eq!(status.progress_percent, 100);
    assert!(status.is_fully_approved);
}

#[test]
fn test_policy_without_levels_needs_one_approval() {
    let policy: ApprovalPolicy = ApprovalPolicy {
        base_levels: Vec::new(),
        type_levels: BTreeMap::new(),
        flag_levels: BTreeMap::new(),
    };
    let submitted: WorkPermit = submitted_general();
    let status: ApprovalStatus = submitted.approval_status(&policy);
    assert_eq!(status.progress_percent, 0);
    assert!(!status.is_fully_approved);

    let approved: WorkPermit = apply(
        &submitted,
        Command::Approve {
            decision: decision("Anyone"),
        },
        &policy,
        create_test_actor(),
        create_test_cause(),
        NOW,
    )
    .unwrap()
    .new_permit;
    assert_eq!(approved.status(), PermitStatus::Approved);
}

#[test]
fn test_approve_requires_submitted_status() {
    let draft: WorkPermit = create_draft(PermitType::General, PermitOptions::default());
    let result = apply(
        &draft,
        Command::Approve {
            decision: decision(SUPERVISOR),
        },
        &ApprovalPolicy::default(),
        create_test_actor(),
        create_test_cause(),
        NOW,
    );
    assert!(matches!(
        result,
        Err(CoreError::DomainViolation(
            DomainError::InvalidStatusTransition {
                from: PermitStatus::Draft,
                operation: "approve"
            }
        ))
    ));
}

#[test]
fn test_approve_requires_level() {
    let result = apply(
        &submitted_general(),
        Command::Approve {
            decision: decision(" "),
        },
        &ApprovalPolicy::default(),
        create_test_actor(),
        create_test_cause(),
        NOW,
    );
    assert!(matches!(
        result,
        Err(CoreError::DomainViolation(DomainError::MissingField {
            field: "level"
        }))
    ));
}

#[test]
fn test_approval_record_keeps_k3_details() {
    let mut with_k3 = decision(SUPERVISOR);
    with_k3.k3_certificate_number = Some(String::from("K3-UMUM-7781"));
    with_k3.authority_level = Some(String::new());
    with_k3.comments = Some(String::from("Area inspected"));

    let permit: WorkPermit = run(
        &submitted_general(),
        Command::Approve { decision: with_k3 },
    )
    .new_permit;
    let record = &permit.approvals()[0];
    assert!(record.approved);
    assert_eq!(record.k3_certificate_number.as_deref(), Some("K3-UMUM-7781"));
    assert_eq!(record.authority_level, None);
    assert_eq!(record.comments.as_deref(), Some("Area inspected"));
    assert_eq!(record.decided_at, NOW);
}
