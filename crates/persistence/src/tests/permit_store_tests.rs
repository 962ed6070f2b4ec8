// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use super::{
    apply_command, decision, deletion_event, details, execute, hazard, person, store, store_draft,
};
use crate::{PermitQuery, PermitSummary, PersistedPermit, Persistence, PersistenceError};
use hse_permit::{Command, CompletionReport, PermitOptions, TransitionResult, WorkPermit};
use hse_permit_domain::{
    AttachmentDraft, K3Regulation, PermitStatus, PermitType, PrecautionCategory, PrecautionDraft,
    RiskLevel, SafetyRequirements,
};

fn k3_precaution() -> PrecautionDraft {
    PrecautionDraft {
        description: String::from("Fire extinguisher within 10 m"),
        category: PrecautionCategory::FireProtection,
        is_required: true,
        priority: 1,
        responsible_person: Some(String::from("Budi")),
        verification_method: Some(String::from("Visual check")),
        requires_verification: true,
        regulation: K3Regulation {
            is_k3_requirement: true,
            k3_standard_reference: Some(String::from("Permenaker 04/1980")),
            is_mandatory_by_law: true,
        },
    }
}

fn submitted(persistence: &mut Persistence) -> WorkPermit {
    let draft: WorkPermit = store_draft(persistence, PermitType::General);
    let with_hazard: WorkPermit =
        execute(persistence, &draft, Command::AddHazard { hazard: hazard(2, 2) });
    execute(persistence, &with_hazard, Command::Submit { submitter: person() })
}

#[test]
fn test_new_permit_is_stored_at_version_one() {
    let mut persistence: Persistence = Persistence::new_in_memory().unwrap();
    let draft: WorkPermit = store_draft(&mut persistence, PermitType::General);
    assert_eq!(draft.version(), 1);
    assert_eq!(draft.status(), PermitStatus::Draft);
    assert!(draft.id().is_some());
}

#[test]
fn test_full_lifecycle_round_trips_through_the_store() {
    let mut persistence: Persistence = Persistence::new_in_memory().unwrap();
    let options: PermitOptions = PermitOptions {
        safety: SafetyRequirements {
            hot_work_permit: true,
            ..SafetyRequirements::default()
        },
        risk_assessment: Some(String::from("JSA-2026-031")),
        contractor_company: Some(String::from("PT Las Prima")),
        ..PermitOptions::default()
    };
    let mut permit: WorkPermit = store(
        &mut persistence,
        details(PermitType::HotWork, "u-100"),
        options,
    );

    let commands: Vec<Command> = vec![
        Command::AddHazard { hazard: hazard(4, 4) },
        Command::AddHazard { hazard: hazard(1, 2) },
        Command::AddPrecaution {
            precaution: k3_precaution(),
        },
        Command::Submit { submitter: person() },
        Command::Approve {
            decision: decision("Supervisor"),
        },
        Command::Approve {
            decision: decision("SafetyOfficer"),
        },
        Command::Approve {
            decision: decision("FireSafetyOfficer"),
        },
        Command::CompletePrecaution {
            precaution_id: 1,
            by: person(),
            notes: Some(String::from("Extinguisher tagged")),
        },
        Command::VerifyPrecaution {
            precaution_id: 1,
            by: person(),
        },
        Command::StartWork { actor: person() },
        Command::ImplementHazardControls {
            hazard_id: 1,
            residual_likelihood: 2,
            residual_severity: 2,
            notes: None,
        },
        Command::AddAttachment {
            attachment: AttachmentDraft {
                file_name: String::from("hot-work-checklist.pdf"),
                content_type: String::from("application/pdf"),
                size_bytes: 10_240,
                storage_key: String::from("a1b2c3"),
                description: None,
                uploaded_by: String::from("u-100"),
            },
        },
        Command::CompleteWork {
            actor: person(),
            report: CompletionReport {
                notes: String::from("Welding finished, area inspected"),
                completed_safely: true,
                lessons_learned: Some(String::from("Book the fire watch earlier")),
            },
        },
    ];

    for command in commands {
        let result: TransitionResult = apply_command(&permit, command);
        let persisted: PersistedPermit = persistence.persist_transition(&result).unwrap();
        let mut expected: WorkPermit = result.new_permit;
        expected.mark_persisted(persisted.permit_id, persisted.version);

        permit = persistence.load_permit(persisted.permit_id).unwrap();
        assert_eq!(permit, expected);
    }

    assert_eq!(permit.status(), PermitStatus::Completed);
    assert_eq!(permit.version(), 14);
    assert_eq!(permit.overall_risk_level(), RiskLevel::High);
    assert_eq!(permit.approvals().len(), 3);
    assert_eq!(
        permit.hazards().get(1).unwrap().residual_risk_level(),
        Some(RiskLevel::Low)
    );
}

#[test]
fn test_concurrent_approvals_cannot_both_commit() {
    let mut persistence: Persistence = Persistence::new_in_memory().unwrap();
    let loaded: WorkPermit = submitted(&mut persistence);
    let first_copy: WorkPermit = loaded.clone();
    let second_copy: WorkPermit = loaded;

    let first: TransitionResult = apply_command(
        &first_copy,
        Command::Approve {
            decision: decision("Supervisor"),
        },
    );
    let second: TransitionResult = apply_command(
        &second_copy,
        Command::Approve {
            decision: decision("Supervisor"),
        },
    );

    let permit_id: i64 = first.new_permit.id().unwrap();
    persistence.persist_transition(&first).unwrap();
    assert_eq!(
        persistence.persist_transition(&second).unwrap_err(),
        PersistenceError::ConcurrencyConflict {
            permit_id,
            expected_version: 3,
            actual_version: 4,
        }
    );

    let stored: WorkPermit = persistence.load_permit(permit_id).unwrap();
    assert_eq!(stored.status(), PermitStatus::Approved);
    assert_eq!(stored.approvals().len(), 1);
    let approved_events: usize = stored
        .events()
        .iter()
        .filter(|e| e.kind.as_str() == "Approved")
        .count();
    assert_eq!(approved_events, 1);
}

#[test]
fn test_failed_commit_leaves_store_unchanged() {
    let mut persistence: Persistence = Persistence::new_in_memory().unwrap();
    let loaded: WorkPermit = submitted(&mut persistence);
    let stale: WorkPermit = loaded.clone();

    execute(
        &mut persistence,
        &loaded,
        Command::Cancel {
            actor: person(),
            reason: String::from("Weather"),
        },
    );
    let late: TransitionResult = apply_command(
        &stale,
        Command::Approve {
            decision: decision("Supervisor"),
        },
    );
    assert!(persistence.persist_transition(&late).is_err());

    let stored: WorkPermit = persistence.load_permit(stale.id().unwrap()).unwrap();
    assert_eq!(stored.status(), PermitStatus::Cancelled);
    assert!(stored.approvals().is_empty());
    let timeline = persistence
        .get_audit_timeline(stored.permit_number())
        .unwrap();
    assert!(timeline.iter().all(|e| e.action.name != "Approve"));
}

#[test]
fn test_rejection_history_survives_resubmission() {
    let mut persistence: Persistence = Persistence::new_in_memory().unwrap();
    let permit: WorkPermit = submitted(&mut persistence);
    let rejected: WorkPermit = execute(
        &mut persistence,
        &permit,
        Command::Reject {
            approver: person(),
            level: String::from("Supervisor"),
            reason: String::from("Wrong location"),
        },
    );
    let resubmitted: WorkPermit = execute(
        &mut persistence,
        &rejected,
        Command::Submit { submitter: person() },
    );

    assert_eq!(resubmitted.status(), PermitStatus::Submitted);
    assert_eq!(resubmitted.round(), 2);
    assert_eq!(resubmitted.approvals().len(), 1);
    assert!(!resubmitted.approvals()[0].approved);
    assert_eq!(resubmitted.events().len(), 3);
    assert_eq!(resubmitted.latest_reason(), Some("Wrong location"));
}

#[test]
fn test_removed_hazard_ids_stay_retired_after_reload() {
    let mut persistence: Persistence = Persistence::new_in_memory().unwrap();
    let draft: WorkPermit = store_draft(&mut persistence, PermitType::General);
    let one: WorkPermit = execute(&mut persistence, &draft, Command::AddHazard { hazard: hazard(1, 1) });
    let two: WorkPermit = execute(&mut persistence, &one, Command::AddHazard { hazard: hazard(2, 2) });
    let removed: WorkPermit = execute(&mut persistence, &two, Command::RemoveHazard { hazard_id: 2 });
    assert_eq!(removed.hazards().next_id(), 2);

    let result: TransitionResult =
        apply_command(&removed, Command::AddHazard { hazard: hazard(3, 3) });
    assert_eq!(result.child_id, Some(3));
}

#[test]
fn test_delete_removes_permit_but_keeps_audit_trail() {
    let mut persistence: Persistence = Persistence::new_in_memory().unwrap();
    let draft: WorkPermit = store_draft(&mut persistence, PermitType::General);
    let with_hazard: WorkPermit = execute(
        &mut persistence,
        &draft,
        Command::AddHazard { hazard: hazard(2, 3) },
    );
    let permit_id: i64 = with_hazard.id().unwrap();

    let stale = persistence.delete_permit(permit_id, 1, &deletion_event(&with_hazard));
    assert!(matches!(
        stale,
        Err(PersistenceError::ConcurrencyConflict { .. })
    ));

    persistence
        .delete_permit(permit_id, with_hazard.version(), &deletion_event(&with_hazard))
        .unwrap();

    assert_eq!(
        persistence.load_permit(permit_id),
        Err(PersistenceError::PermitNotFound(permit_id))
    );
    let timeline = persistence
        .get_audit_timeline(with_hazard.permit_number())
        .unwrap();
    let names: Vec<&str> = timeline.iter().map(|e| e.action.name.as_str()).collect();
    assert_eq!(names, vec!["CreatePermit", "AddHazard", "DeletePermit"]);
    assert!(timeline.iter().all(|e| e.permit_id.is_none()));
}

#[test]
fn test_save_of_deleted_permit_is_not_found() {
    let mut persistence: Persistence = Persistence::new_in_memory().unwrap();
    let draft: WorkPermit = store_draft(&mut persistence, PermitType::General);
    persistence
        .delete_permit(draft.id().unwrap(), 1, &deletion_event(&draft))
        .unwrap();

    let late: TransitionResult = apply_command(&draft, Command::AddHazard { hazard: hazard(1, 1) });
    assert_eq!(
        persistence.persist_transition(&late).unwrap_err(),
        PersistenceError::PermitNotFound(draft.id().unwrap())
    );
}

#[test]
fn test_list_filters_by_status_type_and_requestor() {
    let mut persistence: Persistence = Persistence::new_in_memory().unwrap();
    store_draft(&mut persistence, PermitType::General);
    let other: WorkPermit = store(
        &mut persistence,
        details(PermitType::ColdWork, "u-200"),
        PermitOptions::default(),
    );
    submitted(&mut persistence);

    let all: Vec<PermitSummary> = persistence.list_permits(&PermitQuery::default()).unwrap();
    assert_eq!(all.len(), 3);

    let drafts: Vec<PermitSummary> = persistence
        .list_permits(&PermitQuery {
            status: Some(PermitStatus::Draft),
            ..PermitQuery::default()
        })
        .unwrap();
    assert_eq!(drafts.len(), 2);

    let cold: Vec<PermitSummary> = persistence
        .list_permits(&PermitQuery {
            permit_type: Some(PermitType::ColdWork),
            ..PermitQuery::default()
        })
        .unwrap();
    assert_eq!(cold.len(), 1);
    assert_eq!(&cold[0].permit_number, other.permit_number());

    let by_requestor: Vec<PermitSummary> = persistence
        .list_permits(&PermitQuery {
            requestor_id: Some(String::from("u-200")),
            ..PermitQuery::default()
        })
        .unwrap();
    assert_eq!(by_requestor.len(), 1);
    assert_eq!(by_requestor[0].requestor_id, "u-200");

    let limited: Vec<PermitSummary> = persistence
        .list_permits(&PermitQuery {
            limit: Some(1),
            ..PermitQuery::default()
        })
        .unwrap();
    assert_eq!(limited.len(), 1);
}

#[test]
fn test_load_by_number() {
    let mut persistence: Persistence = Persistence::new_in_memory().unwrap();
    let draft: WorkPermit = store_draft(&mut persistence, PermitType::General);
    let loaded: WorkPermit = persistence
        .load_permit_by_number(draft.permit_number())
        .unwrap();
    assert_eq!(loaded, draft);

    let missing = persistence.load_permit_by_number(&"WP-209912-0001".parse().unwrap());
    assert!(missing.unwrap_err().is_not_found());
}
