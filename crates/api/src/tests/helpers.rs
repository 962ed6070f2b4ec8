// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Test helper functions and fixtures.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hse_permit_audit::Cause;
use hse_permit_domain::ApprovalPolicy;
use hse_permit_persistence::Persistence;
use time::macros::datetime;

use crate::{
    AttachmentStore, AttachmentStoreError, CreatePermitRequest, CurrentUser, HazardRequest,
    PermitService, PrecautionRequest, RequestContext, RetryPolicy,
};

type Files = BTreeMap<(i64, String), Vec<u8>>;

/// An attachment store that keeps bytes in memory and can be told to fail.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: Arc<Mutex<Files>>,
    fail_saves: Arc<Mutex<bool>>,
    fail_deletes: Arc<Mutex<bool>>,
}

impl MemoryStore {
    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    pub fn fail_saves(&self) {
        *self.fail_saves.lock().unwrap() = true;
    }

    pub fn fail_deletes(&self) {
        *self.fail_deletes.lock().unwrap() = true;
    }

    fn io_failure(path: String) -> AttachmentStoreError {
        AttachmentStoreError::Io {
            path,
            source: std::io::Error::other("simulated failure"),
        }
    }
}

impl AttachmentStore for MemoryStore {
    fn save(
        &self,
        permit_id: i64,
        storage_key: &str,
        bytes: &[u8],
    ) -> Result<(), AttachmentStoreError> {
        if *self.fail_saves.lock().unwrap() {
            return Err(Self::io_failure(storage_key.to_string()));
        }
        self.files
            .lock()
            .unwrap()
            .insert((permit_id, storage_key.to_string()), bytes.to_vec());
        Ok(())
    }

    fn read(&self, permit_id: i64, storage_key: &str) -> Result<Vec<u8>, AttachmentStoreError> {
        self.files
            .lock()
            .unwrap()
            .get(&(permit_id, storage_key.to_string()))
            .cloned()
            .ok_or_else(|| AttachmentStoreError::NotFound {
                permit_id,
                storage_key: storage_key.to_string(),
            })
    }

    fn delete(&self, permit_id: i64, storage_key: &str) -> Result<(), AttachmentStoreError> {
        if *self.fail_deletes.lock().unwrap() {
            return Err(Self::io_failure(storage_key.to_string()));
        }
        self.files
            .lock()
            .unwrap()
            .remove(&(permit_id, storage_key.to_string()))
            .map(|_| ())
            .ok_or_else(|| AttachmentStoreError::NotFound {
                permit_id,
                storage_key: storage_key.to_string(),
            })
    }
}

pub fn create_test_cause() -> Cause {
    Cause::new(String::from("api-req-1"), String::from("API request"))
}

pub fn user(id: &str, name: &str) -> CurrentUser {
    CurrentUser::new(id, name, "Maintenance").unwrap()
}

/// The requestor's context.
pub fn ctx() -> RequestContext {
    RequestContext::new(user("u-100", "Dewi Lestari"), create_test_cause())
}

/// A context for an approver signing at `level`.
pub fn approver(level: &str) -> RequestContext {
    RequestContext::new(
        user(&format!("approver-{level}"), &format!("{level} on duty")),
        create_test_cause(),
    )
}

pub fn service() -> (PermitService, MemoryStore) {
    let store: MemoryStore = MemoryStore::default();
    let service: PermitService = PermitService::new(
        Persistence::new_in_memory().unwrap(),
        ApprovalPolicy::default(),
        Box::new(store.clone()),
    )
    .unwrap()
    .with_retry_policy(RetryPolicy {
        max_attempts: 3,
        initial_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    });
    (service, store)
}

pub fn create_request(permit_type: &str) -> CreatePermitRequest {
    CreatePermitRequest {
        title: String::from("Replace pump seal"),
        description: String::from("Replace leaking seal on cooling water pump P-101"),
        permit_type: permit_type.to_string(),
        location: String::from("Utility area, Plant 2"),
        planned_start: datetime!(2026-03-03 07:00 UTC),
        planned_end: datetime!(2026-03-03 17:00 UTC),
        number_of_workers: 3,
        contractor_company: None,
        equipment: None,
        safety: hse_permit_domain::SafetyRequirements::default(),
        compliance: hse_permit_domain::ComplianceInfo::default(),
        risk_assessment: None,
        emergency_procedures: None,
        priority: None,
    }
}

pub fn hazard_request(likelihood: u8, severity: u8) -> HazardRequest {
    HazardRequest {
        description: String::from("Pressurised line"),
        category: String::from("Mechanical"),
        likelihood,
        severity,
        control_measures: String::from("Depressurise and lock out"),
        responsible_person: None,
    }
}

pub fn precaution_request(is_required: bool) -> PrecautionRequest {
    PrecautionRequest {
        description: String::from("Lock out / tag out"),
        category: String::from("Isolation"),
        is_required,
        priority: 1,
        responsible_person: None,
        verification_method: None,
        requires_verification: false,
        is_k3_requirement: false,
        k3_standard_reference: None,
        is_mandatory_by_law: false,
    }
}

/// Creates a draft and returns its id.
pub fn create_draft(service: &mut PermitService, permit_type: &str) -> i64 {
    service
        .create_permit(&ctx(), &create_request(permit_type))
        .unwrap()
        .permit_id
}

/// A General permit with one hazard, submitted.
pub fn submitted_general(service: &mut PermitService) -> i64 {
    let id: i64 = create_draft(service, "General");
    service.add_hazard(id, &ctx(), &hazard_request(2, 2)).unwrap();
    service.submit(id, &ctx()).unwrap();
    id
}

/// A General permit approved by its supervisor.
pub fn approved_general(service: &mut PermitService) -> i64 {
    let id: i64 = submitted_general(service);
    service
        .approve(id, &approver("Supervisor"), &approve_request("Supervisor"))
        .unwrap();
    id
}

pub fn approve_request(level: &str) -> crate::ApproveRequest {
    crate::ApproveRequest {
        level: level.to_string(),
        comments: None,
        k3_certificate_number: None,
        authority_level: None,
    }
}
