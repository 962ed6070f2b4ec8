// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use super::helpers::{
    approve_request, approver, create_draft, create_request, ctx, service, submitted_general,
    user,
};
use crate::{
    ApiError, AuditTimelineResponse, ListPermitsRequest, ListPermitsResponse, PermitResponse,
    RequestContext,
};

#[test]
fn test_list_filters_by_status_type_and_requestor() {
    let (mut service, _) = service();
    let submitted: i64 = submitted_general(&mut service);
    create_draft(&mut service, "General");
    let other_ctx: RequestContext =
        RequestContext::new(user("u-200", "Budi Santoso"), ctx().cause);
    service
        .create_permit(&other_ctx, &create_request("ColdWork"))
        .unwrap();

    let all: ListPermitsResponse = service.list_permits(&ListPermitsRequest::default()).unwrap();
    assert_eq!(all.permits.len(), 3);

    let by_status: ListPermitsResponse = service
        .list_permits(&ListPermitsRequest {
            status: Some(String::from("Submitted")),
            ..ListPermitsRequest::default()
        })
        .unwrap();
    assert_eq!(by_status.permits.len(), 1);
    assert_eq!(by_status.permits[0].permit_id, submitted);

    let by_type: ListPermitsResponse = service
        .list_permits(&ListPermitsRequest {
            permit_type: Some(String::from("ColdWork")),
            ..ListPermitsRequest::default()
        })
        .unwrap();
    assert_eq!(by_type.permits.len(), 1);
    assert_eq!(by_type.permits[0].requestor_name, "Budi Santoso");

    let by_requestor: ListPermitsResponse = service
        .list_permits(&ListPermitsRequest {
            requestor_id: Some(String::from("u-100")),
            limit: Some(1),
            ..ListPermitsRequest::default()
        })
        .unwrap();
    assert_eq!(by_requestor.permits.len(), 1);
    assert_eq!(by_requestor.permits[0].requestor_id, "u-100");
}

#[test]
fn test_list_rejects_bad_filters() {
    let (mut service, _) = service();

    let status: ApiError = service
        .list_permits(&ListPermitsRequest {
            status: Some(String::from("Pending")),
            ..ListPermitsRequest::default()
        })
        .unwrap_err();
    assert!(matches!(status, ApiError::ValidationFailure { .. }));

    let limit: ApiError = service
        .list_permits(&ListPermitsRequest {
            limit: Some(0),
            ..ListPermitsRequest::default()
        })
        .unwrap_err();
    assert!(matches!(
        limit,
        ApiError::ValidationFailure { ref field, .. } if field == "limit"
    ));
}

#[test]
fn test_get_permit_by_number() {
    let (mut service, _) = service();
    let id: i64 = create_draft(&mut service, "General");
    let number: String = service.get_permit(id).unwrap().permit_number;

    let permit: PermitResponse = service.get_permit_by_number(&number).unwrap();
    assert_eq!(permit.permit_id, id);

    let missing: ApiError = service.get_permit_by_number("WP-209912-0001").unwrap_err();
    assert!(matches!(
        missing,
        ApiError::NotFound { ref resource_type, .. } if resource_type == "Permit"
    ));

    let malformed: ApiError = service.get_permit_by_number("permit-1").unwrap_err();
    assert!(matches!(
        malformed,
        ApiError::ValidationFailure { ref field, .. } if field == "permit_number"
    ));
}

#[test]
fn test_unknown_permit_is_not_found() {
    let (mut service, _) = service();

    let err: ApiError = service.get_approval_status(404).unwrap_err();

    assert!(matches!(
        err,
        ApiError::NotFound { ref resource_type, .. } if resource_type == "Permit"
    ));
}

#[test]
fn test_audit_timeline_attributes_each_actor() {
    let (mut service, _) = service();
    let id: i64 = submitted_general(&mut service);
    service
        .approve(id, &approver("Supervisor"), &approve_request("Supervisor"))
        .unwrap();

    let timeline: AuditTimelineResponse = service.get_permit_audit_timeline(id).unwrap();

    let actions: Vec<&str> = timeline.events.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(
        actions,
        vec!["CreatePermit", "AddHazard", "SubmitForApproval", "Approve"]
    );
    assert!(timeline.events[..3].iter().all(|e| e.actor_id == "u-100"));
    assert_eq!(timeline.events[3].actor_id, "approver-Supervisor");
    assert!(timeline.events.iter().all(|e| e.cause_id == "api-req-1"));
    assert!(
        timeline.events[3]
            .details
            .as_deref()
            .is_some_and(|d| d.contains("progress 100%"))
    );
}

#[test]
fn test_timeline_of_unused_number_is_not_found() {
    let (mut service, _) = service();

    let err: ApiError = service.get_audit_timeline("WP-209912-0042").unwrap_err();

    assert!(matches!(err, ApiError::NotFound { .. }));
}
