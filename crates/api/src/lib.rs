// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Workflow orchestration for HSE work permits.
//!
//! This crate sits between transport and the permit core. It resolves who is
//! acting, turns requests into commands, commits results through the record
//! store with retry, keeps attachment bytes in step with attachment records,
//! and translates every lower-layer error into [`ApiError`].

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::multiple_crate_versions)]

mod attachments;
mod cancellation;
mod error;
mod handlers;
mod identity;
mod request_response;
mod retry;
mod service;
mod views;

#[cfg(test)]
mod tests;

pub use attachments::{
    AttachmentStore, AttachmentStoreError, FsAttachmentStore, generate_storage_key,
};
pub use cancellation::CancellationSignal;
pub use error::{
    ApiError, translate_core_error, translate_domain_error, translate_persistence_error,
};
pub use handlers::MAX_ATTACHMENT_BYTES;
pub use identity::{CurrentUser, IdentityProvider, StaticIdentity};
pub use request_response::{
    AddAttachmentRequest, ApprovalInfo, ApprovalStatusResponse, ApproveRequest,
    AttachmentContent, AttachmentInfo, AuditEventInfo, AuditTimelineResponse, CancelRequest,
    CompletePrecautionRequest, CompleteWorkRequest, CompletionInfo, CreatePermitRequest,
    DeletePermitResponse, HazardInfo, HazardRequest, ImplementControlsRequest,
    LifecycleEventInfo, ListPermitsRequest, ListPermitsResponse, PermitResponse,
    PermitSummaryInfo, PrecautionInfo, PrecautionRequest, RejectRequest, UpdatePermitRequest,
    WriteResponse,
};
pub use retry::RetryPolicy;
pub use service::{Executed, PermitService, RequestContext};
