// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! The permit workflow service.
//!
//! Every state-changing operation follows the same path: check for
//! cancellation, load the permit, build the command, apply it, check for
//! cancellation again, then commit the new permit and its audit event in one
//! store transaction. Retryable failures repeat the whole path against a
//! freshly loaded permit.

use hse_permit::{Command, TransitionResult, WorkPermit, apply};
use hse_permit_audit::Cause;
use hse_permit_domain::ApprovalPolicy;
use hse_permit_persistence::{PersistedPermit, Persistence};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::attachments::AttachmentStore;
use crate::cancellation::CancellationSignal;
use crate::error::{
    ApiError, translate_core_error, translate_domain_error, translate_persistence_error,
};
use crate::identity::CurrentUser;
use crate::request_response::WriteResponse;
use crate::retry::RetryPolicy;

/// Who is acting, why, and whether they have given up.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: CurrentUser,
    pub cause: Cause,
    pub cancellation: CancellationSignal,
}

impl RequestContext {
    /// Creates a context with a fresh, uncancelled signal.
    #[must_use]
    pub fn new(user: CurrentUser, cause: Cause) -> Self {
        Self {
            user,
            cause,
            cancellation: CancellationSignal::new(),
        }
    }

    /// Replaces the cancellation signal with one the caller holds.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationSignal) -> Self {
        self.cancellation = cancellation;
        self
    }
}

/// A committed command.
#[derive(Debug, Clone)]
pub struct Executed {
    pub result: TransitionResult,
    pub persisted: PersistedPermit,
}

impl Executed {
    /// The stored permit after the command.
    #[must_use]
    pub fn permit(&self) -> WorkPermit {
        let mut permit: WorkPermit = self.result.new_permit.clone();
        permit.mark_persisted(self.persisted.permit_id, self.persisted.version);
        permit
    }

    #[must_use]
    pub fn into_write_response(self) -> WriteResponse {
        let permit: &WorkPermit = &self.result.new_permit;
        let action = self.result.audit_event.action;
        WriteResponse {
            permit_id: self.persisted.permit_id,
            permit_number: permit.permit_number().to_string(),
            version: self.persisted.version,
            status: permit.status().to_string(),
            event_id: self.persisted.event_id,
            child_id: self.result.child_id,
            message: action.details.unwrap_or(action.name),
        }
    }
}

/// Orchestrates permit commands against the record and attachment stores.
pub struct PermitService {
    pub(crate) persistence: Persistence,
    pub(crate) policy: ApprovalPolicy,
    pub(crate) attachments: Box<dyn AttachmentStore>,
    pub(crate) retry: RetryPolicy,
}

impl PermitService {
    /// Creates a service.
    ///
    /// # Arguments
    ///
    /// * `persistence` - The record store
    /// * `policy` - The approval policy in force
    /// * `attachments` - Where attachment bytes are kept
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailure` if the approval policy is invalid.
    pub fn new(
        persistence: Persistence,
        policy: ApprovalPolicy,
        attachments: Box<dyn AttachmentStore>,
    ) -> Result<Self, ApiError> {
        policy.validate().map_err(translate_domain_error)?;
        info!(
            base_levels = ?policy.base_levels,
            "Permit service ready"
        );
        Ok(Self {
            persistence,
            policy,
            attachments,
            retry: RetryPolicy::default(),
        })
    }

    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub const fn policy(&self) -> &ApprovalPolicy {
        &self.policy
    }

    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Direct access to the record store.
    pub const fn persistence_mut(&mut self) -> &mut Persistence {
        &mut self.persistence
    }

    /// Loads a permit, translating store errors.
    pub(crate) fn load(&mut self, permit_id: i64) -> Result<WorkPermit, ApiError> {
        self.persistence
            .load_permit(permit_id)
            .map_err(translate_persistence_error)
    }

    /// Runs `operation`, repeating it while it fails with a retryable error
    /// and the retry policy allows another attempt.
    ///
    /// Backoff sleeps block the calling thread. Async callers must run the
    /// service on a blocking thread, as the HTTP server does.
    pub(crate) fn with_retry<T>(
        &mut self,
        permit_id: i64,
        mut operation: impl FnMut(&mut Self) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let mut attempt: u32 = 1;
        loop {
            match operation(self) {
                Err(err) if err.is_retryable() && self.retry.allows_another(attempt) => {
                    let delay: Duration = self.retry.delay_after(attempt);
                    warn!(
                        permit_id,
                        attempt,
                        error = %err,
                        ?delay,
                        "Retrying permit operation"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Applies a command built from the current permit and commits it.
    ///
    /// `build` is called once per attempt with the freshly loaded permit.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is cancelled, the permit does not
    /// exist, the command is rejected, or the commit fails after all retries.
    pub(crate) fn execute(
        &mut self,
        permit_id: i64,
        ctx: &RequestContext,
        build: impl Fn(&WorkPermit) -> Result<Command, ApiError>,
    ) -> Result<Executed, ApiError> {
        let executed: Executed = self.with_retry(permit_id, |service| {
            service.execute_once(permit_id, ctx, &build)
        })?;

        info!(
            permit_id,
            permit_number = %executed.result.new_permit.permit_number(),
            event_id = executed.persisted.event_id,
            actor_id = %ctx.user.id,
            action = %executed.result.audit_event.action.name,
            "Committed permit command"
        );
        Ok(executed)
    }

    fn execute_once(
        &mut self,
        permit_id: i64,
        ctx: &RequestContext,
        build: &impl Fn(&WorkPermit) -> Result<Command, ApiError>,
    ) -> Result<Executed, ApiError> {
        ctx.cancellation.check()?;
        let permit: WorkPermit = self.load(permit_id)?;
        let command: Command = build(&permit)?;
        debug!(permit_id, command = command.name(), "Applying permit command");

        let result: TransitionResult = apply(
            &permit,
            command,
            &self.policy,
            ctx.user.to_audit_actor(),
            ctx.cause.clone(),
            OffsetDateTime::now_utc(),
        )
        .map_err(translate_core_error)?;

        ctx.cancellation.check()?;
        let persisted: PersistedPermit = self
            .persistence
            .persist_transition(&result)
            .map_err(translate_persistence_error)?;

        Ok(Executed { result, persisted })
    }
}
