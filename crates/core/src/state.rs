// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::permit::WorkPermit;
use hse_permit_audit::AuditEvent;

/// The result of a successful permit command.
///
/// Transitions are atomic: they either succeed completely or fail without side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    /// The permit after the command.
    pub new_permit: WorkPermit,
    /// The audit event recording this command.
    pub audit_event: AuditEvent,
    /// The id of the hazard, precaution or attachment the command created,
    /// updated or removed, if any.
    pub child_id: Option<u32>,
}

/// The result of creating a permit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationResult {
    /// The new Draft permit, not yet stored.
    pub permit: WorkPermit,
    /// The audit event recording the creation.
    pub audit_event: AuditEvent,
}
