// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Error types for the API layer.

use hse_permit::CoreError;
use hse_permit_domain::DomainError;
use hse_permit_persistence::PersistenceError;

use crate::attachments::AttachmentStoreError;

/// API-level errors.
///
/// These are distinct from domain, core and persistence errors and represent
/// the API contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The caller's identity could not be established.
    AuthenticationFailed {
        /// The reason authentication failed.
        reason: String,
    },
    /// A referenced permit, hazard, precaution, attachment or event does not exist.
    NotFound {
        /// The kind of resource that was not found.
        resource_type: String,
        /// A human-readable description of what was not found.
        message: String,
    },
    /// The operation is not allowed in the permit's current status.
    InvalidTransition {
        /// A human-readable description of the rejected transition.
        message: String,
    },
    /// The request violated a structural or business rule.
    ValidationFailure {
        /// The field the failure is about.
        field: String,
        /// A human-readable description of the failure.
        message: String,
    },
    /// The permit changed since it was read.
    ConcurrencyConflict {
        /// The permit whose version did not match.
        permit_id: i64,
    },
    /// The record store was locked by another connection.
    StorageBusy {
        /// A description of the failure.
        message: String,
    },
    /// The record store failed.
    StorageFailure {
        /// A description of the failure.
        message: String,
    },
    /// The attachment store failed.
    IoFailure {
        /// A description of the failure.
        message: String,
    },
    /// The caller cancelled the request before any change was committed.
    Cancelled,
}

impl ApiError {
    /// Returns true if repeating the operation may succeed.
    ///
    /// Only version conflicts and lock contention qualify. Other storage
    /// and I/O failures would fail the same way again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrencyConflict { .. } | Self::StorageBusy { .. }
        )
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthenticationFailed { reason } => {
                write!(f, "Authentication failed: {reason}")
            }
            Self::NotFound {
                resource_type,
                message,
            } => {
                write!(f, "{resource_type} not found: {message}")
            }
            Self::InvalidTransition { message } => write!(f, "Invalid transition: {message}"),
            Self::ValidationFailure { field, message } => {
                write!(f, "Invalid input for field '{field}': {message}")
            }
            Self::ConcurrencyConflict { permit_id } => {
                write!(
                    f,
                    "Permit {permit_id} was modified by another request; reload and try again"
                )
            }
            Self::StorageBusy { message } => write!(f, "Storage busy: {message}"),
            Self::StorageFailure { message } => write!(f, "Storage failure: {message}"),
            Self::IoFailure { message } => write!(f, "Attachment storage failure: {message}"),
            Self::Cancelled => write!(f, "Request cancelled"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<AttachmentStoreError> for ApiError {
    fn from(err: AttachmentStoreError) -> Self {
        match err {
            AttachmentStoreError::NotFound { .. } => Self::NotFound {
                resource_type: String::from("Attachment content"),
                message: err.to_string(),
            },
            AttachmentStoreError::InvalidKey(_) | AttachmentStoreError::Io { .. } => {
                Self::IoFailure {
                    message: err.to_string(),
                }
            }
        }
    }
}

/// Translates a domain error into an API error.
///
/// This translation is explicit and ensures domain errors are not leaked directly.
#[must_use]
pub fn translate_domain_error(err: DomainError) -> ApiError {
    if err.is_not_found() {
        let resource_type: &str = match err {
            DomainError::HazardNotFound(_) => "Hazard",
            DomainError::PrecautionNotFound(_) => "Precaution",
            _ => "Attachment",
        };
        return ApiError::NotFound {
            resource_type: resource_type.to_string(),
            message: err.to_string(),
        };
    }

    if err.is_invalid_transition() {
        return ApiError::InvalidTransition {
            message: err.to_string(),
        };
    }

    ApiError::ValidationFailure {
        field: err.field().to_string(),
        message: err.to_string(),
    }
}

/// Translates a core error into an API error.
#[must_use]
pub fn translate_core_error(err: CoreError) -> ApiError {
    match err {
        CoreError::DomainViolation(domain_err) => translate_domain_error(domain_err),
    }
}

/// Translates a persistence error into an API error.
#[must_use]
pub fn translate_persistence_error(err: PersistenceError) -> ApiError {
    match err {
        PersistenceError::PermitNotFound(id) => ApiError::NotFound {
            resource_type: String::from("Permit"),
            message: format!("Permit {id} does not exist"),
        },
        PersistenceError::EventNotFound(id) => ApiError::NotFound {
            resource_type: String::from("Audit event"),
            message: format!("Audit event {id} does not exist"),
        },
        PersistenceError::NotFound(message) => ApiError::NotFound {
            resource_type: String::from("Record"),
            message,
        },
        PersistenceError::ConcurrencyConflict { permit_id, .. } => {
            ApiError::ConcurrencyConflict { permit_id }
        }
        other if other.is_busy() => ApiError::StorageBusy {
            message: other.to_string(),
        },
        other => ApiError::StorageFailure {
            message: other.to_string(),
        },
    }
}
