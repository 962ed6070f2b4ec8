// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Identity of the user acting on a permit.
//!
//! The workflow does not authenticate anyone itself. An `IdentityProvider`
//! supplied by the caller resolves who is acting, and that identity is used
//! for requestor snapshots, lifecycle actors and audit attribution.

use hse_permit_audit::Actor;
use hse_permit_domain::{PersonRef, RequestorSnapshot};

use crate::error::ApiError;

/// The resolved acting user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
    pub department: String,
    pub position: Option<String>,
    pub phone: Option<String>,
}

impl CurrentUser {
    /// Creates an acting user.
    ///
    /// # Arguments
    ///
    /// * `id` - The user's identifier
    /// * `name` - The user's display name
    /// * `department` - The user's department
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationFailed` if any of the values is blank.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        department: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let user: Self = Self {
            id: id.into().trim().to_string(),
            name: name.into().trim().to_string(),
            department: department.into().trim().to_string(),
            position: None,
            phone: None,
        };

        for (label, value) in [
            ("user id", &user.id),
            ("user name", &user.name),
            ("department", &user.department),
        ] {
            if value.is_empty() {
                return Err(ApiError::AuthenticationFailed {
                    reason: format!("No {label} supplied"),
                });
            }
        }
        Ok(user)
    }

    #[must_use]
    pub fn with_position(mut self, position: Option<String>) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub fn with_phone(mut self, phone: Option<String>) -> Self {
        self.phone = phone;
        self
    }

    /// Converts this user into an audit actor.
    #[must_use]
    pub fn to_audit_actor(&self) -> Actor {
        Actor::new(self.id.clone(), String::from("user"))
    }

    /// The reference recorded on lifecycle events, completions and verifications.
    #[must_use]
    pub fn to_person_ref(&self) -> PersonRef {
        PersonRef::new(self.id.clone(), self.name.clone())
    }

    /// The snapshot frozen onto a new permit as its requestor.
    #[must_use]
    pub fn to_requestor_snapshot(&self) -> RequestorSnapshot {
        RequestorSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            department: self.department.clone(),
            position: self.position.clone(),
            phone: self.phone.clone(),
        }
    }
}

/// Resolves the acting user for a request.
pub trait IdentityProvider {
    /// Returns the acting user.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationFailed` if no user can be resolved.
    fn current_user(&self) -> Result<CurrentUser, ApiError>;
}

/// An identity provider that always returns the same user.
#[derive(Debug, Clone)]
pub struct StaticIdentity(pub CurrentUser);

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Result<CurrentUser, ApiError> {
        Ok(self.0.clone())
    }
}
