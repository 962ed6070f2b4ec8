// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Caller identity extraction for the server.
//!
//! Authentication happens in front of this server. The upstream gateway
//! forwards the authenticated user in `X-User-*` headers, and this module
//! turns them into the `RequestContext` every workflow operation needs.
//!
//! | Header | Required |
//! |---|---|
//! | `X-User-Id` | yes |
//! | `X-User-Name` | yes |
//! | `X-User-Department` | yes |
//! | `X-User-Position` | no |
//! | `X-User-Phone` | no |
//! | `X-Request-Id` | no, becomes the audit cause id |

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use hse_permit_api::{ApiError, CurrentUser, IdentityProvider, RequestContext};
use hse_permit_audit::Cause;
use tracing::{debug, warn};

use crate::{AppState, HttpError};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_DEPARTMENT_HEADER: &str = "x-user-department";
pub const USER_POSITION_HEADER: &str = "x-user-position";
pub const USER_PHONE_HEADER: &str = "x-user-phone";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Resolves the acting user from forwarded headers.
pub struct HeaderIdentity<'a> {
    headers: &'a HeaderMap,
}

impl<'a> HeaderIdentity<'a> {
    #[must_use]
    pub const fn new(headers: &'a HeaderMap) -> Self {
        Self { headers }
    }

    fn header(&self, name: &str) -> Result<Option<String>, ApiError> {
        self.headers
            .get(name)
            .map(|value| {
                value
                    .to_str()
                    .map(|v| v.trim().to_string())
                    .map_err(|_| ApiError::AuthenticationFailed {
                        reason: format!("Header {name} is not valid text"),
                    })
            })
            .transpose()
    }

    fn required(&self, name: &str) -> Result<String, ApiError> {
        self.header(name)?
            .ok_or_else(|| ApiError::AuthenticationFailed {
                reason: format!("Missing {name} header"),
            })
    }
}

impl IdentityProvider for HeaderIdentity<'_> {
    fn current_user(&self) -> Result<CurrentUser, ApiError> {
        let user: CurrentUser = CurrentUser::new(
            self.required(USER_ID_HEADER)?,
            self.required(USER_NAME_HEADER)?,
            self.required(USER_DEPARTMENT_HEADER)?,
        )?;
        Ok(user
            .with_position(self.header(USER_POSITION_HEADER)?.filter(|v| !v.is_empty()))
            .with_phone(self.header(USER_PHONE_HEADER)?.filter(|v| !v.is_empty())))
    }
}

/// Extractor for the acting user and the audit cause of a request.
///
/// Rejects the request with 401 Unauthorized when the identity headers are
/// missing or blank.
pub struct Caller(pub RequestContext);

impl FromRequestParts<AppState> for Caller {
    type Rejection = HttpError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity: HeaderIdentity<'_> = HeaderIdentity::new(&parts.headers);
        let user: CurrentUser = identity.current_user().map_err(|e| {
            warn!(error = %e, path = %parts.uri.path(), "Rejected request without identity");
            HttpError::from(e)
        })?;

        let cause_id: String = identity
            .header(REQUEST_ID_HEADER)?
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("http-{:016x}", rand::random::<u64>()));
        let cause: Cause = Cause::new(cause_id, format!("{} {}", parts.method, parts.uri.path()));

        debug!(
            actor_id = %user.id,
            cause_id = %cause.id,
            "Resolved caller"
        );
        Ok(Self(RequestContext::new(user, cause)))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map: HeaderMap = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_headers_resolve_to_user() {
        let map: HeaderMap = headers(&[
            (USER_ID_HEADER, "u-100"),
            (USER_NAME_HEADER, "Dewi Lestari"),
            (USER_DEPARTMENT_HEADER, "Maintenance"),
            (USER_POSITION_HEADER, "Technician"),
            (USER_PHONE_HEADER, " "),
        ]);

        let user: CurrentUser = HeaderIdentity::new(&map).current_user().unwrap();

        assert_eq!(user.id, "u-100");
        assert_eq!(user.position.as_deref(), Some("Technician"));
        assert_eq!(user.phone, None);
    }

    #[test]
    fn test_missing_department_fails_authentication() {
        let map: HeaderMap = headers(&[
            (USER_ID_HEADER, "u-100"),
            (USER_NAME_HEADER, "Dewi Lestari"),
        ]);

        let err: ApiError = HeaderIdentity::new(&map).current_user().unwrap_err();

        assert!(matches!(err, ApiError::AuthenticationFailed { .. }));
    }
}
