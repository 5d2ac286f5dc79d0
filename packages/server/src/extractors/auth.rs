use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::files::FileError;
use crate::state::AppState;
use crate::utils::jwt;

/// Authenticated caller as asserted by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
    pub org_id: Option<String>,
}

/// A caller that belongs to an organization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tenant {
    pub identity: String,
    /// Organization id; keys the caller's knowledge namespace.
    pub id: String,
}

/// Per-request authentication context extracted from the
/// `Authorization: Bearer <token>` header.
///
/// A missing header is not rejected here; workflows decide via
/// [`RequestContext::resolve_tenant`]. A header with a bad token is.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    pub identity: Option<Identity>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self { identity: None }
    }

    pub fn for_identity(subject: impl Into<String>, org_id: Option<&str>) -> Self {
        Self {
            identity: Some(Identity {
                subject: subject.into(),
                org_id: org_id.map(str::to_owned),
            }),
        }
    }

    /// Resolve the caller's tenant.
    pub fn resolve_tenant(&self) -> Result<Tenant, FileError> {
        let identity = self
            .identity
            .as_ref()
            .ok_or(FileError::Unauthorized("Identity not found"))?;

        let org_id = identity
            .org_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(FileError::Unauthorized("Organization not found"))?;

        Ok(Tenant {
            identity: identity.subject.clone(),
            id: org_id.to_string(),
        })
    }
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(auth_header) = parts.headers.get("Authorization") else {
            return Ok(Self::anonymous());
        };

        let token = auth_header
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(AppError::TokenInvalid)?;

        let claims = jwt::verify(token, &state.config.auth.jwt_secret)
            .map_err(|_| AppError::TokenInvalid)?;

        Ok(Self {
            identity: Some(Identity {
                subject: claims.sub,
                org_id: claims.org_id,
            }),
        })
    }
}
