//! Supabase access token authentication and organization access checks.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use studio_models::{Membership, Organization};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Decoded Supabase access token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseClaims {
    /// User ID
    pub sub: String,
    /// Email (if available)
    #[serde(default)]
    pub email: Option<String>,
    /// Audience
    pub aud: String,
    /// Expiration
    pub exp: i64,
    /// Postgres role the token maps to
    #[serde(default)]
    pub role: Option<String>,
}

/// Authenticated user extracted from request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub email: Option<String>,
}

impl From<SupabaseClaims> for AuthUser {
    fn from(claims: SupabaseClaims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
        }
    }
}

/// Verifies HS256 tokens signed with the project's JWT secret.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify_token(&self, token: &str) -> ApiResult<SupabaseClaims> {
        let data = decode::<SupabaseClaims>(token, &self.key, &self.validation).map_err(|e| {
            debug!("Rejected access token: {}", e);
            ApiError::unauthorized(format!("Token validation failed: {}", e))
        })?;
        Ok(data.claims)
    }
}

/// Axum extractor for authenticated user.
#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header format"))?;

        let claims = state.jwt.verify_token(token)?;
        Ok(AuthUser::from(claims))
    }
}

/// The caller's organization and role, resolved from the route's slug.
#[derive(Debug, Clone)]
pub struct OrgAccess {
    pub organization: Organization,
    pub membership: Membership,
}

impl OrgAccess {
    /// Resolve `slug` and require that `user` is a member.
    ///
    /// An unknown slug is 404; a known organization the user does not
    /// belong to is 403.
    pub async fn resolve(state: &AppState, user: &AuthUser, slug: &str) -> ApiResult<Self> {
        let store = state.ctx.store.as_ref();
        let organization = store
            .organization_by_slug(slug)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("organization {}", slug)))?;
        let membership = store
            .membership(&organization.id, &user.user_id)
            .await?
            .ok_or_else(|| ApiError::forbidden("Not a member of this organization"))?;
        Ok(Self {
            organization,
            membership,
        })
    }

    /// Require a role that may manage finished outputs.
    pub fn require_manager(&self) -> ApiResult<()> {
        if self.membership.role.can_manage() {
            Ok(())
        } else {
            Err(ApiError::forbidden(
                "Only owners and admins can regenerate outputs",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(secret: &str, aud: &str, exp: i64) -> String {
        let claims = SupabaseClaims {
            sub: "user-1".into(),
            email: Some("editor@example.com".into()),
            aud: aud.into(),
            exp,
            role: Some("authenticated".into()),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn in_an_hour() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[test]
    fn test_accepts_valid_token() {
        let verifier = JwtVerifier::new("secret", "authenticated");
        let claims = verifier
            .verify_token(&token("secret", "authenticated", in_an_hour()))
            .unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(AuthUser::from(claims).email.as_deref(), Some("editor@example.com"));
    }

    #[test]
    fn test_rejects_wrong_secret_audience_and_expiry() {
        let verifier = JwtVerifier::new("secret", "authenticated");
        assert!(verifier
            .verify_token(&token("other", "authenticated", in_an_hour()))
            .is_err());
        assert!(verifier
            .verify_token(&token("secret", "anon", in_an_hour()))
            .is_err());
        assert!(verifier
            .verify_token(&token("secret", "authenticated", 1_000))
            .is_err());
    }
}
