use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::{
    auth::{errors::AuthError, jwt::JwtKeys},
    state::AppState,
    users::PublicUser,
};

/// Extracts and validates a bearer JWT, resolving it to an active user.
pub struct AuthUser(pub PublicUser);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::Unauthorized("missing Authorization header"))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or(AuthError::Unauthorized("invalid auth scheme"))?;

        let claims = JwtKeys::from_ref(state).verify(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AuthError::Unauthorized("invalid or expired token")
        })?;

        let user = match state.auth.find_user_by_id(claims.id).await {
            Ok(u) => u,
            Err(AuthError::NotFound) => {
                warn!(user_id = %claims.id, "token for missing user");
                return Err(AuthError::Unauthorized("user does not exist"));
            }
            Err(e) => return Err(e),
        };

        if !user.is_active {
            warn!(user_id = %user.id, "token for inactive user");
            return Err(AuthError::Unauthorized("user is inactive"));
        }

        Ok(AuthUser(user))
    }
}
