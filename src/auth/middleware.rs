use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::auth::tokens::{self, PAT_PREFIX};
use crate::db::decode_list;
use crate::db::queries::{personal_tokens, users};
use crate::error::AppError;

/// The principal every protected route sees, resolved from either a
/// personal access token or a session JWT. Both paths fail with the same
/// generic rejection so the response never reveals which credential class
/// was attempted.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub username: String,
    pub scopes: Vec<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync + AsRef<crate::AppState>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state: &crate::AppState = state.as_ref();

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthorized)?;

        if token.starts_with(PAT_PREFIX) {
            authenticate_pat(app_state, token).await
        } else {
            let claims = app_state
                .jwt
                .verify_session_token(token)
                .map_err(|_| AppError::Unauthorized)?;
            Ok(AuthUser {
                user_id: claims.sub,
                username: claims.username,
                scopes: claims.scopes,
            })
        }
    }
}

async fn authenticate_pat(
    state: &crate::AppState,
    raw_token: &str,
) -> Result<AuthUser, AppError> {
    let token_hash = tokens::hash_token(raw_token);
    let pat = personal_tokens::find_by_hash(&state.db, &token_hash)
        .await
        .map_err(|_| AppError::Unauthorized)?
        .ok_or(AppError::Unauthorized)?;

    if let Some(expires_at) = pat.expires_at {
        if expires_at < chrono::Utc::now().naive_utc() {
            return Err(AppError::Unauthorized);
        }
    }

    let user = users::find_by_id(&state.db, &pat.user_id)
        .await
        .map_err(|_| AppError::Unauthorized)?
        .ok_or(AppError::Unauthorized)?;

    if !user.is_active {
        return Err(AppError::Unauthorized);
    }

    // Best-effort watermark; a write failure must not fail authentication.
    if let Err(e) = personal_tokens::touch_last_used(&state.db, &pat.id).await {
        tracing::debug!("failed to update PAT last_used_at: {e}");
    }

    Ok(AuthUser {
        user_id: user.id,
        username: user.username,
        scopes: decode_list(&pat.scopes),
    })
}
