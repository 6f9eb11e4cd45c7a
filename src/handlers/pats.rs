use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::AuthUser;
use crate::auth::scopes::is_valid_scope;
use crate::auth::tokens;
use crate::db::queries::personal_tokens;
use crate::db::{decode_list, encode_list};
use crate::error::AppError;
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct CreatePatRequest {
    pub name: String,
    pub scopes: Vec<String>,
    pub expires_in_days: Option<i64>,
}

/// Creation response; the only time the raw token is visible.
#[derive(Debug, Serialize)]
pub struct CreatedPatResponse {
    pub id: String,
    pub token: String,
    pub token_prefix: String,
    pub name: String,
    pub scopes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PatResponse {
    pub id: String,
    pub token_prefix: String,
    pub name: String,
    pub scopes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<String>,
    pub created_at: String,
}

// --- Handlers ---

pub async fn create_pat(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreatePatRequest>,
) -> Result<(StatusCode, Json<CreatedPatResponse>), AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }
    if req.scopes.is_empty() || req.scopes.iter().any(|s| !is_valid_scope(s)) {
        return Err(AppError::InvalidScope);
    }
    if let Some(days) = req.expires_in_days {
        if days <= 0 {
            return Err(AppError::BadRequest(
                "expires_in_days must be positive".to_string(),
            ));
        }
    }

    let pat = tokens::new_personal_token();
    let expires_at = req
        .expires_in_days
        .map(|days| (Utc::now() + Duration::days(days)).naive_utc());

    let stored = personal_tokens::insert(
        &state.db,
        &tokens::hash_token(&pat.token),
        &user.user_id,
        req.name.trim(),
        &pat.display_prefix,
        &encode_list(&req.scopes),
        expires_at,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedPatResponse {
            id: stored.id,
            token: pat.token,
            token_prefix: stored.token_prefix,
            name: stored.name,
            scopes: req.scopes,
            expires_at: stored.expires_at.map(|t| t.to_string()),
        }),
    ))
}

pub async fn list_pats(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<PatResponse>>, AppError> {
    let pats = personal_tokens::list_for_owner(&state.db, &user.user_id).await?;

    Ok(Json(
        pats.into_iter()
            .map(|p| PatResponse {
                id: p.id,
                token_prefix: p.token_prefix,
                name: p.name,
                scopes: decode_list(&p.scopes),
                expires_at: p.expires_at.map(|t| t.to_string()),
                last_used_at: p.last_used_at.map(|t| t.to_string()),
                created_at: p.created_at.to_string(),
            })
            .collect(),
    ))
}

pub async fn delete_pat(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    personal_tokens::delete_for_owner(&state.db, &id, &user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
