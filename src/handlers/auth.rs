use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::auth::password::{hash_password, validate_password, verify_password};
use crate::auth::scopes::SCOPES;
use crate::db::queries;
use crate::error::AppError;
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user_id: String,
    pub username: String,
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: String,
}

// --- Handlers ---

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let username = req.username.trim();
    if username.is_empty() {
        return Err(AppError::BadRequest("Username is required".to_string()));
    }
    validate_password(&req.password)?;

    if queries::users::find_by_username(&state.db, username)
        .await?
        .is_some()
        || queries::users::find_by_email(&state.db, &req.email)
            .await?
            .is_some()
    {
        return Err(AppError::UserAlreadyExists);
    }

    let password_hash = hash_password(&req.password)?;
    let user = queries::users::insert(
        &state.db,
        &Uuid::new_v4().to_string(),
        username,
        &req.email,
        &password_hash,
    )
    .await?;

    issue_session(&state, &user)
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let user = queries::users::find_by_username(&state.db, &req.username)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(&req.password, &user.password_hash)? {
        return Err(AppError::InvalidCredentials);
    }

    if !user.is_active {
        return Err(AppError::UserDisabled);
    }

    issue_session(&state, &user)
}

pub async fn me(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, AppError> {
    let db_user = queries::users::find_by_id(&state.db, &user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(ProfileResponse {
        id: db_user.id,
        username: db_user.username,
        email: db_user.email,
        created_at: db_user.created_at.to_string(),
    }))
}

fn issue_session(
    state: &AppState,
    user: &entity::user::Model,
) -> Result<Json<SessionResponse>, AppError> {
    // A first-party session carries the full scope set; narrowing is what
    // PATs and OAuth grants are for.
    let scopes: Vec<String> = SCOPES.iter().map(|s| s.to_string()).collect();
    let access_token = state
        .jwt
        .issue_session_token(&user.id, &user.username, scopes)?;

    Ok(Json(SessionResponse {
        user_id: user.id.clone(),
        username: user.username.clone(),
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt.session_token_expiry_secs(),
    }))
}
