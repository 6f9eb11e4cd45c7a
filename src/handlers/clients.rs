use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::AuthUser;
use crate::auth::scopes::is_valid_scope;
use crate::db::queries::clients::{self, ClientChanges, NewClient};
use crate::db::decode_list;
use crate::error::AppError;
use crate::AppState;

const MAX_REDIRECT_URIS: usize = 10;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct RegisterClientRequest {
    pub name: String,
    pub description: Option<String>,
    pub redirect_uris: Vec<String>,
    pub scopes: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub redirect_uris: Option<Vec<String>>,
    pub scopes: Option<Vec<String>>,
}

/// Registration response; the only place the raw secret ever appears.
#[derive(Debug, Serialize)]
pub struct RegisteredClientResponse {
    pub id: String,
    pub client_id: String,
    pub client_secret: String,
    pub name: String,
    pub description: Option<String>,
    pub redirect_uris: Vec<String>,
    pub scopes: Vec<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct ClientResponse {
    pub id: String,
    pub client_id: String,
    pub name: String,
    pub description: Option<String>,
    pub redirect_uris: Vec<String>,
    pub scopes: Vec<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct RegeneratedSecretResponse {
    pub client_secret: String,
}

impl From<entity::oauth_client::Model> for ClientResponse {
    fn from(client: entity::oauth_client::Model) -> Self {
        Self {
            id: client.id,
            client_id: client.client_id,
            name: client.name,
            description: client.description,
            redirect_uris: decode_list(&client.redirect_uris),
            scopes: decode_list(&client.scopes),
            created_at: client.created_at.to_string(),
        }
    }
}

// --- Validation ---

fn validate_redirect_uris(uris: &[String]) -> Result<(), AppError> {
    if uris.is_empty() || uris.len() > MAX_REDIRECT_URIS {
        return Err(AppError::BadRequest(format!(
            "redirect_uris must contain between 1 and {MAX_REDIRECT_URIS} entries"
        )));
    }
    Ok(())
}

fn validate_scopes(scopes: &[String]) -> Result<(), AppError> {
    if scopes.is_empty() || scopes.iter().any(|s| !is_valid_scope(s)) {
        return Err(AppError::InvalidScope);
    }
    Ok(())
}

// --- Handlers ---

pub async fn register_client(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<RegisterClientRequest>,
) -> Result<(StatusCode, Json<RegisteredClientResponse>), AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }
    validate_redirect_uris(&req.redirect_uris)?;
    validate_scopes(&req.scopes)?;

    let created = clients::create(
        &state.db,
        &user.user_id,
        NewClient {
            name: req.name,
            description: req.description,
            redirect_uris: req.redirect_uris,
            scopes: req.scopes,
        },
    )
    .await?;

    let client = created.client;
    Ok((
        StatusCode::CREATED,
        Json(RegisteredClientResponse {
            id: client.id,
            client_id: client.client_id,
            client_secret: created.client_secret,
            name: client.name,
            description: client.description,
            redirect_uris: decode_list(&client.redirect_uris),
            scopes: decode_list(&client.scopes),
            created_at: client.created_at.to_string(),
        }),
    ))
}

pub async fn list_clients(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ClientResponse>>, AppError> {
    let owned = clients::list_for_owner(&state.db, &user.user_id).await?;
    Ok(Json(owned.into_iter().map(ClientResponse::from).collect()))
}

pub async fn get_client(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ClientResponse>, AppError> {
    let client = clients::find_for_owner(&state.db, &id, &user.user_id).await?;
    Ok(Json(client.into()))
}

pub async fn update_client(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateClientRequest>,
) -> Result<Json<ClientResponse>, AppError> {
    if let Some(name) = &req.name {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest("Name must not be empty".to_string()));
        }
    }
    if let Some(uris) = &req.redirect_uris {
        validate_redirect_uris(uris)?;
    }
    if let Some(scopes) = &req.scopes {
        validate_scopes(scopes)?;
    }

    let client = clients::update_for_owner(
        &state.db,
        &id,
        &user.user_id,
        ClientChanges {
            name: req.name,
            description: req.description,
            redirect_uris: req.redirect_uris,
            scopes: req.scopes,
        },
    )
    .await?;

    Ok(Json(client.into()))
}

pub async fn delete_client(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    clients::delete_for_owner(&state.db, &id, &user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn regenerate_secret(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RegeneratedSecretResponse>, AppError> {
    let client_secret = clients::regenerate_secret(&state.db, &id, &user.user_id).await?;
    Ok(Json(RegeneratedSecretResponse { client_secret }))
}
