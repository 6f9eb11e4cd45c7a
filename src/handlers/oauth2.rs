use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::auth::oauth2 as grants;
use crate::error::AppError;
use crate::AppState;

// --- Request / Response types ---

/// The token endpoint's body, discriminated on `grant_type` so each
/// branch's required fields are enforced at deserialization.
#[derive(Debug, Deserialize)]
#[serde(tag = "grant_type", rename_all = "snake_case")]
pub enum TokenRequest {
    AuthorizationCode {
        code: String,
        redirect_uri: String,
        client_id: String,
        client_secret: String,
    },
    RefreshToken {
        refresh_token: String,
        client_id: String,
        client_secret: String,
    },
    ClientCredentials {
        client_id: String,
        client_secret: String,
        scope: Option<String>,
    },
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_in: i64,
    pub scope: String,
}

#[derive(Debug, Deserialize)]
pub struct RevokeRequest {
    pub token: String,
    #[allow(dead_code)]
    pub token_type_hint: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IntrospectRequest {
    pub token: String,
    #[allow(dead_code)]
    pub token_type_hint: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IntrospectResponse {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
}

impl IntrospectResponse {
    fn inactive() -> Self {
        Self {
            active: false,
            scope: None,
            client_id: None,
            username: None,
            token_type: None,
            exp: None,
            iat: None,
            sub: None,
        }
    }
}

// --- Handlers ---

pub async fn token(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<TokenResponse>, AppError> {
    // Probe the discriminant first so an out-of-set grant_type reports
    // unsupported_grant_type rather than a shapeless decode failure.
    let grant_type = body
        .get("grant_type")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    if !matches!(
        grant_type,
        "authorization_code" | "refresh_token" | "client_credentials"
    ) {
        return Err(AppError::UnsupportedGrantType(grant_type.to_string()));
    }

    let req: TokenRequest =
        serde_json::from_value(body).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let issued = match req {
        TokenRequest::AuthorizationCode {
            code,
            redirect_uri,
            client_id,
            client_secret,
        } => {
            grants::exchange_authorization_code(
                &state.db,
                &code,
                &redirect_uri,
                &client_id,
                &client_secret,
            )
            .await?
        }
        TokenRequest::RefreshToken {
            refresh_token,
            client_id,
            client_secret,
        } => {
            grants::rotate_refresh_token(&state.db, &refresh_token, &client_id, &client_secret)
                .await?
        }
        TokenRequest::ClientCredentials {
            client_id,
            client_secret,
            scope,
        } => {
            grants::client_credentials(&state.db, &client_id, &client_secret, scope.as_deref())
                .await?
        }
    };

    Ok(Json(TokenResponse {
        access_token: issued.access_token,
        refresh_token: issued.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: issued.expires_in,
        scope: issued.scopes.join(" "),
    }))
}

pub async fn revoke(
    State(state): State<AppState>,
    Json(req): Json<RevokeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    authenticate_optional_client(&state, req.client_id.as_deref(), req.client_secret.as_deref())
        .await?;

    // Always 200, whether or not anything matched (RFC 7009).
    grants::revoke_token(&state.db, &req.token).await?;
    Ok(Json(serde_json::json!({})))
}

pub async fn introspect(
    State(state): State<AppState>,
    Json(req): Json<IntrospectRequest>,
) -> Result<Json<IntrospectResponse>, AppError> {
    authenticate_optional_client(&state, req.client_id.as_deref(), req.client_secret.as_deref())
        .await?;

    match grants::introspect_token(&state.db, &req.token).await? {
        Some(info) => Ok(Json(IntrospectResponse {
            active: true,
            scope: Some(info.scopes.join(" ")),
            client_id: info.client_id,
            username: Some(info.username),
            token_type: Some(info.token_type.to_string()),
            exp: Some(info.exp),
            iat: Some(info.iat),
            sub: Some(info.sub),
        })),
        None => Ok(Json(IntrospectResponse::inactive())),
    }
}

/// Revoke and introspect accept anonymous callers, but credentials that
/// are supplied have to be right.
async fn authenticate_optional_client(
    state: &AppState,
    client_id: Option<&str>,
    client_secret: Option<&str>,
) -> Result<(), AppError> {
    if let (Some(id), Some(secret)) = (client_id, client_secret) {
        grants::resolve_client(&state.db, id, secret)
            .await
            .map_err(|_| AppError::InvalidClientAuth)?;
    }
    Ok(())
}
