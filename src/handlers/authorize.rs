use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::AuthUser;
use crate::auth::oauth2 as grants;
use crate::db::queries::clients;
use crate::error::AppError;
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct AuthorizeQuery {
    pub response_type: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClientInfo {
    pub client_id: String,
    pub name: String,
    pub description: Option<String>,
}

/// What the consent screen renders.
#[derive(Debug, Serialize)]
pub struct AuthorizeInfoResponse {
    pub client: ClientInfo,
    pub scopes: Vec<String>,
    pub redirect_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConsentRequest {
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: Option<String>,
    pub state: Option<String>,
    pub consent: String,
}

#[derive(Debug, Serialize)]
pub struct ConsentResponse {
    pub redirect_uri: String,
}

// --- Handlers ---

/// Validate an authorization request and describe it for the consent
/// prompt. Read-only; nothing is persisted until the user decides.
pub async fn authorize_info(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<AuthorizeQuery>,
) -> Result<Json<AuthorizeInfoResponse>, AppError> {
    if query.response_type != "code" {
        return Err(AppError::BadRequest(
            "response_type must be 'code'".to_string(),
        ));
    }

    let client = clients::find_by_client_id(&state.db, &query.client_id)
        .await?
        .ok_or(AppError::InvalidClient)?;
    grants::validate_redirect_uri(&client, &query.redirect_uri)?;
    let scopes = grants::granted_scopes(&client, query.scope.as_deref())?;

    Ok(Json(AuthorizeInfoResponse {
        client: ClientInfo {
            client_id: client.client_id,
            name: client.name,
            description: client.description,
        },
        scopes,
        redirect_uri: query.redirect_uri,
        state: query.state,
    }))
}

/// Record the user's consent decision. Denial redirects back with
/// `error=access_denied` and persists nothing; approval mints a single-use
/// authorization code and carries it on the redirect.
pub async fn authorize_consent(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ConsentRequest>,
) -> Result<Json<ConsentResponse>, AppError> {
    let client = clients::find_by_client_id(&state.db, &req.client_id)
        .await?
        .ok_or(AppError::InvalidClient)?;
    grants::validate_redirect_uri(&client, &req.redirect_uri)?;

    match req.consent.as_str() {
        "deny" => {
            let redirect_uri = append_query(
                &req.redirect_uri,
                &[("error", "access_denied")],
                req.state.as_deref(),
            );
            Ok(Json(ConsentResponse { redirect_uri }))
        }
        "allow" => {
            let scopes = grants::granted_scopes(&client, req.scope.as_deref())?;
            let code = grants::issue_authorization_code(
                &state.db,
                &user.user_id,
                &client,
                &req.redirect_uri,
                &scopes,
            )
            .await?;

            let redirect_uri =
                append_query(&req.redirect_uri, &[("code", &code)], req.state.as_deref());
            Ok(Json(ConsentResponse { redirect_uri }))
        }
        other => Err(AppError::BadRequest(format!(
            "consent must be 'allow' or 'deny', got '{other}'"
        ))),
    }
}

fn append_query(uri: &str, params: &[(&str, &str)], state: Option<&str>) -> String {
    let mut out = uri.to_string();
    let mut separator = if uri.contains('?') { '&' } else { '?' };
    for (key, value) in params {
        out.push(separator);
        out.push_str(key);
        out.push('=');
        out.push_str(&urlencoding::encode(value));
        separator = '&';
    }
    if let Some(state) = state {
        out.push(separator);
        out.push_str("state=");
        out.push_str(&urlencoding::encode(state));
    }
    out
}
