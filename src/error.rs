use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Client authentication failed")]
    InvalidClient,

    // Same OAuth error code as InvalidClient, but surfaced as 401 on the
    // revoke/introspect endpoints when supplied credentials fail.
    #[error("Client authentication failed")]
    InvalidClientAuth,

    #[error("Invalid, expired, or already-used grant")]
    InvalidGrant,

    #[error("Requested scope is empty or not granted to this client")]
    InvalidScope,

    #[error("Redirect URI is not registered for this client")]
    InvalidRedirectUri,

    #[error("Unsupported grant_type: {0}")]
    UnsupportedGrantType(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User account is disabled")]
    UserDisabled,

    #[error("User already exists")]
    UserAlreadyExists,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::InvalidClient => {
                (StatusCode::BAD_REQUEST, "invalid_client", self.to_string())
            }
            AppError::InvalidClientAuth => {
                (StatusCode::UNAUTHORIZED, "invalid_client", self.to_string())
            }
            AppError::InvalidGrant => {
                (StatusCode::BAD_REQUEST, "invalid_grant", self.to_string())
            }
            AppError::InvalidScope => {
                (StatusCode::BAD_REQUEST, "invalid_scope", self.to_string())
            }
            AppError::InvalidRedirectUri => (
                StatusCode::BAD_REQUEST,
                "invalid_redirect_uri",
                self.to_string(),
            ),
            AppError::UnsupportedGrantType(_) => (
                StatusCode::BAD_REQUEST,
                "unsupported_grant_type",
                self.to_string(),
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                self.to_string(),
            ),
            AppError::UserDisabled => {
                (StatusCode::FORBIDDEN, "user_disabled", self.to_string())
            }
            AppError::UserAlreadyExists => {
                (StatusCode::CONFLICT, "user_already_exists", self.to_string())
            }
            AppError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string())
            }
            AppError::NotFound => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error".to_string(),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                )
            }
            // Bearer-token verification failures collapse to the same
            // generic response as every other gate rejection.
            AppError::Jwt(_) => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Unauthorized".to_string(),
            ),
        };

        let body = json!({
            "error": error_type,
            "message": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
