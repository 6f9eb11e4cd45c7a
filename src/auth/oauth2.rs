//! The OAuth2 grant engine: authorization-code issue/exchange, refresh
//! rotation, client credentials, revocation, and introspection. All state
//! lives in the database; every entry point is a single bounded unit of
//! work over it.

use chrono::{Duration, Utc};
use sea_orm::{DatabaseConnection, EntityTrait, TransactionTrait};

use crate::auth::scopes::filter_granted;
use crate::auth::tokens;
use crate::db::queries::{access_tokens, auth_codes, clients, refresh_tokens, users};
use crate::db::{decode_list, encode_list};
use crate::error::AppError;

pub const AUTH_CODE_TTL_MINUTES: i64 = 10;
pub const ACCESS_TOKEN_TTL_SECS: i64 = 3600;
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 30;

/// Raw token material handed back to the client. Secrets in here exist
/// nowhere else; only hashes are stored.
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub scopes: Vec<String>,
}

/// Everything introspection reports about a live token.
pub struct TokenInfo {
    pub sub: String,
    pub username: String,
    pub client_id: Option<String>,
    pub scopes: Vec<String>,
    pub token_type: &'static str,
    pub exp: i64,
    pub iat: i64,
}

/// Look up a client by public id and verify its secret. Every failure mode
/// collapses to `invalid_client`.
pub async fn resolve_client(
    db: &DatabaseConnection,
    client_id: &str,
    client_secret: &str,
) -> Result<entity::oauth_client::Model, AppError> {
    let client = clients::find_by_client_id(db, client_id)
        .await?
        .ok_or(AppError::InvalidClient)?;

    if !tokens::verify_token(client_secret, &client.client_secret_hash) {
        return Err(AppError::InvalidClient);
    }

    Ok(client)
}

/// Redirect URIs match by byte equality against the registered set; there
/// is no normalization or prefix matching.
pub fn validate_redirect_uri(
    client: &entity::oauth_client::Model,
    redirect_uri: &str,
) -> Result<(), AppError> {
    if clients::redirect_uris(client).iter().any(|u| u == redirect_uri) {
        Ok(())
    } else {
        Err(AppError::InvalidRedirectUri)
    }
}

/// Intersect the requested scopes with what the client was granted at
/// registration. An empty intersection is an `invalid_scope` failure.
pub fn granted_scopes(
    client: &entity::oauth_client::Model,
    requested: Option<&str>,
) -> Result<Vec<String>, AppError> {
    let granted = filter_granted(requested, &clients::allowed_scopes(client));
    if granted.is_empty() {
        return Err(AppError::InvalidScope);
    }
    Ok(granted)
}

/// Persist a short-lived single-use authorization code bound to the
/// consenting user, the client, the redirect URI, and the resolved scopes.
/// Returns the raw code for the redirect; only its hash is stored.
pub async fn issue_authorization_code(
    db: &DatabaseConnection,
    user_id: &str,
    client: &entity::oauth_client::Model,
    redirect_uri: &str,
    scopes: &[String],
) -> Result<String, AppError> {
    let code = tokens::new_authorization_code();
    let expires_at = (Utc::now() + Duration::minutes(AUTH_CODE_TTL_MINUTES)).naive_utc();

    auth_codes::insert(
        db,
        &tokens::hash_token(&code),
        &client.id,
        user_id,
        redirect_uri,
        &encode_list(scopes),
        expires_at,
    )
    .await?;

    Ok(code)
}

/// Redeem an authorization code for an access/refresh token pair.
///
/// The delete-code + create-tokens sequence runs in one transaction, and
/// the delete's row count decides redemption races: of N concurrent
/// submissions of the same code, exactly one deletes the row, the rest
/// fail `invalid_grant`.
pub async fn exchange_authorization_code(
    db: &DatabaseConnection,
    raw_code: &str,
    redirect_uri: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<IssuedTokens, AppError> {
    let code_hash = tokens::hash_token(raw_code);
    let code = auth_codes::find_by_hash(db, &code_hash)
        .await?
        .ok_or(AppError::InvalidGrant)?;

    let now = Utc::now().naive_utc();
    if code.expires_at < now {
        // Lazy expiry: the row is gone the first time anyone trips over it.
        auth_codes::delete_by_hash(db, &code_hash).await?;
        return Err(AppError::InvalidGrant);
    }

    if code.redirect_uri != redirect_uri {
        return Err(AppError::InvalidGrant);
    }

    let client = resolve_client(db, client_id, client_secret).await?;
    if client.id != code.client_id {
        return Err(AppError::InvalidClient);
    }

    let txn = db.begin().await?;

    if auth_codes::delete_by_hash(&txn, &code_hash).await? == 0 {
        // A concurrent redeemer got here first.
        txn.rollback().await?;
        return Err(AppError::InvalidGrant);
    }

    let access_token = tokens::new_access_token();
    let refresh_token = tokens::new_refresh_token();
    let access_expires = (Utc::now() + Duration::seconds(ACCESS_TOKEN_TTL_SECS)).naive_utc();
    let refresh_expires = (Utc::now() + Duration::days(REFRESH_TOKEN_TTL_DAYS)).naive_utc();

    access_tokens::insert(
        &txn,
        &tokens::hash_token(&access_token),
        &code.user_id,
        Some(&client.id),
        &code.scopes,
        access_expires,
    )
    .await?;
    refresh_tokens::insert(
        &txn,
        &tokens::hash_token(&refresh_token),
        &code.user_id,
        Some(&client.id),
        &code.scopes,
        refresh_expires,
    )
    .await?;

    txn.commit().await?;

    Ok(IssuedTokens {
        access_token,
        refresh_token: Some(refresh_token),
        expires_in: ACCESS_TOKEN_TTL_SECS,
        scopes: decode_list(&code.scopes),
    })
}

/// Rotate a refresh token: the presented token is consumed and a fresh
/// access/refresh pair inheriting its user, client, and scopes is issued.
/// Replaying a consumed token fails `invalid_grant`, identically to a
/// token that never existed.
pub async fn rotate_refresh_token(
    db: &DatabaseConnection,
    raw_token: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<IssuedTokens, AppError> {
    let token_hash = tokens::hash_token(raw_token);
    let stored = refresh_tokens::find_by_hash(db, &token_hash)
        .await?
        .ok_or(AppError::InvalidGrant)?;

    let now = Utc::now().naive_utc();
    if stored.expires_at < now {
        refresh_tokens::delete_by_id(db, &stored.id).await?;
        return Err(AppError::InvalidGrant);
    }

    let client = resolve_client(db, client_id, client_secret).await?;
    if let Some(bound_client) = &stored.client_id {
        if *bound_client != client.id {
            return Err(AppError::InvalidGrant);
        }
    }

    let txn = db.begin().await?;

    if refresh_tokens::delete_by_id(&txn, &stored.id).await? == 0 {
        txn.rollback().await?;
        return Err(AppError::InvalidGrant);
    }

    let access_token = tokens::new_access_token();
    let refresh_token = tokens::new_refresh_token();
    let access_expires = (Utc::now() + Duration::seconds(ACCESS_TOKEN_TTL_SECS)).naive_utc();
    let refresh_expires = (Utc::now() + Duration::days(REFRESH_TOKEN_TTL_DAYS)).naive_utc();

    access_tokens::insert(
        &txn,
        &tokens::hash_token(&access_token),
        &stored.user_id,
        stored.client_id.as_deref(),
        &stored.scopes,
        access_expires,
    )
    .await?;
    refresh_tokens::insert(
        &txn,
        &tokens::hash_token(&refresh_token),
        &stored.user_id,
        stored.client_id.as_deref(),
        &stored.scopes,
        refresh_expires,
    )
    .await?;

    txn.commit().await?;

    Ok(IssuedTokens {
        access_token,
        refresh_token: Some(refresh_token),
        expires_in: ACCESS_TOKEN_TTL_SECS,
        scopes: decode_list(&stored.scopes),
    })
}

/// Machine-to-machine grant: one access token, no refresh token, no code.
/// The token is bound to the registering user's identity.
pub async fn client_credentials(
    db: &DatabaseConnection,
    client_id: &str,
    client_secret: &str,
    requested_scope: Option<&str>,
) -> Result<IssuedTokens, AppError> {
    let client = resolve_client(db, client_id, client_secret).await?;
    let scopes = granted_scopes(&client, requested_scope)?;

    let access_token = tokens::new_access_token();
    let expires_at = (Utc::now() + Duration::seconds(ACCESS_TOKEN_TTL_SECS)).naive_utc();

    access_tokens::insert(
        db,
        &tokens::hash_token(&access_token),
        &client.user_id,
        Some(&client.id),
        &encode_list(&scopes),
        expires_at,
    )
    .await?;

    Ok(IssuedTokens {
        access_token,
        refresh_token: None,
        expires_in: ACCESS_TOKEN_TTL_SECS,
        scopes,
    })
}

/// Delete whichever token record matches the presented value, if any.
/// Per RFC 7009 the caller reports success either way, so this never
/// surfaces "not found".
pub async fn revoke_token(db: &DatabaseConnection, raw_token: &str) -> Result<(), AppError> {
    let token_hash = tokens::hash_token(raw_token);

    if let Some(access) = access_tokens::find_by_hash(db, &token_hash).await? {
        access_tokens::delete_by_id(db, &access.id).await?;
        return Ok(());
    }

    if let Some(refresh) = refresh_tokens::find_by_hash(db, &token_hash).await? {
        refresh_tokens::delete_by_id(db, &refresh.id).await?;
    }

    Ok(())
}

/// Resolve a presented token to its introspection data. `None` means the
/// caller reports `{active: false}`; an unknown or expired token is a
/// valid outcome, not an error. Expired rows are deleted on the way out.
pub async fn introspect_token(
    db: &DatabaseConnection,
    raw_token: &str,
) -> Result<Option<TokenInfo>, AppError> {
    let token_hash = tokens::hash_token(raw_token);
    let now = Utc::now().naive_utc();

    if let Some(access) = access_tokens::find_by_hash(db, &token_hash).await? {
        if access.expires_at < now {
            access_tokens::delete_by_id(db, &access.id).await?;
            return Ok(None);
        }
        return Ok(Some(
            token_info(
                db,
                &access.user_id,
                access.client_id.as_deref(),
                &access.scopes,
                "access_token",
                access.expires_at,
                access.created_at,
            )
            .await?,
        ));
    }

    if let Some(refresh) = refresh_tokens::find_by_hash(db, &token_hash).await? {
        if refresh.expires_at < now {
            refresh_tokens::delete_by_id(db, &refresh.id).await?;
            return Ok(None);
        }
        return Ok(Some(
            token_info(
                db,
                &refresh.user_id,
                refresh.client_id.as_deref(),
                &refresh.scopes,
                "refresh_token",
                refresh.expires_at,
                refresh.created_at,
            )
            .await?,
        ));
    }

    Ok(None)
}

async fn token_info(
    db: &DatabaseConnection,
    user_id: &str,
    internal_client_id: Option<&str>,
    scopes: &str,
    token_type: &'static str,
    expires_at: chrono::NaiveDateTime,
    created_at: chrono::NaiveDateTime,
) -> Result<TokenInfo, AppError> {
    let username = users::find_by_id(db, user_id)
        .await?
        .map(|u| u.username)
        .unwrap_or_default();

    // Report the public client id, not the internal row id.
    let client_id = match internal_client_id {
        Some(id) => entity::oauth_client::Entity::find_by_id(id)
            .one(db)
            .await
            .map_err(AppError::Database)?
            .map(|c| c.client_id),
        None => None,
    };

    Ok(TokenInfo {
        sub: user_id.to_string(),
        username,
        client_id,
        scopes: decode_list(scopes),
        token_type,
        exp: expires_at.and_utc().timestamp(),
        iat: created_at.and_utc().timestamp(),
    })
}
