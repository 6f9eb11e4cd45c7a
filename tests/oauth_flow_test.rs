mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use chunk_auth::auth::tokens;
use common::{extract_query_param, TestApp};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;
use serial_test::serial;

const REDIRECT: &str = "https://game.example/callback";

async fn setup() -> (TestApp, String, common::CreatedClient) {
    let app = TestApp::new().await;
    let session = app.session_token("alice").await;
    let client = app
        .create_client(
            &session,
            "Mod Manager",
            &[REDIRECT, "https://game.example/alt"],
            &["project:read", "project:write", "version:read"],
        )
        .await;
    (app, session, client)
}

// --- Authorization endpoint ---

#[tokio::test]
#[serial]
async fn authorize_info_describes_request() {
    let (app, session, client) = setup().await;

    let uri = format!(
        "/oauth/authorize?response_type=code&client_id={}&redirect_uri={}&scope=project%3Aread&state=xyz",
        client.client_id,
        urlencoding::encode(REDIRECT),
    );
    let resp = app.get(&uri, Some(&session)).await;
    resp.assert_status(StatusCode::OK);

    let json: serde_json::Value = resp.json();
    assert_eq!(json["client"]["client_id"], client.client_id);
    assert_eq!(json["client"]["name"], "Mod Manager");
    assert_eq!(json["scopes"], json!(["project:read"]));
    assert_eq!(json["redirect_uri"], REDIRECT);
    assert_eq!(json["state"], "xyz");
}

#[tokio::test]
#[serial]
async fn authorize_rejects_unregistered_redirect() {
    let (app, session, client) = setup().await;

    let uri = format!(
        "/oauth/authorize?response_type=code&client_id={}&redirect_uri={}",
        client.client_id,
        urlencoding::encode("https://evil.example/callback"),
    );
    let resp = app.get(&uri, Some(&session)).await;
    resp.assert_error(StatusCode::BAD_REQUEST, "invalid_redirect_uri");
}

#[tokio::test]
#[serial]
async fn authorize_redirect_match_is_byte_exact() {
    let (app, session, client) = setup().await;

    // Trailing slash is a different URI.
    let uri = format!(
        "/oauth/authorize?response_type=code&client_id={}&redirect_uri={}",
        client.client_id,
        urlencoding::encode("https://game.example/callback/"),
    );
    let resp = app.get(&uri, Some(&session)).await;
    resp.assert_error(StatusCode::BAD_REQUEST, "invalid_redirect_uri");
}

#[tokio::test]
#[serial]
async fn authorize_rejects_unknown_client() {
    let app = TestApp::new().await;
    let session = app.session_token("alice").await;

    let uri = format!(
        "/oauth/authorize?response_type=code&client_id=ch_deadbeefdeadbeef&redirect_uri={}",
        urlencoding::encode(REDIRECT),
    );
    let resp = app.get(&uri, Some(&session)).await;
    resp.assert_error(StatusCode::BAD_REQUEST, "invalid_client");
}

#[tokio::test]
#[serial]
async fn authorize_rejects_disjoint_scope() {
    let (app, session, client) = setup().await;

    // user:write is in the registry but was never granted to this client.
    let uri = format!(
        "/oauth/authorize?response_type=code&client_id={}&redirect_uri={}&scope=user%3Awrite",
        client.client_id,
        urlencoding::encode(REDIRECT),
    );
    let resp = app.get(&uri, Some(&session)).await;
    resp.assert_error(StatusCode::BAD_REQUEST, "invalid_scope");
}

#[tokio::test]
#[serial]
async fn consent_denial_redirects_with_access_denied() {
    let (app, session, client) = setup().await;

    let resp = app
        .post_json(
            "/oauth/authorize",
            Some(&session),
            &json!({
                "client_id": client.client_id,
                "redirect_uri": REDIRECT,
                "consent": "deny",
                "state": "xyz",
            }),
        )
        .await;
    resp.assert_status(StatusCode::OK);

    let json: serde_json::Value = resp.json();
    let redirect = json["redirect_uri"].as_str().unwrap();
    assert_eq!(
        extract_query_param(redirect, "error").as_deref(),
        Some("access_denied")
    );
    assert_eq!(extract_query_param(redirect, "state").as_deref(), Some("xyz"));
    assert!(extract_query_param(redirect, "code").is_none());
}

#[tokio::test]
#[serial]
async fn consent_requires_authentication() {
    let (app, _session, client) = setup().await;

    let resp = app
        .post_json(
            "/oauth/authorize",
            None,
            &json!({
                "client_id": client.client_id,
                "redirect_uri": REDIRECT,
                "consent": "allow",
            }),
        )
        .await;
    resp.assert_error(StatusCode::UNAUTHORIZED, "unauthorized");
}

// --- Authorization code exchange ---

#[tokio::test]
#[serial]
async fn full_code_flow_issues_tokens() {
    let (app, session, client) = setup().await;
    let code = app
        .obtain_code(&session, &client, REDIRECT, Some("project:read version:read"))
        .await;

    let resp = app
        .post_json(
            "/oauth/token",
            None,
            &json!({
                "grant_type": "authorization_code",
                "code": code,
                "redirect_uri": REDIRECT,
                "client_id": client.client_id,
                "client_secret": client.client_secret,
            }),
        )
        .await;
    resp.assert_status(StatusCode::OK);

    let json: serde_json::Value = resp.json();
    assert_eq!(json["token_type"], "Bearer");
    assert_eq!(json["expires_in"], 3600);
    assert_eq!(json["scope"], "project:read version:read");
    assert!(!json["access_token"].as_str().unwrap().is_empty());
    assert!(!json["refresh_token"].as_str().unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn code_cannot_be_redeemed_twice() {
    let (app, session, client) = setup().await;
    let code = app.obtain_code(&session, &client, REDIRECT, None).await;

    let body = json!({
        "grant_type": "authorization_code",
        "code": code,
        "redirect_uri": REDIRECT,
        "client_id": client.client_id,
        "client_secret": client.client_secret,
    });

    let first = app.post_json("/oauth/token", None, &body).await;
    first.assert_status(StatusCode::OK);

    let second = app.post_json("/oauth/token", None, &body).await;
    second.assert_error(StatusCode::BAD_REQUEST, "invalid_grant");
}

#[tokio::test]
#[serial]
async fn concurrent_redemption_has_one_winner() {
    let (app, session, client) = setup().await;
    let code = app.obtain_code(&session, &client, REDIRECT, None).await;

    let body = json!({
        "grant_type": "authorization_code",
        "code": code,
        "redirect_uri": REDIRECT,
        "client_id": client.client_id,
        "client_secret": client.client_secret,
    });

    let (a, b) = tokio::join!(
        app.post_json("/oauth/token", None, &body),
        app.post_json("/oauth/token", None, &body),
    );

    let statuses = [a.status, b.status];
    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::OK).count(),
        1,
        "exactly one redemption should win: {statuses:?}"
    );
    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == StatusCode::BAD_REQUEST)
            .count(),
        1
    );
}

#[tokio::test]
#[serial]
async fn exchange_rejects_redirect_mismatch() {
    let (app, session, client) = setup().await;
    let code = app.obtain_code(&session, &client, REDIRECT, None).await;

    // Also a registered URI, just not the one the code was bound to.
    let resp = app
        .post_json(
            "/oauth/token",
            None,
            &json!({
                "grant_type": "authorization_code",
                "code": code,
                "redirect_uri": "https://game.example/alt",
                "client_id": client.client_id,
                "client_secret": client.client_secret,
            }),
        )
        .await;
    resp.assert_error(StatusCode::BAD_REQUEST, "invalid_grant");
}

#[tokio::test]
#[serial]
async fn exchange_rejects_wrong_secret() {
    let (app, session, client) = setup().await;
    let code = app.obtain_code(&session, &client, REDIRECT, None).await;

    let resp = app
        .post_json(
            "/oauth/token",
            None,
            &json!({
                "grant_type": "authorization_code",
                "code": code,
                "redirect_uri": REDIRECT,
                "client_id": client.client_id,
                "client_secret": "not-the-secret",
            }),
        )
        .await;
    resp.assert_error(StatusCode::BAD_REQUEST, "invalid_client");
}

#[tokio::test]
#[serial]
async fn exchange_rejects_code_issued_to_another_client() {
    let (app, session, client) = setup().await;
    let other = app
        .create_client(&session, "Other App", &[REDIRECT], &["project:read"])
        .await;
    let code = app.obtain_code(&session, &client, REDIRECT, None).await;

    let resp = app
        .post_json(
            "/oauth/token",
            None,
            &json!({
                "grant_type": "authorization_code",
                "code": code,
                "redirect_uri": REDIRECT,
                "client_id": other.client_id,
                "client_secret": other.client_secret,
            }),
        )
        .await;
    resp.assert_error(StatusCode::BAD_REQUEST, "invalid_client");
}

#[tokio::test]
#[serial]
async fn expired_code_is_rejected_and_deleted() {
    let (app, session, client) = setup().await;
    let code = app.obtain_code(&session, &client, REDIRECT, None).await;

    // Age the stored code past its window.
    let expired = (Utc::now() - Duration::minutes(1)).naive_utc();
    entity::authorization_code::Entity::update_many()
        .col_expr(
            entity::authorization_code::Column::ExpiresAt,
            sea_orm::sea_query::Expr::value(expired),
        )
        .filter(entity::authorization_code::Column::CodeHash.eq(tokens::hash_token(&code)))
        .exec(&app.state.db)
        .await
        .unwrap();

    let body = json!({
        "grant_type": "authorization_code",
        "code": code,
        "redirect_uri": REDIRECT,
        "client_id": client.client_id,
        "client_secret": client.client_secret,
    });
    let resp = app.post_json("/oauth/token", None, &body).await;
    resp.assert_error(StatusCode::BAD_REQUEST, "invalid_grant");

    // The row was lazily deleted on lookup.
    let remaining = entity::authorization_code::Entity::find()
        .filter(entity::authorization_code::Column::CodeHash.eq(tokens::hash_token(&code)))
        .one(&app.state.db)
        .await
        .unwrap();
    assert!(remaining.is_none());
}

#[tokio::test]
#[serial]
async fn unsupported_grant_type_is_reported() {
    let app = TestApp::new().await;

    let resp = app
        .post_json(
            "/oauth/token",
            None,
            &json!({
                "grant_type": "password",
                "username": "alice",
                "password": "hunter22",
            }),
        )
        .await;
    resp.assert_error(StatusCode::BAD_REQUEST, "unsupported_grant_type");
}

// --- Refresh token rotation ---

async fn exchange(
    app: &TestApp,
    client: &common::CreatedClient,
    code: &str,
) -> serde_json::Value {
    let resp = app
        .post_json(
            "/oauth/token",
            None,
            &json!({
                "grant_type": "authorization_code",
                "code": code,
                "redirect_uri": REDIRECT,
                "client_id": client.client_id,
                "client_secret": client.client_secret,
            }),
        )
        .await;
    resp.assert_status(StatusCode::OK);
    resp.json()
}

#[tokio::test]
#[serial]
async fn refresh_rotates_both_tokens() {
    let (app, session, client) = setup().await;
    let code = app.obtain_code(&session, &client, REDIRECT, None).await;
    let issued = exchange(&app, &client, &code).await;
    let old_refresh = issued["refresh_token"].as_str().unwrap();

    let resp = app
        .post_json(
            "/oauth/token",
            None,
            &json!({
                "grant_type": "refresh_token",
                "refresh_token": old_refresh,
                "client_id": client.client_id,
                "client_secret": client.client_secret,
            }),
        )
        .await;
    resp.assert_status(StatusCode::OK);

    let rotated: serde_json::Value = resp.json();
    assert_ne!(rotated["access_token"], issued["access_token"]);
    assert_ne!(rotated["refresh_token"], issued["refresh_token"]);
    assert_eq!(rotated["scope"], issued["scope"]);
    assert_eq!(rotated["expires_in"], 3600);
}

#[tokio::test]
#[serial]
async fn replayed_refresh_token_is_rejected() {
    let (app, session, client) = setup().await;
    let code = app.obtain_code(&session, &client, REDIRECT, None).await;
    let issued = exchange(&app, &client, &code).await;
    let old_refresh = issued["refresh_token"].as_str().unwrap();

    let body = json!({
        "grant_type": "refresh_token",
        "refresh_token": old_refresh,
        "client_id": client.client_id,
        "client_secret": client.client_secret,
    });

    let first = app.post_json("/oauth/token", None, &body).await;
    first.assert_status(StatusCode::OK);
    let rotated: serde_json::Value = first.json();

    // The consumed token is gone.
    let replay = app.post_json("/oauth/token", None, &body).await;
    replay.assert_error(StatusCode::BAD_REQUEST, "invalid_grant");

    // The replacement still works.
    let resp = app
        .post_json(
            "/oauth/token",
            None,
            &json!({
                "grant_type": "refresh_token",
                "refresh_token": rotated["refresh_token"],
                "client_id": client.client_id,
                "client_secret": client.client_secret,
            }),
        )
        .await;
    resp.assert_status(StatusCode::OK);
}

#[tokio::test]
#[serial]
async fn refresh_token_is_bound_to_its_client() {
    let (app, session, client) = setup().await;
    let other = app
        .create_client(&session, "Other App", &[REDIRECT], &["project:read"])
        .await;
    let code = app.obtain_code(&session, &client, REDIRECT, None).await;
    let issued = exchange(&app, &client, &code).await;

    let resp = app
        .post_json(
            "/oauth/token",
            None,
            &json!({
                "grant_type": "refresh_token",
                "refresh_token": issued["refresh_token"],
                "client_id": other.client_id,
                "client_secret": other.client_secret,
            }),
        )
        .await;
    resp.assert_error(StatusCode::BAD_REQUEST, "invalid_grant");
}

// --- Client credentials ---

#[tokio::test]
#[serial]
async fn client_credentials_issues_access_token_only() {
    let (app, _session, client) = setup().await;

    let resp = app
        .post_json(
            "/oauth/token",
            None,
            &json!({
                "grant_type": "client_credentials",
                "client_id": client.client_id,
                "client_secret": client.client_secret,
            }),
        )
        .await;
    resp.assert_status(StatusCode::OK);

    let json: serde_json::Value = resp.json();
    assert!(!json["access_token"].as_str().unwrap().is_empty());
    assert!(json.get("refresh_token").is_none());
    assert_eq!(json["expires_in"], 3600);
    // Omitted scope defaults to everything the client was granted.
    assert_eq!(json["scope"], "project:read project:write version:read");
}

#[tokio::test]
#[serial]
async fn client_credentials_narrows_scope() {
    let (app, _session, client) = setup().await;

    let resp = app
        .post_json(
            "/oauth/token",
            None,
            &json!({
                "grant_type": "client_credentials",
                "client_id": client.client_id,
                "client_secret": client.client_secret,
                "scope": "project:read",
            }),
        )
        .await;
    resp.assert_status(StatusCode::OK);
    let json: serde_json::Value = resp.json();
    assert_eq!(json["scope"], "project:read");
}

#[tokio::test]
#[serial]
async fn client_credentials_rejects_ungranted_scope() {
    let (app, _session, client) = setup().await;

    let resp = app
        .post_json(
            "/oauth/token",
            None,
            &json!({
                "grant_type": "client_credentials",
                "client_id": client.client_id,
                "client_secret": client.client_secret,
                "scope": "user:write",
            }),
        )
        .await;
    resp.assert_error(StatusCode::BAD_REQUEST, "invalid_scope");
}

#[tokio::test]
#[serial]
async fn client_credentials_rejects_bad_secret() {
    let (app, _session, client) = setup().await;

    let resp = app
        .post_json(
            "/oauth/token",
            None,
            &json!({
                "grant_type": "client_credentials",
                "client_id": client.client_id,
                "client_secret": "wrong",
            }),
        )
        .await;
    resp.assert_error(StatusCode::BAD_REQUEST, "invalid_client");
}

// --- Revocation ---

#[tokio::test]
#[serial]
async fn revoking_unknown_token_still_succeeds() {
    let app = TestApp::new().await;

    let resp = app
        .post_json("/oauth/revoke", None, &json!({ "token": "no-such-token" }))
        .await;
    resp.assert_status(StatusCode::OK);
    assert_eq!(resp.json::<serde_json::Value>(), json!({}));
}

#[tokio::test]
#[serial]
async fn revoked_access_token_goes_inactive() {
    let (app, session, client) = setup().await;
    let code = app.obtain_code(&session, &client, REDIRECT, None).await;
    let issued = exchange(&app, &client, &code).await;
    let access = issued["access_token"].as_str().unwrap();

    let live = app
        .post_json("/oauth/introspect", None, &json!({ "token": access }))
        .await;
    assert_eq!(live.json::<serde_json::Value>()["active"], true);

    let resp = app
        .post_json("/oauth/revoke", None, &json!({ "token": access }))
        .await;
    resp.assert_status(StatusCode::OK);

    let after = app
        .post_json("/oauth/introspect", None, &json!({ "token": access }))
        .await;
    assert_eq!(after.json::<serde_json::Value>()["active"], false);
}

#[tokio::test]
#[serial]
async fn revoke_rejects_wrong_client_credentials() {
    let (app, _session, client) = setup().await;

    let resp = app
        .post_json(
            "/oauth/revoke",
            None,
            &json!({
                "token": "whatever",
                "client_id": client.client_id,
                "client_secret": "wrong",
            }),
        )
        .await;
    resp.assert_error(StatusCode::UNAUTHORIZED, "invalid_client");
}

// --- Introspection ---

#[tokio::test]
#[serial]
async fn introspect_describes_live_access_token() {
    let (app, session, client) = setup().await;
    let code = app
        .obtain_code(&session, &client, REDIRECT, Some("project:read"))
        .await;
    let issued = exchange(&app, &client, &code).await;

    let resp = app
        .post_json(
            "/oauth/introspect",
            None,
            &json!({ "token": issued["access_token"] }),
        )
        .await;
    resp.assert_status(StatusCode::OK);

    let json: serde_json::Value = resp.json();
    assert_eq!(json["active"], true);
    assert_eq!(json["scope"], "project:read");
    assert_eq!(json["client_id"], client.client_id);
    assert_eq!(json["username"], "alice");
    assert_eq!(json["token_type"], "access_token");
    assert!(json["exp"].as_i64().unwrap() > json["iat"].as_i64().unwrap());
}

#[tokio::test]
#[serial]
async fn introspect_unknown_token_reports_inactive_only() {
    let app = TestApp::new().await;

    let resp = app
        .post_json("/oauth/introspect", None, &json!({ "token": "nope" }))
        .await;
    resp.assert_status(StatusCode::OK);
    assert_eq!(resp.json::<serde_json::Value>(), json!({ "active": false }));
}

#[tokio::test]
#[serial]
async fn introspect_expired_token_reports_inactive() {
    let (app, session, client) = setup().await;
    let code = app.obtain_code(&session, &client, REDIRECT, None).await;
    let issued = exchange(&app, &client, &code).await;
    let access = issued["access_token"].as_str().unwrap();

    let expired = (Utc::now() - Duration::minutes(1)).naive_utc();
    entity::access_token::Entity::update_many()
        .col_expr(
            entity::access_token::Column::ExpiresAt,
            sea_orm::sea_query::Expr::value(expired),
        )
        .filter(entity::access_token::Column::TokenHash.eq(tokens::hash_token(access)))
        .exec(&app.state.db)
        .await
        .unwrap();

    let resp = app
        .post_json("/oauth/introspect", None, &json!({ "token": access }))
        .await;
    assert_eq!(resp.json::<serde_json::Value>()["active"], false);
}
