use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Protocol endpoints get brute-force protection; 30 requests per
    // 60 seconds per IP.
    let oauth_limiter = RateLimiter::new(30, Duration::from_secs(60));

    // OAuth2 protocol endpoints (authorize/token/revoke/introspect).
    let oauth_protocol_routes = Router::new()
        .route(
            "/authorize",
            get(handlers::authorize::authorize_info).post(handlers::authorize::authorize_consent),
        )
        .route("/token", post(handlers::oauth2::token))
        .route("/revoke", post(handlers::oauth2::revoke))
        .route("/introspect", post(handlers::oauth2::introspect))
        .route_layer(middleware::from_fn_with_state(
            oauth_limiter,
            rate_limit_middleware,
        ));

    // Client registration and management (owner-scoped).
    let oauth_client_routes = Router::new()
        .route("/register", post(handlers::clients::register_client))
        .route("/clients", get(handlers::clients::list_clients))
        .route(
            "/clients/:id",
            get(handlers::clients::get_client)
                .patch(handlers::clients::update_client)
                .delete(handlers::clients::delete_client),
        )
        .route(
            "/clients/:id/secret",
            post(handlers::clients::regenerate_secret),
        );

    // User-facing session endpoints.
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/me", get(handlers::auth::me));

    // Personal access tokens.
    let pat_routes = Router::new()
        .route(
            "/pats",
            get(handlers::pats::list_pats).post(handlers::pats::create_pat),
        )
        .route("/pats/:id", axum::routing::delete(handlers::pats::delete_pat));

    Router::new()
        .nest("/oauth", oauth_protocol_routes.merge(oauth_client_routes))
        .nest("/auth", auth_routes)
        .nest("/user", pat_routes)
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}
