use crate::handlers::{
    self, auth,
    google::{self, ExternalIdentity},
    user,
};
use std::{sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer, trace::TraceLayer,
};

use axum::{
    Router,
    extract::Extension,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};

use app_authentication::AuthService;
use app_config::AppConfig;
use app_error::middleware_handling::error_handling_middleware;
use app_middleware::{
    AllowedRoles, FixedWindowLimiter, SessionGate, auth_rate_limit_middleware, optional_auth,
    require_auth, require_role, security_headers_middleware,
};

pub fn create_routes(
    config: &AppConfig,
    auth_service: Arc<AuthService>,
    gate: Arc<SessionGate>,
    auth_limiter: Arc<FixedWindowLimiter>,
    external: Arc<dyn ExternalIdentity>,
) -> Router {
    let cors_config = &config.security.cors;

    let cors = CorsLayer::new()
        .allow_origin(
            if cors_config.allowed_origins.contains(&"*".to_string()) {
                tower_http::cors::AllowOrigin::any()
            } else {
                tower_http::cors::AllowOrigin::list(
                    cors_config
                        .allowed_origins
                        .iter()
                        .filter_map(|origin| origin.parse().ok())
                        .collect::<Vec<_>>(),
                )
            },
        )
        .allow_methods(
            cors_config
                .allowed_methods
                .iter()
                .filter_map(|method| method.parse().ok())
                .collect::<Vec<_>>(),
        )
        .allow_headers(
            cors_config
                .allowed_headers
                .iter()
                .filter_map(|header| header.parse().ok())
                .collect::<Vec<_>>(),
        );

    // Only sign-in burns rate-limit budget; the other auth routes are
    // protected by their own semantics.
    let signin_routes = Router::new()
        .route("/signin", post(auth::signin))
        .route_layer(from_fn_with_state(
            Arc::clone(&auth_limiter),
            auth_rate_limit_middleware,
        ));

    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/signout", post(auth::signout))
        .route("/refresh-token", post(auth::refresh_token))
        .route("/google", post(google::google_signin))
        .merge(signin_routes);

    let protected_routes = Router::new()
        .route("/user/me", get(user::me))
        .route_layer(from_fn_with_state(Arc::clone(&gate), require_auth));

    // route_layer wraps outside-in as layers are added, so the role check is
    // added first and runs after authentication.
    let admin_routes = Router::new()
        .route("/admin/overview", get(user::admin_overview))
        .route_layer(from_fn_with_state(
            AllowedRoles::new(["admin"]),
            require_role,
        ))
        .route_layer(from_fn_with_state(Arc::clone(&gate), require_auth));

    let optional_routes = Router::new()
        .route("/overview", get(user::overview))
        .route_layer(from_fn_with_state(Arc::clone(&gate), optional_auth));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .merge(optional_routes);

    let app = Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", api_routes);

    // Shared services for the handlers
    let app = app
        .layer(Extension(auth_service))
        .layer(Extension(external));

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout,
        )))
        .layer(cors);

    app.layer(from_fn(error_handling_middleware))
        .layer(RequestBodyLimitLayer::new(config.server.body_limit))
        .layer(middleware_stack)
        .layer(from_fn(security_headers_middleware))
}
