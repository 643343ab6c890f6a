use anyhow::Context;
use micro_auth::handlers::google::GoogleAuthDisabled;
use micro_auth::routes;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{Level, error, info};
use tracing_subscriber::{FmtSubscriber, layer::SubscriberExt};

use app_authentication::{AuthService, LockoutPolicy, SurrealUserStore};
use app_config::AppConfig;
use app_database::{DB_ARC, db_connect::initialize_db};
use app_error::{AppError, AppErrorExt};
use app_middleware::{FixedWindowLimiter, SessionGate};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    config.validate()?;

    let _guard = sentry::init((
        config.monitoring.sentry.dsn.clone(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(config.monitoring.sentry.environment.clone().into()),
            ..Default::default()
        },
    ));

    let level = config
        .monitoring
        .logging
        .level
        .parse::<Level>()
        .unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    let subscriber = subscriber.with(sentry_tracing::layer());
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
        .server_err()?;

    info!("Starting auth service at {}", chrono::Utc::now());

    let db_arc = DB_ARC
        .get_or_init(|| async {
            initialize_db(&config).await.unwrap_or_else(|e| {
                error!("Database initialization failed: {}", e);
                panic!("Database initialization failed");
            })
        })
        .await;

    let user_store = Arc::new(SurrealUserStore::new(Arc::clone(db_arc), "users"));

    let jwt_config = &config.security.jwt;
    let lockout_config = &config.security.lockout;

    let auth_service = Arc::new(
        AuthService::new(
            jwt_config.secret.as_bytes(),
            jwt_config.expiry_hours,
            user_store.clone(),
        )
        .with_lockout(LockoutPolicy::new(
            lockout_config.max_failed_attempts,
            lockout_config.lock_duration_secs,
        ))
        .with_password_min_length(config.security.password.min_length),
    );

    let gate = Arc::new(SessionGate::new(auth_service.jwt_service(), user_store));
    let auth_limiter = Arc::new(FixedWindowLimiter::from_settings(
        &config.security.rate_limiting.auth,
    ));
    let external = Arc::new(GoogleAuthDisabled);

    let app = routes::create_routes(&config, auth_service, gate, auth_limiter, external);

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&address)
        .await
        .context(format!("Failed to bind to address: {}", address))
        .server_err()?;

    info!("Auth service listening on http://{}", address);

    // ConnectInfo feeds the rate limiter's fallback client identifier.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")
    .server_err()?;

    Ok(())
}
