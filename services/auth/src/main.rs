use sea_orm::Database;
use tracing::info;

use vantra_auth::config::AuthConfig;
use vantra_auth::router::build_router;
use vantra_auth::state::AppState;
use vantra_auth::usecase::totp::SecretCipher;

#[tokio::main]
async fn main() {
    vantra_core::tracing::init_tracing();

    let config = AuthConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let redis_cfg = deadpool_redis::Config::from_url(&config.redis_url);
    let redis = redis_cfg
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .expect("failed to create Redis pool");

    let state = AppState {
        db,
        redis,
        cipher: SecretCipher::new(config.secret_encryption_key),
        totp_issuer: config.totp_issuer,
        cookie_domain: config.cookie_domain,
        revoke_other_sessions_on_password_change: config.revoke_sessions_on_password_change,
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.auth_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("auth service listening on {addr}");
    axum::serve(listener, router).await.expect("server error");
}
